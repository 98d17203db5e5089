use crate::grid_state::{load_grid_state, save_grid_state};
use crate::layout_table::{self, SCRATCH_TABLE};
use crate::reader::EntryReader;
use anyhow::{Context as _, anyhow};
use regrid_domain::{
    Container, EntryInsert, GridSize, MigrationDelegate, MigrationOutcome, MigrationPhase,
    MigrationReport, MigrationStrategy, PlacedEntry, WidgetMetadataResolver, diff_snapshots,
    migration_strategy, place_diff,
};
use rusqlite::{Connection, Transaction};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MigrationRequest {
    pub source: GridSize,
    pub target: GridSize,
    pub reserve_first_cell: bool,
}

/// Moves a layout from one grid table to another.
///
/// Everything up to the commit runs in a single transaction; the grid-state
/// marker is recorded afterwards whether or not the migration succeeded.
#[derive(Clone)]
pub struct Migrator {
    resolver: Arc<dyn WidgetMetadataResolver>,
    delegate: Option<Arc<dyn MigrationDelegate>>,
}

struct PhaseTracker {
    phase: MigrationPhase,
}

impl PhaseTracker {
    fn enter(&mut self, phase: MigrationPhase) {
        tracing::info!(phase = %phase, "migration phase");
        self.phase = phase;
    }
}

impl Migrator {
    pub fn new(resolver: Arc<dyn WidgetMetadataResolver>) -> Self {
        Self {
            resolver,
            delegate: None,
        }
    }

    pub fn with_delegate(mut self, delegate: Arc<dyn MigrationDelegate>) -> Self {
        self.delegate = Some(delegate);
        self
    }

    pub fn run(
        &self,
        conn: &mut Connection,
        request: MigrationRequest,
    ) -> anyhow::Result<MigrationReport> {
        let strategy = migration_strategy(request.source, request.target);

        let marker = match load_grid_state(conn) {
            Ok(marker) => marker,
            Err(err) => {
                return Err(self.fail(conn, request, strategy, MigrationPhase::Idle, err));
            }
        };
        if marker.is_some_and(|state| state.grid == request.target) {
            tracing::info!(grid = %request.target, "layout already migrated");
            let mut report = MigrationReport::new(request.source, request.target, strategy);
            report.outcome = MigrationOutcome::AlreadyMigrated;
            self.notify(&report);
            return Ok(report);
        }

        tracing::info!(
            from = %request.source,
            to = %request.target,
            strategy = ?strategy,
            "starting grid migration"
        );
        let mut tracker = PhaseTracker {
            phase: MigrationPhase::Idle,
        };

        let report = match self.execute(conn, request, strategy, &mut tracker) {
            Ok(report) => report,
            Err(err) => return Err(self.fail(conn, request, strategy, tracker.phase, err)),
        };

        tracker.enter(MigrationPhase::Done);
        tracing::info!(
            added = report.added.len(),
            removed = report.removed_ids.len(),
            deleted_invalid = report.deleted_invalid.len(),
            new_screens = ?report.new_screen_ids,
            "grid migration finished"
        );
        let saved = save_grid_state(conn, request.target, MigrationPhase::Done);
        if let Err(marker_err) = &saved {
            tracing::error!(error = %marker_err, "failed to record grid state");
        }
        self.notify(&report);
        saved.context("layout migrated but the grid state was not recorded")?;
        Ok(report)
    }

    /// Records the failure in the marker, tells the delegate, and returns
    /// `err` with the failing phase attached.
    fn fail(
        &self,
        conn: &mut Connection,
        request: MigrationRequest,
        strategy: MigrationStrategy,
        phase: MigrationPhase,
        err: anyhow::Error,
    ) -> anyhow::Error {
        let message = format!("{err:#}");
        tracing::error!(phase = %phase, error = %message, "grid migration failed");
        if let Err(marker_err) = save_grid_state(conn, request.target, MigrationPhase::Failed) {
            tracing::error!(error = %marker_err, "failed to record grid state");
        }
        let report =
            MigrationReport::new(request.source, request.target, strategy).failed(phase, message);
        self.notify(&report);
        err.context(format!("grid migration failed while {phase}"))
    }

    fn notify(&self, report: &MigrationReport) {
        if let Some(delegate) = &self.delegate {
            delegate.on_migration_finished(report);
        }
    }

    fn execute(
        &self,
        conn: &mut Connection,
        request: MigrationRequest,
        strategy: MigrationStrategy,
        tracker: &mut PhaseTracker,
    ) -> anyhow::Result<MigrationReport> {
        let src_table = request.source.table_name();
        let dst_table = request.target.table_name();
        let mut report = MigrationReport::new(request.source, request.target, strategy);

        let tx = conn.transaction()?;
        tracker.enter(MigrationPhase::CopyingSource);
        if !layout_table::table_exists(&tx, &src_table)? {
            return Err(anyhow!("source layout table {src_table} does not exist"));
        }

        match strategy {
            MigrationStrategy::Unchanged => {}
            MigrationStrategy::ShiftDown { rows } => {
                self.shift_down(&tx, &src_table, &dst_table, rows, tracker, &mut report)?;
            }
            MigrationStrategy::Reconcile => {
                self.reconcile(&tx, request, &src_table, &dst_table, tracker, &mut report)?;
            }
        }

        tx.commit().context("failed to commit migration")?;
        Ok(report)
    }

    /// Copies the source over the destination and pushes the workspace down.
    /// Destination-only rows are not reconciled and disappear with the copy.
    fn shift_down(
        &self,
        tx: &Transaction<'_>,
        src_table: &str,
        dst_table: &str,
        rows: i32,
        tracker: &mut PhaseTracker,
        report: &mut MigrationReport,
    ) -> anyhow::Result<()> {
        let (previous_screens, mut replaced) = if layout_table::table_exists(tx, dst_table)? {
            (
                layout_table::screen_ids(tx, dst_table)?,
                layout_table::all_ids(tx, dst_table)?,
            )
        } else {
            (Vec::new(), Vec::new())
        };
        replaced.sort_unstable();
        layout_table::copy_table(tx, src_table, dst_table)?;

        tracker.enter(MigrationPhase::Committing);
        let shifted = layout_table::shift_workspace_rows(tx, dst_table, rows)?;
        tracing::info!(rows, shifted, table = %dst_table, "shifted workspace rows down");

        for row in layout_table::load_rows(tx, dst_table)? {
            let Some(container @ (Container::Desktop | Container::Hotseat)) = row.parent() else {
                continue;
            };
            report.added.push(PlacedEntry {
                id: row.id,
                source_id: row.id,
                container,
                screen_id: row.screen,
                cell_x: row.cell_x,
                cell_y: row.cell_y,
                span_x: row.span_x,
                span_y: row.span_y,
            });
        }
        report.new_screen_ids = layout_table::screen_ids(tx, dst_table)?
            .into_iter()
            .filter(|screen| !previous_screens.contains(screen))
            .collect();
        report.removed_ids = replaced;
        Ok(())
    }

    fn reconcile(
        &self,
        tx: &Transaction<'_>,
        request: MigrationRequest,
        src_table: &str,
        dst_table: &str,
        tracker: &mut PhaseTracker,
        report: &mut MigrationReport,
    ) -> anyhow::Result<()> {
        let copied = layout_table::copy_table(tx, src_table, SCRATCH_TABLE)?;
        layout_table::create_table(tx, dst_table)?;
        tracing::info!(rows = copied, source = %src_table, "copied source layout");

        tracker.enter(MigrationPhase::Diffing);
        let resolver = self.resolver.as_ref();
        let src = EntryReader::new(tx, SCRATCH_TABLE, resolver).load_snapshot()?;
        let dst = EntryReader::new(tx, dst_table, resolver).load_snapshot()?;
        let diff = diff_snapshots(&src, &dst);
        report.deleted_invalid = src.invalid_ids();
        report.deleted_invalid.extend(dst.invalid_ids());

        tracker.enter(MigrationPhase::Placing);
        let mut ids_in_use = layout_table::all_ids(tx, SCRATCH_TABLE)?;
        ids_in_use.extend(layout_table::all_ids(tx, dst_table)?);
        let plan = place_diff(
            request.target,
            &dst,
            diff,
            ids_in_use,
            request.reserve_first_cell,
        )?;
        for id in &plan.dropped_unplaceable {
            tracing::warn!(id, "entry does not fit the target grid, dropping it");
        }
        for id in &plan.dropped_hotseat {
            tracing::warn!(id, "no free dock slot, dropping entry");
        }

        tracker.enter(MigrationPhase::Committing);
        layout_table::delete_ids(tx, dst_table, &plan.remove_ids)?;
        for insert in &plan.inserts {
            layout_table::insert_placed(tx, SCRATCH_TABLE, dst_table, insert)?;
        }
        layout_table::drop_table(tx, SCRATCH_TABLE)?;

        report.added = plan.inserts.iter().map(placed_entry).collect();
        report.new_screen_ids = plan.new_screen_ids;
        report.removed_ids = plan.remove_ids;
        report.dropped_unplaceable = plan.dropped_unplaceable;
        report.dropped_hotseat = plan.dropped_hotseat;
        Ok(())
    }
}

fn placed_entry(insert: &EntryInsert) -> PlacedEntry {
    PlacedEntry {
        id: insert.new_id,
        source_id: insert.source_id,
        container: insert.container,
        screen_id: insert.screen_id,
        cell_x: insert.cell_x,
        cell_y: insert.cell_y,
        span_x: insert.span_x,
        span_y: insert.span_y,
    }
}
