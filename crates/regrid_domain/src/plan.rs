use crate::placement::{
    IdAllocator, place_hotseat, place_workspace, verify_hotseat, verify_workspace,
};
use crate::{
    Container, GridDiff, GridEntry, GridSize, InvalidRow, LoadedEntries, PlacementError, calc_diff,
};
use std::collections::HashSet;

/// How a migration between two grid sizes is carried out.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MigrationStrategy {
    /// Source and destination are the same grid.
    Unchanged,
    /// Same width and dock, more rows: copy the source and push every
    /// workspace entry down by `rows`.
    ShiftDown { rows: i32 },
    /// General case: diff the snapshots and place what is new.
    Reconcile,
}

pub fn is_strictly_taller(src: GridSize, dst: GridSize) -> bool {
    src.columns == dst.columns
        && src.hotseat_capacity == dst.hotseat_capacity
        && dst.rows > src.rows
}

pub fn migration_strategy(src: GridSize, dst: GridSize) -> MigrationStrategy {
    if src == dst {
        MigrationStrategy::Unchanged
    } else if is_strictly_taller(src, dst) {
        MigrationStrategy::ShiftDown {
            rows: dst.rows - src.rows,
        }
    } else {
        MigrationStrategy::Reconcile
    }
}

/// Validated workspace and dock entries of one layout table.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub workspace: LoadedEntries,
    pub hotseat: LoadedEntries,
    /// Child rows whose parent row is missing altogether.
    pub orphans: Vec<InvalidRow>,
}

impl Snapshot {
    pub fn invalid_ids(&self) -> Vec<i64> {
        let mut ids = self.workspace.invalid_ids();
        ids.extend(self.hotseat.invalid_ids());
        ids.extend(self.orphans.iter().map(|row| row.id));
        ids.sort_unstable();
        ids
    }

    pub fn all_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.workspace.all_ids().chain(self.hotseat.all_ids())
    }
}

#[derive(Clone, Debug, Default)]
pub struct SnapshotDiff {
    pub workspace: GridDiff,
    pub hotseat: GridDiff,
}

impl SnapshotDiff {
    pub fn to_remove_ids(&self) -> Vec<i64> {
        let mut ids = self.workspace.to_remove_ids.clone();
        ids.extend(&self.hotseat.to_remove_ids);
        ids
    }
}

pub fn diff_snapshots(src: &Snapshot, dst: &Snapshot) -> SnapshotDiff {
    SnapshotDiff {
        workspace: calc_diff(&src.workspace.entries, &dst.workspace.entries),
        hotseat: calc_diff(&src.hotseat.entries, &dst.hotseat.entries),
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize)]
pub struct ChildInsert {
    pub source_id: i64,
    pub new_id: i64,
}

/// One source row to copy into the destination under a fresh id, with its
/// placement overriding the copied position fields.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize)]
pub struct EntryInsert {
    pub source_id: i64,
    pub new_id: i64,
    pub container: Container,
    pub screen_id: i32,
    pub cell_x: i32,
    pub cell_y: i32,
    pub span_x: i32,
    pub span_y: i32,
    pub children: Vec<ChildInsert>,
}

impl EntryInsert {
    fn new(entry: &GridEntry, ids: &mut IdAllocator) -> Self {
        let new_id = ids.allocate();
        let children = entry
            .child_ids()
            .into_iter()
            .map(|source_id| ChildInsert {
                source_id,
                new_id: ids.allocate(),
            })
            .collect();
        Self {
            source_id: entry.id,
            new_id,
            container: entry.container,
            screen_id: entry.screen_id,
            cell_x: entry.cell_x,
            cell_y: entry.cell_y,
            span_x: entry.span_x,
            span_y: entry.span_y,
            children,
        }
    }
}

/// Row-level writes that turn the destination snapshot into the migrated
/// layout.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Serialize)]
pub struct MigrationPlan {
    pub remove_ids: Vec<i64>,
    pub inserts: Vec<EntryInsert>,
    pub new_screen_ids: Vec<i32>,
    pub dropped_unplaceable: Vec<i64>,
    pub dropped_hotseat: Vec<i64>,
}

impl MigrationPlan {
    pub fn is_noop(&self) -> bool {
        self.remove_ids.is_empty() && self.inserts.is_empty()
    }
}

/// Places the entries a diff added onto the destination grid and assigns
/// fresh ids to them and their children.
///
/// `ids_in_use` must cover every id present in either table.
pub fn place_diff(
    target: GridSize,
    dst: &Snapshot,
    diff: SnapshotDiff,
    ids_in_use: impl IntoIterator<Item = i64>,
    reserve_first_cell: bool,
) -> Result<MigrationPlan, PlacementError> {
    let removed: HashSet<i64> = diff
        .workspace
        .removed_entry_ids
        .iter()
        .chain(&diff.hotseat.removed_entry_ids)
        .copied()
        .collect();
    let retained = |entries: &[GridEntry]| -> Vec<GridEntry> {
        entries
            .iter()
            .filter(|entry| !removed.contains(&entry.id))
            .cloned()
            .collect()
    };
    let retained_hotseat = retained(&dst.hotseat.entries);
    let retained_workspace = retained(&dst.workspace.entries);
    let remove_ids = diff.to_remove_ids();

    let hotseat = place_hotseat(
        target.hotseat_capacity,
        &retained_hotseat,
        diff.hotseat.to_add,
    );
    verify_hotseat(target.hotseat_capacity, &retained_hotseat, &hotseat.placed)?;

    let workspace = place_workspace(
        target,
        &retained_workspace,
        dst.workspace.last_screen_id,
        diff.workspace.to_add,
        reserve_first_cell,
    )?;
    verify_workspace(target, &retained_workspace, &workspace.placed)?;

    let mut ids = IdAllocator::new(ids_in_use);
    let inserts = hotseat
        .placed
        .iter()
        .chain(&workspace.placed)
        .map(|entry| EntryInsert::new(entry, &mut ids))
        .collect();

    Ok(MigrationPlan {
        remove_ids,
        inserts,
        new_screen_ids: workspace.new_screen_ids,
        dropped_unplaceable: workspace.dropped.iter().map(|entry| entry.id).collect(),
        dropped_hotseat: hotseat.dropped.iter().map(|entry| entry.id).collect(),
    })
}

/// Diff and placement in one step.
pub fn plan_migration(
    target: GridSize,
    src: &Snapshot,
    dst: &Snapshot,
    reserve_first_cell: bool,
) -> Result<MigrationPlan, PlacementError> {
    let diff = diff_snapshots(src, dst);
    let ids_in_use: Vec<i64> = src.all_ids().chain(dst.all_ids()).collect();
    place_diff(target, dst, diff, ids_in_use, reserve_first_cell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ItemKind, LayoutRow, NoWidgetMetadata, load_entries, orphaned_children};

    fn snapshot(rows: &[LayoutRow]) -> Snapshot {
        let children: Vec<LayoutRow> = rows
            .iter()
            .filter(|row| matches!(row.parent(), Some(Container::Folder(_))))
            .cloned()
            .collect();
        Snapshot {
            workspace: load_entries(Container::Desktop, rows, &children, &NoWidgetMetadata),
            hotseat: load_entries(Container::Hotseat, rows, &children, &NoWidgetMetadata),
            orphans: orphaned_children(rows),
        }
    }

    fn grid(columns: i32, rows: i32, hotseat: i32) -> GridSize {
        GridSize::new(columns, rows, hotseat).unwrap()
    }

    #[test]
    fn strategy_prefers_shift_down_for_strictly_taller_grids() {
        assert_eq!(
            migration_strategy(grid(4, 4, 4), grid(4, 5, 4)),
            MigrationStrategy::ShiftDown { rows: 1 }
        );
        assert_eq!(
            migration_strategy(grid(4, 4, 4), grid(4, 4, 4)),
            MigrationStrategy::Unchanged
        );
        assert_eq!(
            migration_strategy(grid(4, 4, 4), grid(5, 5, 4)),
            MigrationStrategy::Reconcile
        );
        assert_eq!(
            migration_strategy(grid(4, 4, 4), grid(4, 5, 5)),
            MigrationStrategy::Reconcile
        );
        assert_eq!(
            migration_strategy(grid(4, 5, 4), grid(4, 4, 4)),
            MigrationStrategy::Reconcile
        );
    }

    #[test]
    fn duplicate_shortcut_is_added_once_at_first_vacant_cell() {
        let src = snapshot(&[
            LayoutRow::app(1, Container::Desktop, "com.mail/.Inbox").at(0, 0, 0),
            LayoutRow::app(2, Container::Desktop, "com.mail/.Inbox").at(0, 1, 0),
        ]);
        let dst = snapshot(&[LayoutRow::app(5, Container::Desktop, "com.mail/.Inbox").at(0, 2, 2)]);
        let plan = plan_migration(grid(5, 5, 4), &src, &dst, false).unwrap();

        assert!(plan.remove_ids.is_empty());
        assert_eq!(plan.inserts.len(), 1);
        let insert = &plan.inserts[0];
        assert_eq!(insert.source_id, 1);
        assert_eq!(insert.new_id, 6);
        assert_eq!(
            (insert.screen_id, insert.cell_x, insert.cell_y),
            (0, 0, 0)
        );
    }

    #[test]
    fn folders_are_copied_with_fresh_child_ids() {
        let src = snapshot(&[
            LayoutRow::collection(10, ItemKind::Folder, Container::Desktop).at(0, 1, 1),
            LayoutRow::app(11, Container::Folder(10), "com.maps/.Main"),
            LayoutRow::app(12, Container::Folder(10), "com.chat/.Main").with_rank(1),
        ]);
        let dst = snapshot(&[LayoutRow::app(40, Container::Hotseat, "com.mail/.Inbox")]);
        let plan = plan_migration(grid(3, 3, 3), &src, &dst, false).unwrap();

        assert_eq!(plan.inserts.len(), 1);
        let folder = &plan.inserts[0];
        assert_eq!(folder.source_id, 10);
        assert_eq!(folder.new_id, 41);
        assert_eq!(
            folder.children,
            vec![
                ChildInsert {
                    source_id: 11,
                    new_id: 42
                },
                ChildInsert {
                    source_id: 12,
                    new_id: 43
                },
            ]
        );
        assert_eq!(plan.remove_ids, vec![40]);
    }

    #[test]
    fn destination_only_items_are_removed_and_their_space_reused() {
        let src = snapshot(&[LayoutRow::app(1, Container::Desktop, "com.mail/.Inbox").at(0, 3, 3)]);
        let dst = snapshot(&[
            LayoutRow::app(5, Container::Desktop, "com.news/.Main").at(0, 0, 0),
            LayoutRow::app(6, Container::Desktop, "com.maps/.Main").at(0, 1, 0),
        ]);
        let plan = plan_migration(grid(2, 1, 2), &src, &dst, false).unwrap();

        assert_eq!(plan.remove_ids, vec![5, 6]);
        assert_eq!(plan.inserts.len(), 1);
        assert_eq!(
            (plan.inserts[0].screen_id, plan.inserts[0].cell_x),
            (0, 0)
        );
        assert!(plan.new_screen_ids.is_empty());
    }

    #[test]
    fn dock_entries_fill_free_slots_and_overflow_is_reported() {
        let src = snapshot(&[
            LayoutRow::app(1, Container::Hotseat, "com.mail/.Inbox").at(0, 0, 0),
            LayoutRow::app(2, Container::Hotseat, "com.maps/.Main").at(1, 0, 0),
            LayoutRow::app(3, Container::Hotseat, "com.chat/.Main").at(2, 0, 0),
            LayoutRow::app(4, Container::Hotseat, "com.news/.Main").at(3, 0, 0),
        ]);
        let dst = snapshot(&[LayoutRow::app(9, Container::Hotseat, "com.maps/.Main").at(0, 0, 0)]);
        let plan = plan_migration(grid(4, 4, 3), &src, &dst, false).unwrap();

        let slots: Vec<(i64, Container, i32)> = plan
            .inserts
            .iter()
            .map(|insert| (insert.source_id, insert.container, insert.screen_id))
            .collect();
        assert_eq!(
            slots,
            vec![(1, Container::Hotseat, 1), (3, Container::Hotseat, 2)]
        );
        assert_eq!(plan.dropped_hotseat, vec![4]);
        assert!(plan.remove_ids.is_empty());
    }

    #[test]
    fn retained_rows_far_outside_the_grid_are_ignored_while_seeding() {
        let src = snapshot(&[
            LayoutRow::app(1, Container::Desktop, "com.mail/.Inbox").at(0, 0, 0),
            LayoutRow::app(2, Container::Desktop, "com.news/.Main").at(0, 1, 0),
        ]);
        let dst = snapshot(&[
            LayoutRow::app(7, Container::Desktop, "com.news/.Main").at(0, i32::MAX, 0),
        ]);
        let plan = plan_migration(grid(4, 4, 4), &src, &dst, false).unwrap();

        assert!(plan.remove_ids.is_empty());
        assert_eq!(plan.inserts.len(), 1);
        let insert = &plan.inserts[0];
        assert_eq!((insert.source_id, insert.new_id), (1, 8));
        assert_eq!(
            (insert.screen_id, insert.cell_x, insert.cell_y),
            (0, 0, 0)
        );
    }

    #[test]
    fn identical_snapshots_produce_an_empty_plan() {
        let rows = [
            LayoutRow::app(1, Container::Desktop, "com.mail/.Inbox").at(0, 0, 0),
            LayoutRow::widget(2, "com.clock/.Widget", 2, 2).at(0, 1, 0),
            LayoutRow::app(3, Container::Hotseat, "com.maps/.Main"),
        ];
        let plan = plan_migration(grid(4, 4, 4), &snapshot(&rows), &snapshot(&rows), false)
            .unwrap();
        assert!(plan.is_noop());
    }
}
