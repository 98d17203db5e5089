mod adapters;
pub use adapters::{
    MigrationDelegate, NoWidgetMetadata, StaticWidgetMetadata, WidgetMetadataResolver,
    WidgetSpans,
};
mod grid;
pub use grid::{
    CONTAINER_DESKTOP, CONTAINER_HOTSEAT, CellRect, Container, GridSize, GridSizeParseError,
    ItemKind, MAX_GRID_DIMENSION,
};
mod model;
pub use model::{ChildItems, EntryPayload, GridEntry, IdentityKey, LaunchTarget, LayoutRow};
mod occupancy;
pub use occupancy::GridOccupancy;
mod loading;
pub use loading::{
    InvalidEntryReason, InvalidRow, LoadedEntries, child_identity, entry_from_row, load_entries,
    orphaned_children,
};
mod diff;
pub use diff::{GridDiff, calc_diff};
pub mod placement;
pub use placement::{PlacementError, WorkspacePlacement};
mod plan;
pub use plan::{
    ChildInsert, EntryInsert, MigrationPlan, MigrationStrategy, Snapshot, SnapshotDiff,
    diff_snapshots, is_strictly_taller, migration_strategy, place_diff, plan_migration,
};
mod report;
pub use report::{MigrationOutcome, MigrationPhase, MigrationReport, PlacedEntry};
