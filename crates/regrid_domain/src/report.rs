use crate::{Container, GridSize, MigrationStrategy};
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationPhase {
    Idle,
    CopyingSource,
    Diffing,
    Placing,
    Committing,
    Done,
    Failed,
}

impl MigrationPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            MigrationPhase::Idle => "idle",
            MigrationPhase::CopyingSource => "copying_source",
            MigrationPhase::Diffing => "diffing",
            MigrationPhase::Placing => "placing",
            MigrationPhase::Committing => "committing",
            MigrationPhase::Done => "done",
            MigrationPhase::Failed => "failed",
        }
    }
}

impl fmt::Display for MigrationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MigrationOutcome {
    Succeeded,
    /// The recorded grid already matched the target; nothing was touched.
    AlreadyMigrated,
    Failed {
        phase: MigrationPhase,
        error: String,
    },
}

impl MigrationOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, MigrationOutcome::Failed { .. })
    }
}

/// Final position of an entry written into the destination table.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize)]
pub struct PlacedEntry {
    pub id: i64,
    pub source_id: i64,
    pub container: Container,
    pub screen_id: i32,
    pub cell_x: i32,
    pub cell_y: i32,
    pub span_x: i32,
    pub span_y: i32,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize)]
pub struct MigrationReport {
    pub source: GridSize,
    pub target: GridSize,
    pub strategy: MigrationStrategy,
    pub outcome: MigrationOutcome,
    pub added: Vec<PlacedEntry>,
    pub new_screen_ids: Vec<i32>,
    pub removed_ids: Vec<i64>,
    pub deleted_invalid: Vec<i64>,
    pub dropped_unplaceable: Vec<i64>,
    pub dropped_hotseat: Vec<i64>,
}

impl MigrationReport {
    pub fn new(source: GridSize, target: GridSize, strategy: MigrationStrategy) -> Self {
        Self {
            source,
            target,
            strategy,
            outcome: MigrationOutcome::Succeeded,
            added: Vec::new(),
            new_screen_ids: Vec::new(),
            removed_ids: Vec::new(),
            deleted_invalid: Vec::new(),
            dropped_unplaceable: Vec::new(),
            dropped_hotseat: Vec::new(),
        }
    }

    pub fn failed(mut self, phase: MigrationPhase, error: impl fmt::Display) -> Self {
        self.outcome = MigrationOutcome::Failed {
            phase,
            error: error.to_string(),
        };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_report_serializes_phase_and_error() {
        let grid = GridSize::new(4, 4, 4).unwrap();
        let report = MigrationReport::new(grid, grid, MigrationStrategy::Reconcile)
            .failed(MigrationPhase::Placing, "no room");
        assert!(!report.outcome.is_success());

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["outcome"]["status"], "failed");
        assert_eq!(value["outcome"]["phase"], "placing");
        assert_eq!(value["outcome"]["error"], "no room");
        assert_eq!(value["strategy"]["kind"], "reconcile");
    }
}
