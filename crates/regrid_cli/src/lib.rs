use anyhow::Context as _;
use clap::{Parser, Subcommand};
use regrid_backend::{MigrationRequest, Migrator, SqliteStore};
use regrid_domain::{
    GridSize, LayoutRow, MigrationDelegate, MigrationOutcome, MigrationReport, NoWidgetMetadata,
    StaticWidgetMetadata, WidgetMetadataResolver,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod env;
#[cfg(test)]
mod test_support;

use env::{flag_from_env, optional_trimmed_path_from_env};

pub const DEFAULT_DB_PATH: &str = "regrid.db";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RegridConfig {
    pub db_path: PathBuf,
    pub reserve_first_cell: bool,
}

impl Default for RegridConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            reserve_first_cell: false,
        }
    }
}

impl RegridConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let mut out = Self::default();
        if let Some(path) = optional_trimmed_path_from_env("REGRID_DB_PATH")? {
            out.db_path = path;
        }
        out.reserve_first_cell = flag_from_env("REGRID_RESERVE_FIRST_CELL");
        Ok(out)
    }
}

#[derive(Parser, Debug)]
#[command(name = "regrid", about = "Migrate home-screen layouts between grid sizes")]
pub struct Cli {
    /// Layout database, overrides REGRID_DB_PATH
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replace the layout of a grid with rows read from a JSON file
    Import {
        #[arg(long)]
        grid: GridSize,
        rows: PathBuf,
    },
    /// Print the layout of a grid as JSON
    Show {
        #[arg(long)]
        grid: GridSize,
    },
    /// Print the grid the layout was last migrated to
    State,
    /// Move the layout from one grid size to another
    Migrate {
        #[arg(long)]
        from: GridSize,
        #[arg(long)]
        to: GridSize,
        /// Keep the top-left cell of the first screen free
        #[arg(long)]
        reserve_first_cell: bool,
        /// JSON object mapping widget providers to their minimum spans
        #[arg(long)]
        widget_metadata: Option<PathBuf>,
    },
}

/// Runs one command and returns what should be printed.
pub fn run(cli: Cli, mut config: RegridConfig) -> anyhow::Result<serde_json::Value> {
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    let store = SqliteStore::new(config.db_path.clone())?;

    match cli.command {
        Command::Import { grid, rows } => {
            let rows = read_rows(&rows)?;
            let count = store.import_layout(grid, rows)?;
            Ok(serde_json::json!({ "grid": grid.to_string(), "rows": count }))
        }
        Command::Show { grid } => {
            let rows = store.load_layout(grid)?;
            serde_json::to_value(rows).context("failed to encode layout")
        }
        Command::State => {
            let state = store.load_grid_state()?;
            serde_json::to_value(state).context("failed to encode grid state")
        }
        Command::Migrate {
            from,
            to,
            reserve_first_cell,
            widget_metadata,
        } => {
            let resolver: Arc<dyn WidgetMetadataResolver> = match widget_metadata {
                Some(path) => Arc::new(read_widget_metadata(&path)?),
                None => Arc::new(NoWidgetMetadata),
            };
            let migrator = Migrator::new(resolver).with_delegate(Arc::new(LoggingDelegate));
            let report = store.migrate(
                migrator,
                MigrationRequest {
                    source: from,
                    target: to,
                    reserve_first_cell: reserve_first_cell || config.reserve_first_cell,
                },
            )?;
            serde_json::to_value(&report).context("failed to encode migration report")
        }
    }
}

fn read_rows(path: &Path) -> anyhow::Result<Vec<LayoutRow>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse rows in {}", path.display()))
}

fn read_widget_metadata(path: &Path) -> anyhow::Result<StaticWidgetMetadata> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let metadata: StaticWidgetMetadata = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse widget metadata in {}", path.display()))?;
    tracing::info!(providers = metadata.len(), "loaded widget metadata");
    Ok(metadata)
}

struct LoggingDelegate;

impl MigrationDelegate for LoggingDelegate {
    fn on_migration_finished(&self, report: &MigrationReport) {
        match &report.outcome {
            MigrationOutcome::Succeeded => tracing::info!(
                grid = %report.target,
                added = report.added.len(),
                removed = report.removed_ids.len(),
                "layout migrated"
            ),
            MigrationOutcome::AlreadyMigrated => {
                tracing::info!(grid = %report.target, "layout already migrated")
            }
            MigrationOutcome::Failed { phase, error } => tracing::warn!(
                grid = %report.target,
                phase = %phase,
                error = %error,
                "layout migration failed"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{EnvVarGuard, lock_env};
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("regrid").chain(args.iter().copied())).unwrap()
    }

    fn config_in(dir: &TempDir) -> RegridConfig {
        RegridConfig {
            db_path: dir.path().join("layout.db"),
            reserve_first_cell: false,
        }
    }

    fn write_json(dir: &TempDir, name: &str, value: serde_json::Value) -> String {
        let path = dir.path().join(name);
        std::fs::write(&path, value.to_string()).unwrap();
        path.display().to_string()
    }

    #[test]
    fn config_reads_env_and_defaults() {
        let _lock = lock_env();
        {
            let _db = EnvVarGuard::remove("REGRID_DB_PATH");
            let _flag = EnvVarGuard::remove("REGRID_RESERVE_FIRST_CELL");
            assert_eq!(RegridConfig::from_env().unwrap(), RegridConfig::default());
        }

        let _db = EnvVarGuard::set("REGRID_DB_PATH", " /tmp/layout.db ");
        let _flag = EnvVarGuard::set("REGRID_RESERVE_FIRST_CELL", "yes");
        let config = RegridConfig::from_env().unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/layout.db"));
        assert!(config.reserve_first_cell);

        let _empty = EnvVarGuard::set("REGRID_DB_PATH", "");
        assert!(RegridConfig::from_env().is_err());
    }

    #[test]
    fn grid_arguments_are_validated_while_parsing() {
        let cli = parse(&["migrate", "--from", "4x4x4", "--to", "5x5x4"]);
        match cli.command {
            Command::Migrate {
                from,
                to,
                reserve_first_cell,
                widget_metadata,
            } => {
                assert_eq!(from, GridSize::new(4, 4, 4).unwrap());
                assert_eq!(to, GridSize::new(5, 5, 4).unwrap());
                assert!(!reserve_first_cell);
                assert!(widget_metadata.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }

        assert!(Cli::try_parse_from(["regrid", "show", "--grid", "4x0x4"]).is_err());
        assert!(Cli::try_parse_from(["regrid", "show", "--grid", "four"]).is_err());
    }

    #[test]
    fn import_migrate_and_show_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let rows = write_json(
            &dir,
            "rows.json",
            serde_json::json!([
                { "id": 1, "item_type": 0, "container": -100, "launch_target": "com.mail/.Inbox" },
                { "id": 2, "item_type": 4, "container": -100, "screen": 1,
                  "span_x": 4, "span_y": 4, "widget_provider": "com.weather/.Large", "widget_id": 2 },
            ]),
        );
        let metadata = write_json(
            &dir,
            "widgets.json",
            serde_json::json!({ "com.weather/.Large": { "min_span_x": 2, "min_span_y": 1 } }),
        );

        let imported = run(parse(&["import", "--grid", "4x4x4", &rows]), config_in(&dir)).unwrap();
        assert_eq!(imported["rows"], 2);

        let report = run(
            parse(&[
                "migrate",
                "--from",
                "4x4x4",
                "--to",
                "3x3x3",
                "--widget-metadata",
                &metadata,
            ]),
            config_in(&dir),
        )
        .unwrap();
        assert_eq!(report["outcome"]["status"], "succeeded");
        assert_eq!(report["added"].as_array().unwrap().len(), 2);

        let shown = run(parse(&["show", "--grid", "3x3x3"]), config_in(&dir)).unwrap();
        let spans: Vec<(i64, i64)> = shown
            .as_array()
            .unwrap()
            .iter()
            .map(|row| (row["span_x"].as_i64().unwrap(), row["span_y"].as_i64().unwrap()))
            .collect();
        assert_eq!(spans, vec![(1, 1), (2, 1)]);

        let state = run(parse(&["state"]), config_in(&dir)).unwrap();
        assert_eq!(state["grid"]["columns"], 3);
        assert_eq!(state["phase"], "done");
    }

    #[test]
    fn reserve_flag_from_config_applies_to_migrate() {
        let dir = tempfile::tempdir().unwrap();
        let rows = write_json(
            &dir,
            "rows.json",
            serde_json::json!([
                { "id": 1, "item_type": 0, "container": -100, "launch_target": "com.mail/.Inbox" },
            ]),
        );
        run(parse(&["import", "--grid", "4x4x4", &rows]), config_in(&dir)).unwrap();

        let mut config = config_in(&dir);
        config.reserve_first_cell = true;
        let report = run(
            parse(&["migrate", "--from", "4x4x4", "--to", "2x2x2"]),
            config,
        )
        .unwrap();
        assert_eq!(report["added"][0]["cell_x"], 1);
        assert_eq!(report["added"][0]["cell_y"], 0);
    }

    #[test]
    fn db_flag_overrides_config_path() {
        let dir = tempfile::tempdir().unwrap();
        let other = dir.path().join("other.db");
        let other_arg = other.display().to_string();

        let state = run(parse(&["state", "--db", &other_arg]), config_in(&dir)).unwrap();
        assert!(state.is_null());
        assert!(other.exists());
        assert!(!dir.path().join("layout.db").exists());
    }
}
