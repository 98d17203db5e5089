use crate::grid_state::{GridState, load_grid_state};
use crate::layout_table;
use crate::migrator::{MigrationRequest, Migrator};
use anyhow::{Context as _, anyhow};
use regrid_domain::{GridSize, LayoutRow, MigrationReport};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

const LATEST_SCHEMA_VERSION: u32 = 1;

const MIGRATIONS: &[(u32, &str)] = &[(
    1,
    include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/migrations/0001_init.sql"
    )),
)];

/// Handle to the layout database. All commands run on one worker thread, so
/// at most one migration is ever in flight.
#[derive(Clone)]
pub struct SqliteStore {
    tx: mpsc::Sender<DbCommand>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SqliteStoreOptions {
    pub busy_timeout_ms: u64,
}

impl Default for SqliteStoreOptions {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5000,
        }
    }
}

enum DbCommand {
    ImportLayout {
        grid: GridSize,
        rows: Vec<LayoutRow>,
        reply: mpsc::Sender<anyhow::Result<usize>>,
    },
    LoadLayout {
        grid: GridSize,
        reply: mpsc::Sender<anyhow::Result<Vec<LayoutRow>>>,
    },
    LoadGridState {
        reply: mpsc::Sender<anyhow::Result<Option<GridState>>>,
    },
    Migrate {
        migrator: Migrator,
        request: MigrationRequest,
        reply: mpsc::Sender<anyhow::Result<MigrationReport>>,
    },
}

impl SqliteStore {
    pub fn new(db_path: PathBuf) -> anyhow::Result<Self> {
        Self::new_with_options(db_path, SqliteStoreOptions::default())
    }

    pub fn new_with_options(db_path: PathBuf, options: SqliteStoreOptions) -> anyhow::Result<Self> {
        let (tx, rx) = mpsc::channel::<DbCommand>();

        std::thread::Builder::new()
            .name("regrid-sqlite".to_owned())
            .spawn(move || {
                let mut db = SqliteDatabase::open(&db_path, options);
                if let Err(err) = &db {
                    let message = format!("{err:#}");
                    tracing::error!(error = %message, "failed to open layout database");
                }
                while let Ok(cmd) = rx.recv() {
                    match (&mut db, cmd) {
                        (Ok(db), DbCommand::ImportLayout { grid, rows, reply }) => {
                            let _ = reply.send(db.import_layout(grid, &rows));
                        }
                        (Ok(db), DbCommand::LoadLayout { grid, reply }) => {
                            let _ = reply.send(db.load_layout(grid));
                        }
                        (Ok(db), DbCommand::LoadGridState { reply }) => {
                            let _ = reply.send(load_grid_state(&db.conn));
                        }
                        (
                            Ok(db),
                            DbCommand::Migrate {
                                migrator,
                                request,
                                reply,
                            },
                        ) => {
                            let _ = reply.send(migrator.run(&mut db.conn, request));
                        }
                        (Err(err), cmd) => {
                            respond_db_open_error(err, cmd);
                        }
                    }
                }
            })
            .context("failed to spawn sqlite worker thread")?;

        Ok(Self { tx })
    }

    /// Replaces the layout table of `grid` with `rows`. Rows are stored as
    /// given; validation happens when a migration reads them.
    pub fn import_layout(&self, grid: GridSize, rows: Vec<LayoutRow>) -> anyhow::Result<usize> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(DbCommand::ImportLayout {
                grid,
                rows,
                reply: reply_tx,
            })
            .context("sqlite worker is not running")?;
        reply_rx.recv().context("sqlite worker terminated")?
    }

    pub fn load_layout(&self, grid: GridSize) -> anyhow::Result<Vec<LayoutRow>> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(DbCommand::LoadLayout {
                grid,
                reply: reply_tx,
            })
            .context("sqlite worker is not running")?;
        reply_rx.recv().context("sqlite worker terminated")?
    }

    pub fn load_grid_state(&self) -> anyhow::Result<Option<GridState>> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(DbCommand::LoadGridState { reply: reply_tx })
            .context("sqlite worker is not running")?;
        reply_rx.recv().context("sqlite worker terminated")?
    }

    pub fn migrate(
        &self,
        migrator: Migrator,
        request: MigrationRequest,
    ) -> anyhow::Result<MigrationReport> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(DbCommand::Migrate {
                migrator,
                request,
                reply: reply_tx,
            })
            .context("sqlite worker is not running")?;
        reply_rx.recv().context("sqlite worker terminated")?
    }
}

fn respond_db_open_error(err: &anyhow::Error, cmd: DbCommand) {
    let message = format!("{err:#}");
    match cmd {
        DbCommand::ImportLayout { reply, .. } => {
            let _ = reply.send(Err(anyhow!(message)));
        }
        DbCommand::LoadLayout { reply, .. } => {
            let _ = reply.send(Err(anyhow!(message)));
        }
        DbCommand::LoadGridState { reply } => {
            let _ = reply.send(Err(anyhow!(message)));
        }
        DbCommand::Migrate { reply, .. } => {
            let _ = reply.send(Err(anyhow!(message)));
        }
    }
}

struct SqliteDatabase {
    conn: Connection,
}

impl SqliteDatabase {
    fn open(db_path: &Path, options: SqliteStoreOptions) -> anyhow::Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let mut conn = Connection::open(db_path)
            .with_context(|| format!("failed to open sqlite db {}", db_path.display()))?;

        configure_connection(&mut conn, options).context("failed to configure sqlite connection")?;
        apply_migrations(&mut conn).context("failed to apply sqlite migrations")?;

        Ok(Self { conn })
    }

    fn import_layout(&mut self, grid: GridSize, rows: &[LayoutRow]) -> anyhow::Result<usize> {
        let table = grid.table_name();
        let tx = self.conn.transaction()?;
        layout_table::drop_table(&tx, &table)?;
        layout_table::create_table(&tx, &table)?;
        for row in rows {
            layout_table::insert_row(&tx, &table, row)?;
        }
        tx.commit()?;
        tracing::info!(table = %table, rows = rows.len(), "imported layout");
        Ok(rows.len())
    }

    fn load_layout(&mut self, grid: GridSize) -> anyhow::Result<Vec<LayoutRow>> {
        let table = grid.table_name();
        if !layout_table::table_exists(&self.conn, &table)? {
            return Ok(Vec::new());
        }
        layout_table::load_rows(&self.conn, &table)
    }
}

fn configure_connection(conn: &mut Connection, options: SqliteStoreOptions) -> anyhow::Result<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;",
    )
    .context("failed to apply sqlite PRAGMAs")?;
    conn.busy_timeout(Duration::from_millis(options.busy_timeout_ms))
        .context("failed to set sqlite busy timeout")?;
    Ok(())
}

fn apply_migrations(conn: &mut Connection) -> anyhow::Result<()> {
    let current: u32 = conn
        .query_row("PRAGMA user_version", [], |row| row.get::<_, i64>(0))
        .context("failed to read user_version")? as u32;

    if current > LATEST_SCHEMA_VERSION {
        return Err(anyhow!(
            "sqlite schema version is newer than this build: db={}, app={}",
            current,
            LATEST_SCHEMA_VERSION
        ));
    }

    if current == LATEST_SCHEMA_VERSION {
        return Ok(());
    }

    conn.execute_batch("BEGIN IMMEDIATE;")
        .context("failed to begin migration transaction")?;

    for (version, sql) in MIGRATIONS {
        if *version <= current {
            continue;
        }
        conn.execute_batch(sql)
            .with_context(|| format!("failed to apply migration v{version:04}"))?;
        conn.pragma_update(None, "user_version", *version as i64)
            .context("failed to update user_version")?;
    }

    conn.execute_batch("COMMIT;")
        .context("failed to commit migration transaction")?;
    Ok(())
}
