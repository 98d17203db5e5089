use crate::time::unix_epoch_seconds_now;
use anyhow::Context as _;
use regrid_domain::{GridSize, MigrationPhase};
use rusqlite::{Connection, OptionalExtension as _, params};

const GRID_STATE_KEY: &str = "grid_state";

/// Grid the layout was last migrated to, and how that attempt ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GridState {
    pub grid: GridSize,
    pub phase: MigrationPhase,
    pub updated_at_unix_seconds: i64,
}

pub(crate) fn load_grid_state(conn: &Connection) -> anyhow::Result<Option<GridState>> {
    let value = conn
        .query_row(
            "SELECT value FROM grid_settings WHERE key = ?1",
            params![GRID_STATE_KEY],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .context("failed to load grid state")?;
    let Some(value) = value else {
        return Ok(None);
    };
    let state = serde_json::from_str(&value).context("failed to parse grid state")?;
    Ok(Some(state))
}

pub(crate) fn save_grid_state(
    conn: &mut Connection,
    grid: GridSize,
    phase: MigrationPhase,
) -> anyhow::Result<GridState> {
    let state = GridState {
        grid,
        phase,
        updated_at_unix_seconds: unix_epoch_seconds_now(),
    };
    let value = serde_json::to_string(&state).context("failed to encode grid state")?;
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO grid_settings (key, value, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET
           value = excluded.value,
           updated_at = excluded.updated_at",
        params![GRID_STATE_KEY, value, state.updated_at_unix_seconds],
    )
    .context("failed to save grid state")?;
    tx.commit()?;
    Ok(state)
}
