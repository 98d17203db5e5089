use anyhow::{Context as _, anyhow};
use regrid_domain::{CONTAINER_DESKTOP, EntryInsert, LayoutRow};
use rusqlite::{Connection, OptionalExtension as _, Row, params};

pub(crate) const SCRATCH_TABLE: &str = "favorites_tmp";

const COLUMNS: &str = "id, item_type, container, screen, cell_x, cell_y, span_x, span_y, rank, \
                       launch_target, profile_id, widget_provider, widget_id";

/// Layout tables are addressed by interpolated names, so only plain
/// `favorites_*` identifiers are accepted.
pub(crate) fn checked_table_name(name: &str) -> anyhow::Result<&str> {
    let valid = name.len() > "favorites_".len()
        && name.starts_with("favorites_")
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_');
    if !valid {
        return Err(anyhow!("invalid layout table name {name:?}"));
    }
    Ok(name)
}

pub(crate) fn table_exists(conn: &Connection, table: &str) -> anyhow::Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |_| Ok(()),
        )
        .optional()
        .with_context(|| format!("failed to look up table {table}"))?;
    Ok(found.is_some())
}

pub(crate) fn create_table(conn: &Connection, table: &str) -> anyhow::Result<()> {
    let table = checked_table_name(table)?;
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {table} (
           id INTEGER PRIMARY KEY,
           item_type INTEGER NOT NULL,
           container INTEGER NOT NULL,
           screen INTEGER NOT NULL DEFAULT 0,
           cell_x INTEGER NOT NULL DEFAULT 0,
           cell_y INTEGER NOT NULL DEFAULT 0,
           span_x INTEGER NOT NULL DEFAULT 1,
           span_y INTEGER NOT NULL DEFAULT 1,
           rank INTEGER NOT NULL DEFAULT 0,
           launch_target TEXT,
           profile_id INTEGER NOT NULL DEFAULT 0,
           widget_provider TEXT,
           widget_id INTEGER
         );"
    ))
    .with_context(|| format!("failed to create table {table}"))
}

pub(crate) fn drop_table(conn: &Connection, table: &str) -> anyhow::Result<()> {
    let table = checked_table_name(table)?;
    conn.execute_batch(&format!("DROP TABLE IF EXISTS {table};"))
        .with_context(|| format!("failed to drop table {table}"))
}

/// Replaces `to` with a copy of every row of `from`.
pub(crate) fn copy_table(conn: &Connection, from: &str, to: &str) -> anyhow::Result<usize> {
    let from = checked_table_name(from)?;
    drop_table(conn, to)?;
    create_table(conn, to)?;
    conn.execute(
        &format!("INSERT INTO {to} ({COLUMNS}) SELECT {COLUMNS} FROM {from}"),
        [],
    )
    .with_context(|| format!("failed to copy {from} into {to}"))
}

pub(crate) fn load_rows(conn: &Connection, table: &str) -> anyhow::Result<Vec<LayoutRow>> {
    let table = checked_table_name(table)?;
    let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM {table} ORDER BY id"))?;
    let rows = stmt
        .query_map([], layout_row)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .with_context(|| format!("failed to load rows of {table}"))?;
    Ok(rows)
}

fn layout_row(row: &Row<'_>) -> rusqlite::Result<LayoutRow> {
    Ok(LayoutRow {
        id: row.get(0)?,
        item_type: row.get(1)?,
        container: row.get(2)?,
        screen: row.get(3)?,
        cell_x: row.get(4)?,
        cell_y: row.get(5)?,
        span_x: row.get(6)?,
        span_y: row.get(7)?,
        rank: row.get(8)?,
        launch_target: row.get(9)?,
        profile_id: row.get(10)?,
        widget_provider: row.get(11)?,
        widget_id: row.get(12)?,
    })
}

pub(crate) fn all_ids(conn: &Connection, table: &str) -> anyhow::Result<Vec<i64>> {
    let table = checked_table_name(table)?;
    let mut stmt = conn.prepare(&format!("SELECT id FROM {table}"))?;
    let ids = stmt
        .query_map([], |row| row.get::<_, i64>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .with_context(|| format!("failed to load ids of {table}"))?;
    Ok(ids)
}

/// Distinct workspace screen ids, ascending.
pub(crate) fn screen_ids(conn: &Connection, table: &str) -> anyhow::Result<Vec<i32>> {
    let table = checked_table_name(table)?;
    let mut stmt = conn.prepare(&format!(
        "SELECT DISTINCT screen FROM {table} WHERE container = ?1 ORDER BY screen"
    ))?;
    let screens = stmt
        .query_map(params![CONTAINER_DESKTOP], |row| row.get::<_, i32>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .with_context(|| format!("failed to load screens of {table}"))?;
    Ok(screens)
}

pub(crate) fn delete_ids(conn: &Connection, table: &str, ids: &[i64]) -> anyhow::Result<usize> {
    let table = checked_table_name(table)?;
    let mut stmt = conn.prepare(&format!("DELETE FROM {table} WHERE id = ?1"))?;
    let mut deleted = 0;
    for id in ids {
        deleted += stmt
            .execute(params![id])
            .with_context(|| format!("failed to delete row {id} from {table}"))?;
    }
    Ok(deleted)
}

pub(crate) fn insert_row(conn: &Connection, table: &str, row: &LayoutRow) -> anyhow::Result<()> {
    let table = checked_table_name(table)?;
    conn.execute(
        &format!(
            "INSERT INTO {table} ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
        ),
        params![
            row.id,
            row.item_type,
            row.container,
            row.screen,
            row.cell_x,
            row.cell_y,
            row.span_x,
            row.span_y,
            row.rank,
            row.launch_target,
            row.profile_id,
            row.widget_provider,
            row.widget_id,
        ],
    )
    .with_context(|| format!("failed to insert row {} into {table}", row.id))?;
    Ok(())
}

/// Copies a source row (and its children) into `to` under the ids and
/// position chosen by the planner.
pub(crate) fn insert_placed(
    conn: &Connection,
    from: &str,
    to: &str,
    insert: &EntryInsert,
) -> anyhow::Result<()> {
    let from = checked_table_name(from)?;
    let to = checked_table_name(to)?;
    let copied = conn
        .execute(
            &format!(
                "INSERT INTO {to} ({COLUMNS})
                 SELECT ?1, item_type, ?2, ?3, ?4, ?5, ?6, ?7, rank,
                        launch_target, profile_id, widget_provider, widget_id
                 FROM {from} WHERE id = ?8"
            ),
            params![
                insert.new_id,
                insert.container.as_raw(),
                insert.screen_id,
                insert.cell_x,
                insert.cell_y,
                insert.span_x,
                insert.span_y,
                insert.source_id,
            ],
        )
        .with_context(|| format!("failed to copy row {} into {to}", insert.source_id))?;
    if copied != 1 {
        return Err(anyhow!("row {} is missing from {from}", insert.source_id));
    }

    for child in &insert.children {
        let copied = conn
            .execute(
                &format!(
                    "INSERT INTO {to} ({COLUMNS})
                     SELECT ?1, item_type, ?2, screen, cell_x, cell_y, span_x, span_y, rank,
                            launch_target, profile_id, widget_provider, widget_id
                     FROM {from} WHERE id = ?3"
                ),
                params![child.new_id, insert.new_id, child.source_id],
            )
            .with_context(|| format!("failed to copy child row {} into {to}", child.source_id))?;
        if copied != 1 {
            return Err(anyhow!("child row {} is missing from {from}", child.source_id));
        }
    }
    Ok(())
}

/// Moves every workspace row down by `rows`. Dock rows and folder children
/// keep their positions.
pub(crate) fn shift_workspace_rows(conn: &Connection, table: &str, rows: i32) -> anyhow::Result<usize> {
    let table = checked_table_name(table)?;
    conn.execute(
        &format!("UPDATE {table} SET cell_y = cell_y + ?1 WHERE container = ?2"),
        params![rows, CONTAINER_DESKTOP],
    )
    .with_context(|| format!("failed to shift rows of {table}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use regrid_domain::{ChildInsert, Container, ItemKind};

    fn open() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    #[test]
    fn table_names_are_restricted() {
        assert!(checked_table_name("favorites_4x4x4").is_ok());
        assert!(checked_table_name("favorites_tmp").is_ok());
        assert!(checked_table_name("favorites_").is_err());
        assert!(checked_table_name("grid_settings").is_err());
        assert!(checked_table_name("favorites_1; DROP TABLE x").is_err());
    }

    #[test]
    fn rows_round_trip_through_a_table() {
        let conn = open();
        create_table(&conn, "favorites_4x4x4").unwrap();
        let mut widget = LayoutRow::widget(3, "com.clock/.Widget", 2, 2).at(1, 2, 0);
        widget.profile_id = 10;
        insert_row(&conn, "favorites_4x4x4", &widget).unwrap();
        insert_row(
            &conn,
            "favorites_4x4x4",
            &LayoutRow::app(1, Container::Hotseat, "com.mail/.Inbox").at(2, 0, 0),
        )
        .unwrap();

        let rows = load_rows(&conn, "favorites_4x4x4").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, 1);
        assert_eq!(rows[1], widget);
        assert!(table_exists(&conn, "favorites_4x4x4").unwrap());
        assert!(!table_exists(&conn, "favorites_5x5x5").unwrap());
    }

    #[test]
    fn shift_moves_only_workspace_rows() {
        let conn = open();
        create_table(&conn, "favorites_4x4x4").unwrap();
        for row in [
            LayoutRow::app(1, Container::Desktop, "com.mail/.Inbox").at(0, 1, 2),
            LayoutRow::app(2, Container::Hotseat, "com.maps/.Main").at(1, 1, 0),
            LayoutRow::collection(3, ItemKind::Folder, Container::Desktop).at(1, 0, 0),
            LayoutRow::app(4, Container::Folder(3), "com.chat/.Main"),
        ] {
            insert_row(&conn, "favorites_4x4x4", &row).unwrap();
        }

        assert_eq!(shift_workspace_rows(&conn, "favorites_4x4x4", 2).unwrap(), 2);
        let cells: Vec<(i64, i32)> = load_rows(&conn, "favorites_4x4x4")
            .unwrap()
            .into_iter()
            .map(|row| (row.id, row.cell_y))
            .collect();
        assert_eq!(cells, vec![(1, 4), (2, 0), (3, 2), (4, 0)]);
        assert_eq!(screen_ids(&conn, "favorites_4x4x4").unwrap(), vec![0, 1]);
    }

    #[test]
    fn placed_rows_are_copied_with_children_under_new_ids() {
        let conn = open();
        create_table(&conn, SCRATCH_TABLE).unwrap();
        create_table(&conn, "favorites_5x5x4").unwrap();
        for row in [
            LayoutRow::collection(10, ItemKind::Folder, Container::Desktop).at(2, 3, 3),
            LayoutRow::app(11, Container::Folder(10), "com.chat/.Main").with_rank(1),
        ] {
            insert_row(&conn, SCRATCH_TABLE, &row).unwrap();
        }

        let insert = EntryInsert {
            source_id: 10,
            new_id: 20,
            container: Container::Desktop,
            screen_id: 0,
            cell_x: 1,
            cell_y: 0,
            span_x: 1,
            span_y: 1,
            children: vec![ChildInsert {
                source_id: 11,
                new_id: 21,
            }],
        };
        insert_placed(&conn, SCRATCH_TABLE, "favorites_5x5x4", &insert).unwrap();

        let rows = load_rows(&conn, "favorites_5x5x4").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            (rows[0].id, rows[0].screen, rows[0].cell_x, rows[0].cell_y),
            (20, 0, 1, 0)
        );
        assert_eq!(rows[0].kind(), Some(ItemKind::Folder));
        assert_eq!((rows[1].id, rows[1].container, rows[1].rank), (21, 20, 1));
        assert_eq!(rows[1].launch_target.as_deref(), Some("com.chat/.Main"));

        let missing = EntryInsert {
            source_id: 99,
            new_id: 30,
            children: Vec::new(),
            ..insert
        };
        assert!(insert_placed(&conn, SCRATCH_TABLE, "favorites_5x5x4", &missing).is_err());
    }

    #[test]
    fn copy_replaces_destination_contents() {
        let conn = open();
        create_table(&conn, "favorites_4x4x4").unwrap();
        create_table(&conn, "favorites_4x5x4").unwrap();
        insert_row(
            &conn,
            "favorites_4x4x4",
            &LayoutRow::app(1, Container::Desktop, "com.mail/.Inbox"),
        )
        .unwrap();
        insert_row(
            &conn,
            "favorites_4x5x4",
            &LayoutRow::app(7, Container::Desktop, "com.news/.Main"),
        )
        .unwrap();

        assert_eq!(copy_table(&conn, "favorites_4x4x4", "favorites_4x5x4").unwrap(), 1);
        assert_eq!(all_ids(&conn, "favorites_4x5x4").unwrap(), vec![1]);
        assert_eq!(delete_ids(&conn, "favorites_4x5x4", &[1, 2]).unwrap(), 1);
        drop_table(&conn, "favorites_4x5x4").unwrap();
        assert!(!table_exists(&conn, "favorites_4x5x4").unwrap());
    }
}
