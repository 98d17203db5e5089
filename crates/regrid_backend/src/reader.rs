use crate::layout_table;
use regrid_domain::{
    Container, InvalidRow, LayoutRow, LoadedEntries, Snapshot, WidgetMetadataResolver,
    load_entries, orphaned_children,
};
use rusqlite::Connection;

/// Loads validated entries from one layout table.
///
/// Rows that fail validation are deleted from the table as they are read, so
/// callers should hold a transaction when the deletion must be undoable.
pub struct EntryReader<'a> {
    conn: &'a Connection,
    table: &'a str,
    resolver: &'a dyn WidgetMetadataResolver,
}

impl<'a> EntryReader<'a> {
    pub fn new(
        conn: &'a Connection,
        table: &'a str,
        resolver: &'a dyn WidgetMetadataResolver,
    ) -> Self {
        Self {
            conn,
            table,
            resolver,
        }
    }

    pub fn load_workspace_entries(&self) -> anyhow::Result<LoadedEntries> {
        let rows = layout_table::load_rows(self.conn, self.table)?;
        self.load_container(Container::Desktop, &rows)
    }

    pub fn load_hotseat_entries(&self) -> anyhow::Result<LoadedEntries> {
        let rows = layout_table::load_rows(self.conn, self.table)?;
        self.load_container(Container::Hotseat, &rows)
    }

    /// Both containers in one pass, plus removal of children whose parent row
    /// no longer exists.
    pub fn load_snapshot(&self) -> anyhow::Result<Snapshot> {
        let rows = layout_table::load_rows(self.conn, self.table)?;
        let orphans = orphaned_children(&rows);
        self.delete_invalid(&orphans)?;

        Ok(Snapshot {
            workspace: self.load_container(Container::Desktop, &rows)?,
            hotseat: self.load_container(Container::Hotseat, &rows)?,
            orphans,
        })
    }

    fn load_container(
        &self,
        container: Container,
        rows: &[LayoutRow],
    ) -> anyhow::Result<LoadedEntries> {
        let loaded = load_entries(container, rows, rows, self.resolver);
        self.delete_invalid(&loaded.invalid)?;
        Ok(loaded)
    }

    fn delete_invalid(&self, invalid: &[InvalidRow]) -> anyhow::Result<()> {
        if invalid.is_empty() {
            return Ok(());
        }
        for row in invalid {
            tracing::warn!(
                table = %self.table,
                id = row.id,
                reason = %row.reason,
                "deleting invalid layout row"
            );
        }
        let ids: Vec<i64> = invalid.iter().map(|row| row.id).collect();
        layout_table::delete_ids(self.conn, self.table, &ids)?;
        Ok(())
    }
}
