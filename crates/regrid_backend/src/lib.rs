mod grid_state;
mod layout_table;
mod migrator;
mod reader;
mod sqlite_store;
mod time;

pub use grid_state::GridState;
pub use migrator::{MigrationRequest, Migrator};
pub use reader::EntryReader;
pub use sqlite_store::{SqliteStore, SqliteStoreOptions};
