mod entry;
mod launch_target;
mod row;

pub use entry::{ChildItems, EntryPayload, GridEntry, IdentityKey};
pub use launch_target::LaunchTarget;
pub use row::LayoutRow;
