mod hotseat;
mod ids;
mod screen;

pub use hotseat::{HotseatPlacement, place_hotseat};
pub use ids::IdAllocator;
pub use screen::{ScreenPacking, pack_screen};

use crate::{CellRect, GridEntry, GridOccupancy, GridSize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PlacementError {
    Overlap {
        screen_id: i32,
        first_id: i64,
        second_id: i64,
    },
    OutOfBounds {
        id: i64,
        screen_id: i32,
    },
    DockSlotCollision {
        slot: i32,
    },
    NoProgress {
        screen_id: i32,
        remaining: usize,
    },
}

impl fmt::Display for PlacementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementError::Overlap {
                screen_id,
                first_id,
                second_id,
            } => write!(
                f,
                "entries {first_id} and {second_id} overlap on screen {screen_id}"
            ),
            PlacementError::OutOfBounds { id, screen_id } => {
                write!(f, "entry {id} placed outside the grid on screen {screen_id}")
            }
            PlacementError::DockSlotCollision { slot } => {
                write!(f, "dock slot {slot} assigned twice")
            }
            PlacementError::NoProgress {
                screen_id,
                remaining,
            } => write!(
                f,
                "empty screen {screen_id} accepted none of {remaining} queued entries"
            ),
        }
    }
}

impl std::error::Error for PlacementError {}

#[derive(Clone, Debug, Default)]
pub struct WorkspacePlacement {
    pub placed: Vec<GridEntry>,
    pub dropped: Vec<GridEntry>,
    /// Screens beyond the destination's last screen that received entries.
    pub new_screen_ids: Vec<i32>,
}

/// Places `queue` onto the workspace of `target`, screen by screen.
///
/// Existing screens `0..=last_screen_id` are filled first around the
/// `retained` destination entries; new screens are appended after that until
/// the queue is empty. When `reserve_first_cell` is set, cell `(0, 0)` of
/// screen 0 is never handed out.
pub fn place_workspace(
    target: GridSize,
    retained: &[GridEntry],
    last_screen_id: i32,
    mut queue: Vec<GridEntry>,
    reserve_first_cell: bool,
) -> Result<WorkspacePlacement, PlacementError> {
    let mut by_screen: BTreeMap<i32, Vec<&GridEntry>> = BTreeMap::new();
    for entry in retained {
        by_screen.entry(entry.screen_id).or_default().push(entry);
    }

    queue.sort_by_key(GridEntry::reading_order);

    let mut placement = WorkspacePlacement::default();
    let last_existing = last_screen_id.max(-1);
    let mut screen_id = 0;
    while !queue.is_empty() {
        let mut occupancy = GridOccupancy::new(target.columns, target.rows);
        for entry in by_screen.get(&screen_id).into_iter().flatten() {
            occupancy.mark_cells(entry, true);
        }
        if screen_id == 0 && reserve_first_cell {
            occupancy.mark_rect(CellRect::new(0, 0, 1, 1), true);
        }
        let was_empty = occupancy.is_empty();

        let packing = pack_screen(screen_id, occupancy, queue);
        placement.dropped.extend(packing.dropped);
        if was_empty && packing.placed.is_empty() && !packing.remaining.is_empty() {
            return Err(PlacementError::NoProgress {
                screen_id,
                remaining: packing.remaining.len(),
            });
        }
        if screen_id > last_existing && !packing.placed.is_empty() {
            placement.new_screen_ids.push(screen_id);
        }
        placement.placed.extend(packing.placed);
        queue = packing.remaining;
        screen_id += 1;
    }

    Ok(placement)
}

/// Checks that every placed workspace entry is inside the grid and overlaps
/// neither retained entries nor other placed entries on its screen.
///
/// Overlaps among retained entries alone are legacy data and are tolerated.
pub fn verify_workspace(
    target: GridSize,
    retained: &[GridEntry],
    placed: &[GridEntry],
) -> Result<(), PlacementError> {
    for (index, entry) in placed.iter().enumerate() {
        if !entry.rect().fits_within(target.columns, target.rows) {
            return Err(PlacementError::OutOfBounds {
                id: entry.id,
                screen_id: entry.screen_id,
            });
        }
        let others = retained.iter().chain(&placed[index + 1..]);
        for other in others {
            if other.screen_id == entry.screen_id && other.rect().intersects(&entry.rect()) {
                return Err(PlacementError::Overlap {
                    screen_id: entry.screen_id,
                    first_id: entry.id,
                    second_id: other.id,
                });
            }
        }
    }
    Ok(())
}

pub fn verify_hotseat(
    capacity: i32,
    retained: &[GridEntry],
    placed: &[GridEntry],
) -> Result<(), PlacementError> {
    let mut slots: HashSet<i32> = retained.iter().map(|entry| entry.screen_id).collect();
    for entry in placed {
        if !(0..capacity).contains(&entry.screen_id) || !slots.insert(entry.screen_id) {
            return Err(PlacementError::DockSlotCollision {
                slot: entry.screen_id,
            });
        }
    }
    Ok(())
}
