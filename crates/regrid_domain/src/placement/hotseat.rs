use crate::{Container, GridEntry};

#[derive(Clone, Debug, Default)]
pub struct HotseatPlacement {
    pub placed: Vec<GridEntry>,
    pub dropped: Vec<GridEntry>,
}

/// Fills free dock slots, lowest first, with queued dock entries in their
/// original slot order.
///
/// Queued entries whose original slot is beyond `capacity` are dropped, and
/// so is whatever is still queued once every slot is taken.
pub fn place_hotseat(
    capacity: i32,
    retained: &[GridEntry],
    mut queue: Vec<GridEntry>,
) -> HotseatPlacement {
    let capacity = capacity.max(0);
    let mut occupied = vec![false; capacity as usize];
    for entry in retained {
        if (0..capacity).contains(&entry.screen_id) {
            occupied[entry.screen_id as usize] = true;
        }
    }

    queue.sort_by_key(|entry| entry.screen_id);
    let (mut queue, mut dropped): (Vec<GridEntry>, Vec<GridEntry>) = queue
        .into_iter()
        .partition(|entry| entry.screen_id < capacity);
    queue.reverse();

    let mut placed = Vec::new();
    for (slot, taken) in occupied.iter_mut().enumerate() {
        if *taken {
            continue;
        }
        let Some(mut entry) = queue.pop() else {
            break;
        };
        let slot = slot as i32;
        entry.container = Container::Hotseat;
        entry.screen_id = slot;
        entry.cell_x = slot;
        entry.cell_y = 0;
        entry.span_x = 1;
        entry.span_y = 1;
        *taken = true;
        placed.push(entry);
    }

    queue.reverse();
    dropped.extend(queue);
    HotseatPlacement { placed, dropped }
}
