use crate::{CellRect, Container, GridEntry, GridOccupancy};

#[derive(Clone, Debug, Default)]
pub struct ScreenPacking {
    pub placed: Vec<GridEntry>,
    /// Entries that did not fit on this screen, in queue order.
    pub remaining: Vec<GridEntry>,
    /// Entries whose minimum span exceeds the grid; they can never be placed.
    pub dropped: Vec<GridEntry>,
}

#[derive(Clone, Copy, Debug)]
struct ScanCursor {
    x: i32,
    y: i32,
}

/// Packs as much of `queue` as fits onto one screen.
///
/// The scan cursor starts at the top-left and only moves forward: after a
/// placement the next scan resumes right of the placed entry on the same
/// row, so placements on one screen follow the queue's reading order.
pub fn pack_screen(
    screen_id: i32,
    mut occupancy: GridOccupancy,
    queue: Vec<GridEntry>,
) -> ScreenPacking {
    let columns = occupancy.columns();
    let rows = occupancy.rows();
    let mut cursor = ScanCursor { x: 0, y: 0 };
    let mut packing = ScreenPacking::default();

    for mut entry in queue {
        if entry.min_span_x > columns || entry.min_span_y > rows {
            packing.dropped.push(entry);
            continue;
        }

        let Some(spot) = find_spot(&occupancy, &entry, cursor) else {
            packing.remaining.push(entry);
            continue;
        };

        entry.container = Container::Desktop;
        entry.screen_id = screen_id;
        entry.cell_x = spot.x;
        entry.cell_y = spot.y;
        entry.span_x = spot.span_x;
        entry.span_y = spot.span_y;
        occupancy.mark_cells(&entry, true);
        cursor = ScanCursor {
            x: spot.x + spot.span_x,
            y: spot.y,
        };
        packing.placed.push(entry);
    }

    packing
}

fn find_spot(occupancy: &GridOccupancy, entry: &GridEntry, cursor: ScanCursor) -> Option<CellRect> {
    for y in cursor.y..occupancy.rows() {
        let start_x = if y == cursor.y { cursor.x } else { 0 };
        for x in start_x..occupancy.columns() {
            if occupancy.is_region_vacant(x, y, entry.span_x, entry.span_y) {
                return Some(CellRect::new(x, y, entry.span_x, entry.span_y));
            }
            if occupancy.is_region_vacant(x, y, entry.min_span_x, entry.min_span_y) {
                return Some(CellRect::new(x, y, entry.min_span_x, entry.min_span_y));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::pack_screen;
    use crate::{CellRect, Container, EntryPayload, GridEntry, GridOccupancy, ItemKind, LaunchTarget};

    fn app(id: i64) -> GridEntry {
        let target =
            LaunchTarget::parse(ItemKind::Application, &format!("com.app{id}/.Main")).unwrap();
        GridEntry::new(
            id,
            Container::Desktop,
            0,
            CellRect::new(0, 0, 1, 1),
            1,
            1,
            0,
            EntryPayload::Application { target },
        )
    }

    fn widget(id: i64, span: (i32, i32), min: (i32, i32)) -> GridEntry {
        GridEntry::new(
            id,
            Container::Desktop,
            0,
            CellRect::new(0, 0, span.0, span.1),
            min.0,
            min.1,
            0,
            EntryPayload::Widget {
                provider: format!("com.widget{id}/.Provider"),
                widget_id: Some(id),
            },
        )
    }

    fn positions(entries: &[GridEntry]) -> Vec<(i64, i32, i32, i32, i32)> {
        entries
            .iter()
            .map(|e| (e.id, e.cell_x, e.cell_y, e.span_x, e.span_y))
            .collect()
    }

    #[test]
    fn packs_in_reading_order_around_occupied_cells() {
        let mut occupancy = GridOccupancy::new(3, 2);
        occupancy.mark_rect(CellRect::new(1, 0, 1, 1), true);
        let packing = pack_screen(4, occupancy, vec![app(1), app(2), app(3)]);

        assert_eq!(
            positions(&packing.placed),
            vec![(1, 0, 0, 1, 1), (2, 2, 0, 1, 1), (3, 0, 1, 1, 1)]
        );
        assert!(packing.placed.iter().all(|e| e.screen_id == 4));
        assert!(packing.remaining.is_empty());
    }

    #[test]
    fn shrinks_to_min_span_when_full_span_does_not_fit() {
        let occupancy = GridOccupancy::new(3, 3);
        let packing = pack_screen(0, occupancy, vec![widget(1, (4, 4), (2, 2))]);

        assert_eq!(positions(&packing.placed), vec![(1, 0, 0, 2, 2)]);
    }

    #[test]
    fn keeps_full_span_when_it_fits() {
        let occupancy = GridOccupancy::new(4, 4);
        let packing = pack_screen(0, occupancy, vec![widget(1, (4, 2), (2, 1))]);
        assert_eq!(positions(&packing.placed), vec![(1, 0, 0, 4, 2)]);
    }

    #[test]
    fn oversized_min_span_is_dropped() {
        let occupancy = GridOccupancy::new(3, 3);
        let packing = pack_screen(0, occupancy, vec![widget(1, (4, 4), (4, 2)), app(2)]);

        assert_eq!(
            packing.dropped.iter().map(|e| e.id).collect::<Vec<_>>(),
            vec![1]
        );
        assert_eq!(positions(&packing.placed), vec![(2, 0, 0, 1, 1)]);
    }

    #[test]
    fn cursor_does_not_backfill_earlier_cells() {
        let mut occupancy = GridOccupancy::new(3, 2);
        occupancy.mark_rect(CellRect::new(1, 0, 1, 1), true);
        let packing = pack_screen(0, occupancy, vec![widget(1, (2, 1), (2, 1)), app(2)]);

        assert_eq!(
            positions(&packing.placed),
            vec![(1, 0, 1, 2, 1), (2, 2, 1, 1, 1)]
        );
    }

    #[test]
    fn entries_that_do_not_fit_stay_queued() {
        let occupancy = GridOccupancy::new(3, 2);
        let packing = pack_screen(
            0,
            occupancy,
            vec![widget(1, (2, 2), (2, 2)), app(2), widget(3, (3, 1), (3, 1)), app(4)],
        );

        assert_eq!(
            positions(&packing.placed),
            vec![(1, 0, 0, 2, 2), (2, 2, 0, 1, 1), (4, 2, 1, 1, 1)]
        );
        assert_eq!(
            packing.remaining.iter().map(|e| e.id).collect::<Vec<_>>(),
            vec![3]
        );
    }
}
