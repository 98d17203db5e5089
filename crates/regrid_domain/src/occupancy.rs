use crate::{CellRect, GridEntry};

/// Boolean occupancy bitmap for one screen of `columns × rows` cells.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GridOccupancy {
    columns: i32,
    rows: i32,
    cells: Vec<bool>,
}

impl GridOccupancy {
    pub fn new(columns: i32, rows: i32) -> Self {
        let columns = columns.max(0);
        let rows = rows.max(0);
        Self {
            columns,
            rows,
            cells: vec![false; columns as usize * rows as usize],
        }
    }

    pub fn columns(&self) -> i32 {
        self.columns
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        !self.cells.iter().any(|occupied| *occupied)
    }

    /// Sets or clears every in-bounds cell of `rect`. Cells outside the grid
    /// are ignored so legacy out-of-bounds rows never fail seeding.
    pub fn mark_rect(&mut self, rect: CellRect, occupied: bool) {
        let x_start = rect.x.max(0);
        let y_start = rect.y.max(0);
        let x_end = rect.x.saturating_add(rect.span_x).min(self.columns);
        let y_end = rect.y.saturating_add(rect.span_y).min(self.rows);
        for y in y_start..y_end {
            for x in x_start..x_end {
                let index = self.index(x, y);
                self.cells[index] = occupied;
            }
        }
    }

    pub fn mark_cells(&mut self, entry: &GridEntry, occupied: bool) {
        self.mark_rect(entry.rect(), occupied);
    }

    pub fn is_occupied(&self, x: i32, y: i32) -> bool {
        self.in_bounds(x, y) && self.cells[self.index(x, y)]
    }

    /// True only when the whole rectangle is inside the grid and free.
    pub fn is_region_vacant(&self, x: i32, y: i32, span_x: i32, span_y: i32) -> bool {
        if span_x < 1 || span_y < 1 {
            return false;
        }
        if !CellRect::new(x, y, span_x, span_y).fits_within(self.columns, self.rows) {
            return false;
        }
        (y..y + span_y).all(|cy| (x..x + span_x).all(|cx| !self.cells[self.index(cx, cy)]))
    }

    /// First vacant top-left position in row-major order (y outer, x inner).
    pub fn find_vacant_cell(&self, span_x: i32, span_y: i32) -> Option<(i32, i32)> {
        (0..self.rows)
            .flat_map(|y| (0..self.columns).map(move |x| (x, y)))
            .find(|&(x, y)| self.is_region_vacant(x, y, span_x, span_y))
    }

    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.columns && y < self.rows
    }

    fn index(&self, x: i32, y: i32) -> usize {
        y as usize * self.columns as usize + x as usize
    }
}
