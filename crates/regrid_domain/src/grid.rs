use std::fmt;
use std::str::FromStr;

pub const CONTAINER_DESKTOP: i64 = -100;
pub const CONTAINER_HOTSEAT: i64 = -101;

/// Largest accepted value for any grid dimension.
pub const MAX_GRID_DIMENSION: i32 = 256;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub struct GridSize {
    pub columns: i32,
    pub rows: i32,
    pub hotseat_capacity: i32,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum GridSizeParseError {
    Malformed(String),
    NonPositive(String),
    TooLarge(String),
}

impl fmt::Display for GridSizeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridSizeParseError::Malformed(raw) => {
                write!(f, "grid size must look like COLUMNSxROWSxHOTSEAT, got {raw:?}")
            }
            GridSizeParseError::NonPositive(raw) => {
                write!(f, "grid dimensions must all be at least 1, got {raw:?}")
            }
            GridSizeParseError::TooLarge(raw) => write!(
                f,
                "grid dimensions must all be at most {MAX_GRID_DIMENSION}, got {raw:?}"
            ),
        }
    }
}

impl std::error::Error for GridSizeParseError {}

impl GridSize {
    pub fn new(
        columns: i32,
        rows: i32,
        hotseat_capacity: i32,
    ) -> Result<Self, GridSizeParseError> {
        let size = Self {
            columns,
            rows,
            hotseat_capacity,
        };
        if columns < 1 || rows < 1 || hotseat_capacity < 1 {
            return Err(GridSizeParseError::NonPositive(size.to_string()));
        }
        if columns > MAX_GRID_DIMENSION
            || rows > MAX_GRID_DIMENSION
            || hotseat_capacity > MAX_GRID_DIMENSION
        {
            return Err(GridSizeParseError::TooLarge(size.to_string()));
        }
        Ok(size)
    }

    /// Name of the per-grid layout table, e.g. `favorites_5x6x4`.
    pub fn table_name(&self) -> String {
        format!(
            "favorites_{}x{}x{}",
            self.columns, self.rows, self.hotseat_capacity
        )
    }
}

impl fmt::Display for GridSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}x{}",
            self.columns, self.rows, self.hotseat_capacity
        )
    }
}

impl FromStr for GridSize {
    type Err = GridSizeParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let parts = trimmed
            .split(['x', 'X'])
            .map(|part| part.trim().parse::<i32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| GridSizeParseError::Malformed(trimmed.to_owned()))?;
        match parts.as_slice() {
            [columns, rows, hotseat] => GridSize::new(*columns, *rows, *hotseat),
            _ => Err(GridSizeParseError::Malformed(trimmed.to_owned())),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Container {
    Desktop,
    Hotseat,
    Folder(i64),
}

impl Container {
    pub fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            CONTAINER_DESKTOP => Some(Container::Desktop),
            CONTAINER_HOTSEAT => Some(Container::Hotseat),
            id if id > 0 => Some(Container::Folder(id)),
            _ => None,
        }
    }

    pub fn as_raw(self) -> i64 {
        match self {
            Container::Desktop => CONTAINER_DESKTOP,
            Container::Hotseat => CONTAINER_HOTSEAT,
            Container::Folder(id) => id,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Application,
    DeepShortcut,
    Folder,
    AppPair,
    Widget,
}

impl ItemKind {
    pub const ALL: [ItemKind; 5] = [
        ItemKind::Application,
        ItemKind::DeepShortcut,
        ItemKind::Folder,
        ItemKind::AppPair,
        ItemKind::Widget,
    ];

    pub fn from_raw(raw: i64) -> Option<Self> {
        ItemKind::ALL.into_iter().find(|kind| kind.as_raw() == raw)
    }

    pub fn as_raw(self) -> i64 {
        match self {
            ItemKind::Application => 0,
            ItemKind::Folder => 2,
            ItemKind::Widget => 4,
            ItemKind::DeepShortcut => 6,
            ItemKind::AppPair => 10,
        }
    }

    pub fn as_key(self) -> &'static str {
        match self {
            ItemKind::Application => "application",
            ItemKind::DeepShortcut => "deep_shortcut",
            ItemKind::Folder => "folder",
            ItemKind::AppPair => "app_pair",
            ItemKind::Widget => "widget",
        }
    }

    pub fn is_collection(self) -> bool {
        matches!(self, ItemKind::Folder | ItemKind::AppPair)
    }

    pub fn is_launchable(self) -> bool {
        matches!(self, ItemKind::Application | ItemKind::DeepShortcut)
    }
}

/// A `[x, x+span_x) × [y, y+span_y)` rectangle of cells.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize)]
pub struct CellRect {
    pub x: i32,
    pub y: i32,
    pub span_x: i32,
    pub span_y: i32,
}

impl CellRect {
    pub fn new(x: i32, y: i32, span_x: i32, span_y: i32) -> Self {
        Self {
            x,
            y,
            span_x,
            span_y,
        }
    }

    /// Exclusive right edge. Computed in `i64` since stored rows may hold any `i32`.
    pub fn end_x(&self) -> i64 {
        i64::from(self.x) + i64::from(self.span_x)
    }

    pub fn end_y(&self) -> i64 {
        i64::from(self.y) + i64::from(self.span_y)
    }

    pub fn intersects(&self, other: &CellRect) -> bool {
        i64::from(self.x) < other.end_x()
            && i64::from(other.x) < self.end_x()
            && i64::from(self.y) < other.end_y()
            && i64::from(other.y) < self.end_y()
    }

    pub fn fits_within(&self, columns: i32, rows: i32) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.span_x >= 1
            && self.span_y >= 1
            && self.end_x() <= i64::from(columns)
            && self.end_y() <= i64::from(rows)
    }
}
