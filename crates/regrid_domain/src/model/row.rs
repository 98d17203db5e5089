use crate::{Container, ItemKind};

fn default_span() -> i32 {
    1
}

/// One persisted row of a layout table, exactly as the store holds it.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LayoutRow {
    pub id: i64,
    pub item_type: i64,
    pub container: i64,
    #[serde(default)]
    pub screen: i32,
    #[serde(default)]
    pub cell_x: i32,
    #[serde(default)]
    pub cell_y: i32,
    #[serde(default = "default_span")]
    pub span_x: i32,
    #[serde(default = "default_span")]
    pub span_y: i32,
    #[serde(default)]
    pub rank: i32,
    #[serde(default)]
    pub launch_target: Option<String>,
    #[serde(default)]
    pub profile_id: i64,
    #[serde(default)]
    pub widget_provider: Option<String>,
    #[serde(default)]
    pub widget_id: Option<i64>,
}

impl LayoutRow {
    pub fn kind(&self) -> Option<ItemKind> {
        ItemKind::from_raw(self.item_type)
    }

    pub fn parent(&self) -> Option<Container> {
        Container::from_raw(self.container)
    }

    pub fn app(id: i64, container: Container, target: &str) -> Self {
        Self {
            id,
            item_type: ItemKind::Application.as_raw(),
            container: container.as_raw(),
            screen: 0,
            cell_x: 0,
            cell_y: 0,
            span_x: 1,
            span_y: 1,
            rank: 0,
            launch_target: Some(target.to_owned()),
            profile_id: 0,
            widget_provider: None,
            widget_id: None,
        }
    }

    pub fn widget(id: i64, provider: &str, span_x: i32, span_y: i32) -> Self {
        Self {
            id,
            item_type: ItemKind::Widget.as_raw(),
            container: Container::Desktop.as_raw(),
            screen: 0,
            cell_x: 0,
            cell_y: 0,
            span_x,
            span_y,
            rank: 0,
            launch_target: None,
            profile_id: 0,
            widget_provider: Some(provider.to_owned()),
            widget_id: Some(id),
        }
    }

    pub fn collection(id: i64, kind: ItemKind, container: Container) -> Self {
        Self {
            id,
            item_type: kind.as_raw(),
            container: container.as_raw(),
            screen: 0,
            cell_x: 0,
            cell_y: 0,
            span_x: 1,
            span_y: 1,
            rank: 0,
            launch_target: None,
            profile_id: 0,
            widget_provider: None,
            widget_id: None,
        }
    }

    pub fn at(mut self, screen: i32, cell_x: i32, cell_y: i32) -> Self {
        self.screen = screen;
        self.cell_x = cell_x;
        self.cell_y = cell_y;
        self
    }

    pub fn with_rank(mut self, rank: i32) -> Self {
        self.rank = rank;
        self
    }
}
