use super::LaunchTarget;
use crate::{CellRect, Container, ItemKind};
use std::collections::BTreeMap;
use std::fmt;

/// Content-derived key used to match the same logical item across snapshots.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct IdentityKey(String);

impl IdentityKey {
    pub fn launchable(target: &LaunchTarget, profile_id: i64) -> Self {
        Self(format!("{target}|{profile_id}"))
    }

    pub fn widget(provider: &str, profile_id: i64) -> Self {
        Self(format!("widget:{provider}|{profile_id}"))
    }

    /// Structural key of a folder or app pair: its kind plus how many
    /// children share each child identity.
    pub fn collection(kind: ItemKind, children: &ChildItems) -> Self {
        let mut parts: Vec<String> = children
            .0
            .iter()
            .map(|(key, ids)| format!("{}{}", ids.len(), key.0))
            .collect();
        parts.sort();
        Self(format!("{}:{}", kind.as_key(), parts.join(",")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Children of a folder or app pair, grouped by child identity. Several
/// children may share one identity.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ChildItems(BTreeMap<IdentityKey, Vec<i64>>);

impl ChildItems {
    pub fn insert(&mut self, key: IdentityKey, id: i64) {
        self.0.entry(key).or_default().push(id);
    }

    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every child id, ascending.
    pub fn ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.0.values().flatten().copied().collect();
        ids.sort_unstable();
        ids
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EntryPayload {
    Application { target: LaunchTarget },
    DeepShortcut { target: LaunchTarget },
    Folder { children: ChildItems },
    AppPair { children: ChildItems },
    Widget { provider: String, widget_id: Option<i64> },
}

impl EntryPayload {
    pub fn kind(&self) -> ItemKind {
        match self {
            EntryPayload::Application { .. } => ItemKind::Application,
            EntryPayload::DeepShortcut { .. } => ItemKind::DeepShortcut,
            EntryPayload::Folder { .. } => ItemKind::Folder,
            EntryPayload::AppPair { .. } => ItemKind::AppPair,
            EntryPayload::Widget { .. } => ItemKind::Widget,
        }
    }

    pub fn children(&self) -> Option<&ChildItems> {
        match self {
            EntryPayload::Folder { children } | EntryPayload::AppPair { children } => {
                Some(children)
            }
            _ => None,
        }
    }

    fn identity_key(&self, profile_id: i64) -> IdentityKey {
        match self {
            EntryPayload::Application { target } | EntryPayload::DeepShortcut { target } => {
                IdentityKey::launchable(target, profile_id)
            }
            EntryPayload::Folder { children } | EntryPayload::AppPair { children } => {
                IdentityKey::collection(self.kind(), children)
            }
            EntryPayload::Widget { provider, .. } => IdentityKey::widget(provider, profile_id),
        }
    }
}

/// The unit of placement: one validated workspace or dock item.
///
/// For dock entries `screen_id` is the slot index and the cell fields are
/// zeroed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GridEntry {
    pub id: i64,
    pub container: Container,
    pub screen_id: i32,
    pub cell_x: i32,
    pub cell_y: i32,
    pub span_x: i32,
    pub span_y: i32,
    pub min_span_x: i32,
    pub min_span_y: i32,
    pub profile_id: i64,
    pub payload: EntryPayload,
    identity_key: IdentityKey,
}

impl GridEntry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: i64,
        container: Container,
        screen_id: i32,
        rect: CellRect,
        min_span_x: i32,
        min_span_y: i32,
        profile_id: i64,
        payload: EntryPayload,
    ) -> Self {
        let identity_key = payload.identity_key(profile_id);
        Self {
            id,
            container,
            screen_id,
            cell_x: rect.x,
            cell_y: rect.y,
            span_x: rect.span_x,
            span_y: rect.span_y,
            min_span_x: min_span_x.clamp(1, rect.span_x.max(1)),
            min_span_y: min_span_y.clamp(1, rect.span_y.max(1)),
            profile_id,
            payload,
            identity_key,
        }
    }

    pub fn kind(&self) -> ItemKind {
        self.payload.kind()
    }

    pub fn identity_key(&self) -> &IdentityKey {
        &self.identity_key
    }

    pub fn rect(&self) -> CellRect {
        CellRect::new(self.cell_x, self.cell_y, self.span_x, self.span_y)
    }

    pub fn child_ids(&self) -> Vec<i64> {
        self.payload
            .children()
            .map(ChildItems::ids)
            .unwrap_or_default()
    }

    /// Reading order on the source layout: screen, then row, then column.
    pub fn reading_order(&self) -> (i32, i32, i32) {
        (self.screen_id, self.cell_y, self.cell_x)
    }
}
