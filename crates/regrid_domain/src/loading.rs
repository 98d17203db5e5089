use crate::{
    CellRect, ChildItems, Container, EntryPayload, GridEntry, IdentityKey, ItemKind, LaunchTarget,
    LayoutRow, WidgetMetadataResolver, WidgetSpans,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum InvalidEntryReason {
    UnknownItemType { item_type: i64 },
    UnparsableLaunchTarget,
    MissingWidgetProvider,
    WidgetInDock,
    EmptyFolder,
    AppPairCardinality { children: usize },
    NonPositiveSpan,
    NegativeScreen,
    InvalidDockSlot,
    DuplicateDockSlot { slot: i32 },
    ChildNotLaunchable,
    ParentInvalid { parent_id: i64 },
    ParentNotCollection { parent_id: i64 },
    OrphanedChild { parent_id: i64 },
}

impl fmt::Display for InvalidEntryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidEntryReason::UnknownItemType { item_type } => {
                write!(f, "unknown item type {item_type}")
            }
            InvalidEntryReason::UnparsableLaunchTarget => write!(f, "unparsable launch target"),
            InvalidEntryReason::MissingWidgetProvider => write!(f, "widget has no provider"),
            InvalidEntryReason::WidgetInDock => write!(f, "widgets cannot live in the dock"),
            InvalidEntryReason::EmptyFolder => write!(f, "folder has no valid children"),
            InvalidEntryReason::AppPairCardinality { children } => {
                write!(f, "app pair has {children} valid children, expected 2")
            }
            InvalidEntryReason::NonPositiveSpan => write!(f, "span must be at least 1x1"),
            InvalidEntryReason::NegativeScreen => write!(f, "negative screen id"),
            InvalidEntryReason::InvalidDockSlot => write!(f, "negative dock slot"),
            InvalidEntryReason::DuplicateDockSlot { slot } => {
                write!(f, "dock slot {slot} is already taken")
            }
            InvalidEntryReason::ChildNotLaunchable => {
                write!(f, "folder child must be an application or shortcut")
            }
            InvalidEntryReason::ParentInvalid { parent_id } => {
                write!(f, "parent {parent_id} was rejected")
            }
            InvalidEntryReason::ParentNotCollection { parent_id } => {
                write!(f, "parent {parent_id} is not a folder or app pair")
            }
            InvalidEntryReason::OrphanedChild { parent_id } => {
                write!(f, "parent {parent_id} does not exist")
            }
        }
    }
}

impl std::error::Error for InvalidEntryReason {}

#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize)]
pub struct InvalidRow {
    pub id: i64,
    #[serde(flatten)]
    pub reason: InvalidEntryReason,
}

/// Validated entries of one container plus the rows that must be deleted.
#[derive(Clone, Debug)]
pub struct LoadedEntries {
    pub entries: Vec<GridEntry>,
    pub invalid: Vec<InvalidRow>,
    /// Highest screen id (or dock slot) seen, `-1` when there are no entries.
    pub last_screen_id: i32,
    by_screen: BTreeMap<i32, Vec<usize>>,
}

impl LoadedEntries {
    fn from_parts(entries: Vec<GridEntry>, invalid: Vec<InvalidRow>) -> Self {
        let mut by_screen: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
        for (index, entry) in entries.iter().enumerate() {
            by_screen.entry(entry.screen_id).or_default().push(index);
        }
        let last_screen_id = by_screen.keys().next_back().copied().unwrap_or(-1);
        Self {
            entries,
            invalid,
            last_screen_id,
            by_screen,
        }
    }

    pub fn entries_on_screen(&self, screen_id: i32) -> impl Iterator<Item = &GridEntry> {
        self.by_screen
            .get(&screen_id)
            .into_iter()
            .flatten()
            .map(|index| &self.entries[*index])
    }

    pub fn screen_ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.by_screen.keys().copied()
    }

    pub fn invalid_ids(&self) -> Vec<i64> {
        self.invalid.iter().map(|row| row.id).collect()
    }

    /// Every id referenced by the loaded entries, children included.
    pub fn all_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.entries
            .iter()
            .flat_map(|entry| std::iter::once(entry.id).chain(entry.child_ids()))
    }
}

/// Identity of a folder or app-pair child row.
pub fn child_identity(row: &LayoutRow) -> Result<IdentityKey, InvalidEntryReason> {
    let kind = row.kind().ok_or(InvalidEntryReason::UnknownItemType {
        item_type: row.item_type,
    })?;
    if !kind.is_launchable() {
        return Err(InvalidEntryReason::ChildNotLaunchable);
    }
    let target = parse_target(kind, row)?;
    Ok(IdentityKey::launchable(&target, row.profile_id))
}

/// Converts one top-level row into a [`GridEntry`]. `children` must already
/// hold the valid children of a folder or app pair.
pub fn entry_from_row(
    row: &LayoutRow,
    container: Container,
    children: ChildItems,
    resolver: &dyn WidgetMetadataResolver,
) -> Result<GridEntry, InvalidEntryReason> {
    let kind = row.kind().ok_or(InvalidEntryReason::UnknownItemType {
        item_type: row.item_type,
    })?;

    let (screen_id, rect) = match container {
        Container::Hotseat => {
            if row.screen < 0 {
                return Err(InvalidEntryReason::InvalidDockSlot);
            }
            if kind == ItemKind::Widget {
                return Err(InvalidEntryReason::WidgetInDock);
            }
            (row.screen, CellRect::new(0, 0, 1, 1))
        }
        _ => {
            if row.screen < 0 {
                return Err(InvalidEntryReason::NegativeScreen);
            }
            if row.span_x < 1 || row.span_y < 1 {
                return Err(InvalidEntryReason::NonPositiveSpan);
            }
            (
                row.screen,
                CellRect::new(row.cell_x, row.cell_y, row.span_x, row.span_y),
            )
        }
    };

    let mut min_spans = (rect.span_x, rect.span_y);
    let payload = match kind {
        ItemKind::Application => EntryPayload::Application {
            target: parse_target(kind, row)?,
        },
        ItemKind::DeepShortcut => EntryPayload::DeepShortcut {
            target: parse_target(kind, row)?,
        },
        ItemKind::Folder => {
            if children.is_empty() {
                return Err(InvalidEntryReason::EmptyFolder);
            }
            EntryPayload::Folder { children }
        }
        ItemKind::AppPair => {
            if children.len() != 2 {
                return Err(InvalidEntryReason::AppPairCardinality {
                    children: children.len(),
                });
            }
            EntryPayload::AppPair { children }
        }
        ItemKind::Widget => {
            let provider = row
                .widget_provider
                .as_deref()
                .map(str::trim)
                .filter(|provider| !provider.is_empty())
                .ok_or(InvalidEntryReason::MissingWidgetProvider)?;
            let spans = resolver
                .min_spans(provider)
                .unwrap_or(WidgetSpans::FALLBACK);
            min_spans = (spans.min_span_x, spans.min_span_y);
            EntryPayload::Widget {
                provider: provider.to_owned(),
                widget_id: row.widget_id,
            }
        }
    };

    Ok(GridEntry::new(
        row.id,
        container,
        screen_id,
        rect,
        min_spans.0,
        min_spans.1,
        row.profile_id,
        payload,
    ))
}

/// Validates every row of `container` (plus the children of its folders)
/// and partitions them into entries and rows to delete.
///
/// `child_rows` may contain children of other containers; only those whose
/// parent is among `rows` are considered.
pub fn load_entries(
    container: Container,
    rows: &[LayoutRow],
    child_rows: &[LayoutRow],
    resolver: &dyn WidgetMetadataResolver,
) -> LoadedEntries {
    let mut children_by_parent: HashMap<i64, Vec<&LayoutRow>> = HashMap::new();
    for child in child_rows {
        if let Some(Container::Folder(parent_id)) = child.parent() {
            children_by_parent.entry(parent_id).or_default().push(child);
        }
    }

    let mut rows: Vec<&LayoutRow> = rows
        .iter()
        .filter(|row| row.parent() == Some(container))
        .collect();
    rows.sort_by_key(|row| row.id);

    let mut entries = Vec::new();
    let mut invalid = Vec::new();
    let mut taken_slots: HashSet<i32> = HashSet::new();

    for row in rows {
        let mut child_ids = Vec::new();
        let mut children = ChildItems::default();
        if let Some(child_rows) = children_by_parent.get_mut(&row.id) {
            child_rows.sort_by_key(|child| (child.rank, child.id));
            let holds_children = row.kind().is_none_or(ItemKind::is_collection);
            for child in child_rows.iter() {
                let identity = if holds_children {
                    child_identity(child)
                } else {
                    Err(InvalidEntryReason::ParentNotCollection { parent_id: row.id })
                };
                match identity {
                    Ok(key) => {
                        child_ids.push(child.id);
                        children.insert(key, child.id);
                    }
                    Err(reason) => invalid.push(InvalidRow {
                        id: child.id,
                        reason,
                    }),
                }
            }
        }

        let result = if container == Container::Hotseat && taken_slots.contains(&row.screen) {
            Err(InvalidEntryReason::DuplicateDockSlot { slot: row.screen })
        } else {
            entry_from_row(row, container, children, resolver)
        };

        match result {
            Ok(entry) => {
                if container == Container::Hotseat {
                    taken_slots.insert(entry.screen_id);
                }
                entries.push(entry);
            }
            Err(reason) => {
                invalid.push(InvalidRow { id: row.id, reason });
                invalid.extend(child_ids.into_iter().map(|id| InvalidRow {
                    id,
                    reason: InvalidEntryReason::ParentInvalid { parent_id: row.id },
                }));
            }
        }
    }

    LoadedEntries::from_parts(entries, invalid)
}

/// Child rows whose parent folder or app pair is missing from `rows`.
pub fn orphaned_children(rows: &[LayoutRow]) -> Vec<InvalidRow> {
    let ids: HashSet<i64> = rows.iter().map(|row| row.id).collect();
    let mut orphans: Vec<InvalidRow> = rows
        .iter()
        .filter_map(|row| match row.parent() {
            Some(Container::Folder(parent_id)) if !ids.contains(&parent_id) => Some(InvalidRow {
                id: row.id,
                reason: InvalidEntryReason::OrphanedChild { parent_id },
            }),
            _ => None,
        })
        .collect();
    orphans.sort_by_key(|row| row.id);
    orphans
}

fn parse_target(kind: ItemKind, row: &LayoutRow) -> Result<LaunchTarget, InvalidEntryReason> {
    row.launch_target
        .as_deref()
        .and_then(|raw| LaunchTarget::parse(kind, raw))
        .ok_or(InvalidEntryReason::UnparsableLaunchTarget)
}
