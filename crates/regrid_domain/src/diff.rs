use crate::{GridEntry, IdentityKey};
use std::collections::HashMap;

#[derive(Clone, Debug, Default)]
pub struct GridDiff {
    /// Source entries with no counterpart in the destination, in source order.
    pub to_add: Vec<GridEntry>,
    /// Destination ids (children of removed collections included) with no
    /// counterpart in the source.
    pub to_remove_ids: Vec<i64>,
    /// Top-level destination entries that were removed.
    pub removed_entry_ids: Vec<i64>,
}

/// Multiset difference of two snapshots keyed by identity.
///
/// Duplicated identities are matched by count, so `n` source copies against
/// `m` destination copies add `n - m` or remove `m - n` entries, never both.
pub fn calc_diff(src: &[GridEntry], dst: &[GridEntry]) -> GridDiff {
    let mut counts: HashMap<&IdentityKey, i64> = HashMap::new();
    for entry in src {
        *counts.entry(entry.identity_key()).or_default() += 1;
    }
    for entry in dst {
        *counts.entry(entry.identity_key()).or_default() -= 1;
    }

    let mut diff = GridDiff::default();
    for entry in src {
        let Some(count) = counts.get_mut(entry.identity_key()) else {
            continue;
        };
        if *count > 0 {
            *count -= 1;
            diff.to_add.push(entry.clone());
        }
    }
    for entry in dst {
        let Some(count) = counts.get_mut(entry.identity_key()) else {
            continue;
        };
        if *count < 0 {
            *count += 1;
            diff.removed_entry_ids.push(entry.id);
            diff.to_remove_ids.push(entry.id);
            diff.to_remove_ids.extend(entry.child_ids());
        }
    }
    diff
}
