/// Emoji list operations: uniqueness, ordering, repositioning
use std::collections::HashSet;

use crate::emoji_data::Emoji;

/// Make items unique by key (keep first occurrence)
///
/// Items whose key is `None` are always kept and never count as duplicates
/// of each other. Returns the kept items and the removed items, both in
/// their original relative order.
pub fn dedupe_by_key<T, F>(items: Vec<T>, key: F) -> (Vec<T>, Vec<T>)
where
    F: Fn(&T) -> Option<String>,
{
    let mut seen = HashSet::new();
    let mut keep = Vec::with_capacity(items.len());
    let mut removed = Vec::new();

    for item in items {
        match key(&item) {
            Some(k) => {
                if seen.insert(k) {
                    keep.push(item);
                } else {
                    removed.push(item);
                }
            }
            None => keep.push(item),
        }
    }

    (keep, removed)
}

/// Most recently used first; entries never used sink to the end
pub fn sort_by_recency(emojis: &mut [Emoji]) {
    emojis.sort_by(|a, b| b.last_used.unwrap_or(0).cmp(&a.last_used.unwrap_or(0)));
}

/// Most used first
pub fn sort_by_usage(emojis: &mut [Emoji]) {
    emojis.sort_by(|a, b| b.usage_count.unwrap_or(0).cmp(&a.usage_count.unwrap_or(0)));
}

/// Insert at `index`, or append when the index is past the end
pub fn insert_or_append<T>(items: &mut Vec<T>, index: usize, item: T) -> usize {
    if index <= items.len() {
        items.insert(index, item);
        index
    } else {
        items.push(item);
        items.len() - 1
    }
}

/// Move an item inside one list, treating `to` as a position in the list
/// before removal (so dropping after the source shifts left by one)
pub fn reposition<T>(items: &mut Vec<T>, from: usize, to: usize) -> Option<usize> {
    if from >= items.len() {
        return None;
    }
    let item = items.remove(from);
    let adjusted = if to > from { to - 1 } else { to };
    Some(insert_or_append(items, adjusted, item))
}
