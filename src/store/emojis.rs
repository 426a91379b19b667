use std::collections::HashMap;

use log::{debug, info, warn};
use serde::Serialize;
use uuid::Uuid;

use super::EmojiStore;
use crate::emoji_data::{DuplicateEntry, Emoji, EmojiDraft, EmojiPatch};
use crate::hooks::CacheHooks;
use crate::normalize::{name_key, normalize_image_url};
use crate::operations::{dedupe_by_key, insert_or_append, reposition};

/// Outcome of a cross-group duplicate cleanup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DuplicateRemoval {
    /// Entries rewritten into references to their canonical emoji
    pub aliased: usize,
    /// Entries deleted outright
    pub removed: usize,
}

impl<H: CacheHooks> EmojiStore<H> {
    fn new_emoji(&self, group_id: &str, draft: EmojiDraft) -> Emoji {
        let mut emoji = draft.into_emoji(format!("emoji-{}", Uuid::new_v4()), group_id.to_string());
        emoji.added_at = Some(self.now());
        emoji
    }

    pub fn add_emoji(&mut self, group_id: &str, draft: EmojiDraft) -> Option<Emoji> {
        let Some(gi) = self.group_position(group_id) else {
            warn!("[EmojiCrudStore] add_emoji: unknown group {}", group_id);
            return None;
        };

        let emoji = self.new_emoji(group_id, draft);
        self.groups[gi].emojis.push(emoji.clone());

        if !emoji.tags.is_empty() {
            self.hooks.on_tags_added(&emoji.tags);
        }
        self.hooks.on_emoji_added(&emoji);
        self.save.mark_group_dirty(group_id);
        self.maybe_save();
        Some(emoji)
    }

    /// Bulk import path: caches are invalidated instead of updated and the
    /// caller owns the batch and the save
    pub fn add_emoji_without_save(&mut self, group_id: &str, draft: EmojiDraft) -> Option<Emoji> {
        let gi = self.group_position(group_id)?;

        let emoji = self.new_emoji(group_id, draft);
        self.groups[gi].emojis.push(emoji.clone());

        self.hooks.invalidate_tag_cache();
        self.hooks.invalidate_search_index();
        self.save.mark_group_dirty(group_id);
        Some(emoji)
    }

    fn apply_patch_at(&mut self, gi: usize, ei: usize, patch: &EmojiPatch) -> Emoji {
        let old = self.groups[gi].emojis[ei].clone();
        let mut new = old.clone();
        patch.apply_to(&mut new);

        if patch.tags.is_some() && old.tags != new.tags {
            self.hooks.on_tags_removed(&old.tags);
            self.hooks.on_tags_added(&new.tags);
        }
        self.groups[gi].emojis[ei] = new.clone();
        self.hooks.on_emoji_updated(&old, &new);

        let group_id = self.groups[gi].id.clone();
        self.save.mark_group_dirty(&group_id);
        self.maybe_save();
        new
    }

    /// Patch an emoji wherever it lives
    pub fn update_emoji(&mut self, emoji_id: &str, patch: &EmojiPatch) -> Option<Emoji> {
        let (gi, ei) = self.locate_emoji(emoji_id)?;
        Some(self.apply_patch_at(gi, ei, patch))
    }

    pub fn update_emoji_in_group(&mut self, group_id: &str, index: usize, patch: &EmojiPatch) -> Option<Emoji> {
        let gi = self.group_position(group_id)?;
        if index >= self.groups[gi].emojis.len() {
            debug!("[EmojiCrudStore] update_emoji_in_group: index {} out of range", index);
            return None;
        }
        Some(self.apply_patch_at(gi, index, patch))
    }

    /// Rename many emojis at once; returns how many were renamed
    pub fn update_emoji_names(&mut self, names: &HashMap<String, String>) -> usize {
        self.batch(|store| {
            let mut renamed = 0;
            for gi in 0..store.groups.len() {
                let mut touched = false;
                for ei in 0..store.groups[gi].emojis.len() {
                    let Some(name) = names.get(&store.groups[gi].emojis[ei].id) else {
                        continue;
                    };
                    let old = store.groups[gi].emojis[ei].clone();
                    store.groups[gi].emojis[ei].name = name.clone();
                    store.hooks.on_emoji_updated(&old, &store.groups[gi].emojis[ei]);
                    touched = true;
                    renamed += 1;
                }
                if touched {
                    let group_id = store.groups[gi].id.clone();
                    store.save.mark_group_dirty(&group_id);
                }
            }
            renamed
        })
    }

    fn remove_at(&mut self, gi: usize, ei: usize) -> Emoji {
        let emoji = self.groups[gi].emojis.remove(ei);
        self.hooks.on_tags_removed(&emoji.tags);
        self.hooks.on_emoji_removed(&emoji);

        let group_id = self.groups[gi].id.clone();
        self.save.mark_group_dirty(&group_id);
        if self.favorites.remove(&emoji.id) {
            self.save.mark_favorites_dirty();
        }
        self.maybe_save();
        emoji
    }

    pub fn remove_emoji_from_group(&mut self, group_id: &str, index: usize) -> Option<Emoji> {
        let gi = self.group_position(group_id)?;
        if index >= self.groups[gi].emojis.len() {
            debug!("[EmojiCrudStore] remove_emoji_from_group: index {} out of range", index);
            return None;
        }
        Some(self.remove_at(gi, index))
    }

    pub fn delete_emoji(&mut self, emoji_id: &str) -> Option<Emoji> {
        let (gi, ei) = self.locate_emoji(emoji_id)?;
        Some(self.remove_at(gi, ei))
    }

    /// Move an emoji to `dst_index` of `dst_group`; an index past the end
    /// appends. Within one group the index refers to the list before the
    /// emoji is taken out.
    pub fn move_emoji(&mut self, src_group: &str, src_index: usize, dst_group: &str, dst_index: usize) -> bool {
        let (Some(si), Some(di)) = (self.group_position(src_group), self.group_position(dst_group)) else {
            debug!("[EmojiCrudStore] move_emoji: unknown group {} or {}", src_group, dst_group);
            return false;
        };
        if src_index >= self.groups[si].emojis.len() {
            debug!("[EmojiCrudStore] move_emoji: source index {} out of range", src_index);
            return false;
        }

        let (old, new) = if si == di {
            let old = self.groups[si].emojis[src_index].clone();
            let Some(at) = reposition(&mut self.groups[si].emojis, src_index, dst_index) else {
                return false;
            };
            (old, self.groups[si].emojis[at].clone())
        } else {
            let mut emoji = self.groups[si].emojis.remove(src_index);
            let old = emoji.clone();
            emoji.group_id = dst_group.to_string();
            let at = insert_or_append(&mut self.groups[di].emojis, dst_index, emoji);
            (old, self.groups[di].emojis[at].clone())
        };

        self.hooks.on_emoji_updated(&old, &new);
        self.save.mark_group_dirty(src_group);
        self.save.mark_group_dirty(dst_group);
        self.maybe_save();
        true
    }

    fn dedupe_group_with(&mut self, group_id: &str, key: impl Fn(&Emoji) -> Option<String>) -> usize {
        let Some(gi) = self.group_position(group_id) else {
            return 0;
        };

        let emojis = std::mem::take(&mut self.groups[gi].emojis);
        let (keep, removed) = dedupe_by_key(emojis, key);
        self.groups[gi].emojis = keep;
        if removed.is_empty() {
            return 0;
        }

        self.hooks.invalidate_tag_cache();
        self.hooks.invalidate_search_index();
        let mut favorites_changed = false;
        for emoji in &removed {
            favorites_changed |= self.favorites.remove(&emoji.id);
        }
        if favorites_changed {
            self.save.mark_favorites_dirty();
        }
        self.save.mark_group_dirty(group_id);
        self.maybe_save();

        info!("[EmojiCrudStore] dedupe {}: removed {}", group_id, removed.len());
        removed.len()
    }

    /// Drop later emojis whose image URL normalizes to one already seen
    pub fn dedupe_group(&mut self, group_id: &str) -> usize {
        self.dedupe_group_with(group_id, |e| normalize_image_url(&e.url))
    }

    /// Drop later emojis with the same case-insensitive name
    pub fn dedupe_group_by_name(&mut self, group_id: &str) -> usize {
        self.dedupe_group_with(group_id, |e| name_key(&e.name))
    }

    /// Collapse duplicate sets found across groups.
    ///
    /// The first entry of each set is canonical. Every other entry becomes a
    /// reference to it (`create_references`) or is deleted. Entries that no
    /// longer exist are skipped.
    pub fn remove_duplicates_across_groups(
        &mut self,
        sets: &[Vec<DuplicateEntry>],
        create_references: bool,
    ) -> DuplicateRemoval {
        self.batch(|store| {
            let mut result = DuplicateRemoval::default();

            for set in sets {
                let [canonical, duplicates @ ..] = set.as_slice() else {
                    continue;
                };
                if duplicates.is_empty() {
                    continue;
                }
                let canonical_url = store
                    .find_emoji(&canonical.emoji.id)
                    .map(|e| e.url.clone())
                    .unwrap_or_else(|| canonical.emoji.url.clone());

                for duplicate in duplicates {
                    let located = store
                        .group_position(&duplicate.group_id)
                        .and_then(|gi| store.groups[gi].position_of(&duplicate.emoji.id).map(|ei| (gi, ei)));
                    let Some((gi, ei)) = located else {
                        warn!(
                            "[EmojiCrudStore] duplicate {} not found in group {}, skipping",
                            duplicate.emoji.id, duplicate.group_id
                        );
                        continue;
                    };

                    if create_references {
                        let patch = EmojiPatch {
                            reference_id: Some(canonical.emoji.id.clone()),
                            url: Some(canonical_url.clone()),
                            ..EmojiPatch::default()
                        };
                        store.apply_patch_at(gi, ei, &patch);
                        result.aliased += 1;
                    } else {
                        store.remove_at(gi, ei);
                        result.removed += 1;
                    }
                }
            }

            info!(
                "[EmojiCrudStore] cross-group duplicates: {} aliased, {} removed",
                result.aliased, result.removed
            );
            result
        })
    }

    /// Follow `reference_id` one hop. The result keeps the alias's own id
    /// and group but shows the referent's image. A missing referent leaves
    /// the alias as it is.
    pub fn resolve_emoji_reference(&self, emoji: &Emoji) -> Emoji {
        let Some(reference_id) = &emoji.reference_id else {
            return emoji.clone();
        };
        match self.find_emoji(reference_id) {
            Some(referent) => Emoji {
                url: referent.url.clone(),
                display_url: Some(referent.display_url.clone().unwrap_or_else(|| referent.url.clone())),
                ..emoji.clone()
            },
            None => emoji.clone(),
        }
    }

    /// Aliases whose referent no longer exists
    pub fn dangling_references(&self) -> Vec<&Emoji> {
        self.all_emojis()
            .filter(|e| {
                e.reference_id
                    .as_deref()
                    .is_some_and(|id| self.find_emoji(id).is_none())
            })
            .collect()
    }

    /// Strip every perceptual hash; returns the number of groups touched
    pub fn clear_all_perceptual_hashes(&mut self) -> usize {
        self.batch(|store| {
            let mut touched = 0;
            for group in &mut store.groups {
                let mut modified = false;
                for emoji in &mut group.emojis {
                    modified |= emoji.perceptual_hash.take().is_some();
                }
                if modified {
                    store.save.mark_group_dirty(&group.id);
                    touched += 1;
                }
            }
            touched
        })
    }

    pub fn find_emoji(&self, emoji_id: &str) -> Option<&Emoji> {
        self.all_emojis().find(|e| e.id == emoji_id)
    }

    pub fn find_emoji_group(&self, emoji_id: &str) -> Option<&crate::emoji_data::EmojiGroup> {
        self.groups.iter().find(|g| g.position_of(emoji_id).is_some())
    }

    pub fn all_emojis(&self) -> impl Iterator<Item = &Emoji> {
        self.groups.iter().flat_map(|g| g.emojis.iter())
    }
}
