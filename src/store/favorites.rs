use log::{debug, info, warn};
use uuid::Uuid;

use super::EmojiStore;
use crate::emoji_data::{Emoji, EmojiGroup, FAVORITES_GROUP_ID};
use crate::hooks::CacheHooks;
use crate::operations::{sort_by_recency, sort_by_usage};

/// Repeat uses inside this window simply count up
pub const FAVORITES_DECAY_WINDOW_MS: i64 = 12 * 60 * 60 * 1000;

/// Applied to the usage count when a favorite comes back after the window
pub const FAVORITES_DECAY_FACTOR: f64 = 0.8;

fn decayed_usage(count: Option<u32>, last_used: Option<i64>, now: i64) -> u32 {
    let elapsed = now - last_used.unwrap_or(0);
    if elapsed < FAVORITES_DECAY_WINDOW_MS {
        count.unwrap_or(0).saturating_add(1)
    } else {
        (f64::from(count.unwrap_or(1)) * FAVORITES_DECAY_FACTOR).floor() as u32 + 1
    }
}

impl<H: CacheHooks> EmojiStore<H> {
    /// Position of the favorites group, creating it at the front if needed
    pub(crate) fn ensure_favorites_group_index(&mut self) -> usize {
        if let Some(index) = self.group_position(FAVORITES_GROUP_ID) {
            return index;
        }
        info!("[FavoritesStore] Creating favorites group");
        let group = EmojiGroup::new(
            FAVORITES_GROUP_ID.to_string(),
            self.config.favorites_group_name.clone(),
            self.config.favorites_group_icon.clone(),
            0,
        );
        self.groups.insert(0, group);
        self.save.mark_group_dirty(FAVORITES_GROUP_ID);
        self.save.mark_index_dirty();
        0
    }

    pub fn ensure_favorites_group(&mut self) -> &EmojiGroup {
        let index = self.ensure_favorites_group_index();
        &self.groups[index]
    }

    fn mark_favorites_changed(&mut self) {
        self.save.mark_favorites_dirty();
        if self.has_group(FAVORITES_GROUP_ID) {
            self.save.mark_group_dirty(FAVORITES_GROUP_ID);
        }
        self.maybe_save();
    }

    /// Record a use of `emoji` in the favorites group.
    ///
    /// An entry with the same url is bumped (with decay after a long pause),
    /// otherwise a copy is added. The group stays sorted by last use.
    /// Returns false while the store is not ready.
    pub fn add_to_favorites(&mut self, emoji: &Emoji) -> bool {
        if !self.has_loaded_once || self.is_loading {
            warn!("[FavoritesStore] addToFavorites blocked - data not ready");
            return false;
        }

        let now = self.now();
        let fi = self.ensure_favorites_group_index();
        let existing = self.groups[fi].emojis.iter().position(|e| e.url == emoji.url);

        match existing {
            Some(ei) => {
                let old = self.groups[fi].emojis[ei].clone();
                let entry = &mut self.groups[fi].emojis[ei];
                entry.usage_count = Some(decayed_usage(entry.usage_count, entry.last_used, now));
                entry.last_used = Some(now);
                debug!("[FavoritesStore] usage of {} now {:?}", entry.name, entry.usage_count);
                self.hooks.on_emoji_updated(&old, &self.groups[fi].emojis[ei]);
            }
            None => {
                let favorite = Emoji {
                    id: format!("fav-{}", Uuid::new_v4()),
                    group_id: FAVORITES_GROUP_ID.to_string(),
                    usage_count: Some(1),
                    last_used: Some(now),
                    added_at: Some(now),
                    reference_id: None,
                    ..emoji.clone()
                };
                if !favorite.tags.is_empty() {
                    self.hooks.on_tags_added(&favorite.tags);
                }
                self.hooks.on_emoji_added(&favorite);
                info!("[FavoritesStore] Added to favorites: {}", favorite.name);
                self.groups[fi].emojis.push(favorite);
            }
        }

        sort_by_recency(&mut self.groups[fi].emojis);

        if self.read_only {
            self.save.request_favorites_only();
        } else {
            self.mark_favorites_changed();
        }
        true
    }

    /// Flip membership in the favorites id set; returns the new state
    pub fn toggle_favorite(&mut self, emoji_id: &str) -> bool {
        let now_favorite = if self.favorites.remove(emoji_id) {
            false
        } else {
            self.favorites.insert(emoji_id.to_string());
            true
        };
        debug!("[FavoritesStore] toggleFavorite {} -> {}", emoji_id, now_favorite);
        self.mark_favorites_changed();
        now_favorite
    }

    pub fn remove_from_favorites(&mut self, emoji_id: &str) -> bool {
        let Some(fi) = self.group_position(FAVORITES_GROUP_ID) else {
            return false;
        };
        let Some(ei) = self.groups[fi].position_of(emoji_id) else {
            return false;
        };

        let removed = self.groups[fi].emojis.remove(ei);
        self.hooks.on_tags_removed(&removed.tags);
        self.hooks.on_emoji_removed(&removed);
        self.favorites.remove(emoji_id);
        info!("[FavoritesStore] Removed from favorites: {}", emoji_id);
        self.mark_favorites_changed();
        true
    }

    pub fn clear_all_favorites(&mut self) -> bool {
        let Some(fi) = self.group_position(FAVORITES_GROUP_ID) else {
            warn!("[FavoritesStore] Favorites group not found");
            return false;
        };

        self.groups[fi].emojis.clear();
        self.favorites.clear();
        self.hooks.invalidate_tag_cache();
        self.hooks.invalidate_search_index();
        info!("[FavoritesStore] Cleared all favorites");
        self.mark_favorites_changed();
        true
    }

    pub fn is_favorite(&self, emoji_id: &str) -> bool {
        self.favorites.contains(emoji_id)
    }

    pub fn favorites_group(&self) -> Option<&EmojiGroup> {
        self.find_group(FAVORITES_GROUP_ID)
    }

    pub fn favorites_count(&self) -> usize {
        self.favorites_group().map_or(0, |g| g.emojis.len())
    }

    /// Copy of the favorites, most used first
    pub fn favorite_emojis(&self) -> Vec<Emoji> {
        let mut emojis = self
            .favorites_group()
            .map(|g| g.emojis.clone())
            .unwrap_or_default();
        sort_by_usage(&mut emojis);
        emojis
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::hooks::NoopHooks;
    use crate::test_utils::{ManualClock, create_test_emoji, create_test_group, create_test_store};

    const HOUR_MS: i64 = 60 * 60 * 1000;

    #[test]
    fn test_decayed_usage() {
        assert_eq!(decayed_usage(Some(4), Some(1_000), 1_000 + HOUR_MS), 5);
        assert_eq!(decayed_usage(Some(10), Some(0), 13 * HOUR_MS), 9);
        assert_eq!(decayed_usage(None, None, 13 * HOUR_MS), 1);
        assert_eq!(decayed_usage(Some(1), Some(0), 12 * HOUR_MS), 1);
        assert_eq!(decayed_usage(Some(u32::MAX), Some(1_000), 1_000 + HOUR_MS), u32::MAX);
    }

    #[test]
    fn test_ensure_favorites_group_is_idempotent() {
        let (mut store, _clock) = create_test_store();
        store.hydrate(vec![create_test_group("a", &[])], Vec::new());

        assert_eq!(store.ensure_favorites_group().name, "常用表情");
        store.ensure_favorites_group();

        assert_eq!(store.group_count(), 2);
        assert_eq!(store.groups()[0].id, "favorites");
        assert_eq!(store.groups()[0].icon, "⭐");
    }

    #[test]
    fn test_add_to_favorites_blocked_before_load() {
        let mut store = EmojiStore::with_parts(StoreConfig::default(), NoopHooks, ManualClock::new(0));

        assert!(!store.add_to_favorites(&create_test_emoji("e1", "g1")));
        assert!(store.favorites_group().is_none());
    }

    #[test]
    fn test_add_to_favorites_tracks_usage_with_decay() {
        let (mut store, clock) = create_test_store();
        store.hydrate(vec![create_test_group("g1", &["e1"])], Vec::new());
        let emoji = store.find_emoji("e1").unwrap().clone();

        assert!(store.add_to_favorites(&emoji));
        let favorite = &store.favorites_group().unwrap().emojis[0];
        assert!(favorite.id.starts_with("fav-"));
        assert_eq!(favorite.group_id, "favorites");
        assert_eq!(favorite.usage_count, Some(1));
        assert_eq!(favorite.added_at, Some(clock.now()));

        clock.advance(HOUR_MS);
        store.add_to_favorites(&emoji);
        assert_eq!(store.favorites_group().unwrap().emojis[0].usage_count, Some(2));
        assert_eq!(store.favorites_count(), 1);

        for _ in 0..8 {
            store.add_to_favorites(&emoji);
        }
        assert_eq!(store.favorites_group().unwrap().emojis[0].usage_count, Some(10));

        clock.advance(13 * HOUR_MS);
        store.add_to_favorites(&emoji);
        let favorite = &store.favorites_group().unwrap().emojis[0];
        assert_eq!(favorite.usage_count, Some(9));
        assert_eq!(favorite.last_used, Some(clock.now()));
    }

    #[test]
    fn test_favorites_sorted_by_recency_and_usage() {
        let (mut store, clock) = create_test_store();
        store.hydrate(vec![create_test_group("g1", &["e1", "e2"])], Vec::new());
        let first = store.find_emoji("e1").unwrap().clone();
        let second = store.find_emoji("e2").unwrap().clone();

        store.add_to_favorites(&first);
        store.add_to_favorites(&first);
        clock.advance(1_000);
        store.add_to_favorites(&second);

        let recency: Vec<&str> = store
            .favorites_group()
            .unwrap()
            .emojis
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(recency, vec!["e2", "e1"]);

        let by_usage: Vec<String> = store.favorite_emojis().into_iter().map(|e| e.name).collect();
        assert_eq!(by_usage, vec!["e1", "e2"]);
    }

    #[test]
    fn test_add_to_favorites_marks_dirty() {
        let (mut store, _clock) = create_test_store();
        store.hydrate(vec![create_test_group("g1", &["e1"])], Vec::new());
        let emoji = store.find_emoji("e1").unwrap().clone();

        store.add_to_favorites(&emoji);

        let dirty = store.save_control().dirty();
        assert!(dirty.favorites);
        assert!(dirty.groups.contains("favorites"));
        assert!(store.next_flush_at().is_some());
    }

    #[test]
    fn test_add_to_favorites_read_only_requests_favorites_save() {
        let (mut store, _clock) = create_test_store();
        store.hydrate(vec![create_test_group("g1", &["e1"])], Vec::new());
        store.set_read_only_mode(true);
        let emoji = store.find_emoji("e1").unwrap().clone();

        store.add_to_favorites(&emoji);

        assert!(store.save_control().favorites_only_requested());
        assert_eq!(store.next_flush_at(), None);
    }

    #[test]
    fn test_toggle_and_remove_favorites() {
        let (mut store, _clock) = create_test_store();
        store.hydrate(vec![create_test_group("g1", &["e1"])], Vec::new());

        assert!(store.toggle_favorite("e1"));
        assert!(store.is_favorite("e1"));
        assert!(!store.toggle_favorite("e1"));
        assert!(!store.is_favorite("e1"));

        let emoji = store.find_emoji("e1").unwrap().clone();
        store.add_to_favorites(&emoji);
        let fav_id = store.favorites_group().unwrap().emojis[0].id.clone();
        assert!(store.remove_from_favorites(&fav_id));
        assert!(!store.remove_from_favorites(&fav_id));
        assert_eq!(store.favorites_count(), 0);
    }

    #[test]
    fn test_clear_all_favorites() {
        let (mut store, _clock) = create_test_store();
        assert!(!store.clear_all_favorites());

        store.hydrate(vec![create_test_group("g1", &["e1"])], vec!["e1".to_string()]);
        let emoji = store.find_emoji("e1").unwrap().clone();
        store.add_to_favorites(&emoji);

        assert!(store.clear_all_favorites());
        assert_eq!(store.favorites_count(), 0);
        assert!(!store.is_favorite("e1"));
        assert!(store.has_group("favorites"));
    }
}
