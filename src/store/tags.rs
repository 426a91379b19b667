use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use super::EmojiStore;
use crate::emoji_data::Emoji;
use crate::hooks::CacheHooks;
use crate::normalize::{clean_tag, clean_tags};

impl<H: CacheHooks> EmojiStore<H> {
    /// Rewrite one emoji's tag list through `edit`, which reports whether
    /// it changed anything
    fn retag(&mut self, emoji_id: &str, edit: impl FnOnce(&mut Vec<String>) -> bool) -> bool {
        let Some((gi, ei)) = self.locate_emoji(emoji_id) else {
            debug!("[TagStore] unknown emoji {}", emoji_id);
            return false;
        };

        let old = self.groups[gi].emojis[ei].clone();
        let mut tags = old.tags.clone();
        if !edit(&mut tags) {
            return false;
        }

        self.hooks.on_tags_removed(&old.tags);
        self.hooks.on_tags_added(&tags);
        self.groups[gi].emojis[ei].tags = tags;
        self.hooks.on_emoji_updated(&old, &self.groups[gi].emojis[ei]);

        let group_id = self.groups[gi].id.clone();
        self.save.mark_group_dirty(&group_id);
        self.maybe_save();
        true
    }

    pub fn add_tag_to_emoji(&mut self, emoji_id: &str, tag: &str) -> bool {
        let cleaned = clean_tag(tag);
        if cleaned.is_empty() {
            return false;
        }
        self.retag(emoji_id, |tags| {
            if tags.contains(&cleaned) {
                false
            } else {
                tags.push(cleaned);
                true
            }
        })
    }

    pub fn remove_tag_from_emoji(&mut self, emoji_id: &str, tag: &str) -> bool {
        let cleaned = clean_tag(tag);
        self.retag(emoji_id, |tags| match tags.iter().position(|t| *t == cleaned) {
            Some(index) => {
                tags.remove(index);
                true
            }
            None => false,
        })
    }

    /// Replace all tags; empties are dropped
    pub fn set_emoji_tags<S: AsRef<str>>(&mut self, emoji_id: &str, tags: &[S]) -> bool {
        let cleaned = clean_tags(tags);
        self.retag(emoji_id, |tags| {
            *tags = cleaned;
            true
        })
    }

    /// Returns how many emojis actually gained the tag
    pub fn add_tag_to_multiple_emojis<S: AsRef<str>>(&mut self, emoji_ids: &[S], tag: &str) -> usize {
        if clean_tag(tag).is_empty() {
            return 0;
        }
        self.batch(|store| {
            let mut changed = 0;
            for id in emoji_ids {
                if store.add_tag_to_emoji(id.as_ref(), tag) {
                    changed += 1;
                }
            }
            changed
        })
    }

    pub fn remove_tag_from_multiple_emojis<S: AsRef<str>>(&mut self, emoji_ids: &[S], tag: &str) -> usize {
        self.batch(|store| {
            let mut changed = 0;
            for id in emoji_ids {
                if store.remove_tag_from_emoji(id.as_ref(), tag) {
                    changed += 1;
                }
            }
            changed
        })
    }

    pub fn emoji_tags(&self, emoji_id: &str) -> Vec<String> {
        self.find_emoji(emoji_id)
            .map(|e| e.tags.clone())
            .unwrap_or_default()
    }

    pub fn find_emojis_by_tag(&self, tag: &str) -> Vec<&Emoji> {
        let cleaned = clean_tag(tag);
        self.all_emojis()
            .filter(|e| e.tags.iter().any(|t| clean_tag(t) == cleaned))
            .collect()
    }

    /// Every distinct normalized tag, sorted
    pub fn all_tags(&self) -> BTreeSet<String> {
        self.all_emojis()
            .flat_map(|e| clean_tags(&e.tags))
            .collect()
    }

    /// Tag → number of emojis carrying it, computed from scratch
    pub fn tag_usage_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for tag in self.all_emojis().flat_map(|e| clean_tags(&e.tags)) {
            *counts.entry(tag).or_insert(0) += 1;
        }
        counts
    }

    // --- Filters (presentation state, never persisted) ---

    pub fn selected_tags(&self) -> &[String] {
        &self.selected_tags
    }

    pub fn set_selected_tags(&mut self, tags: Vec<String>) {
        self.selected_tags = tags;
    }

    pub fn toggle_tag_filter(&mut self, tag: &str) {
        match self.selected_tags.iter().position(|t| t == tag) {
            Some(index) => {
                self.selected_tags.remove(index);
            }
            None => self.selected_tags.push(tag.to_string()),
        }
    }

    pub fn clear_tag_filters(&mut self) {
        self.selected_tags.clear();
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn set_search_query(&mut self, query: &str) {
        self.search_query = query.to_string();
    }

    /// Active group's emojis narrowed by the selected tags (any match) and
    /// then by the search query (name or tag substring)
    pub fn filtered_emojis(&self) -> Vec<&Emoji> {
        let Some(group) = self.active_group() else {
            return Vec::new();
        };
        let selected = clean_tags(&self.selected_tags);
        let query = self.search_query.trim().to_lowercase();

        group
            .emojis
            .iter()
            .filter(|e| selected.is_empty() || e.tags.iter().any(|t| selected.contains(&clean_tag(t))))
            .filter(|e| {
                query.is_empty()
                    || e.name.to_lowercase().contains(&query)
                    || e.tags.iter().any(|t| t.to_lowercase().contains(&query))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::StoreCaches;
    use crate::config::StoreConfig;
    use crate::emoji_data::{EmojiDraft, EmojiPatch};
    use crate::store::EmojiStore;
    use crate::test_utils::{ManualClock, create_test_group, create_test_store};

    fn tagged_store() -> EmojiStore {
        let (mut store, _clock) = create_test_store();
        let mut group = create_test_group("g1", &["e1", "e2", "e3"]);
        group.emojis[0].tags = vec!["cat".to_string(), "cute".to_string()];
        group.emojis[1].tags = vec!["dog".to_string(), "cute".to_string()];
        store.hydrate(vec![group], Vec::new());
        store
    }

    #[test]
    fn test_add_tag_normalizes_and_guards() {
        let mut store = tagged_store();

        assert!(store.add_tag_to_emoji("e3", "  Happy "));
        assert!(!store.add_tag_to_emoji("e3", "happy"));
        assert!(!store.add_tag_to_emoji("e3", "   "));
        assert!(!store.add_tag_to_emoji("missing", "x"));

        assert_eq!(store.emoji_tags("e3"), vec!["happy".to_string()]);
        assert!(store.save_control().dirty().groups.contains("g1"));
    }

    #[test]
    fn test_remove_and_set_tags() {
        let mut store = tagged_store();

        assert!(store.remove_tag_from_emoji("e1", "CAT"));
        assert!(!store.remove_tag_from_emoji("e1", "cat"));
        assert!(store.set_emoji_tags("e2", &["A", "", " b "]));

        assert_eq!(store.emoji_tags("e1"), vec!["cute".to_string()]);
        assert_eq!(store.emoji_tags("e2"), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_multi_emoji_tagging_counts_changes() {
        let (mut store, clock) = create_test_store();
        store.hydrate(vec![create_test_group("g1", &["e1", "e2", "e3"])], Vec::new());
        store.add_tag_to_emoji("e1", "x");

        assert_eq!(store.add_tag_to_multiple_emojis(&["e1", "e2", "e3", "nope"], "X"), 2);
        assert_eq!(store.next_flush_at(), Some(clock.now()));
        assert_eq!(store.remove_tag_from_multiple_emojis(&["e1", "e2"], "x"), 2);
        assert_eq!(store.add_tag_to_multiple_emojis(&["e1"], " "), 0);
    }

    #[test]
    fn test_all_tags_and_counts() {
        let store = tagged_store();

        let tags: Vec<String> = store.all_tags().into_iter().collect();
        assert_eq!(tags, vec!["cat", "cute", "dog"]);

        let counts = store.tag_usage_counts();
        assert_eq!(counts["cute"], 2);
        assert_eq!(counts["cat"], 1);
        assert_eq!(store.find_emojis_by_tag("Cute").len(), 2);
    }

    #[test]
    fn test_tag_filters() {
        let mut store = tagged_store();

        store.toggle_tag_filter("dog");
        let ids: Vec<&str> = store.filtered_emojis().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e2"]);

        store.toggle_tag_filter("cat");
        assert_eq!(store.filtered_emojis().len(), 2);

        store.toggle_tag_filter("dog");
        assert_eq!(store.selected_tags(), &["cat".to_string()]);

        store.clear_tag_filters();
        store.set_search_query("E3");
        let ids: Vec<&str> = store.filtered_emojis().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e3"]);

        store.set_search_query("");
        store.set_selected_tags(vec!["cute".to_string()]);
        assert_eq!(store.filtered_emojis().len(), 2);
    }

    #[test]
    fn test_incremental_tag_counts_match_recomputation() {
        let clock = ManualClock::new(0);
        let mut store = EmojiStore::with_parts(StoreConfig::default(), StoreCaches::default(), clock);
        store.hydrate(vec![create_test_group("g1", &["e1", "e2"])], Vec::new());
        let groups = store.groups().to_vec();
        store.hooks_mut().tags.rebuild(&groups);

        let mut draft = EmojiDraft::new("https://x/n.png", "new");
        draft.tags = vec!["cute".to_string(), "fresh".to_string()];
        let added = store.add_emoji("g1", draft).unwrap();
        store.add_tag_to_emoji("e1", "cute");
        store.add_tag_to_multiple_emojis(&["e1", "e2"], "dog");
        store.remove_tag_from_emoji("e2", "dog");
        store.update_emoji(
            &added.id,
            &EmojiPatch {
                tags: Some(vec!["fresh".to_string()]),
                ..EmojiPatch::default()
            },
        );
        store.delete_emoji("e1");

        assert!(store.hooks().tags.is_valid());
        let expected = store.tag_usage_counts();
        let groups = store.groups().to_vec();
        assert_eq!(store.hooks_mut().tags.counts(&groups), &expected);
    }
}
