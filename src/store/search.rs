use super::EmojiStore;
use crate::cache::StoreCaches;
use crate::emoji_data::Emoji;

impl EmojiStore<StoreCaches> {
    /// Look up emojis by name word or tag, rebuilding the index if a
    /// mutation invalidated it
    pub fn search(&mut self, query: &str) -> Vec<Emoji> {
        if !self.hooks.search.is_valid() {
            self.hooks.search.rebuild(&self.groups);
        }
        let Some(ids) = self.hooks.search.search(query) else {
            return Vec::new();
        };
        self.all_emojis()
            .filter(|e| ids.contains(&e.id))
            .cloned()
            .collect()
    }

    /// Tag counts from the incremental cache
    pub fn cached_tag_counts(&mut self) -> Vec<(String, usize)> {
        let counts = self.hooks.tags.counts(&self.groups);
        counts.iter().map(|(tag, n)| (tag.clone(), *n)).collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::StoreCaches;
    use crate::config::StoreConfig;
    use crate::emoji_data::{EmojiDraft, EmojiPatch};
    use crate::store::EmojiStore;
    use crate::test_utils::{ManualClock, create_test_group};

    fn cached_store() -> EmojiStore<StoreCaches> {
        let mut store = EmojiStore::with_parts(StoreConfig::default(), StoreCaches::default(), ManualClock::new(0));
        let mut group = create_test_group("g1", &["e1", "e2"]);
        group.emojis[0].name = "Happy Cat".to_string();
        group.emojis[1].name = "grumpy dog".to_string();
        group.emojis[1].tags = vec!["angry".to_string()];
        store.hydrate(vec![group], Vec::new());
        store
    }

    fn names(found: &[crate::emoji_data::Emoji]) -> Vec<&str> {
        found.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_search_builds_index_lazily() {
        let mut store = cached_store();
        assert!(!store.hooks().search.is_valid());

        assert_eq!(names(&store.search("cat")), vec!["Happy Cat"]);
        assert!(store.hooks().search.is_valid());
        assert_eq!(names(&store.search("ang")), vec!["grumpy dog"]);
        assert!(store.search("").is_empty());
    }

    #[test]
    fn test_search_sees_added_and_renamed_emojis() {
        let mut store = cached_store();
        store.search("cat");

        store.add_emoji("g1", EmojiDraft::new("https://x/p.png", "Parrot"));
        assert_eq!(names(&store.search("parrot")), vec!["Parrot"]);

        store.update_emoji(
            "e1",
            &EmojiPatch {
                name: Some("Sleepy Cat".to_string()),
                ..EmojiPatch::default()
            },
        );
        assert!(store.search("happy").is_empty());
        assert_eq!(names(&store.search("sleepy")), vec!["Sleepy Cat"]);
    }

    #[test]
    fn test_search_after_delete() {
        let mut store = cached_store();
        store.search("cat");

        store.delete_emoji("e1");

        assert!(store.search("cat").is_empty());
    }

    #[test]
    fn test_cached_tag_counts() {
        let mut store = cached_store();
        store.add_tag_to_emoji("e1", "angry");

        assert_eq!(store.cached_tag_counts(), vec![("angry".to_string(), 2)]);
    }
}
