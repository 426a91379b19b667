/// Derived caches kept in step with the store through `CacheHooks`
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::LazyLock;

use regex::Regex;

use crate::emoji_data::{Emoji, EmojiGroup};
use crate::hooks::CacheHooks;
use crate::normalize::clean_tag;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Lowercased name words plus lowercased tags
fn index_terms(emoji: &Emoji) -> Vec<String> {
    let name = emoji.name.to_lowercase();
    WHITESPACE
        .split(name.trim())
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .chain(emoji.tags.iter().map(|tag| tag.to_lowercase()))
        .collect()
}

#[derive(Debug, Default)]
struct TrieNode {
    children: HashMap<char, TrieNode>,
    emoji_ids: BTreeSet<String>,
}

impl TrieNode {
    fn insert(&mut self, word: &str, emoji_id: &str) {
        let mut node = self;
        for c in word.chars() {
            node = node.children.entry(c).or_default();
            node.emoji_ids.insert(emoji_id.to_string());
        }
    }

    fn prefixed(&self, prefix: &str) -> Option<&BTreeSet<String>> {
        let mut node = self;
        for c in prefix.chars() {
            node = node.children.get(&c)?;
        }
        Some(&node.emoji_ids)
    }
}

/// Term → emoji ids, with a prefix trie for type-ahead
///
/// Lookup order:
/// 1. Exact term match
/// 2. Prefix match through the trie
/// 3. Substring match over all terms
///
/// Removing from a trie is not supported, so removals drop the index to
/// invalid and the next search rebuilds it.
#[derive(Debug, Default)]
pub struct SearchIndex {
    terms: HashMap<String, BTreeSet<String>>,
    trie: TrieNode,
    valid: bool,
}

impl SearchIndex {
    pub fn new() -> Self {
        SearchIndex::default()
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn rebuild(&mut self, groups: &[EmojiGroup]) {
        self.terms.clear();
        self.trie = TrieNode::default();
        for emoji in groups.iter().flat_map(|g| g.emojis.iter()) {
            self.insert(emoji);
        }
        self.valid = true;
    }

    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    fn insert(&mut self, emoji: &Emoji) {
        for term in index_terms(emoji) {
            self.trie.insert(&term, &emoji.id);
            self.terms.entry(term).or_default().insert(emoji.id.clone());
        }
    }

    fn remove(&mut self, emoji: &Emoji) {
        for term in index_terms(emoji) {
            if let Some(ids) = self.terms.get_mut(&term) {
                ids.remove(&emoji.id);
                if ids.is_empty() {
                    self.terms.remove(&term);
                }
            }
        }
    }

    /// Matching emoji ids, or `None` when the index is stale or nothing matched
    pub fn search(&self, query: &str) -> Option<BTreeSet<String>> {
        let query = query.trim().to_lowercase();
        if query.is_empty() || !self.valid {
            return None;
        }

        if let Some(exact) = self.terms.get(&query) {
            return Some(exact.clone());
        }

        if let Some(prefixed) = self.trie.prefixed(&query).filter(|ids| !ids.is_empty()) {
            return Some(prefixed.clone());
        }

        let partial: BTreeSet<String> = self
            .terms
            .iter()
            .filter(|(term, _)| term.contains(&query))
            .flat_map(|(_, ids)| ids.iter().cloned())
            .collect();
        if partial.is_empty() { None } else { Some(partial) }
    }
}

impl CacheHooks for SearchIndex {
    fn on_emoji_added(&mut self, emoji: &Emoji) {
        if self.valid {
            self.insert(emoji);
        }
    }

    fn on_emoji_removed(&mut self, emoji: &Emoji) {
        if self.valid {
            self.remove(emoji);
            self.valid = false;
        }
    }

    fn on_emoji_updated(&mut self, old: &Emoji, new: &Emoji) {
        if self.valid {
            self.remove(old);
            self.insert(new);
            // The trie still lists the old terms
            if index_terms(old) != index_terms(new) {
                self.valid = false;
            }
        }
    }

    fn invalidate_search_index(&mut self) {
        self.valid = false;
    }
}

/// Incrementally maintained tag → usage count map
#[derive(Debug, Default)]
pub struct TagCountCache {
    counts: BTreeMap<String, usize>,
    valid: bool,
}

impl TagCountCache {
    pub fn new() -> Self {
        TagCountCache::default()
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn rebuild(&mut self, groups: &[EmojiGroup]) {
        self.counts.clear();
        self.valid = true;
        for emoji in groups.iter().flat_map(|g| g.emojis.iter()) {
            self.add(&emoji.tags);
        }
    }

    /// Current counts, rebuilt from `groups` first when invalidated
    pub fn counts(&mut self, groups: &[EmojiGroup]) -> &BTreeMap<String, usize> {
        if !self.valid {
            self.rebuild(groups);
        }
        &self.counts
    }

    fn add(&mut self, tags: &[String]) {
        for tag in tags.iter().map(|t| clean_tag(t)).filter(|t| !t.is_empty()) {
            *self.counts.entry(tag).or_insert(0) += 1;
        }
    }

    fn subtract(&mut self, tags: &[String]) {
        for tag in tags.iter().map(|t| clean_tag(t)).filter(|t| !t.is_empty()) {
            match self.counts.get_mut(&tag) {
                Some(count) if *count > 1 => *count -= 1,
                Some(_) => {
                    self.counts.remove(&tag);
                }
                // Counts disagree with the data, start over on next read
                None => self.valid = false,
            }
        }
    }
}

impl CacheHooks for TagCountCache {
    fn on_tags_added(&mut self, tags: &[String]) {
        if self.valid {
            self.add(tags);
        }
    }

    fn on_tags_removed(&mut self, tags: &[String]) {
        if self.valid {
            self.subtract(tags);
        }
    }

    fn invalidate_tag_cache(&mut self) {
        self.valid = false;
    }
}

/// Search index and tag counts together, as wired into the extension
#[derive(Debug, Default)]
pub struct StoreCaches {
    pub search: SearchIndex,
    pub tags: TagCountCache,
}

impl CacheHooks for StoreCaches {
    fn on_emoji_added(&mut self, emoji: &Emoji) {
        self.search.on_emoji_added(emoji);
    }

    fn on_emoji_removed(&mut self, emoji: &Emoji) {
        self.search.on_emoji_removed(emoji);
    }

    fn on_emoji_updated(&mut self, old: &Emoji, new: &Emoji) {
        self.search.on_emoji_updated(old, new);
    }

    fn on_tags_added(&mut self, tags: &[String]) {
        self.tags.on_tags_added(tags);
    }

    fn on_tags_removed(&mut self, tags: &[String]) {
        self.tags.on_tags_removed(tags);
    }

    fn invalidate_tag_cache(&mut self) {
        self.tags.invalidate_tag_cache();
    }

    fn invalidate_search_index(&mut self) {
        self.search.invalidate_search_index();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_emoji(id: &str, name: &str, tags: &[&str]) -> Emoji {
        Emoji {
            id: id.to_string(),
            group_id: "g1".to_string(),
            url: format!("https://x/{}.png", id),
            name: name.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Emoji::default()
        }
    }

    fn create_test_groups() -> Vec<EmojiGroup> {
        let mut group = EmojiGroup::new("g1".into(), "G1".into(), "".into(), 0);
        group.emojis = vec![
            create_test_emoji("e1", "Happy Cat", &["cute"]),
            create_test_emoji("e2", "sad dog", &["cute", "dog"]),
            create_test_emoji("e3", "catalog", &[]),
        ];
        vec![group]
    }

    #[test]
    fn test_search_exact_prefix_substring() {
        let mut index = SearchIndex::new();
        index.rebuild(&create_test_groups());

        let exact = index.search("cat").unwrap();
        assert_eq!(exact.into_iter().collect::<Vec<_>>(), vec!["e1"]);

        let prefix = index.search("ca").unwrap();
        assert!(prefix.contains("e1") && prefix.contains("e3"));

        let partial = index.search("og").unwrap();
        assert!(partial.contains("e2") && partial.contains("e3"));

        assert_eq!(index.search("zebra"), None);
        assert_eq!(index.search("  "), None);
    }

    #[test]
    fn test_search_index_incremental_add() {
        let mut index = SearchIndex::new();
        index.rebuild(&create_test_groups());

        index.on_emoji_added(&create_test_emoji("e4", "Parrot", &[]));

        assert!(index.search("parrot").unwrap().contains("e4"));
        assert!(index.search("par").unwrap().contains("e4"));
    }

    #[test]
    fn test_search_index_removal_invalidates() {
        let mut index = SearchIndex::new();
        let groups = create_test_groups();
        index.rebuild(&groups);

        index.on_emoji_removed(&groups[0].emojis[0]);

        assert!(!index.is_valid());
        assert_eq!(index.search("cat"), None);
    }

    #[test]
    fn test_tag_counts_match_rebuild() {
        let groups = create_test_groups();
        let mut cache = TagCountCache::new();
        cache.rebuild(&groups);

        cache.on_tags_added(&["Cute".to_string(), "new".to_string()]);
        cache.on_tags_removed(&["dog".to_string()]);

        let counts = cache.counts(&groups).clone();
        assert_eq!(counts.get("cute"), Some(&3));
        assert_eq!(counts.get("new"), Some(&1));
        assert_eq!(counts.get("dog"), None);
    }

    #[test]
    fn test_tag_cache_rebuilds_after_invalidate() {
        let groups = create_test_groups();
        let mut cache = TagCountCache::new();
        cache.rebuild(&groups);
        cache.invalidate_tag_cache();

        cache.on_tags_added(&["ignored".to_string()]);

        let counts = cache.counts(&groups);
        assert_eq!(counts.get("cute"), Some(&2));
        assert_eq!(counts.get("ignored"), None);
    }

    #[test]
    fn test_unknown_tag_removal_forces_rebuild() {
        let groups = create_test_groups();
        let mut cache = TagCountCache::new();
        cache.rebuild(&groups);

        cache.on_tags_removed(&["never-seen".to_string()]);

        assert!(!cache.is_valid());
        assert_eq!(cache.counts(&groups).get("dog"), Some(&1));
    }
}
