/// Cache maintenance callbacks invoked by every mutating store operation
use crate::emoji_data::Emoji;

/// Derived indexes (search, tag counts) listen through this trait.
///
/// Every method has a no-op default so the store can call hooks
/// unconditionally. Bulk paths call the `invalidate_*` methods instead of
/// the incremental ones.
pub trait CacheHooks {
    fn on_emoji_added(&mut self, _emoji: &Emoji) {}

    fn on_emoji_removed(&mut self, _emoji: &Emoji) {}

    fn on_emoji_updated(&mut self, _old: &Emoji, _new: &Emoji) {}

    fn on_tags_added(&mut self, _tags: &[String]) {}

    fn on_tags_removed(&mut self, _tags: &[String]) {}

    fn invalidate_tag_cache(&mut self) {}

    fn invalidate_search_index(&mut self) {}
}

/// Hooks for hosts that keep no derived caches
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl CacheHooks for NoopHooks {}
