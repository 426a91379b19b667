/// Shared fixtures and mocks for the store tests
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use async_trait::async_trait;

use crate::clock::Clock;
use crate::config::StoreConfig;
use crate::emoji_data::{Emoji, EmojiGroup, GroupIndexEntry};
use crate::error::{StorageError, StorageResult};
use crate::hooks::NoopHooks;
use crate::storage::{MemoryAdapter, PersistenceAdapter, keys};
use crate::store::EmojiStore;

pub const TEST_START_MS: i64 = 1_700_000_000_000;

// ===== ManualClock =====

#[derive(Debug)]
pub struct ManualClock {
    now: Cell<i64>,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Rc<Self> {
        Rc::new(ManualClock {
            now: Cell::new(start_ms),
        })
    }

    pub fn now(&self) -> i64 {
        self.now.get()
    }

    pub fn advance(&self, ms: i64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.get()
    }
}

// ===== RecordingAdapter =====

/// Memory adapter that logs every call and fails calls touching chosen keys
pub struct RecordingAdapter {
    inner: MemoryAdapter,
    calls: RefCell<Vec<String>>,
    failing: RefCell<HashSet<String>>,
}

impl RecordingAdapter {
    pub fn new() -> Self {
        RecordingAdapter {
            inner: MemoryAdapter::new(),
            calls: RefCell::new(Vec::new()),
            failing: RefCell::new(HashSet::new()),
        }
    }

    pub fn fail_key(&self, key: &str) {
        self.failing.borrow_mut().insert(key.to_string());
    }

    pub fn clear_failures(&self) {
        self.failing.borrow_mut().clear();
    }

    pub fn count_calls(&self, call: &str) -> usize {
        self.calls.borrow().iter().filter(|c| *c == call).count()
    }

    fn record(&self, call: String, key: &str) -> StorageResult<()> {
        self.calls.borrow_mut().push(call);
        if self.failing.borrow().contains(key) {
            return Err(StorageError::Backend(format!("injected failure for {}", key)));
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl PersistenceAdapter for RecordingAdapter {
    async fn get_emoji_group_index(&self) -> StorageResult<Vec<GroupIndexEntry>> {
        self.record("get_emoji_group_index".to_string(), keys::GROUP_INDEX)?;
        self.inner.get_emoji_group_index().await
    }

    async fn set_emoji_group_index(&self, entries: &[GroupIndexEntry]) -> StorageResult<()> {
        self.record("set_emoji_group_index".to_string(), keys::GROUP_INDEX)?;
        self.inner.set_emoji_group_index(entries).await
    }

    async fn get_emoji_group(&self, group_id: &str) -> StorageResult<Option<EmojiGroup>> {
        self.record(format!("get_emoji_group:{}", group_id), &keys::group(group_id))?;
        self.inner.get_emoji_group(group_id).await
    }

    async fn set_emoji_group(&self, group_id: &str, group: &EmojiGroup) -> StorageResult<()> {
        self.record(format!("set_emoji_group:{}", group_id), &keys::group(group_id))?;
        self.inner.set_emoji_group(group_id, group).await
    }

    async fn remove_emoji_group(&self, group_id: &str) -> StorageResult<()> {
        self.record(format!("remove_emoji_group:{}", group_id), &keys::group(group_id))?;
        self.inner.remove_emoji_group(group_id).await
    }

    async fn get_favorites(&self) -> StorageResult<Vec<String>> {
        self.record("get_favorites".to_string(), keys::FAVORITES)?;
        self.inner.get_favorites().await
    }

    async fn set_favorites(&self, ids: &[String]) -> StorageResult<()> {
        self.record("set_favorites".to_string(), keys::FAVORITES)?;
        self.inner.set_favorites(ids).await
    }
}

// ===== Fixtures =====

pub fn create_test_emoji(id: &str, group_id: &str) -> Emoji {
    Emoji {
        id: id.to_string(),
        group_id: group_id.to_string(),
        url: format!("https://x/{}.png", id),
        name: id.to_string(),
        ..Emoji::default()
    }
}

pub fn create_test_group(id: &str, emoji_ids: &[&str]) -> EmojiGroup {
    let mut group = EmojiGroup::new(id.to_string(), id.to_uppercase(), "🙂".to_string(), 0);
    group.emojis = emoji_ids.iter().map(|e| create_test_emoji(e, id)).collect();
    group
}

/// An empty store that has already completed a load, on a manual clock
pub fn create_test_store() -> (EmojiStore, Rc<ManualClock>) {
    let clock = ManualClock::new(TEST_START_MS);
    let mut store = EmojiStore::with_parts(StoreConfig::default(), NoopHooks, clock.clone());
    store.hydrate(Vec::new(), Vec::new());
    (store, clock)
}
