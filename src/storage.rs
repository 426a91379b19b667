/// Persistence adapter contract and an in-memory key/value implementation
use std::cell::RefCell;
use std::collections::HashMap;

use async_trait::async_trait;
use futures::future::join_all;
use log::warn;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::emoji_data::{EmojiGroup, GroupIndexEntry};
use crate::error::StorageResult;

/// Storage keys shared by every key/value backend
pub mod keys {
    pub const FAVORITES: &str = "favorites";
    pub const GROUP_INDEX: &str = "emojiGroupIndex";
    pub const GROUP_PREFIX: &str = "emojiGroup_";

    pub fn group(group_id: &str) -> String {
        format!("{}{}", GROUP_PREFIX, group_id)
    }
}

/// Key/value persistence used by the store.
///
/// No transactionality is assumed across calls: the group index and the
/// groups it lists are written separately, so the index may briefly lag.
#[async_trait(?Send)]
pub trait PersistenceAdapter {
    async fn get_emoji_group_index(&self) -> StorageResult<Vec<GroupIndexEntry>>;

    async fn set_emoji_group_index(&self, entries: &[GroupIndexEntry]) -> StorageResult<()>;

    async fn get_emoji_group(&self, group_id: &str) -> StorageResult<Option<EmojiGroup>>;

    async fn set_emoji_group(&self, group_id: &str, group: &EmojiGroup) -> StorageResult<()>;

    async fn remove_emoji_group(&self, group_id: &str) -> StorageResult<()>;

    async fn get_favorites(&self) -> StorageResult<Vec<String>>;

    async fn set_favorites(&self, ids: &[String]) -> StorageResult<()>;
}

/// What a full load reads back from storage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredCollection {
    pub groups: Vec<EmojiGroup>,
    pub favorites: Vec<String>,
}

/// Read every indexed group (in parallel) plus the favorites list.
///
/// Index order wins over the order stored inside each group. Index entries
/// whose group key is missing are skipped.
pub async fn read_collection<A: PersistenceAdapter + ?Sized>(
    adapter: &A,
) -> StorageResult<StoredCollection> {
    let index = adapter.get_emoji_group_index().await?;

    let reads = index.iter().map(|entry| async move {
        let group = adapter.get_emoji_group(&entry.id).await?;
        Ok::<_, crate::error::StorageError>(group.map(|mut g| {
            g.order = entry.order;
            g
        }))
    });

    let mut groups = Vec::with_capacity(index.len());
    for (entry, result) in index.iter().zip(join_all(reads).await) {
        match result? {
            Some(group) => groups.push(group),
            None => warn!("[Storage] index lists missing group {}", entry.id),
        }
    }
    groups.sort_by_key(|g| g.order);

    let favorites = adapter.get_favorites().await?;

    Ok(StoredCollection { groups, favorites })
}

/// Values are kept as JSON strings under the same keys the extension uses
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        MemoryAdapter::default()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        match self.entries.borrow().get(key) {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StorageResult<()> {
        let json = serde_json::to_string(value)?;
        self.entries.borrow_mut().insert(key.to_string(), json);
        Ok(())
    }
}

#[async_trait(?Send)]
impl PersistenceAdapter for MemoryAdapter {
    async fn get_emoji_group_index(&self) -> StorageResult<Vec<GroupIndexEntry>> {
        Ok(self.read(keys::GROUP_INDEX)?.unwrap_or_default())
    }

    async fn set_emoji_group_index(&self, entries: &[GroupIndexEntry]) -> StorageResult<()> {
        self.write(keys::GROUP_INDEX, entries)
    }

    async fn get_emoji_group(&self, group_id: &str) -> StorageResult<Option<EmojiGroup>> {
        self.read(&keys::group(group_id))
    }

    async fn set_emoji_group(&self, group_id: &str, group: &EmojiGroup) -> StorageResult<()> {
        self.write(&keys::group(group_id), group)
    }

    async fn remove_emoji_group(&self, group_id: &str) -> StorageResult<()> {
        self.entries.borrow_mut().remove(&keys::group(group_id));
        Ok(())
    }

    async fn get_favorites(&self) -> StorageResult<Vec<String>> {
        Ok(self.read(keys::FAVORITES)?.unwrap_or_default())
    }

    async fn set_favorites(&self, ids: &[String]) -> StorageResult<()> {
        self.write(keys::FAVORITES, ids)
    }
}
