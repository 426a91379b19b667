/// `chrome.storage.local` adapter, reached through the `storage.js` bridge
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;

use crate::emoji_data::{EmojiGroup, GroupIndexEntry};
use crate::error::{StorageError, StorageResult};
use crate::storage::{PersistenceAdapter, keys};

#[wasm_bindgen(module = "/storage.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn getStorage(key: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn setStorage(key: &str, value: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn removeStorage(key: &str) -> Result<(), JsValue>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeStorageAdapter;

impl ChromeStorageAdapter {
    pub fn new() -> Self {
        ChromeStorageAdapter
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        let value = getStorage(key)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to read {}: {:?}", key, e)))?;
        if value.is_undefined() || value.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_wasm_bindgen::from_value(value)?))
    }

    async fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StorageResult<()> {
        let value = serde_wasm_bindgen::to_value(value)?;
        setStorage(key, value)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to write {}: {:?}", key, e)))
    }
}

#[async_trait(?Send)]
impl PersistenceAdapter for ChromeStorageAdapter {
    async fn get_emoji_group_index(&self) -> StorageResult<Vec<GroupIndexEntry>> {
        Ok(self.read(keys::GROUP_INDEX).await?.unwrap_or_default())
    }

    async fn set_emoji_group_index(&self, entries: &[GroupIndexEntry]) -> StorageResult<()> {
        self.write(keys::GROUP_INDEX, entries).await
    }

    async fn get_emoji_group(&self, group_id: &str) -> StorageResult<Option<EmojiGroup>> {
        self.read(&keys::group(group_id)).await
    }

    async fn set_emoji_group(&self, group_id: &str, group: &EmojiGroup) -> StorageResult<()> {
        self.write(&keys::group(group_id), group).await
    }

    async fn remove_emoji_group(&self, group_id: &str) -> StorageResult<()> {
        let key = keys::group(group_id);
        removeStorage(&key)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to remove {}: {:?}", key, e)))
    }

    async fn get_favorites(&self) -> StorageResult<Vec<String>> {
        Ok(self.read(keys::FAVORITES).await?.unwrap_or_default())
    }

    async fn set_favorites(&self, ids: &[String]) -> StorageResult<()> {
        self.write(keys::FAVORITES, ids).await
    }
}
