/// Emoji Hoard - emoji collection store for the browser extension
/// Built with Rust + WASM

mod bindings;
pub mod cache;
mod chrome_storage;
pub mod clock;
pub mod config;
pub mod emoji_data;
pub mod error;
pub mod hooks;
pub mod normalize;
mod operations;
pub mod persist;
pub mod save_control;
pub mod storage;
pub mod store;

#[cfg(test)]
mod test_utils;

use wasm_bindgen::prelude::*;

pub use bindings::EmojiStoreHandle;
pub use cache::{SearchIndex, StoreCaches, TagCountCache};
pub use chrome_storage::ChromeStorageAdapter;
pub use config::StoreConfig;
pub use emoji_data::{Emoji, EmojiDraft, EmojiGroup, EmojiPatch, GroupPatch};
pub use error::{StorageError, StoreError};
pub use hooks::{CacheHooks, NoopHooks};
pub use storage::{MemoryAdapter, PersistenceAdapter};
pub use store::{DuplicateRemoval, EmojiStore};

// Set up panic hook and console logging for the extension pages
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Exposed for the content script's duplicate finder
#[wasm_bindgen(js_name = normalizeImageUrl)]
pub fn normalize_image_url(url: &str) -> Option<String> {
    normalize::normalize_image_url(url)
}
