//! Smoke tests run in a browser with `wasm-pack test --headless --chrome`
#![cfg(target_arch = "wasm32")]

use emoji_hoard::persist::{load, save_data};
use emoji_hoard::{EmojiDraft, EmojiStore, MemoryAdapter, StoreConfig, normalize_image_url};
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn test_normalize_in_browser() {
    assert_eq!(
        normalize_image_url("http://www.example.com/a.png?x=1"),
        Some("https://example.com/a.png".to_string())
    );
}

#[wasm_bindgen_test]
async fn test_save_and_reload_with_browser_clock() {
    let adapter = MemoryAdapter::new();
    let mut store = EmojiStore::new(StoreConfig::default());
    load(&mut store, &adapter).await.unwrap();

    store.create_group("Cats", "🐱", Some("cats"));
    let emoji = store.add_emoji("cats", EmojiDraft::new("https://x/a.png", "a")).unwrap();
    assert!(emoji.added_at.unwrap() > 0);
    save_data(&mut store, &adapter).await.unwrap();

    let mut reloaded = EmojiStore::new(StoreConfig::default());
    load(&mut reloaded, &adapter).await.unwrap();
    assert_eq!(reloaded.find_emoji(&emoji.id).map(|e| e.name.as_str()), Some("a"));
}
