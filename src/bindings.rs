/// JavaScript surface of the store for the options page and content scripts
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use js_sys::Promise;
use log::{debug, error, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, spawn_local};

use crate::cache::StoreCaches;
use crate::chrome_storage::ChromeStorageAdapter;
use crate::clock::SystemClock;
use crate::config::StoreConfig;
use crate::emoji_data::{DuplicateEntry, Emoji, EmojiDraft, EmojiPatch, GroupPatch};
use crate::error::StoreError;
use crate::persist::FlushReport;
use crate::storage::read_collection;
use crate::store::EmojiStore;

type SharedStore = Rc<RefCell<EmojiStore<StoreCaches>>>;

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&format!("Failed to serialize: {:?}", e)))
}

fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(|e| StoreError::from(e).into())
}

/// What the debounce timer needs to flush on its own
#[derive(Clone)]
struct FlushContext {
    store: SharedStore,
    adapter: Rc<ChromeStorageAdapter>,
    timer_armed: Rc<Cell<bool>>,
}

impl FlushContext {
    /// Arm a timer for the pending flush deadline, and kick off a
    /// favorites-only save if a read-only context asked for one
    fn schedule(&self) {
        let (favorites_only, delay) = {
            let mut store = self.store.borrow_mut();
            let delay = store.next_flush_at().map(|due_at| (due_at - store.now()).max(0));
            (store.take_favorites_only_request(), delay)
        };

        if favorites_only {
            let ctx = self.clone();
            spawn_local(async move {
                ctx.save_favorites_only().await;
            });
        }

        let Some(delay) = delay else {
            return;
        };
        if self.timer_armed.get() {
            return;
        }
        let Some(window) = web_sys::window() else {
            warn!("[SaveControl] no window, debounced save not scheduled");
            return;
        };

        let ctx = self.clone();
        let callback = Closure::once_into_js(move || spawn_local(ctx.run_due_flush()));
        self.timer_armed.set(true);
        let armed = window.set_timeout_with_callback_and_timeout_and_arguments_0(
            callback.unchecked_ref(),
            i32::try_from(delay).unwrap_or(i32::MAX),
        );
        if let Err(e) = armed {
            error!("[SaveControl] setTimeout failed: {:?}", e);
            self.timer_armed.set(false);
        }
    }

    async fn run_due_flush(self) {
        self.timer_armed.set(false);
        let plan = self.store.borrow_mut().prepare_flush(false);
        if let Some(plan) = plan {
            let outcome = plan.execute(self.adapter.as_ref()).await;
            match self.store.borrow_mut().settle_flush(outcome) {
                Ok(report) => debug!("[SaveControl] debounced flush done: {:?}", report),
                Err(err) => error!("[SaveControl] debounced flush failed: {}", err),
            }
        }
        // The deadline may have moved, or marks arrived while writing
        self.schedule();
    }

    async fn save_favorites_only(&self) -> bool {
        let plan = self.store.borrow_mut().prepare_favorites_only();
        let Some(plan) = plan else {
            return false;
        };
        match plan.execute(self.adapter.as_ref()).await {
            Ok(()) => true,
            Err(err) => {
                error!("[FavoritesStore] Failed to save favorites: {}", err);
                false
            }
        }
    }
}

#[wasm_bindgen]
pub struct EmojiStoreHandle {
    ctx: FlushContext,
}

impl EmojiStoreHandle {
    /// Run a mutation, then arm whatever save it asked for
    fn mutate<R>(&self, f: impl FnOnce(&mut EmojiStore<StoreCaches>) -> R) -> R {
        let result = f(&mut self.ctx.store.borrow_mut());
        self.ctx.schedule();
        result
    }

    fn read<R>(&self, f: impl FnOnce(&EmojiStore<StoreCaches>) -> R) -> R {
        f(&self.ctx.store.borrow())
    }
}

#[wasm_bindgen]
impl EmojiStoreHandle {
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<EmojiStoreHandle, JsValue> {
        let config: StoreConfig = if config.is_undefined() || config.is_null() {
            StoreConfig::default()
        } else {
            from_js(config)?
        };
        let store = EmojiStore::with_parts(config, StoreCaches::default(), Rc::new(SystemClock));
        Ok(EmojiStoreHandle {
            ctx: FlushContext {
                store: Rc::new(RefCell::new(store)),
                adapter: Rc::new(ChromeStorageAdapter::new()),
                timer_armed: Rc::new(Cell::new(false)),
            },
        })
    }

    // --- Persistence ---

    #[wasm_bindgen(js_name = loadData)]
    pub fn load_data(&self) -> Promise {
        let ctx = self.ctx.clone();
        future_to_promise(async move {
            ctx.store.borrow_mut().begin_load();
            let loaded = read_collection(ctx.adapter.as_ref()).await.map_err(StoreError::from);
            ctx.store.borrow_mut().finish_load(loaded)?;
            ctx.schedule();
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Write everything dirty now; rejects with the list of failed writes
    #[wasm_bindgen(js_name = saveData)]
    pub fn save_data(&self) -> Promise {
        let ctx = self.ctx.clone();
        future_to_promise(async move {
            let (in_flight, plan) = {
                let mut store = ctx.store.borrow_mut();
                (store.save_control().is_in_flight(), store.prepare_flush(true))
            };
            let report = match plan {
                Some(plan) => {
                    let outcome = plan.execute(ctx.adapter.as_ref()).await;
                    let settled = ctx.store.borrow_mut().settle_flush(outcome);
                    // Saves queued while this one was writing
                    ctx.schedule();
                    settled?
                }
                None => {
                    ctx.schedule();
                    FlushReport {
                        deferred: in_flight,
                        ..FlushReport::default()
                    }
                }
            };
            to_js(&report)
        })
    }

    #[wasm_bindgen(js_name = saveFavoritesOnly)]
    pub fn save_favorites_only(&self) -> Promise {
        let ctx = self.ctx.clone();
        future_to_promise(async move { Ok(JsValue::from_bool(ctx.save_favorites_only().await)) })
    }

    #[wasm_bindgen(js_name = setReadOnlyMode)]
    pub fn set_read_only_mode(&self, read_only: bool) {
        self.ctx.store.borrow_mut().set_read_only_mode(read_only);
    }

    #[wasm_bindgen(js_name = beginBatch)]
    pub fn begin_batch(&self) {
        self.ctx.store.borrow_mut().begin_batch();
    }

    #[wasm_bindgen(js_name = endBatch)]
    pub fn end_batch(&self) {
        self.mutate(|s| s.end_batch());
    }

    // --- Groups ---

    pub fn groups(&self) -> Result<JsValue, JsValue> {
        self.read(|s| to_js(&s.sorted_groups()))
    }

    #[wasm_bindgen(js_name = createGroup)]
    pub fn create_group(&self, name: &str, icon: &str, custom_id: Option<String>) -> Result<JsValue, JsValue> {
        let group = self.mutate(|s| s.create_group(name, icon, custom_id.as_deref()));
        to_js(&group)
    }

    #[wasm_bindgen(js_name = updateGroup)]
    pub fn update_group(&self, group_id: &str, patch: JsValue) -> Result<bool, JsValue> {
        let patch: GroupPatch = from_js(patch)?;
        Ok(self.mutate(|s| s.update_group(group_id, patch)))
    }

    #[wasm_bindgen(js_name = deleteGroup)]
    pub fn delete_group(&self, group_id: &str) -> bool {
        self.mutate(|s| s.delete_group(group_id))
    }

    #[wasm_bindgen(js_name = reorderGroups)]
    pub fn reorder_groups(&self, source_id: &str, target_id: &str) -> bool {
        self.mutate(|s| s.reorder_groups(source_id, target_id))
    }

    #[wasm_bindgen(js_name = setActiveGroup)]
    pub fn set_active_group(&self, group_id: &str) {
        self.ctx.store.borrow_mut().set_active_group_id(group_id);
    }

    // --- Emojis ---

    #[wasm_bindgen(js_name = addEmoji)]
    pub fn add_emoji(&self, group_id: &str, draft: JsValue) -> Result<JsValue, JsValue> {
        let draft: EmojiDraft = from_js(draft)?;
        let emoji = self.mutate(|s| s.add_emoji(group_id, draft));
        to_js(&emoji)
    }

    #[wasm_bindgen(js_name = updateEmoji)]
    pub fn update_emoji(&self, emoji_id: &str, patch: JsValue) -> Result<bool, JsValue> {
        let patch: EmojiPatch = from_js(patch)?;
        Ok(self.mutate(|s| s.update_emoji(emoji_id, &patch)).is_some())
    }

    #[wasm_bindgen(js_name = updateEmojiNames)]
    pub fn update_emoji_names(&self, names: JsValue) -> Result<u32, JsValue> {
        let names: HashMap<String, String> = from_js(names)?;
        Ok(self.mutate(|s| s.update_emoji_names(&names)) as u32)
    }

    #[wasm_bindgen(js_name = removeEmojiFromGroup)]
    pub fn remove_emoji_from_group(&self, group_id: &str, index: u32) -> bool {
        self.mutate(|s| s.remove_emoji_from_group(group_id, index as usize))
            .is_some()
    }

    #[wasm_bindgen(js_name = deleteEmoji)]
    pub fn delete_emoji(&self, emoji_id: &str) -> bool {
        self.mutate(|s| s.delete_emoji(emoji_id)).is_some()
    }

    /// A negative target index appends
    #[wasm_bindgen(js_name = moveEmoji)]
    pub fn move_emoji(&self, src_group: &str, src_index: u32, dst_group: &str, dst_index: i32) -> bool {
        let dst_index = usize::try_from(dst_index).unwrap_or(usize::MAX);
        self.mutate(|s| s.move_emoji(src_group, src_index as usize, dst_group, dst_index))
    }

    #[wasm_bindgen(js_name = dedupeGroup)]
    pub fn dedupe_group(&self, group_id: &str) -> u32 {
        self.mutate(|s| s.dedupe_group(group_id)) as u32
    }

    #[wasm_bindgen(js_name = dedupeGroupByName)]
    pub fn dedupe_group_by_name(&self, group_id: &str) -> u32 {
        self.mutate(|s| s.dedupe_group_by_name(group_id)) as u32
    }

    #[wasm_bindgen(js_name = removeDuplicatesAcrossGroups)]
    pub fn remove_duplicates_across_groups(&self, sets: JsValue, create_references: bool) -> Result<JsValue, JsValue> {
        let sets: Vec<Vec<DuplicateEntry>> = from_js(sets)?;
        let result = self.mutate(|s| s.remove_duplicates_across_groups(&sets, create_references));
        to_js(&result)
    }

    #[wasm_bindgen(js_name = resolveEmojiReference)]
    pub fn resolve_emoji_reference(&self, emoji: JsValue) -> Result<JsValue, JsValue> {
        let emoji: Emoji = from_js(emoji)?;
        self.read(|s| to_js(&s.resolve_emoji_reference(&emoji)))
    }

    #[wasm_bindgen(js_name = clearAllPerceptualHashes)]
    pub fn clear_all_perceptual_hashes(&self) -> u32 {
        self.mutate(|s| s.clear_all_perceptual_hashes()) as u32
    }

    // --- Favorites ---

    #[wasm_bindgen(js_name = addToFavorites)]
    pub fn add_to_favorites(&self, emoji: JsValue) -> Result<bool, JsValue> {
        let emoji: Emoji = from_js(emoji)?;
        Ok(self.mutate(|s| s.add_to_favorites(&emoji)))
    }

    #[wasm_bindgen(js_name = toggleFavorite)]
    pub fn toggle_favorite(&self, emoji_id: &str) -> bool {
        self.mutate(|s| s.toggle_favorite(emoji_id))
    }

    #[wasm_bindgen(js_name = removeFromFavorites)]
    pub fn remove_from_favorites(&self, emoji_id: &str) -> bool {
        self.mutate(|s| s.remove_from_favorites(emoji_id))
    }

    #[wasm_bindgen(js_name = clearAllFavorites)]
    pub fn clear_all_favorites(&self) -> bool {
        self.mutate(|s| s.clear_all_favorites())
    }

    #[wasm_bindgen(js_name = isFavorite)]
    pub fn is_favorite(&self, emoji_id: &str) -> bool {
        self.read(|s| s.is_favorite(emoji_id))
    }

    #[wasm_bindgen(js_name = favoriteEmojis)]
    pub fn favorite_emojis(&self) -> Result<JsValue, JsValue> {
        self.read(|s| to_js(&s.favorite_emojis()))
    }

    // --- Tags, filters and search ---

    #[wasm_bindgen(js_name = addTagToEmoji)]
    pub fn add_tag_to_emoji(&self, emoji_id: &str, tag: &str) -> bool {
        self.mutate(|s| s.add_tag_to_emoji(emoji_id, tag))
    }

    #[wasm_bindgen(js_name = removeTagFromEmoji)]
    pub fn remove_tag_from_emoji(&self, emoji_id: &str, tag: &str) -> bool {
        self.mutate(|s| s.remove_tag_from_emoji(emoji_id, tag))
    }

    #[wasm_bindgen(js_name = setEmojiTags)]
    pub fn set_emoji_tags(&self, emoji_id: &str, tags: Vec<String>) -> bool {
        self.mutate(|s| s.set_emoji_tags(emoji_id, &tags))
    }

    #[wasm_bindgen(js_name = addTagToMultipleEmojis)]
    pub fn add_tag_to_multiple_emojis(&self, emoji_ids: Vec<String>, tag: &str) -> u32 {
        self.mutate(|s| s.add_tag_to_multiple_emojis(&emoji_ids, tag)) as u32
    }

    #[wasm_bindgen(js_name = removeTagFromMultipleEmojis)]
    pub fn remove_tag_from_multiple_emojis(&self, emoji_ids: Vec<String>, tag: &str) -> u32 {
        self.mutate(|s| s.remove_tag_from_multiple_emojis(&emoji_ids, tag)) as u32
    }

    #[wasm_bindgen(js_name = allTags)]
    pub fn all_tags(&self) -> Result<JsValue, JsValue> {
        self.read(|s| to_js(&s.all_tags()))
    }

    #[wasm_bindgen(js_name = tagUsageCounts)]
    pub fn tag_usage_counts(&self) -> Result<JsValue, JsValue> {
        let counts: HashMap<String, usize> = self.ctx.store.borrow_mut().cached_tag_counts().into_iter().collect();
        to_js(&counts)
    }

    #[wasm_bindgen(js_name = toggleTagFilter)]
    pub fn toggle_tag_filter(&self, tag: &str) {
        self.ctx.store.borrow_mut().toggle_tag_filter(tag);
    }

    #[wasm_bindgen(js_name = setSelectedTags)]
    pub fn set_selected_tags(&self, tags: Vec<String>) {
        self.ctx.store.borrow_mut().set_selected_tags(tags);
    }

    #[wasm_bindgen(js_name = clearTagFilters)]
    pub fn clear_tag_filters(&self) {
        self.ctx.store.borrow_mut().clear_tag_filters();
    }

    #[wasm_bindgen(js_name = setSearchQuery)]
    pub fn set_search_query(&self, query: &str) {
        self.ctx.store.borrow_mut().set_search_query(query);
    }

    #[wasm_bindgen(js_name = filteredEmojis)]
    pub fn filtered_emojis(&self) -> Result<JsValue, JsValue> {
        self.read(|s| to_js(&s.filtered_emojis()))
    }

    pub fn search(&self, query: &str) -> Result<JsValue, JsValue> {
        let found = self.ctx.store.borrow_mut().search(query);
        to_js(&found)
    }
}
