/// The emoji collection store: one owned group list with the group, emoji,
/// favorites and tag operations implemented over it in sibling modules
mod emojis;
mod favorites;
mod groups;
mod search;
mod tags;

use std::collections::BTreeSet;
use std::rc::Rc;

use log::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::emoji_data::{EmojiGroup, FAVORITES_GROUP_ID, GroupIndexEntry};
use crate::error::{StoreError, StoreResult};
use crate::hooks::{CacheHooks, NoopHooks};
use crate::normalize::normalize_image_url;
use crate::persist::{FavoritesOnlyPlan, FlushOutcome, FlushPlan, FlushReport};
use crate::save_control::SaveControl;
use crate::storage::StoredCollection;

pub use emojis::DuplicateRemoval;
pub use favorites::{FAVORITES_DECAY_FACTOR, FAVORITES_DECAY_WINDOW_MS};

pub struct EmojiStore<H: CacheHooks = NoopHooks> {
    groups: Vec<EmojiGroup>,
    /// Secondary id set behind toggle-style favorite buttons
    favorites: BTreeSet<String>,
    active_group_id: String,
    selected_tags: Vec<String>,
    search_query: String,
    save: SaveControl,
    hooks: H,
    clock: Rc<dyn Clock>,
    config: StoreConfig,
    is_loading: bool,
    has_loaded_once: bool,
    read_only: bool,
}

impl EmojiStore<NoopHooks> {
    pub fn new(config: StoreConfig) -> Self {
        EmojiStore::with_parts(config, NoopHooks, Rc::new(SystemClock))
    }
}

impl<H: CacheHooks> EmojiStore<H> {
    pub fn with_parts(config: StoreConfig, hooks: H, clock: Rc<dyn Clock>) -> Self {
        EmojiStore {
            groups: Vec::new(),
            favorites: BTreeSet::new(),
            active_group_id: config.default_group_id.clone(),
            selected_tags: Vec::new(),
            search_query: String::new(),
            save: SaveControl::new(config.debounce_ms),
            hooks,
            clock,
            read_only: config.read_only,
            config,
            is_loading: false,
            has_loaded_once: false,
        }
    }

    // --- State access ---

    pub fn groups(&self) -> &[EmojiGroup] {
        &self.groups
    }

    pub fn favorite_ids(&self) -> &BTreeSet<String> {
        &self.favorites
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    pub fn save_control(&self) -> &SaveControl {
        &self.save
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn has_loaded_once(&self) -> bool {
        self.has_loaded_once
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Popup and sidebar call this before loading
    pub fn set_read_only_mode(&mut self, read_only: bool) {
        self.read_only = read_only;
        info!(
            "[EmojiStore] Read-only mode: {}",
            if read_only { "enabled" } else { "disabled" }
        );
    }

    pub(crate) fn now(&self) -> i64 {
        self.clock.now_ms()
    }

    // --- Save control ---

    pub fn begin_batch(&mut self) {
        self.save.begin_batch();
    }

    pub fn end_batch(&mut self) {
        let now = self.now();
        self.save.end_batch(now);
    }

    /// Run `f` inside a batch; the batch always ends, even on early return
    pub fn batch<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.begin_batch();
        let result = f(self);
        self.end_batch();
        result
    }

    /// Request a debounced flush; a no-op in read-only mode
    pub fn maybe_save(&mut self) {
        if self.read_only {
            debug!("[EmojiStore] maybe_save blocked - read-only mode active");
            return;
        }
        let now = self.now();
        self.save.maybe_save(now);
    }

    pub(crate) fn request_immediate_save(&mut self) {
        if self.read_only {
            debug!("[EmojiStore] immediate save blocked - read-only mode active");
            return;
        }
        let now = self.now();
        self.save.request_immediate(now);
    }

    pub fn mark_group_dirty(&mut self, group_id: &str) {
        self.save.mark_group_dirty(group_id);
    }

    pub fn mark_favorites_dirty(&mut self) {
        self.save.mark_favorites_dirty();
    }

    /// Epoch ms at which a pending flush becomes due
    pub fn next_flush_at(&self) -> Option<i64> {
        self.save.next_flush_at()
    }

    pub fn is_flush_due(&self) -> bool {
        self.save.is_flush_due(self.now())
    }

    /// Capture everything dirty into a plan the caller executes against an
    /// adapter, then hands back to `settle_flush`.
    ///
    /// Returns `None` when there is nothing to write or writing is not
    /// allowed right now; a deferred request stays pending.
    pub fn prepare_flush(&mut self, force: bool) -> Option<FlushPlan> {
        if self.read_only {
            debug!("[EmojiStore] flush blocked - read-only mode active");
            return None;
        }
        if self.is_loading {
            debug!("[EmojiStore] flush deferred - still loading");
            return None;
        }
        if self.groups.is_empty() && !self.has_loaded_once {
            warn!("[EmojiStore] flush blocked - no groups and no successful load yet");
            return None;
        }

        let now = self.now();
        let dirty = self.save.begin_flush(now, force)?;

        let groups = self
            .groups
            .iter()
            .filter(|g| dirty.groups.contains(&g.id))
            .cloned()
            .collect();
        let index = dirty.index.then(|| self.group_index());
        let favorites = dirty
            .favorites
            .then(|| self.favorites.iter().cloned().collect());

        Some(FlushPlan {
            groups,
            removed: dirty.removed.iter().cloned().collect(),
            index,
            favorites,
            dirty,
        })
    }

    pub fn settle_flush(&mut self, outcome: FlushOutcome) -> StoreResult<FlushReport> {
        let FlushOutcome {
            report,
            failed,
            errors,
        } = outcome;
        let result = if failed.is_empty() {
            debug!("[EmojiStore] flush settled: {:?}", report);
            Ok(report)
        } else {
            Err(StoreError::FlushIncomplete {
                groups: failed.groups.iter().cloned().collect(),
                favorites: failed.favorites,
                index: failed.index,
                message: errors.join("; "),
            })
        };
        self.save.finish_flush(failed);
        result
    }

    /// Claim a pending favorites-only save request
    pub fn take_favorites_only_request(&mut self) -> bool {
        self.save.take_favorites_only_request()
    }

    /// Plan for the favorites-only save used by read-only contexts
    pub fn prepare_favorites_only(&mut self) -> Option<FavoritesOnlyPlan> {
        self.save.take_favorites_only_request();
        if !self.has_loaded_once {
            warn!("[FavoritesStore] saveFavoritesOnly blocked - data not loaded yet");
            return None;
        }
        if self.is_loading {
            warn!("[FavoritesStore] saveFavoritesOnly blocked - still loading");
            return None;
        }
        let index = self.ensure_favorites_group_index();
        Some(FavoritesOnlyPlan {
            group: self.groups[index].clone(),
        })
    }

    /// The persisted index: every group with its array position as order
    pub fn group_index(&self) -> Vec<GroupIndexEntry> {
        self.groups
            .iter()
            .enumerate()
            .map(|(order, g)| GroupIndexEntry {
                id: g.id.clone(),
                order: order as u32,
            })
            .collect()
    }

    // --- Loading ---

    pub fn begin_load(&mut self) {
        self.is_loading = true;
    }

    /// Finish a load started with `begin_load`. On failure the store keeps
    /// what it had and `has_loaded_once` is left untouched.
    pub fn finish_load(&mut self, loaded: StoreResult<StoredCollection>) -> StoreResult<()> {
        self.is_loading = false;
        let stored = loaded?;
        self.hydrate(stored.groups, stored.favorites);
        Ok(())
    }

    /// Replace the in-memory state with data read from storage
    pub fn hydrate(&mut self, groups: Vec<EmojiGroup>, favorites: Vec<String>) {
        self.groups = groups;
        for group in &mut self.groups {
            if let Some(icon) = normalize_stored(&group.icon) {
                group.icon = icon;
            }
            for emoji in &mut group.emojis {
                if let Some(url) = normalize_stored(&emoji.url) {
                    emoji.url = url;
                }
                if let Some(display_url) = emoji.display_url.as_deref().and_then(normalize_stored) {
                    emoji.display_url = Some(display_url);
                }
            }
        }
        self.favorites = favorites.into_iter().collect();

        if !self.has_group(&self.active_group_id) {
            self.active_group_id = self
                .groups
                .iter()
                .find(|g| g.id == self.config.default_group_id)
                .or_else(|| self.groups.iter().find(|g| g.id != FAVORITES_GROUP_ID))
                .map(|g| g.id.clone())
                .unwrap_or_else(|| self.config.default_group_id.clone());
        }

        self.hooks.invalidate_tag_cache();
        self.hooks.invalidate_search_index();
        self.is_loading = false;
        self.has_loaded_once = true;
        info!(
            "[EmojiStore] loaded {} group(s), {} favorite id(s)",
            self.groups.len(),
            self.favorites.len()
        );
    }

    // --- Lookup helpers shared by the sub-stores ---

    pub(crate) fn group_position(&self, group_id: &str) -> Option<usize> {
        self.groups.iter().position(|g| g.id == group_id)
    }

    /// (group position, emoji position) of an emoji id
    pub(crate) fn locate_emoji(&self, emoji_id: &str) -> Option<(usize, usize)> {
        self.groups.iter().enumerate().find_map(|(gi, g)| {
            g.position_of(emoji_id).map(|ei| (gi, ei))
        })
    }
}

/// Only image-looking values are rewritten; icons are often plain emoji
fn normalize_stored(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") || trimmed.starts_with("//") {
        normalize_image_url(trimmed)
    } else {
        None
    }
}
