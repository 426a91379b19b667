/// Flush plans and the async drivers that move store state to and from a
/// persistence adapter
use futures::future::join_all;
use log::{error, info, warn};
use serde::Serialize;

use crate::emoji_data::{EmojiGroup, FAVORITES_GROUP_ID, GroupIndexEntry};
use crate::error::{StorageResult, StoreError, StoreResult};
use crate::hooks::CacheHooks;
use crate::save_control::DirtySet;
use crate::storage::{PersistenceAdapter, read_collection};
use crate::store::EmojiStore;

/// Snapshot of everything one flush writes. Owns its data, so it can be
/// executed without holding on to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct FlushPlan {
    pub groups: Vec<EmojiGroup>,
    pub removed: Vec<String>,
    pub index: Option<Vec<GroupIndexEntry>>,
    pub favorites: Option<Vec<String>>,
    pub(crate) dirty: DirtySet,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlushReport {
    pub groups_written: usize,
    pub groups_removed: usize,
    pub index_written: bool,
    pub favorites_written: bool,
    /// Another flush held the store; the request is queued behind it and
    /// nothing was written by this call
    pub deferred: bool,
}

/// Result of executing a plan, handed back to `EmojiStore::settle_flush`
#[derive(Debug, Clone, Default)]
pub struct FlushOutcome {
    pub(crate) report: FlushReport,
    pub(crate) failed: DirtySet,
    pub(crate) errors: Vec<String>,
}

impl FlushOutcome {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

impl FlushPlan {
    pub fn dirty(&self) -> &DirtySet {
        &self.dirty
    }

    /// Write the plan: index, then groups in parallel, then removals, then
    /// favorites. Removals are best effort and never reported as failures.
    pub async fn execute<A: PersistenceAdapter + ?Sized>(self, adapter: &A) -> FlushOutcome {
        let mut outcome = FlushOutcome::default();

        if let Some(index) = &self.index {
            match adapter.set_emoji_group_index(index).await {
                Ok(()) => outcome.report.index_written = true,
                Err(err) => {
                    error!("[SaveControl] failed to write group index: {}", err);
                    outcome.failed.index = true;
                    outcome.errors.push(err.to_string());
                }
            }
        }

        let writes = self.groups.iter().map(|g| adapter.set_emoji_group(&g.id, g));
        for (group, result) in self.groups.iter().zip(join_all(writes).await) {
            match result {
                Ok(()) => outcome.report.groups_written += 1,
                Err(err) => {
                    error!("[SaveControl] failed to write group {}: {}", group.id, err);
                    outcome.failed.groups.insert(group.id.clone());
                    outcome.errors.push(err.to_string());
                }
            }
        }

        let removals = self.removed.iter().map(|id| adapter.remove_emoji_group(id));
        for (id, result) in self.removed.iter().zip(join_all(removals).await) {
            match result {
                Ok(()) => outcome.report.groups_removed += 1,
                Err(err) => warn!("[GroupStore] failed to remove group {} from storage: {}", id, err),
            }
        }

        if let Some(favorites) = &self.favorites {
            match adapter.set_favorites(favorites).await {
                Ok(()) => outcome.report.favorites_written = true,
                Err(err) => {
                    error!("[SaveControl] failed to write favorites: {}", err);
                    outcome.failed.favorites = true;
                    outcome.errors.push(err.to_string());
                }
            }
        }

        outcome
    }
}

/// The favorites group as read-only contexts persist it
#[derive(Debug, Clone, PartialEq)]
pub struct FavoritesOnlyPlan {
    pub group: EmojiGroup,
}

impl FavoritesOnlyPlan {
    pub async fn execute<A: PersistenceAdapter + ?Sized>(self, adapter: &A) -> StorageResult<()> {
        let index = adapter.get_emoji_group_index().await?;
        if !index.iter().any(|entry| entry.id == FAVORITES_GROUP_ID) {
            let with_favorites: Vec<GroupIndexEntry> = std::iter::once(GroupIndexEntry {
                id: FAVORITES_GROUP_ID.to_string(),
                order: 0,
            })
            .chain(index.into_iter().enumerate().map(|(i, entry)| GroupIndexEntry {
                order: i as u32 + 1,
                ..entry
            }))
            .collect();
            adapter.set_emoji_group_index(&with_favorites).await?;
            info!("[FavoritesStore] Added favorites to group index");
        }

        adapter.set_emoji_group(&self.group.id, &self.group).await?;

        let ids: Vec<String> = self
            .group
            .emojis
            .iter()
            .map(|e| e.id.clone())
            .filter(|id| !id.is_empty())
            .collect();
        adapter.set_favorites(&ids).await?;
        info!("[FavoritesStore] Favorites saved, ids: {}", ids.len());
        Ok(())
    }
}

/// Run one flush to completion. With `force` the debounce deadline is
/// ignored; batches and the read-only/loading guards still apply.
pub async fn flush<H, A>(store: &mut EmojiStore<H>, adapter: &A, force: bool) -> StoreResult<FlushReport>
where
    H: CacheHooks,
    A: PersistenceAdapter + ?Sized,
{
    let in_flight = store.save_control().is_in_flight();
    let Some(plan) = store.prepare_flush(force) else {
        return Ok(FlushReport {
            deferred: in_flight,
            ..FlushReport::default()
        });
    };
    let outcome = plan.execute(adapter).await;
    store.settle_flush(outcome)
}

/// Explicit save: writes everything dirty right away and reports failures.
/// While another flush is in flight the save is queued with an immediate
/// deadline and the report comes back with `deferred` set.
pub async fn save_data<H, A>(store: &mut EmojiStore<H>, adapter: &A) -> StoreResult<FlushReport>
where
    H: CacheHooks,
    A: PersistenceAdapter + ?Sized,
{
    flush(store, adapter, true).await
}

/// Flush only when the debounce deadline has passed
pub async fn flush_if_due<H, A>(store: &mut EmojiStore<H>, adapter: &A) -> StoreResult<FlushReport>
where
    H: CacheHooks,
    A: PersistenceAdapter + ?Sized,
{
    flush(store, adapter, false).await
}

/// Service whatever the store asked for: a favorites-only save requested
/// by a read-only context, then a due flush
pub async fn flush_pending<H, A>(store: &mut EmojiStore<H>, adapter: &A) -> StoreResult<FlushReport>
where
    H: CacheHooks,
    A: PersistenceAdapter + ?Sized,
{
    if store.save_control().favorites_only_requested() {
        save_favorites_only(store, adapter).await;
    }
    flush_if_due(store, adapter).await
}

/// Persist just the favorites group. Never fails loudly: errors are logged
/// and reported as `false`.
pub async fn save_favorites_only<H, A>(store: &mut EmojiStore<H>, adapter: &A) -> bool
where
    H: CacheHooks,
    A: PersistenceAdapter + ?Sized,
{
    let Some(plan) = store.prepare_favorites_only() else {
        return false;
    };
    match plan.execute(adapter).await {
        Ok(()) => true,
        Err(err) => {
            error!("[FavoritesStore] Failed to save favorites: {}", err);
            false
        }
    }
}

/// Read the whole collection and hydrate the store with it
pub async fn load<H, A>(store: &mut EmojiStore<H>, adapter: &A) -> StoreResult<()>
where
    H: CacheHooks,
    A: PersistenceAdapter + ?Sized,
{
    store.begin_load();
    let loaded = read_collection(adapter).await.map_err(StoreError::from);
    if let Err(err) = &loaded {
        error!("[EmojiStore] load failed: {}", err);
    }
    store.finish_load(loaded)
}
