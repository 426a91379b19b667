/// Coalescing write scheduler: dirty tracking, batches and save debouncing
use std::collections::BTreeSet;

use log::{debug, warn};

/// Everything that must reach storage on the next flush
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirtySet {
    /// Groups whose content changed
    pub groups: BTreeSet<String>,
    /// Groups deleted from the store whose storage keys should go away
    pub removed: BTreeSet<String>,
    /// The favorites id list
    pub favorites: bool,
    /// The group index (membership or order changed)
    pub index: bool,
}

impl DirtySet {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.removed.is_empty() && !self.favorites && !self.index
    }

    /// Fold the keys of a failed flush back in. A group deleted after the
    /// flush started stays deleted, and a group re-created stays written.
    pub fn restore(&mut self, failed: DirtySet) {
        for id in failed.groups {
            if !self.removed.contains(&id) {
                self.groups.insert(id);
            }
        }
        for id in failed.removed {
            if !self.groups.contains(&id) {
                self.removed.insert(id);
            }
        }
        self.favorites |= failed.favorites;
        self.index |= failed.index;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    Idle,
    /// Saves are held until the outermost batch ends
    Batching { depth: u32, save_requested: bool },
    /// A flush is wanted once `due_at` (epoch ms) has passed
    PendingFlush { due_at: i64 },
}

#[derive(Debug, Clone)]
pub struct SaveControl {
    state: SaveState,
    dirty: DirtySet,
    debounce_ms: i64,
    in_flight: bool,
    favorites_only_requested: bool,
}

impl SaveControl {
    pub fn new(debounce_ms: i64) -> Self {
        SaveControl {
            state: SaveState::Idle,
            dirty: DirtySet::default(),
            debounce_ms: debounce_ms.max(0),
            in_flight: false,
            favorites_only_requested: false,
        }
    }

    pub fn state(&self) -> SaveState {
        self.state
    }

    pub fn dirty(&self) -> &DirtySet {
        &self.dirty
    }

    pub fn is_batching(&self) -> bool {
        matches!(self.state, SaveState::Batching { .. })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn mark_group_dirty(&mut self, group_id: &str) {
        self.dirty.removed.remove(group_id);
        self.dirty.groups.insert(group_id.to_string());
    }

    pub fn mark_group_removed(&mut self, group_id: &str) {
        self.dirty.groups.remove(group_id);
        self.dirty.removed.insert(group_id.to_string());
        self.dirty.index = true;
    }

    pub fn mark_favorites_dirty(&mut self) {
        self.dirty.favorites = true;
    }

    pub fn mark_index_dirty(&mut self) {
        self.dirty.index = true;
    }

    /// Nested batches are flattened: only the outermost `end_batch` counts
    pub fn begin_batch(&mut self) {
        self.state = match self.state {
            SaveState::Idle => SaveState::Batching {
                depth: 1,
                save_requested: false,
            },
            SaveState::PendingFlush { .. } => SaveState::Batching {
                depth: 1,
                save_requested: true,
            },
            SaveState::Batching {
                depth,
                save_requested,
            } => SaveState::Batching {
                depth: depth + 1,
                save_requested,
            },
        };
    }

    /// Leaving the outermost batch asks for exactly one immediate flush if
    /// anything was marked or requested inside it
    pub fn end_batch(&mut self, now: i64) {
        match self.state {
            SaveState::Batching {
                depth,
                save_requested,
            } if depth > 1 => {
                self.state = SaveState::Batching {
                    depth: depth - 1,
                    save_requested,
                };
            }
            SaveState::Batching { save_requested, .. } => {
                self.state = if save_requested || !self.dirty.is_empty() {
                    SaveState::PendingFlush { due_at: now }
                } else {
                    SaveState::Idle
                };
            }
            _ => warn!("[SaveControl] end_batch called outside of a batch"),
        }
    }

    /// Request a debounced flush; calls inside the window push the deadline
    pub fn maybe_save(&mut self, now: i64) {
        match &mut self.state {
            SaveState::Batching { save_requested, .. } => *save_requested = true,
            state => {
                *state = SaveState::PendingFlush {
                    due_at: now + self.debounce_ms,
                };
            }
        }
    }

    /// Request a flush that skips the debounce window
    pub fn request_immediate(&mut self, now: i64) {
        match &mut self.state {
            SaveState::Batching { save_requested, .. } => *save_requested = true,
            state => *state = SaveState::PendingFlush { due_at: now },
        }
    }

    pub fn next_flush_at(&self) -> Option<i64> {
        match self.state {
            SaveState::PendingFlush { due_at } => Some(due_at),
            _ => None,
        }
    }

    pub fn is_flush_due(&self, now: i64) -> bool {
        self.next_flush_at().is_some_and(|due_at| now >= due_at)
    }

    /// Start a flush by moving the dirty set out. Marks made while the flush
    /// is in flight collect in a fresh set. `force` ignores the deadline but
    /// never breaks into a batch. A forced request that meets an in-flight
    /// flush is kept as an immediate deadline for the next one.
    pub fn begin_flush(&mut self, now: i64, force: bool) -> Option<DirtySet> {
        if self.in_flight {
            debug!("[SaveControl] flush already in flight, deferring");
            if force {
                self.request_immediate(now);
            }
            return None;
        }
        if let SaveState::Batching { save_requested, .. } = &mut self.state {
            *save_requested = true;
            return None;
        }
        if !force && !self.is_flush_due(now) {
            return None;
        }

        self.state = SaveState::Idle;
        if self.dirty.is_empty() {
            return None;
        }
        self.in_flight = true;
        Some(std::mem::take(&mut self.dirty))
    }

    /// Close the in-flight flush, keeping the markers of failed writes
    pub fn finish_flush(&mut self, failed: DirtySet) {
        self.in_flight = false;
        if !failed.is_empty() {
            self.dirty.restore(failed);
        }
    }

    pub fn request_favorites_only(&mut self) {
        self.favorites_only_requested = true;
    }

    pub fn favorites_only_requested(&self) -> bool {
        self.favorites_only_requested
    }

    pub fn take_favorites_only_request(&mut self) -> bool {
        std::mem::take(&mut self.favorites_only_requested)
    }
}
