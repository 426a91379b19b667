use log::{debug, info, warn};
use uuid::Uuid;

use super::EmojiStore;
use crate::emoji_data::{EmojiGroup, FAVORITES_GROUP_ID, GroupPatch};
use crate::hooks::CacheHooks;

impl<H: CacheHooks> EmojiStore<H> {
    /// Append a new group and request a save
    pub fn create_group(&mut self, name: &str, icon: &str, custom_id: Option<&str>) -> Option<EmojiGroup> {
        let group = self.create_group_without_save(name, icon, custom_id)?;
        self.maybe_save();
        Some(group)
    }

    /// Append a new group; the caller is expected to batch and save
    pub fn create_group_without_save(
        &mut self,
        name: &str,
        icon: &str,
        custom_id: Option<&str>,
    ) -> Option<EmojiGroup> {
        let id = match custom_id {
            Some(id) if self.has_group(id) => {
                warn!("[GroupStore] group id {} already exists, not creating", id);
                return None;
            }
            Some(id) => id.to_string(),
            None => format!("group-{}", Uuid::new_v4()),
        };

        let group = EmojiGroup::new(id, name.to_string(), icon.to_string(), self.groups.len() as u32);
        self.groups.push(group.clone());
        self.save.mark_group_dirty(&group.id);
        self.save.mark_index_dirty();
        debug!("[GroupStore] created group {} ({})", group.id, group.name);
        Some(group)
    }

    /// Merge name/icon/order into a group; unknown ids are ignored
    pub fn update_group(&mut self, group_id: &str, patch: GroupPatch) -> bool {
        let Some(group) = self.groups.iter_mut().find(|g| g.id == group_id) else {
            debug!("[GroupStore] update_group: unknown group {}", group_id);
            return false;
        };

        if let Some(name) = patch.name {
            group.name = name;
        }
        if let Some(icon) = patch.icon {
            group.icon = icon;
        }
        if let Some(order) = patch.order {
            group.order = order;
            self.save.mark_index_dirty();
        }
        self.save.mark_group_dirty(group_id);
        self.maybe_save();
        true
    }

    pub fn delete_group(&mut self, group_id: &str) -> bool {
        if group_id == FAVORITES_GROUP_ID {
            warn!("[GroupStore] Cannot delete system group: {}", group_id);
            return false;
        }
        let Some(position) = self.group_position(group_id) else {
            debug!("[GroupStore] delete_group: unknown group {}", group_id);
            return false;
        };

        let removed = self.groups.remove(position);
        if removed.emojis.iter().any(|e| self.favorites.contains(&e.id)) {
            for emoji in &removed.emojis {
                self.favorites.remove(&emoji.id);
            }
            self.save.mark_favorites_dirty();
        }
        self.hooks.invalidate_tag_cache();
        self.hooks.invalidate_search_index();
        self.save.mark_group_removed(group_id);

        if self.active_group_id == group_id {
            self.active_group_id = self
                .groups
                .first()
                .map(|g| g.id.clone())
                .unwrap_or_else(|| self.config.default_group_id.clone());
        }

        info!("[GroupStore] deleted group {} ({} emojis)", group_id, removed.emojis.len());
        self.maybe_save();
        true
    }

    /// Move `source_id` to the position of `target_id`.
    ///
    /// The favorites group is pinned: it can be neither source nor target.
    /// Every group gets its array index as `order` and the whole collection
    /// is saved right away.
    pub fn reorder_groups(&mut self, source_id: &str, target_id: &str) -> bool {
        if source_id == FAVORITES_GROUP_ID || target_id == FAVORITES_GROUP_ID {
            warn!("[GroupStore] Cannot reorder favorites group");
            return false;
        }
        let (Some(source), Some(target)) = (self.group_position(source_id), self.group_position(target_id)) else {
            debug!("[GroupStore] reorder_groups: unknown group {} or {}", source_id, target_id);
            return false;
        };

        let moved = self.groups.remove(source);
        let target = target.min(self.groups.len());
        self.groups.insert(target, moved);

        for (order, group) in self.groups.iter_mut().enumerate() {
            group.order = order as u32;
            self.save.mark_group_dirty(&group.id);
        }
        self.save.mark_index_dirty();
        self.request_immediate_save();
        true
    }

    pub fn find_group(&self, group_id: &str) -> Option<&EmojiGroup> {
        self.groups.iter().find(|g| g.id == group_id)
    }

    pub fn has_group(&self, group_id: &str) -> bool {
        self.groups.iter().any(|g| g.id == group_id)
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Favorites first, then by `order`
    pub fn sorted_groups(&self) -> Vec<&EmojiGroup> {
        let mut sorted: Vec<&EmojiGroup> = self.groups.iter().collect();
        sorted.sort_by_key(|g| (!g.is_favorites(), g.order));
        sorted
    }

    pub fn active_group_id(&self) -> &str {
        &self.active_group_id
    }

    /// The selected group, falling back to the first one
    pub fn active_group(&self) -> Option<&EmojiGroup> {
        self.find_group(&self.active_group_id)
            .or_else(|| self.groups.first())
    }

    pub fn set_active_group_id(&mut self, group_id: &str) {
        self.active_group_id = group_id.to_string();
    }
}

#[cfg(test)]
mod tests {
    use crate::emoji_data::GroupPatch;
    use crate::store::EmojiStore;
    use crate::test_utils::{create_test_group, create_test_store};

    fn ids_and_orders(store: &EmojiStore) -> Vec<(String, u32)> {
        store.groups().iter().map(|g| (g.id.clone(), g.order)).collect()
    }

    #[test]
    fn test_create_group_appends_with_order() {
        let (mut store, _clock) = create_test_store();
        store.create_group("Cats", "🐱", Some("g1"));
        let dogs = store.create_group("Dogs", "🐶", None).unwrap();

        assert_eq!(store.group_count(), 2);
        assert_eq!(dogs.order, 1);
        assert!(dogs.id.starts_with("group-"));
        assert!(store.save_control().dirty().index);
        assert!(store.next_flush_at().is_some());
    }

    #[test]
    fn test_create_group_rejects_existing_id() {
        let (mut store, _clock) = create_test_store();
        store.create_group("Cats", "🐱", Some("g1"));

        assert!(store.create_group("Other", "", Some("g1")).is_none());
        assert_eq!(store.group_count(), 1);
    }

    #[test]
    fn test_create_group_without_save_only_marks() {
        let (mut store, _clock) = create_test_store();
        store.create_group_without_save("Cats", "🐱", Some("g1"));

        assert!(store.save_control().dirty().groups.contains("g1"));
        assert_eq!(store.next_flush_at(), None);
    }

    #[test]
    fn test_update_group_merges_fields() {
        let (mut store, _clock) = create_test_store();
        store.create_group("Cats", "🐱", Some("g1"));

        let patch = GroupPatch {
            name: Some("Kittens".to_string()),
            ..GroupPatch::default()
        };
        assert!(store.update_group("g1", patch));
        assert!(!store.update_group("nope", GroupPatch::default()));

        let group = store.find_group("g1").unwrap();
        assert_eq!(group.name, "Kittens");
        assert_eq!(group.icon, "🐱");
    }

    #[test]
    fn test_delete_group_protects_favorites() {
        let (mut store, _clock) = create_test_store();
        store.ensure_favorites_group();

        assert!(!store.delete_group("favorites"));
        assert!(store.has_group("favorites"));
        assert!(!store.delete_group("missing"));
    }

    #[test]
    fn test_delete_active_group_falls_back() {
        let (mut store, _clock) = create_test_store();
        store.hydrate(vec![create_test_group("a", &[]), create_test_group("b", &[])], Vec::new());
        store.set_active_group_id("a");

        assert!(store.delete_group("a"));

        assert_eq!(store.active_group_id(), "b");
        assert!(store.save_control().dirty().removed.contains("a"));

        store.delete_group("b");
        assert_eq!(store.active_group_id(), "nachoneko");
    }

    #[test]
    fn test_reorder_groups_rewrites_order_and_saves_now() {
        let (mut store, clock) = create_test_store();
        store.hydrate(
            vec![
                create_test_group("a", &[]),
                create_test_group("b", &[]),
                create_test_group("c", &[]),
            ],
            Vec::new(),
        );

        assert!(store.reorder_groups("c", "a"));

        let ids: Vec<&str> = store.groups().iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        let orders: Vec<u32> = store.groups().iter().map(|g| g.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        assert_eq!(store.next_flush_at(), Some(clock.now()));
        assert_eq!(store.save_control().dirty().groups.len(), 3);
    }

    #[test]
    fn test_reorder_refuses_favorites() {
        let (mut store, _clock) = create_test_store();
        store.hydrate(vec![create_test_group("a", &[]), create_test_group("b", &[])], Vec::new());
        store.ensure_favorites_group();
        let before = ids_and_orders(&store);

        assert!(!store.reorder_groups("favorites", "b"));
        assert!(!store.reorder_groups("a", "favorites"));

        assert_eq!(ids_and_orders(&store), before);
    }

    #[test]
    fn test_sorted_groups_puts_favorites_first() {
        let (mut store, _clock) = create_test_store();
        let mut late = create_test_group("late", &[]);
        late.order = 5;
        let mut early = create_test_group("early", &[]);
        early.order = 1;
        store.hydrate(vec![late, early], Vec::new());
        store.ensure_favorites_group();
        store.update_group("favorites", GroupPatch { order: Some(9), ..GroupPatch::default() });

        let ids: Vec<&str> = store.sorted_groups().iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["favorites", "early", "late"]);
    }
}
