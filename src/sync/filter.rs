use crate::domain::{CollectionId, RecordId, RecordIds};
use crate::library::{Library, links};
use crate::notifier::{NotifierEvent, WoteroEvent};
use crate::prefs::Prefs;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Decides which records an event should sync.
#[derive(Clone)]
pub struct EventFilter {
    library: Arc<dyn Library>,
}

impl EventFilter {
    pub fn new(library: Arc<dyn Library>) -> Self {
        Self { library }
    }

    /// Record IDs to enqueue for `event`, given the current preferences.
    ///
    /// Notifications only sync records filed in a sync-enabled collection.
    /// Manual requests skip that requirement. A manual collection request
    /// covers the records filed directly in it, while a collection
    /// notification covers its subcollections too.
    pub fn ids_for_event(&self, event: &WoteroEvent, prefs: &Prefs) -> RecordIds {
        match event {
            WoteroEvent::Notifier(notification) => self.filter(
                notification,
                prefs.sync_on_modify_items,
                &prefs.synced_collections(),
            ),
            WoteroEvent::SyncCollection(id) => {
                let ids = self
                    .library
                    .child_items(*id)
                    .into_iter()
                    .filter(|item| item.is_regular())
                    .map(|item| item.id())
                    .collect();
                self.retain_syncable(ids, None)
            }
            WoteroEvent::SyncItems(ids) => {
                self.retain_syncable(ids.iter().copied().collect(), None)
            }
        }
    }

    /// Filters a change notification down to the records to sync.
    pub fn filter(
        &self,
        notification: &NotifierEvent,
        sync_on_modify: bool,
        synced_collections: &HashSet<CollectionId>,
    ) -> RecordIds {
        if synced_collections.is_empty() {
            return RecordIds::new();
        }

        let candidates = self.candidates(notification, sync_on_modify);
        self.retain_syncable(candidates, Some(synced_collections))
    }

    /// Record IDs a notification refers to, before any eligibility checks.
    ///
    /// Filing a record into a collection always counts. Every other kind only
    /// counts when `sync_on_modify` is enabled.
    pub fn candidates(&self, notification: &NotifierEvent, sync_on_modify: bool) -> RecordIds {
        if let NotifierEvent::CollectionItemAdded(pairs) = notification {
            return pairs.iter().map(|(_, item)| *item).collect();
        }

        if !sync_on_modify {
            return RecordIds::new();
        }

        match notification {
            NotifierEvent::CollectionDeleted(ids) | NotifierEvent::CollectionModified(ids) => {
                self.collection_item_ids(ids)
            }
            NotifierEvent::ItemModified(ids) => ids.iter().copied().collect(),
            NotifierEvent::ItemTagModified(pairs) | NotifierEvent::ItemTagRemoved(pairs) => {
                pairs.iter().map(|(item, _)| *item).collect()
            }
            NotifierEvent::CollectionItemAdded(_) | NotifierEvent::Other(_) => RecordIds::new(),
        }
    }

    /// Drops records that are gone, deleted, not regular items, already
    /// synced, or (when `required_collections` is set) outside every listed
    /// collection.
    pub fn retain_syncable(
        &self,
        ids: RecordIds,
        required_collections: Option<&HashSet<CollectionId>>,
    ) -> RecordIds {
        ids.into_iter()
            .filter(|id| self.is_syncable(*id, required_collections))
            .collect()
    }

    fn is_syncable(&self, id: RecordId, required_collections: Option<&HashSet<CollectionId>>) -> bool {
        let Some(item) = self.library.item(id) else {
            return false;
        };

        if item.is_deleted() || !item.is_regular() {
            return false;
        }

        if let Some(required) = required_collections {
            if !item.collections().iter().any(|c| required.contains(c)) {
                return false;
            }
        }

        if links::has_sync_link(item.as_ref()) {
            debug!(item_id = %id, "skipping already synced item");
            return false;
        }

        true
    }

    fn collection_item_ids(&self, collections: &[CollectionId]) -> RecordIds {
        collections
            .iter()
            .flat_map(|id| self.library.collection_items(*id))
            .filter(|item| item.is_regular())
            .map(|item| item.id())
            .collect()
    }
}
