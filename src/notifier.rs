//! Change notifications and the event bus that carries them.

use crate::domain::{CollectionId, NotifierId, RecordId, TagId};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A library change notification, parsed from the host notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierEvent {
    /// Records were filed into collections.
    CollectionItemAdded(Vec<(CollectionId, RecordId)>),
    CollectionDeleted(Vec<CollectionId>),
    CollectionModified(Vec<CollectionId>),
    ItemModified(Vec<RecordId>),
    ItemTagModified(Vec<(RecordId, TagId)>),
    ItemTagRemoved(Vec<(RecordId, TagId)>),
    /// Any other notification kind. Never triggers a sync.
    Other(String),
}

impl NotifierEvent {
    /// Parses a raw notification of the form `"<object>.<event>"`.
    ///
    /// Identifiers that do not have the shape the kind requires are skipped
    /// with a warning.
    pub fn from_raw(kind: &str, ids: &[NotifierId]) -> Self {
        match kind {
            "collection-item.add" => {
                NotifierEvent::CollectionItemAdded(pairs(kind, ids, |a, b| {
                    (CollectionId(a), RecordId(b))
                }))
            }
            "collection.delete" => NotifierEvent::CollectionDeleted(plain(kind, ids, CollectionId)),
            "collection.modify" => NotifierEvent::CollectionModified(plain(kind, ids, CollectionId)),
            "item.modify" => NotifierEvent::ItemModified(plain(kind, ids, RecordId)),
            "item-tag.modify" => {
                NotifierEvent::ItemTagModified(pairs(kind, ids, |a, b| (RecordId(a), TagId(b))))
            }
            "item-tag.remove" => {
                NotifierEvent::ItemTagRemoved(pairs(kind, ids, |a, b| (RecordId(a), TagId(b))))
            }
            other => NotifierEvent::Other(other.to_string()),
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            NotifierEvent::CollectionItemAdded(_) => "collection-item.add",
            NotifierEvent::CollectionDeleted(_) => "collection.delete",
            NotifierEvent::CollectionModified(_) => "collection.modify",
            NotifierEvent::ItemModified(_) => "item.modify",
            NotifierEvent::ItemTagModified(_) => "item-tag.modify",
            NotifierEvent::ItemTagRemoved(_) => "item-tag.remove",
            NotifierEvent::Other(kind) => kind,
        }
    }
}

fn plain<T>(kind: &str, ids: &[NotifierId], make: impl Fn(u64) -> T) -> Vec<T> {
    ids.iter()
        .filter_map(|id| match id {
            NotifierId::Plain(raw) => Some(make(*raw)),
            NotifierId::Compound(_) => {
                warn!(kind, id = %id, "expected a plain id");
                None
            }
        })
        .collect()
}

fn pairs<T>(kind: &str, ids: &[NotifierId], make: impl Fn(u64, u64) -> T) -> Vec<T> {
    ids.iter()
        .filter_map(|id| match (id.component(0), id.component(1)) {
            (Some(a), Some(b)) => Some(make(a, b)),
            _ => {
                warn!(kind, id = %id, "expected a compound id");
                None
            }
        })
        .collect()
}

/// Events the sync service listens for.
#[derive(Debug, Clone)]
pub enum WoteroEvent {
    Notifier(NotifierEvent),
    /// The user asked to sync every record in a collection.
    SyncCollection(CollectionId),
    /// The user asked to sync specific records.
    SyncItems(Vec<RecordId>),
}

/// Something the sync service can subscribe to.
///
/// Every subscriber gets its own unbounded channel, so a burst of events is
/// queued rather than dropped while the listener catches up.
pub trait EventSource: Send + Sync {
    fn subscribe(&self) -> mpsc::UnboundedReceiver<WoteroEvent>;
}

/// Event bus fanning library events out to every subscriber.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<WoteroEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `event` to every live subscriber.
    ///
    /// Subscribers whose receiver has been dropped are forgotten. No
    /// subscribers is fine: nothing is listening yet.
    pub fn emit(&self, event: WoteroEvent) {
        let mut subscribers = self.lock_subscribers();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Parses and emits a raw host notification.
    pub fn emit_raw(&self, kind: &str, ids: &[NotifierId]) {
        let event = NotifierEvent::from_raw(kind, ids);
        debug!(kind = event.kind(), "notification received");
        self.emit(WoteroEvent::Notifier(event));
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock_subscribers().len()
    }

    fn lock_subscribers(&self) -> MutexGuard<'_, Vec<mpsc::UnboundedSender<WoteroEvent>>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventSource for EventBus {
    fn subscribe(&self) -> mpsc::UnboundedReceiver<WoteroEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock_subscribers().push(tx);
        rx
    }
}
