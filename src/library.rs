//! Capability interfaces over the host reference library.
//!
//! The host application owns records, collections and attachments. This crate
//! only sees them through [`Library`] and [`ItemAdapter`], which keeps the
//! scheduling and sync logic testable without a running host.

pub mod item;
pub mod links;

use crate::domain::{Attachment, AttachmentId, CollectionId, Creator, LinkDraft, RecordId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub use item::WoteroItem;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("record {0} not found")]
    NotFound(RecordId),
    #[error("failed to save record {id}: {reason}")]
    Save { id: RecordId, reason: String },
    #[error("library error: {0}")]
    Other(String),
}

/// Lookup of records and collections in the host library.
pub trait Library: Send + Sync {
    /// Resolves a record, or `None` if it no longer exists.
    fn item(&self, id: RecordId) -> Option<Arc<dyn ItemAdapter>>;

    /// Every record filed in the collection, including its subcollections.
    fn collection_items(&self, id: CollectionId) -> Vec<Arc<dyn ItemAdapter>>;

    /// Records filed directly in the collection. Subcollections are not
    /// searched.
    fn child_items(&self, id: CollectionId) -> Vec<Arc<dyn ItemAdapter>>;

    /// The user's quick-copy citation style, if one is configured.
    fn quick_copy_format(&self) -> Option<String> {
        None
    }
}

/// Per-record getters and setters.
///
/// The write methods save without raising change notifications. A
/// notification fired between the tag write and the link write would find
/// the record still unlinked and enqueue it again, creating a second row.
#[async_trait]
pub trait ItemAdapter: Send + Sync {
    fn id(&self) -> RecordId;

    fn is_deleted(&self) -> bool;

    /// False for standalone notes and attachments.
    fn is_regular(&self) -> bool;

    fn collections(&self) -> Vec<CollectionId>;

    /// Child attachments in any order.
    fn attachments(&self) -> Vec<Attachment>;

    fn display_title(&self) -> String;

    /// Reads a raw item field such as `abstractNote`, `date`, `DOI` or `url`.
    fn field(&self, name: &str) -> Option<String>;

    fn creators(&self) -> Vec<Creator>;

    fn tags(&self) -> Vec<String>;

    fn item_type(&self) -> String;

    fn uri(&self) -> String;

    async fn citation(&self, format: &str, in_text: bool) -> Option<String>;

    async fn file_path(&self) -> Option<String>;

    /// Adds `tag` and saves. Must not raise a change notification.
    async fn add_tag(&self, tag: &str) -> Result<(), LibraryError>;

    /// Must not raise a change notification.
    async fn erase_attachments(&self, ids: &[AttachmentId]) -> Result<(), LibraryError>;

    /// Updates the attachment `existing` in place, or creates a new link
    /// attachment when `None`. Must not raise a change notification.
    async fn write_link_attachment(
        &self,
        existing: Option<AttachmentId>,
        link: &LinkDraft,
    ) -> Result<AttachmentId, LibraryError>;
}
