//! # wotero_core
//!
//! Keeps a Wolai database in sync with a reference library. Library changes
//! are filtered, coalesced behind a debounce window, and written out by a
//! single sync pass at a time.
//!
//! ## Features
//!
//! - **Event Filtering**: Turns change notifications and manual requests into the records worth syncing
//! - **Debounced Coalescing**: Bursts of changes collapse into one batch once the library goes quiet
//! - **Single-flight Sync**: At most one pass runs at a time, so a record is never created twice remotely
//! - **Failure Isolation**: A failing record is reported and skipped; the rest of the batch still syncs
//! - **Link Attachments**: Each synced record keeps exactly one link back to its remote page
//! - **Robust Error Handling**: Comprehensive error types with automatic conversions
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wotero_core::domain::NotifierId;
//! use wotero_core::notifier::EventBus;
//! use wotero_core::prefs::PrefStore;
//! use wotero_core::sync::{SyncService, TracingProgress};
//! use wotero_core::wolai::WolaiConnector;
//! # use wotero_core::library::Library;
//!
//! # async fn run(library: Arc<dyn Library>) -> Result<(), Box<dyn std::error::Error>> {
//! let events = Arc::new(EventBus::default());
//! let prefs = Arc::new(PrefStore::open_default()?);
//!
//! let mut service = SyncService::create(
//!     events.clone(),
//!     library,
//!     prefs,
//!     Arc::new(WolaiConnector::new()),
//!     Arc::new(TracingProgress),
//! );
//! service.startup()?;
//!
//! // Forward host notifications as they arrive
//! events.emit_raw("item.modify", &["42".parse::<NotifierId>()?]);
//!
//! service.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//!
//! - **[`domain`]**: Identifiers and plain record types
//! - **[`library`]**: Capability interfaces over the host library and the derived item view
//! - **[`notifier`]**: Change notifications and the event bus
//! - **[`prefs`]**: User preferences and their on-disk store
//! - **[`sync`]**: Filtering, coalescing, scheduling and running sync passes
//! - **[`wolai`]**: The remote note database client
//! - **[`error`]**: Unified error handling throughout the library
//!
//! ## Scheduling
//!
//! Every qualifying change restarts a debounce window (2 seconds by default).
//! When the window elapses without further changes, the pending batch is
//! handed to the runner, unless a pass is already executing. In that case
//! the batch waits and starts as soon as the current pass ends, with no
//! additional delay.
//!
//! ## Error Handling
//!
//! All fallible operations return typed errors that convert into the unified
//! [`WoteroError`], allowing the use of the `?` operator throughout.
//! Inside a sync pass, errors are caught at the boundary that owns the unit of
//! work: missing credentials or an unreachable schema abort the batch, while a
//! failure on one record only marks that record as failed.
//!
//! ```rust,no_run
//! use wotero_core::WoteroResult;
//! use wotero_core::prefs::{PrefStore, Prefs};
//!
//! fn enable_sync_on_modify(store: &PrefStore) -> WoteroResult<Prefs> {
//!     let mut prefs = store.load()?;
//!     prefs.sync_on_modify_items = true;
//!     store.save(&prefs)?;
//!     Ok(prefs)
//! }
//! ```

pub mod domain;
pub mod error;
pub mod library;
pub mod notifier;
pub mod prefs;
pub mod sync;
pub mod telemetry;
pub mod wolai;

/// Re-exports the most commonly used types for convenience.
pub use error::{WoteroError, WoteroResult};
