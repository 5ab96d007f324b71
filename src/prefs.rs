//! User preferences consumed by the sync scheduler.
//!
//! Preferences are read-only from the scheduler's point of view. Every
//! filtering decision and every batch takes a fresh [`Prefs`] snapshot from a
//! [`PrefSource`], so changes made by the user apply to the next event without
//! restarting anything.

pub mod storage;

use crate::domain::CollectionId;
use crate::sync::SyncError;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use thiserror::Error;

pub use storage::PrefStore;

pub const DEFAULT_SYNC_DEBOUNCE_MS: u64 = 2000;

#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("config directory not found")]
    NoConfigDir,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid prefs file: {0}")]
    Decode(#[from] toml::de::Error),
    #[error("failed to encode prefs: {0}")]
    Encode(#[from] toml::ser::Error),
}

/// How the outbound page title is derived from a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PageTitleFormat {
    ItemAuthorDateCitation,
    ItemFullCitation,
    ItemInTextCitation,
    ItemShortTitle,
    #[default]
    ItemTitle,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSyncConfig {
    #[serde(default)]
    pub sync_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Prefs {
    pub sync_on_modify_items: bool,
    #[serde(deserialize_with = "lenient_title_format")]
    pub page_title_format: PageTitleFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wolai_token: Option<String>,
    #[serde(rename = "wolaiDatabaseID", skip_serializing_if = "Option::is_none")]
    pub wolai_database_id: Option<String>,
    pub sync_debounce_ms: u64,
    /// Keyed by collection ID.
    pub collection_sync_configs: BTreeMap<String, CollectionSyncConfig>,
}

impl Default for Prefs {
    fn default() -> Self {
        Prefs {
            sync_on_modify_items: false,
            page_title_format: PageTitleFormat::default(),
            wolai_token: None,
            wolai_database_id: None,
            sync_debounce_ms: DEFAULT_SYNC_DEBOUNCE_MS,
            collection_sync_configs: BTreeMap::new(),
        }
    }
}

/// Authentication and target for the note database.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Credentials {
    pub token: String,
    pub database_id: String,
}

impl Prefs {
    /// Collections the user enabled for sync.
    pub fn synced_collections(&self) -> HashSet<CollectionId> {
        self.collection_sync_configs
            .iter()
            .filter(|(_, config)| config.sync_enabled)
            .filter_map(|(id, _)| id.parse().ok())
            .collect()
    }

    pub fn set_collection_sync(&mut self, id: CollectionId, sync_enabled: bool) {
        self.collection_sync_configs
            .insert(id.to_string(), CollectionSyncConfig { sync_enabled });
    }

    pub fn sync_debounce(&self) -> Duration {
        Duration::from_millis(self.sync_debounce_ms)
    }

    /// Returns the credentials needed to reach the note database.
    ///
    /// Fails with [`SyncError::Configuration`] naming the first missing
    /// preference. Empty strings count as missing.
    pub fn credentials(&self) -> Result<Credentials, SyncError> {
        let token = non_empty(&self.wolai_token)
            .ok_or_else(|| SyncError::Configuration("Missing Wolai integration token".into()))?;
        let database_id = non_empty(&self.wolai_database_id)
            .ok_or_else(|| SyncError::Configuration("Missing Wolai database ID".into()))?;

        Ok(Credentials {
            token: token.to_string(),
            database_id: database_id.to_string(),
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn lenient_title_format<'de, D>(deserializer: D) -> Result<PageTitleFormat, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(PageTitleFormat::deserialize(serde::de::value::StrDeserializer::<D::Error>::new(&raw))
        .unwrap_or_default())
}

/// Supplies the current preferences.
pub trait PrefSource: Send + Sync {
    fn current(&self) -> Prefs;
}

/// Preferences held in memory by the embedding host.
#[derive(Debug, Default)]
pub struct MemoryPrefs {
    prefs: RwLock<Prefs>,
}

impl MemoryPrefs {
    pub fn new(prefs: Prefs) -> Self {
        MemoryPrefs {
            prefs: RwLock::new(prefs),
        }
    }

    /// Applies `f` to the stored preferences.
    pub fn update(&self, f: impl FnOnce(&mut Prefs)) {
        let mut prefs = self.prefs.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut prefs);
    }
}

impl PrefSource for MemoryPrefs {
    fn current(&self) -> Prefs {
        self.prefs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
