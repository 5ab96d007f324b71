//! The remote note database.
//!
//! [`RemoteSyncClient`] is the capability the sync runner writes through;
//! [`client::WolaiClient`] implements it over the Wolai open API.

pub mod client;
pub mod properties;

use crate::domain::RemoteRecordRef;
use crate::prefs::Credentials;
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, LazyLock};
use thiserror::Error;

pub use client::{WolaiClient, WolaiConnector};
pub use properties::RecordBuilder;

pub const APP_URL_PROTOCOL: &str = "wolai:";

/// Maximum length of a text value accepted by the database.
pub const TEXT_CONTENT_MAX_LENGTH: usize = 2000;

static PAGE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{APP_URL_PROTOCOL}.+([0-9a-f]{{32}})$")).expect("valid regex")
});

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected response: {0}")]
    Payload(String),
}

/// Field names the target database declares.
pub type Schema = BTreeSet<String>;

/// Outbound field values keyed by field name.
pub type RecordFields = BTreeMap<String, Value>;

#[async_trait]
pub trait RemoteSyncClient: Send + Sync {
    /// Field names of the target database.
    ///
    /// Fetched once and cached for the lifetime of the client; a failed
    /// fetch is not cached.
    async fn fetch_schema(&self) -> Result<Arc<Schema>, RemoteError>;

    async fn create_record(&self, fields: RecordFields) -> Result<RemoteRecordRef, RemoteError>;
}

/// Builds a client for a set of credentials.
pub trait RemoteConnector: Send + Sync {
    fn connect(&self, credentials: &Credentials) -> Arc<dyn RemoteSyncClient>;
}

pub fn convert_web_url_to_app_url(url: &str) -> String {
    format!("{APP_URL_PROTOCOL}{url}")
}

/// Extracts the trailing 32-hex page ID from an app URL.
pub fn page_id_from_url(url: &str) -> Option<String> {
    PAGE_URL
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Truncates `text` to [`TEXT_CONTENT_MAX_LENGTH`] characters.
pub fn truncate_text(text: &str) -> String {
    text.chars().take(TEXT_CONTENT_MAX_LENGTH).collect()
}

/// Text value for a field; absent content becomes an empty string.
pub fn rich_text(content: Option<&str>) -> Value {
    Value::String(content.map(truncate_text).unwrap_or_default())
}
