//! Typed HTTP client for the Wolai open API.

use crate::domain::RemoteRecordRef;
use crate::prefs::Credentials;
use crate::wolai::{RecordFields, RemoteConnector, RemoteError, RemoteSyncClient, Schema};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://openapi.wolai.com";

// ── API types ───────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct DatabaseInfo {
    #[serde(default)]
    column_order: Vec<String>,
}

#[derive(Debug, Serialize)]
struct InsertRows<'a> {
    rows: [&'a RecordFields; 1],
}

// ── Client impl ─────────────────────────────────────

pub struct WolaiClient {
    base_url: String,
    credentials: Credentials,
    http: reqwest::Client,
    schema: OnceCell<Arc<Schema>>,
}

impl WolaiClient {
    pub fn new(credentials: Credentials) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, credentials, reqwest::Client::new())
    }

    pub fn with_base_url(base_url: &str, credentials: Credentials, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            http,
            schema: OnceCell::new(),
        }
    }

    pub fn database_url(&self) -> String {
        format!("{}/v1/databases/{}", self.base_url, self.credentials.database_id)
    }

    async fn read_body(resp: reqwest::Response) -> Result<String, RemoteError> {
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    async fn request_schema(&self) -> Result<Arc<Schema>, RemoteError> {
        debug!(database_id = %self.credentials.database_id, "fetching database schema");
        let resp = self
            .http
            .get(self.database_url())
            .header(reqwest::header::AUTHORIZATION, &self.credentials.token)
            .send()
            .await?;

        let body = Self::read_body(resp).await?;
        let envelope: Envelope<DatabaseInfo> = serde_json::from_str(&body)
            .map_err(|e| RemoteError::Payload(format!("database info: {e}")))?;

        let schema: Schema = envelope.data.column_order.into_iter().collect();
        info!(columns = schema.len(), "loaded database schema");
        Ok(Arc::new(schema))
    }
}

#[async_trait]
impl RemoteSyncClient for WolaiClient {
    async fn fetch_schema(&self) -> Result<Arc<Schema>, RemoteError> {
        self.schema
            .get_or_try_init(|| self.request_schema())
            .await
            .cloned()
    }

    async fn create_record(&self, fields: RecordFields) -> Result<RemoteRecordRef, RemoteError> {
        let resp = self
            .http
            .post(format!("{}/rows", self.database_url()))
            .header(reqwest::header::AUTHORIZATION, &self.credentials.token)
            .json(&InsertRows { rows: [&fields] })
            .send()
            .await?;

        let body = Self::read_body(resp).await?;
        let envelope: Envelope<Value> = serde_json::from_str(&body)
            .map_err(|e| RemoteError::Payload(format!("insert rows: {e}")))?;

        let web_url = match envelope.data {
            Value::String(url) => url,
            Value::Array(urls) => urls
                .into_iter()
                .find_map(|url| url.as_str().map(str::to_string))
                .ok_or_else(|| RemoteError::Payload("no row URL returned".into()))?,
            other => return Err(RemoteError::Payload(format!("unexpected row data: {other}"))),
        };

        Ok(RemoteRecordRef { web_url })
    }
}

/// Hands out [`WolaiClient`]s, reusing the last one (and its cached schema)
/// while the credentials stay the same.
pub struct WolaiConnector {
    base_url: String,
    http: reqwest::Client,
    last: Mutex<Option<(Credentials, Arc<WolaiClient>)>>,
}

impl WolaiConnector {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            http: reqwest::Client::new(),
            last: Mutex::new(None),
        }
    }
}

impl Default for WolaiConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteConnector for WolaiConnector {
    fn connect(&self, credentials: &Credentials) -> Arc<dyn RemoteSyncClient> {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some((cached, client)) = last.as_ref() {
            if cached == credentials {
                return client.clone();
            }
        }

        let client = Arc::new(WolaiClient::with_base_url(
            &self.base_url,
            credentials.clone(),
            self.http.clone(),
        ));
        *last = Some((credentials.clone(), client.clone()));
        client
    }
}
