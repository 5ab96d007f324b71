#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use wotero_core::domain::{
    Attachment, AttachmentId, CollectionId, Creator, CreatorRole, LinkDraft, RecordId, RecordIds,
    RemoteRecordRef,
};
use wotero_core::library::{ItemAdapter, Library, LibraryError};
use wotero_core::prefs::{Credentials, MemoryPrefs, Prefs};
use wotero_core::sync::{BatchReport, BatchRunner, ProgressReporter};
use wotero_core::wolai::{RecordFields, RemoteConnector, RemoteError, RemoteSyncClient, Schema};

pub fn ids(raw: &[u64]) -> RecordIds {
    raw.iter().copied().map(RecordId).collect()
}

pub fn prefs_with_credentials() -> Prefs {
    Prefs {
        wolai_token: Some("secret-token".to_string()),
        wolai_database_id: Some("db123".to_string()),
        ..Prefs::default()
    }
}

pub fn memory_prefs(prefs: Prefs) -> Arc<MemoryPrefs> {
    Arc::new(MemoryPrefs::new(prefs))
}

// ── Library fakes ───────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    AddTag,
    WriteLink,
}

pub struct FakeItem {
    pub id: RecordId,
    pub title: String,
    pub deleted: Mutex<bool>,
    pub regular: bool,
    pub collections: Mutex<Vec<CollectionId>>,
    pub attachments: Mutex<Vec<Attachment>>,
    pub tags: Mutex<Vec<String>>,
    pub fields: HashMap<String, String>,
    pub creators: Vec<Creator>,
    pub citations: HashMap<(String, bool), String>,
    pub citation_calls: AtomicUsize,
    pub fail_on: Option<FailPoint>,
    next_attachment: AtomicU64,
}

impl FakeItem {
    pub fn new(id: u64, title: &str) -> Self {
        FakeItem {
            id: RecordId(id),
            title: title.to_string(),
            deleted: Mutex::new(false),
            regular: true,
            collections: Mutex::new(Vec::new()),
            attachments: Mutex::new(Vec::new()),
            tags: Mutex::new(Vec::new()),
            fields: HashMap::new(),
            creators: Vec::new(),
            citations: HashMap::new(),
            citation_calls: AtomicUsize::new(0),
            fail_on: None,
            next_attachment: AtomicU64::new(id * 1000 + 1),
        }
    }

    pub fn in_collections(self, collections: &[u64]) -> Self {
        *self.collections.lock().unwrap() = collections.iter().copied().map(CollectionId).collect();
        self
    }

    pub fn non_regular(mut self) -> Self {
        self.regular = false;
        self
    }

    pub fn deleted(self) -> Self {
        *self.deleted.lock().unwrap() = true;
        self
    }

    pub fn with_field(mut self, name: &str, value: &str) -> Self {
        self.fields.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_creator(mut self, first: &str, last: &str, role: CreatorRole) -> Self {
        self.creators.push(Creator {
            first_name: first.to_string(),
            last_name: last.to_string(),
            role,
        });
        self
    }

    pub fn with_citation(mut self, format: &str, in_text: bool, citation: &str) -> Self {
        self.citations
            .insert((format.to_string(), in_text), citation.to_string());
        self
    }

    pub fn with_tags(self, tags: &[&str]) -> Self {
        *self.tags.lock().unwrap() = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_attachment(self, id: u64, title: &str, url: Option<&str>) -> Self {
        self.attachments.lock().unwrap().push(Attachment {
            id: AttachmentId(id),
            title: title.to_string(),
            url: url.map(str::to_string),
            note: String::new(),
        });
        self
    }

    pub fn failing_on(mut self, point: FailPoint) -> Self {
        self.fail_on = Some(point);
        self
    }

    pub fn attachment_list(&self) -> Vec<Attachment> {
        self.attachments.lock().unwrap().clone()
    }

    pub fn tag_list(&self) -> Vec<String> {
        self.tags.lock().unwrap().clone()
    }
}

#[async_trait]
impl ItemAdapter for FakeItem {
    fn id(&self) -> RecordId {
        self.id
    }

    fn is_deleted(&self) -> bool {
        *self.deleted.lock().unwrap()
    }

    fn is_regular(&self) -> bool {
        self.regular
    }

    fn collections(&self) -> Vec<CollectionId> {
        self.collections.lock().unwrap().clone()
    }

    fn attachments(&self) -> Vec<Attachment> {
        self.attachment_list()
    }

    fn display_title(&self) -> String {
        self.title.clone()
    }

    fn field(&self, name: &str) -> Option<String> {
        self.fields.get(name).cloned()
    }

    fn creators(&self) -> Vec<Creator> {
        self.creators.clone()
    }

    fn tags(&self) -> Vec<String> {
        self.tag_list()
    }

    fn item_type(&self) -> String {
        "Journal Article".to_string()
    }

    fn uri(&self) -> String {
        format!("http://zotero.org/users/local/items/{}", self.id)
    }

    async fn citation(&self, format: &str, in_text: bool) -> Option<String> {
        self.citation_calls.fetch_add(1, Ordering::SeqCst);
        self.citations.get(&(format.to_string(), in_text)).cloned()
    }

    async fn file_path(&self) -> Option<String> {
        self.fields.get("filePath").cloned()
    }

    async fn add_tag(&self, tag: &str) -> Result<(), LibraryError> {
        if self.fail_on == Some(FailPoint::AddTag) {
            return Err(LibraryError::Save {
                id: self.id,
                reason: "tag write refused".to_string(),
            });
        }
        let mut tags = self.tags.lock().unwrap();
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
        Ok(())
    }

    async fn erase_attachments(&self, ids: &[AttachmentId]) -> Result<(), LibraryError> {
        self.attachments
            .lock()
            .unwrap()
            .retain(|attachment| !ids.contains(&attachment.id));
        Ok(())
    }

    async fn write_link_attachment(
        &self,
        existing: Option<AttachmentId>,
        link: &LinkDraft,
    ) -> Result<AttachmentId, LibraryError> {
        if self.fail_on == Some(FailPoint::WriteLink) {
            return Err(LibraryError::Save {
                id: self.id,
                reason: "link write refused".to_string(),
            });
        }

        let mut attachments = self.attachments.lock().unwrap();
        if let Some(id) = existing {
            let attachment = attachments
                .iter_mut()
                .find(|attachment| attachment.id == id)
                .ok_or(LibraryError::NotFound(self.id))?;
            attachment.url = Some(link.url.clone());
            attachment.note = link.note.clone();
            return Ok(id);
        }

        let id = AttachmentId(self.next_attachment.fetch_add(1, Ordering::SeqCst));
        attachments.push(Attachment {
            id,
            title: link.title.clone(),
            url: Some(link.url.clone()),
            note: link.note.clone(),
        });
        Ok(id)
    }
}

#[derive(Default)]
pub struct FakeLibrary {
    items: Mutex<HashMap<RecordId, Arc<FakeItem>>>,
    collections: Mutex<HashMap<CollectionId, Vec<RecordId>>>,
    subcollections: Mutex<HashMap<CollectionId, Vec<CollectionId>>>,
    pub quick_copy: Option<String>,
}

impl FakeLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the item and files it under each of its collections.
    pub fn add(&self, item: FakeItem) -> Arc<FakeItem> {
        let item = Arc::new(item);
        let mut collections = self.collections.lock().unwrap();
        for collection in item.collections() {
            collections.entry(collection).or_default().push(item.id);
        }
        self.items.lock().unwrap().insert(item.id, item.clone());
        item
    }

    pub fn remove(&self, id: u64) {
        self.items.lock().unwrap().remove(&RecordId(id));
    }

    pub fn add_subcollection(&self, parent: u64, child: u64) {
        self.subcollections
            .lock()
            .unwrap()
            .entry(CollectionId(parent))
            .or_default()
            .push(CollectionId(child));
    }

    fn filed_in(&self, id: CollectionId) -> Vec<RecordId> {
        self.collections
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }
}

impl Library for FakeLibrary {
    fn item(&self, id: RecordId) -> Option<Arc<dyn ItemAdapter>> {
        self.items
            .lock()
            .unwrap()
            .get(&id)
            .map(|item| item.clone() as Arc<dyn ItemAdapter>)
    }

    fn collection_items(&self, id: CollectionId) -> Vec<Arc<dyn ItemAdapter>> {
        let mut pending = vec![id];
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        while let Some(collection) = pending.pop() {
            if !seen.insert(collection) {
                continue;
            }
            ids.extend(self.filed_in(collection));
            if let Some(children) = self.subcollections.lock().unwrap().get(&collection) {
                pending.extend(children.iter().copied());
            }
        }
        ids.into_iter().filter_map(|id| self.item(id)).collect()
    }

    fn child_items(&self, id: CollectionId) -> Vec<Arc<dyn ItemAdapter>> {
        self.filed_in(id)
            .into_iter()
            .filter_map(|id| self.item(id))
            .collect()
    }

    fn quick_copy_format(&self) -> Option<String> {
        self.quick_copy.clone()
    }
}

// ── Remote fakes ────────────────────────────────────

pub struct FakeRemote {
    pub schema: Schema,
    pub fail_schema: bool,
    /// Titles whose record creation fails.
    pub fail_titles: HashSet<String>,
    pub delay: Duration,
    pub created: Mutex<Vec<RecordFields>>,
    pub schema_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    active: AtomicUsize,
    pub max_active: AtomicUsize,
}

impl FakeRemote {
    pub fn new(columns: &[&str]) -> Self {
        FakeRemote {
            schema: columns.iter().map(|c| c.to_string()).collect(),
            fail_schema: false,
            fail_titles: HashSet::new(),
            delay: Duration::ZERO,
            created: Mutex::new(Vec::new()),
            schema_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    pub fn failing_schema(mut self) -> Self {
        self.fail_schema = true;
        self
    }

    pub fn failing_title(mut self, title: &str) -> Self {
        self.fail_titles.insert(title.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn remote_calls(&self) -> usize {
        self.schema_calls.load(Ordering::SeqCst) + self.create_calls.load(Ordering::SeqCst)
    }

    pub fn created_titles(&self) -> Vec<String> {
        self.created
            .lock()
            .unwrap()
            .iter()
            .filter_map(|fields| fields.get("title").and_then(|v| v.as_str()).map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl RemoteSyncClient for FakeRemote {
    async fn fetch_schema(&self) -> Result<Arc<Schema>, RemoteError> {
        self.schema_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_schema {
            return Err(RemoteError::Status {
                status: 401,
                body: "unauthorized".to_string(),
            });
        }
        Ok(Arc::new(self.schema.clone()))
    }

    async fn create_record(&self, fields: RecordFields) -> Result<RemoteRecordRef, RemoteError> {
        let call = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        let title = fields
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        if self.fail_titles.contains(&title) {
            return Err(RemoteError::Status {
                status: 500,
                body: format!("cannot create {title}"),
            });
        }

        self.created.lock().unwrap().push(fields);
        Ok(RemoteRecordRef {
            web_url: format!("https://www.wolai.com/{call:032x}"),
        })
    }
}

pub struct FakeConnector {
    pub client: Arc<FakeRemote>,
    pub connects: AtomicUsize,
    pub last_credentials: Mutex<Option<Credentials>>,
}

impl FakeConnector {
    pub fn new(client: FakeRemote) -> Self {
        FakeConnector {
            client: Arc::new(client),
            connects: AtomicUsize::new(0),
            last_credentials: Mutex::new(None),
        }
    }
}

impl RemoteConnector for FakeConnector {
    fn connect(&self, credentials: &Credentials) -> Arc<dyn RemoteSyncClient> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        *self.last_credentials.lock().unwrap() = Some(credentials.clone());
        self.client.clone()
    }
}

// ── Progress ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    BatchStart(usize),
    Item(usize, usize),
    ItemError(String),
    BatchError(String),
    BatchDone { succeeded: usize, failed: usize },
}

#[derive(Default)]
pub struct RecordingProgress {
    pub events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn item_errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ProgressEvent::ItemError(message) => Some(message),
                _ => None,
            })
            .collect()
    }
}

impl ProgressReporter for RecordingProgress {
    fn batch_start(&self, total: usize) {
        self.events.lock().unwrap().push(ProgressEvent::BatchStart(total));
    }

    fn item_progress(&self, index: usize, total: usize) {
        self.events.lock().unwrap().push(ProgressEvent::Item(index, total));
    }

    fn item_error(&self, message: &str) {
        self.events
            .lock()
            .unwrap()
            .push(ProgressEvent::ItemError(message.to_string()));
    }

    fn batch_error(&self, message: &str) {
        self.events
            .lock()
            .unwrap()
            .push(ProgressEvent::BatchError(message.to_string()));
    }

    fn batch_done(&self, report: &BatchReport) {
        self.events.lock().unwrap().push(ProgressEvent::BatchDone {
            succeeded: report.succeeded(),
            failed: report.failed(),
        });
    }
}

// ── Batch runner fake ───────────────────────────────

#[derive(Debug, Clone)]
pub struct RecordedRun {
    pub started: Instant,
    pub finished: Instant,
    pub ids: RecordIds,
}

/// Records every pass and flags any overlap between concurrent passes.
pub struct FakeRunner {
    pub delay: Duration,
    pub runs: Mutex<Vec<RecordedRun>>,
    in_flight: Mutex<BTreeSet<RecordId>>,
    active: AtomicUsize,
    pub max_active: AtomicUsize,
    pub overlapping_ids: AtomicUsize,
}

impl FakeRunner {
    pub fn new(delay: Duration) -> Self {
        FakeRunner {
            delay,
            runs: Mutex::new(Vec::new()),
            in_flight: Mutex::new(BTreeSet::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            overlapping_ids: AtomicUsize::new(0),
        }
    }

    pub fn runs(&self) -> Vec<RecordedRun> {
        self.runs.lock().unwrap().clone()
    }
}

#[async_trait]
impl BatchRunner for FakeRunner {
    async fn run(&self, ids: RecordIds) -> BatchReport {
        let started = Instant::now();
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        {
            let mut in_flight = self.in_flight.lock().unwrap();
            let overlap = ids.iter().filter(|id| in_flight.contains(id)).count();
            self.overlapping_ids.fetch_add(overlap, Ordering::SeqCst);
            in_flight.extend(ids.iter().copied());
        }

        tokio::time::sleep(self.delay).await;

        {
            let mut in_flight = self.in_flight.lock().unwrap();
            for id in &ids {
                in_flight.remove(id);
            }
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        self.runs.lock().unwrap().push(RecordedRun {
            started,
            finished: Instant::now(),
            ids: ids.clone(),
        });
        BatchReport::new(ids.len())
    }
}
