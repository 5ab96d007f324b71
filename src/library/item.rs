use crate::domain::{Attachment, CreatorRole, RecordId};
use crate::library::ItemAdapter;
use crate::library::links;
use crate::prefs::PageTitleFormat;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

pub const APA_STYLE: &str = "bibliography=http://www.zotero.org/styles/apa";

static PARENS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\((.+)\)$").expect("valid regex"));

/// A library record viewed as a sync source.
///
/// Wraps an [`ItemAdapter`] with the derived getters used to build outbound
/// records. Citations are computed at most once per format for the lifetime
/// of this value.
pub struct WoteroItem {
    inner: Arc<dyn ItemAdapter>,
    quick_copy_format: String,
    citations: Mutex<HashMap<(String, bool), Option<String>>>,
}

impl WoteroItem {
    /// Wraps `inner`, using `quick_copy_format` for full and in-text
    /// citations. Falls back to APA when no format is configured.
    pub fn new(inner: Arc<dyn ItemAdapter>, quick_copy_format: Option<String>) -> Self {
        let quick_copy_format = quick_copy_format
            .filter(|format| !format.is_empty())
            .unwrap_or_else(|| APA_STYLE.to_string());

        WoteroItem {
            inner,
            quick_copy_format,
            citations: Mutex::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> RecordId {
        self.inner.id()
    }

    pub fn adapter(&self) -> &Arc<dyn ItemAdapter> {
        &self.inner
    }

    pub fn title(&self) -> String {
        self.inner.display_title()
    }

    pub fn short_title(&self) -> Option<String> {
        self.non_empty_field("shortTitle")
    }

    pub fn abstract_note(&self) -> Option<String> {
        self.non_empty_field("abstractNote")
    }

    pub fn date(&self) -> Option<String> {
        self.non_empty_field("date")
    }

    pub fn url(&self) -> Option<String> {
        self.non_empty_field("url")
    }

    /// The DOI as a resolver URL.
    pub fn doi(&self) -> Option<String> {
        self.non_empty_field("DOI")
            .map(|doi| format!("https://doi.org/{doi}"))
    }

    /// Leading integer of the `year` field, so `"2020a"` reads as 2020.
    pub fn year(&self) -> Option<i32> {
        self.non_empty_field("year")
            .and_then(|year| leading_integer(&year))
    }

    pub fn item_type(&self) -> String {
        self.inner.item_type()
    }

    pub fn uri(&self) -> String {
        self.inner.uri()
    }

    /// Primary creators formatted as `"Last, First"`.
    pub fn authors(&self) -> Vec<String> {
        self.creators_with_role(CreatorRole::Primary)
    }

    pub fn editors(&self) -> Vec<String> {
        self.creators_with_role(CreatorRole::Editor)
    }

    /// Tags on the record, minus the sync marker tag.
    pub fn tags(&self) -> Vec<String> {
        self.inner
            .tags()
            .into_iter()
            .filter(|tag| tag != links::SYNC_TAG)
            .collect()
    }

    pub async fn file_path(&self) -> Option<String> {
        self.inner.file_path().await.filter(|path| !path.is_empty())
    }

    /// APA in-text citation without its surrounding parentheses,
    /// e.g. `Smith, 2020`.
    pub async fn author_date_citation(&self) -> Option<String> {
        let citation = self.cached_citation(APA_STYLE, true).await?;
        PARENS
            .captures(&citation)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    pub async fn full_citation(&self) -> Option<String> {
        let format = self.quick_copy_format.clone();
        self.cached_citation(&format, false).await
    }

    pub async fn in_text_citation(&self) -> Option<String> {
        let format = self.quick_copy_format.clone();
        self.cached_citation(&format, true).await
    }

    /// Builds the outbound title with the given strategy, falling back to
    /// the plain title when the strategy yields nothing.
    pub async fn build_title(&self, format: PageTitleFormat) -> String {
        let title = match format {
            PageTitleFormat::ItemAuthorDateCitation => self.author_date_citation().await,
            PageTitleFormat::ItemFullCitation => self.full_citation().await,
            PageTitleFormat::ItemInTextCitation => self.in_text_citation().await,
            PageTitleFormat::ItemShortTitle => self.short_title(),
            PageTitleFormat::ItemTitle => Some(self.title()),
        };

        title
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| self.title())
    }

    /// Link attachments pointing at the remote page, newest first.
    pub fn sync_links(&self) -> Vec<Attachment> {
        links::sync_links(self.inner.attachments())
    }

    /// ID of the remote page this record was last synced to, if any.
    pub fn remote_page_id(&self) -> Option<String> {
        self.sync_links()
            .into_iter()
            .next()
            .and_then(|link| link.url)
            .and_then(|url| crate::wolai::page_id_from_url(&url))
    }

    fn non_empty_field(&self, name: &str) -> Option<String> {
        self.inner.field(name).filter(|value| !value.is_empty())
    }

    fn creators_with_role(&self, role: CreatorRole) -> Vec<String> {
        self.inner
            .creators()
            .iter()
            .filter(|creator| creator.role == role)
            .map(|creator| creator.display_name())
            .collect()
    }

    async fn cached_citation(&self, format: &str, in_text: bool) -> Option<String> {
        let key = (format.to_string(), in_text);
        let cached = self.lock_citations().get(&key).cloned();
        if let Some(cached) = cached {
            return cached;
        }

        let citation = self
            .inner
            .citation(format, in_text)
            .await
            .map(|citation| citation.trim().to_string())
            .filter(|citation| !citation.is_empty());

        self.lock_citations().insert(key, citation.clone());
        citation
    }

    fn lock_citations(&self) -> std::sync::MutexGuard<'_, HashMap<(String, bool), Option<String>>> {
        self.citations.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn leading_integer(raw: &str) -> Option<i32> {
    let raw = raw.trim_start();
    let (sign, rest) = match raw.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    rest[..end].parse::<i32>().ok().map(|n| sign * n)
}
