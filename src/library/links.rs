//! Link attachments that tie a library record to its remote page.

use crate::domain::{Attachment, AttachmentId, LinkDraft, RemoteRecordRef};
use crate::library::{ItemAdapter, LibraryError};
use crate::wolai;
use chrono::{DateTime, Local};
use tracing::debug;

/// Tag applied to a record once it has been synced.
pub const SYNC_TAG: &str = "wolai";

/// Title given to link attachments created by the sync.
pub const LINK_TITLE: &str = "Wolai";

pub fn is_sync_link(attachment: &Attachment) -> bool {
    attachment.title.to_lowercase() == SYNC_TAG
}

/// Filters `attachments` down to sync links, newest (highest ID) first.
pub fn sync_links(attachments: Vec<Attachment>) -> Vec<Attachment> {
    let mut links: Vec<Attachment> = attachments.into_iter().filter(is_sync_link).collect();
    links.sort_by(|a, b| b.id.cmp(&a.id));
    links
}

/// True once a record carries a completed-sync link attachment.
pub fn has_sync_link(item: &dyn ItemAdapter) -> bool {
    item.attachments().iter().any(is_sync_link)
}

/// Writes the link attachment for a freshly created remote record.
///
/// Keeps only the newest existing link (erasing the rest), points it at
/// `remote` and stamps it with `synced_at`. Creates the attachment when the
/// record has none yet.
pub async fn save_link_attachment(
    item: &dyn ItemAdapter,
    remote: &RemoteRecordRef,
    synced_at: DateTime<Local>,
) -> Result<AttachmentId, LibraryError> {
    let links = sync_links(item.attachments());

    if links.len() > 1 {
        let stale: Vec<AttachmentId> = links[1..].iter().map(|link| link.id).collect();
        debug!(item_id = %item.id(), count = stale.len(), "erasing duplicate link attachments");
        item.erase_attachments(&stale).await?;
    }

    let draft = LinkDraft {
        title: LINK_TITLE.to_string(),
        url: wolai::convert_web_url_to_app_url(&remote.web_url),
        note: link_note(synced_at),
    };

    item.write_link_attachment(links.first().map(|link| link.id), &draft)
        .await
}

pub fn link_note(synced_at: DateTime<Local>) -> String {
    format!(
        r#"
<h2 style="background-color: #ff666680;">Do not delete!</h2>
<p>This link attachment serves as a reference for
<a href="https://github.com/imzhangjinming/Wotero">Wotero</a>
so that it can properly update the Wolai page for this item.</p>
<p>Last synced: {}</p>
"#,
        synced_at.format("%Y-%m-%d %H:%M:%S")
    )
}
