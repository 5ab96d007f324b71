use crate::domain::{RecordIds, RemoteRecordRef};
use crate::library::{Library, WoteroItem, links};
use crate::prefs::PrefSource;
use crate::sync::progress::{BatchReport, ItemOutcome, ProgressReporter};
use crate::sync::{ItemSyncError, SyncError};
use crate::wolai::{RecordBuilder, RemoteConnector, RemoteSyncClient};
use async_trait::async_trait;
use chrono::Local;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Executes one sync pass over a batch of record IDs.
#[async_trait]
pub trait BatchRunner: Send + Sync {
    async fn run(&self, ids: RecordIds) -> BatchReport;
}

/// Writes records to the note database one at a time.
///
/// A failure on one record is reported and the pass moves on to the next.
/// Only missing configuration or an unreachable schema abort the pass.
pub struct ItemSyncRunner {
    library: Arc<dyn Library>,
    prefs: Arc<dyn PrefSource>,
    connector: Arc<dyn RemoteConnector>,
    progress: Arc<dyn ProgressReporter>,
}

impl ItemSyncRunner {
    pub fn new(
        library: Arc<dyn Library>,
        prefs: Arc<dyn PrefSource>,
        connector: Arc<dyn RemoteConnector>,
        progress: Arc<dyn ProgressReporter>,
    ) -> Self {
        ItemSyncRunner {
            library,
            prefs,
            connector,
            progress,
        }
    }

    fn resolve(&self, ids: &RecordIds) -> Vec<WoteroItem> {
        let quick_copy_format = self.library.quick_copy_format();

        ids.iter()
            .filter_map(|id| match self.library.item(*id) {
                Some(item) => Some(WoteroItem::new(item, quick_copy_format.clone())),
                None => {
                    debug!(item_id = %id, "item no longer exists, skipping");
                    None
                }
            })
            .collect()
    }

    async fn sync_items(
        &self,
        items: &[WoteroItem],
        report: &mut BatchReport,
    ) -> Result<(), SyncError> {
        let prefs = self.prefs.current();
        let credentials = prefs.credentials()?;
        let client = self.connector.connect(&credentials);
        let schema = client.fetch_schema().await.map_err(SyncError::SchemaFetch)?;
        let builder = RecordBuilder::new(schema, prefs.page_title_format);

        let total = items.len();
        for (index, item) in items.iter().enumerate() {
            let step = index + 1;
            info!(batch_id = %report.batch_id, item_id = %item.id(), "Saving item {step} of {total}");
            self.progress.item_progress(step, total);

            match self.sync_item(item, client.as_ref(), &builder).await {
                Ok(remote) => report.outcomes.push(ItemOutcome::Synced {
                    id: item.id(),
                    remote,
                }),
                Err(e) => {
                    let message = e.to_string();
                    error!(batch_id = %report.batch_id, item_id = %item.id(), error = %message, "failed to sync item");
                    self.progress.item_error(&message);
                    report.outcomes.push(ItemOutcome::Failed {
                        id: item.id(),
                        message,
                    });
                }
            }
        }

        Ok(())
    }

    async fn sync_item(
        &self,
        item: &WoteroItem,
        client: &dyn RemoteSyncClient,
        builder: &RecordBuilder,
    ) -> Result<RemoteRecordRef, ItemSyncError> {
        let fields = builder.build(item).await;

        // The open API has no row update yet, so a re-sync creates a new row.
        if let Some(page_id) = item.remote_page_id() {
            debug!(item_id = %item.id(), page_id = %page_id, "item already linked to a remote page");
        }

        let remote = client.create_record(fields).await?;
        item.adapter().add_tag(links::SYNC_TAG).await?;
        links::save_link_attachment(item.adapter().as_ref(), &remote, Local::now()).await?;

        Ok(remote)
    }
}

#[async_trait]
impl BatchRunner for ItemSyncRunner {
    async fn run(&self, ids: RecordIds) -> BatchReport {
        let items = self.resolve(&ids);
        let mut report = BatchReport::new(items.len());
        if items.is_empty() {
            return report;
        }

        self.progress.batch_start(report.total);

        if let Err(e) = self.sync_items(&items, &mut report).await {
            let message = e.to_string();
            error!(batch_id = %report.batch_id, error = %message, "sync batch aborted");
            self.progress.batch_error(&message);
            report.error = Some(message);
        }

        self.progress.batch_done(&report);
        report
    }
}
