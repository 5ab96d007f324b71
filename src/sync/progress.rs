use crate::domain::{RecordId, RemoteRecordRef};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Receives batch and item lifecycle notifications for user feedback.
pub trait ProgressReporter: Send + Sync {
    fn batch_start(&self, total: usize);

    /// `index` is 1-based.
    fn item_progress(&self, index: usize, total: usize);

    fn item_error(&self, message: &str);

    /// A batch-level failure. Reported once, with no per-item detail.
    fn batch_error(&self, message: &str);

    fn batch_done(&self, report: &BatchReport);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Synced { id: RecordId, remote: RemoteRecordRef },
    Failed { id: RecordId, message: String },
}

impl ItemOutcome {
    pub fn id(&self) -> RecordId {
        match self {
            ItemOutcome::Synced { id, .. } | ItemOutcome::Failed { id, .. } => *id,
        }
    }

    pub fn is_synced(&self) -> bool {
        matches!(self, ItemOutcome::Synced { .. })
    }
}

/// Result of one sync pass.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub batch_id: Uuid,
    /// Records that still resolved when the pass started.
    pub total: usize,
    pub outcomes: Vec<ItemOutcome>,
    /// Set when the whole batch was aborted.
    pub error: Option<String>,
}

impl BatchReport {
    pub fn new(total: usize) -> Self {
        BatchReport {
            batch_id: Uuid::new_v4(),
            total,
            outcomes: Vec::new(),
            error: None,
        }
    }

    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_synced()).count()
    }

    pub fn failed(&self) -> usize {
        self.attempted() - self.succeeded()
    }

    pub fn outcome(&self, id: RecordId) -> Option<&ItemOutcome> {
        self.outcomes.iter().find(|o| o.id() == id)
    }
}

/// Reports progress through `tracing`.
#[derive(Debug, Default)]
pub struct TracingProgress;

impl ProgressReporter for TracingProgress {
    fn batch_start(&self, total: usize) {
        info!(total, "Saving items to Wolai...");
    }

    fn item_progress(&self, index: usize, total: usize) {
        info!("Item {index} of {total}");
    }

    fn item_error(&self, message: &str) {
        warn!("{message}");
    }

    fn batch_error(&self, message: &str) {
        error!("{message}");
    }

    fn batch_done(&self, report: &BatchReport) {
        info!(
            batch_id = %report.batch_id,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "sync batch finished"
        );
    }
}
