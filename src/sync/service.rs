use crate::error::{WoteroError, WoteroResult};
use crate::library::Library;
use crate::notifier::{EventSource, WoteroEvent};
use crate::prefs::PrefSource;
use crate::sync::filter::EventFilter;
use crate::sync::progress::ProgressReporter;
use crate::sync::runner::{BatchRunner, ItemSyncRunner};
use crate::sync::scheduler::{SchedulerHandle, SyncScheduler};
use crate::wolai::RemoteConnector;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Listens for library events and keeps the note database in sync.
pub struct SyncService {
    events: Arc<dyn EventSource>,
    prefs: Arc<dyn PrefSource>,
    filter: EventFilter,
    runner: Arc<dyn BatchRunner>,
    scheduler: Option<SchedulerHandle>,
    listener: Option<JoinHandle<()>>,
}

impl SyncService {
    pub fn create(
        events: Arc<dyn EventSource>,
        library: Arc<dyn Library>,
        prefs: Arc<dyn PrefSource>,
        connector: Arc<dyn RemoteConnector>,
        progress: Arc<dyn ProgressReporter>,
    ) -> Self {
        let runner = Arc::new(ItemSyncRunner::new(
            library.clone(),
            prefs.clone(),
            connector,
            progress,
        ));
        Self::with_runner(events, library, prefs, runner)
    }

    /// Builds the service around a custom [`BatchRunner`].
    pub fn with_runner(
        events: Arc<dyn EventSource>,
        library: Arc<dyn Library>,
        prefs: Arc<dyn PrefSource>,
        runner: Arc<dyn BatchRunner>,
    ) -> Self {
        SyncService {
            events,
            prefs,
            filter: EventFilter::new(library),
            runner,
            scheduler: None,
            listener: None,
        }
    }

    /// Starts the scheduler and subscribes to the event source.
    ///
    /// Calling this on a running service does nothing.
    pub fn startup(&mut self) -> WoteroResult<()> {
        if self.scheduler.is_some() {
            return Ok(());
        }

        tokio::runtime::Handle::try_current()
            .map_err(|e| WoteroError::Other(format!("sync service needs a Tokio runtime: {e}")))?;

        let delay = self.prefs.current().sync_debounce();
        let scheduler = SyncScheduler::spawn(self.runner.clone(), delay);

        let listener = tokio::spawn(listen(
            self.events.subscribe(),
            self.filter.clone(),
            self.prefs.clone(),
            scheduler.clone(),
        ));

        self.scheduler = Some(scheduler);
        self.listener = Some(listener);
        info!("sync service started");
        Ok(())
    }

    /// Stops listening and shuts the scheduler down.
    ///
    /// Pending work that has not started is dropped; a pass already running is
    /// allowed to finish.
    pub async fn shutdown(&mut self) -> WoteroResult<()> {
        // NOTE: aborting the listener drops its receiver, which unsubscribes it
        if let Some(listener) = self.listener.take() {
            listener.abort();
            let _ = listener.await;
        }

        if let Some(scheduler) = self.scheduler.take() {
            scheduler.shutdown().await;
        }

        info!("sync service stopped");
        Ok(())
    }

    pub fn scheduler(&self) -> Option<&SchedulerHandle> {
        self.scheduler.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_some()
    }
}

async fn listen(
    mut events: UnboundedReceiver<WoteroEvent>,
    filter: EventFilter,
    prefs: Arc<dyn PrefSource>,
    scheduler: SchedulerHandle,
) {
    while let Some(event) = events.recv().await {
        let ids = filter.ids_for_event(&event, &prefs.current());
        if ids.is_empty() {
            debug!(?event, "event produced nothing to sync");
            continue;
        }
        info!("Enqueue {} item(s) to sync", ids.len());
        scheduler.enqueue(ids);
    }
}
