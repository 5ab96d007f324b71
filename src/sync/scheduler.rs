use crate::domain::RecordIds;
use crate::sync::progress::BatchReport;
use crate::sync::queue::{CoalescingQueue, TimerToken};
use crate::sync::runner::BatchRunner;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

enum Command {
    Enqueue(RecordIds),
    TimerFired(TimerToken),
    Snapshot(oneshot::Sender<SchedulerSnapshot>),
    Shutdown(oneshot::Sender<()>),
}

/// Lifecycle of the scheduler.
///
/// `Idle` has no pending batch, `TimerArmed` has one waiting out its debounce
/// window, and `Executing` is running a pass (possibly with more work pending).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    TimerArmed,
    Executing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSnapshot {
    pub state: SchedulerState,
    /// Record IDs waiting in the pending batch.
    pub pending: usize,
    pub timer_armed: bool,
    pub sync_running: bool,
    pub completed_passes: u64,
}

/// Runs sync passes one at a time.
///
/// The scheduler owns the coalescing queue and the in-flight pass, and lives
/// on a single task. Every state transition happens between two polls of
/// that task, so taking a batch and clearing it is atomic with respect to
/// new enqueues without any lock.
pub struct SyncScheduler {
    queue: CoalescingQueue,
    runner: Arc<dyn BatchRunner>,
    in_flight: Option<JoinHandle<BatchReport>>,
    completed_passes: u64,
}

impl SyncScheduler {
    /// Spawns the scheduler task and returns a handle to it.
    ///
    /// Must be called from within a Tokio runtime. The task stops once
    /// [`SchedulerHandle::shutdown`] is called or every handle is dropped.
    pub fn spawn(runner: Arc<dyn BatchRunner>, delay: Duration) -> SchedulerHandle {
        let (tx, rx) = mpsc::unbounded_channel();

        // NOTE: weak so a pending timer does not keep the scheduler alive
        let timer_tx = tx.downgrade();
        let queue = CoalescingQueue::new(delay, move |token| {
            if let Some(tx) = timer_tx.upgrade() {
                let _ = tx.send(Command::TimerFired(token));
            }
        });

        let scheduler = SyncScheduler {
            queue,
            runner,
            in_flight: None,
            completed_passes: 0,
        };
        tokio::spawn(scheduler.run(rx));

        SchedulerHandle { tx }
    }

    async fn run(mut self, mut mailbox: mpsc::UnboundedReceiver<Command>) {
        info!(delay_ms = self.queue.delay().as_millis() as u64, "sync scheduler started");

        loop {
            tokio::select! {
                finished = wait_for(&mut self.in_flight) => self.finish(finished),
                command = mailbox.recv() => match command {
                    Some(Command::Enqueue(ids)) => {
                        self.queue.enqueue(ids);
                    }
                    Some(Command::TimerFired(token)) => self.timer_fired(token),
                    Some(Command::Snapshot(reply)) => {
                        let _ = reply.send(self.snapshot());
                    }
                    Some(Command::Shutdown(reply)) => {
                        self.stop().await;
                        let _ = reply.send(());
                        break;
                    }
                    None => {
                        self.stop().await;
                        break;
                    }
                },
            }
        }

        info!("sync scheduler stopped");
    }

    fn timer_fired(&mut self, token: TimerToken) {
        if !self.queue.expire(token) {
            debug!(token, "ignoring stale debounce timer");
            return;
        }

        if self.in_flight.is_some() {
            debug!(pending = self.queue.len(), "sync in progress, deferring expired batch");
            return;
        }

        self.run_if_idle();
    }

    /// Starts a pass for the pending batch if nothing is running and the
    /// batch has waited out its debounce window.
    fn run_if_idle(&mut self) {
        if self.in_flight.is_some() {
            return;
        }

        let Some(ids) = self.queue.take_expired() else {
            return;
        };

        info!(count = ids.len(), "starting sync pass");
        let runner = self.runner.clone();
        self.in_flight = Some(tokio::spawn(async move { runner.run(ids).await }));
    }

    fn finish(&mut self, finished: Result<BatchReport, JoinError>) {
        self.in_flight = None;
        self.completed_passes += 1;

        match finished {
            Ok(report) => info!(
                batch_id = %report.batch_id,
                total = report.total,
                succeeded = report.succeeded(),
                failed = report.failed(),
                "sync pass finished"
            ),
            Err(e) => error!(error = %e, "sync pass did not complete"),
        }

        // Work that went idle while the pass ran starts right away; work still
        // inside its window waits for its timer.
        if self.queue.has_expired_batch() {
            debug!(pending = self.queue.len(), "draining batch queued during pass");
        }
        self.run_if_idle();
    }

    async fn stop(&mut self) {
        let dropped = self.queue.clear();
        if dropped > 0 {
            warn!(dropped, "dropping pending sync batch at shutdown");
        }

        if let Some(handle) = self.in_flight.take() {
            info!("waiting for in-flight sync pass");
            let finished = handle.await;
            self.finish(finished);
        }
    }

    fn state(&self) -> SchedulerState {
        if self.in_flight.is_some() {
            SchedulerState::Executing
        } else if !self.queue.is_empty() {
            SchedulerState::TimerArmed
        } else {
            SchedulerState::Idle
        }
    }

    fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            state: self.state(),
            pending: self.queue.len(),
            timer_armed: self.queue.is_timer_armed(),
            sync_running: self.in_flight.is_some(),
            completed_passes: self.completed_passes,
        }
    }
}

async fn wait_for(in_flight: &mut Option<JoinHandle<BatchReport>>) -> Result<BatchReport, JoinError> {
    match in_flight {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

/// Cheap, cloneable handle to a running [`SyncScheduler`].
#[derive(Clone)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl SchedulerHandle {
    /// Adds record IDs to the pending batch and restarts the debounce window.
    ///
    /// Never blocks. An empty set is ignored.
    pub fn enqueue(&self, ids: RecordIds) {
        if ids.is_empty() {
            return;
        }

        let count = ids.len();
        if self.tx.send(Command::Enqueue(ids)).is_err() {
            warn!(count, "sync scheduler stopped, dropping items");
        }
    }

    /// Current scheduler state, or `None` once the scheduler has stopped.
    pub async fn snapshot(&self) -> Option<SchedulerSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(Command::Snapshot(reply)).ok()?;
        rx.await.ok()
    }

    pub async fn state(&self) -> Option<SchedulerState> {
        self.snapshot().await.map(|snapshot| snapshot.state)
    }

    /// Cancels the debounce timer, drops the pending batch and waits for the
    /// in-flight pass (if any) to finish.
    pub async fn shutdown(&self) {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::Shutdown(reply)).is_ok() {
            let _ = rx.await;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
