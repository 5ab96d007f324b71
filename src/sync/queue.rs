use crate::domain::RecordIds;
use crate::sync::debounce::Debouncer;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Identifies one arming of the debounce timer.
pub type TimerToken = u64;

#[derive(Debug)]
struct PendingBatch {
    /// Never empty.
    ids: RecordIds,
    /// `None` once the debounce window has elapsed.
    timer: Option<TimerToken>,
}

/// Accumulates record IDs into at most one pending batch.
///
/// Every enqueue re-arms the debounce timer. When the timer elapses the queue
/// calls `on_expire` with the token of that arming; the owner then marks the
/// batch expired with [`CoalescingQueue::expire`] and picks it up with
/// [`CoalescingQueue::take_expired`] when it is free to run it.
///
/// None of the methods suspend, so the owner can treat each call as atomic.
pub struct CoalescingQueue {
    delay: Duration,
    pending: Option<PendingBatch>,
    timer: Debouncer,
    next_token: TimerToken,
    on_expire: Arc<dyn Fn(TimerToken) + Send + Sync>,
}

impl CoalescingQueue {
    pub fn new<F>(delay: Duration, on_expire: F) -> Self
    where
        F: Fn(TimerToken) + Send + Sync + 'static,
    {
        CoalescingQueue {
            delay,
            pending: None,
            timer: Debouncer::new(),
            next_token: 0,
            on_expire: Arc::new(on_expire),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Merges `ids` into the pending batch and restarts the debounce window.
    ///
    /// An empty set is ignored. Returns the size of the pending batch.
    pub fn enqueue(&mut self, ids: RecordIds) -> usize {
        if ids.is_empty() {
            return self.len();
        }

        self.next_token += 1;
        let token = self.next_token;

        let batch = self.pending.get_or_insert_with(|| PendingBatch {
            ids: RecordIds::new(),
            timer: None,
        });
        batch.ids.extend(ids);
        batch.timer = Some(token);
        let len = batch.ids.len();

        let on_expire = self.on_expire.clone();
        self.timer.arm(self.delay, move || on_expire(token));

        debug!(pending = len, delay_ms = self.delay.as_millis() as u64, "debounce timer armed");
        len
    }

    /// Marks the pending batch expired if `token` is its current timer.
    ///
    /// Returns false for stale tokens, i.e. timers that were re-armed or whose
    /// batch was already taken.
    pub fn expire(&mut self, token: TimerToken) -> bool {
        match self.pending.as_mut() {
            Some(batch) if batch.timer == Some(token) => {
                batch.timer = None;
                true
            }
            _ => false,
        }
    }

    /// Takes the pending batch if its debounce window has elapsed. Later
    /// enqueues start a fresh batch.
    pub fn take_expired(&mut self) -> Option<RecordIds> {
        if !self.has_expired_batch() {
            return None;
        }
        self.pending.take().map(|batch| batch.ids)
    }

    pub fn has_expired_batch(&self) -> bool {
        self.pending.as_ref().is_some_and(|batch| batch.timer.is_none())
    }

    pub fn is_timer_armed(&self) -> bool {
        self.pending.as_ref().is_some_and(|batch| batch.timer.is_some())
    }

    /// Number of record IDs waiting in the pending batch.
    pub fn len(&self) -> usize {
        self.pending.as_ref().map_or(0, |batch| batch.ids.len())
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_none()
    }

    /// Cancels the timer and drops the pending batch, returning how many IDs
    /// were dropped.
    pub fn clear(&mut self) -> usize {
        self.timer.cancel();
        self.pending.take().map_or(0, |batch| batch.ids.len())
    }
}
