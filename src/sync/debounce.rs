use std::time::Duration;
use tokio::sync::oneshot;

/// A single cancellable one-shot timer.
///
/// Arming spawns a task that waits for `duration` and then runs the callback,
/// unless the timer is cancelled or re-armed first. Re-arming cancels the
/// previous wait, which gives debounce semantics: the callback only runs once
/// the timer has been left alone for a full `duration`.
#[derive(Debug, Default)]
pub struct Debouncer {
    // NOTE: dropping or sending on this wakes the waiting task and skips the callback
    canceller: Option<oneshot::Sender<()>>,
}

impl Debouncer {
    pub fn new() -> Self {
        Debouncer { canceller: None }
    }

    /// Cancels any pending wait and starts a new one.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn arm<F>(&mut self, duration: Duration, on_fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();

        let (c_tx, c_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(duration) => on_fire(),
                _ = c_rx => {}
            }
        });

        self.canceller = Some(c_tx);
    }

    pub fn cancel(&mut self) {
        if let Some(c_tx) = self.canceller.take() {
            let _ = c_tx.send(());
        }
    }

    /// True while a wait is pending. Turns false once the callback has run or
    /// the timer was cancelled.
    pub fn is_armed(&self) -> bool {
        self.canceller
            .as_ref()
            .is_some_and(|c_tx| !c_tx.is_closed())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
