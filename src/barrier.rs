//! Running-job counter with a drain barrier.
//!
//! The session increments the counter before a job instance reaches the
//! backend and decrements it from the instance's post-finish hook, so a
//! waiter can never observe zero while a launched job is still in flight.
//! Waking is edge-driven through [`tokio::sync::Notify`]; the wait loop
//! re-checks the predicate after every wake, so spurious or stale
//! notifications are harmless.

use parking_lot::Mutex;
use tokio::sync::Notify;

/// Counter + notify pair used as a join barrier over in-flight jobs.
#[derive(Debug, Default)]
pub struct JobBarrier {
    count: Mutex<usize>,
    idle: Notify,
}

impl JobBarrier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current number of in-flight jobs.
    #[must_use]
    pub fn count(&self) -> usize {
        *self.count.lock()
    }

    /// Record one launched job. Must happen before the instance is handed to
    /// the backend.
    pub fn increment(&self) {
        *self.count.lock() += 1;
    }

    /// Record one completed job and wake waiters. Safe to call from any
    /// thread; completion paths run this from backend callback threads.
    ///
    /// # Panics
    ///
    /// Panics if called more times than [`increment`](Self::increment); the
    /// count never goes negative. `JobInstance::finish` consumes the
    /// instance, so a paired decrement cannot run twice.
    pub fn decrement(&self) {
        {
            let mut count = self.count.lock();
            *count = count
                .checked_sub(1)
                .expect("job completion signalled with no job in flight");
        }
        self.idle.notify_waiters();
    }

    /// Wait until the count reaches zero. Returns immediately when nothing is
    /// in flight.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            // Register interest before re-checking so a decrement landing
            // between the check and the await still wakes us.
            notified.as_mut().enable();
            if *self.count.lock() == 0 {
                return;
            }
            notified.await;
        }
    }
}
