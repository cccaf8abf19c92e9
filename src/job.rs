//! Job instances: the unit of work handed to the execution backend.
//!
//! A [`JobInstance`] is short-lived: the launching call owns it until it is
//! handed to the backend, the backend owns it while the job runs, and the
//! backend releases it by calling [`JobInstance::finish`], which fires every
//! post-finish callback exactly once. Three factory variants exist, matching
//! the three job families a compiled plan knows about: user jobs, push jobs
//! (data in), and pull jobs (data out).

use std::fmt;

use crate::blob::{BlobSlot, PullFn, PushFn};

/// Which family of backend job an instance belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobKind {
    /// A user-defined compiled function.
    User,
    /// Backend-generated job feeding input data into the plan.
    Push { op_name: String },
    /// Backend-generated job draining output data out of the plan.
    Pull { op_name: String },
}

enum DataCallback {
    Push(PushFn),
    Pull(PullFn),
}

/// One schedulable unit of backend execution.
///
/// Completion hooks are appended with
/// [`add_post_finish_callback`](Self::add_post_finish_callback) before the
/// instance is handed off; [`finish`](Self::finish) consumes the instance,
/// so the completion path cannot run twice.
pub struct JobInstance {
    job_name: String,
    kind: JobKind,
    data_callback: Option<DataCallback>,
    post_finish: Vec<Box<dyn FnOnce() + Send>>,
}

impl JobInstance {
    /// Instance for a user-defined compiled function.
    #[must_use]
    pub fn user(job_name: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
            kind: JobKind::User,
            data_callback: None,
            post_finish: Vec::new(),
        }
    }

    /// Instance for the push job that feeds `op_name`. The callback runs when
    /// the backend is ready to receive the data.
    #[must_use]
    pub fn push(job_name: impl Into<String>, op_name: impl Into<String>, push_cb: PushFn) -> Self {
        Self {
            job_name: job_name.into(),
            kind: JobKind::Push {
                op_name: op_name.into(),
            },
            data_callback: Some(DataCallback::Push(push_cb)),
            post_finish: Vec::new(),
        }
    }

    /// Instance for the pull job that drains `op_name`. The callback runs
    /// when the backend has the output data ready to read.
    #[must_use]
    pub fn pull(job_name: impl Into<String>, op_name: impl Into<String>, pull_cb: PullFn) -> Self {
        Self {
            job_name: job_name.into(),
            kind: JobKind::Pull {
                op_name: op_name.into(),
            },
            data_callback: Some(DataCallback::Pull(pull_cb)),
            post_finish: Vec::new(),
        }
    }

    #[must_use]
    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    #[must_use]
    pub fn kind(&self) -> &JobKind {
        &self.kind
    }

    #[must_use]
    pub fn has_data_callback(&self) -> bool {
        self.data_callback.is_some()
    }

    /// Append a hook to run when the backend signals completion. Hooks run in
    /// registration order.
    pub fn add_post_finish_callback(&mut self, callback: impl FnOnce() + Send + 'static) {
        self.post_finish.push(Box::new(callback));
    }

    /// Invoke the push data callback, if any. Called by the backend when it
    /// is ready to receive the data for this instance. Returns `false` when
    /// the instance carries no push callback (or it already ran).
    pub fn run_push_callback(&mut self, slot: &mut BlobSlot) -> bool {
        match self.data_callback.take() {
            Some(DataCallback::Push(cb)) => {
                cb(slot);
                true
            }
            other => {
                self.data_callback = other;
                false
            }
        }
    }

    /// Invoke the pull data callback, if any. Called by the backend when the
    /// output data is ready to be read.
    pub fn run_pull_callback(&mut self, slot: &BlobSlot) -> bool {
        match self.data_callback.take() {
            Some(DataCallback::Pull(cb)) => {
                cb(slot);
                true
            }
            other => {
                self.data_callback = other;
                false
            }
        }
    }

    /// Signal completion, consuming the instance and firing every post-finish
    /// callback in registration order.
    pub fn finish(self) {
        for callback in self.post_finish {
            callback();
        }
    }
}

impl fmt::Debug for JobInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobInstance")
            .field("job_name", &self.job_name)
            .field("kind", &self.kind)
            .field("has_data_callback", &self.data_callback.is_some())
            .field("post_finish_callbacks", &self.post_finish.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn finish_runs_hooks_in_order() {
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut instance = JobInstance::user("f");
        for i in 0..3 {
            let order = order.clone();
            instance.add_post_finish_callback(move || order.lock().push(i));
        }
        instance.finish();
        assert_eq!(&*order.lock(), &[0, 1, 2]);
    }

    #[test]
    fn push_callback_runs_at_most_once() {
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_in_cb = fired.clone();
        let mut instance = JobInstance::push(
            "push-f",
            "input0",
            Box::new(move |slot| {
                slot.write(&[42]);
                fired_in_cb.fetch_add(1, Ordering::SeqCst);
            }),
        );
        let mut slot = BlobSlot::new();
        assert!(instance.run_push_callback(&mut slot));
        assert!(!instance.run_push_callback(&mut slot));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(slot.bytes(), &[42]);
    }

    #[test]
    fn pull_callback_does_not_fire_on_push_path() {
        let mut instance = JobInstance::pull("pull-f", "output0", Box::new(|_| {}));
        let mut slot = BlobSlot::new();
        assert!(!instance.run_push_callback(&mut slot));
        assert!(instance.run_pull_callback(&slot));
    }
}
