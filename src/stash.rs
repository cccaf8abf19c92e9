//! Per-job variable stash.
//!
//! Jobs materialize variable values during execution; the stash caches them
//! per (job name, variable name) so later launches can reuse them. Writes
//! are exactly-once per pair; a repeated write is a caller bug, not a
//! runtime condition. Lookups are the opposite: a miss is a normal, expected
//! outcome and comes back as `None`.
//!
//! Completion callbacks may write from backend threads while launches read,
//! so the whole table sits behind one mutex.

use miette::Diagnostic;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Errors from stash writes.
#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum StashError {
    /// The (job, variable) pair was already populated this run.
    #[error("variable '{var_name}' already stashed for job '{job_name}'")]
    #[diagnostic(
        code(jobflow::stash::duplicate_variable),
        help("Each variable is materialized at most once per job per run.")
    )]
    DuplicateVariable { job_name: String, var_name: String },
}

/// Write-once-per-pair, read-many cache of materialized variable values.
#[derive(Debug, Default)]
pub struct VariableStash<V> {
    inner: Mutex<FxHashMap<String, FxHashMap<String, V>>>,
}

impl<V: Clone> VariableStash<V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(FxHashMap::default()),
        }
    }

    /// Store `value` for `(job_name, var_name)`. The inner per-job map is
    /// created lazily on first write.
    pub fn stash(
        &self,
        job_name: impl Into<String>,
        var_name: impl Into<String>,
        value: V,
    ) -> Result<(), StashError> {
        let job_name = job_name.into();
        let var_name = var_name.into();
        let mut inner = self.inner.lock();
        let per_job = inner.entry(job_name.clone()).or_default();
        if per_job.contains_key(&var_name) {
            return Err(StashError::DuplicateVariable { job_name, var_name });
        }
        per_job.insert(var_name, value);
        Ok(())
    }

    /// Stored value for `(job_name, var_name)`, or `None` when either level
    /// of the mapping is absent.
    #[must_use]
    pub fn try_get(&self, job_name: &str, var_name: &str) -> Option<V> {
        self.inner
            .lock()
            .get(job_name)
            .and_then(|per_job| per_job.get(var_name))
            .cloned()
    }

    /// Number of variables stashed for `job_name`.
    #[must_use]
    pub fn len_for_job(&self, job_name: &str) -> usize {
        self.inner.lock().get(job_name).map_or(0, FxHashMap::len)
    }
}
