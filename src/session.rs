//! The session: lifecycle state machine and job-execution coordinator.
//!
//! A [`Session`] owns the function registry, the running-job barrier, the
//! per-job variable stash, and the Open → Running → Closed lifecycle. It
//! creates no threads of its own: callers drive submission, and the backend
//! delivers completion callbacks from whatever threads it likes. The only
//! blocking operation is [`Session::sync`] (and therefore
//! [`Session::close`]), which waits for the in-flight job count to drain.
//!
//! # Lifecycle
//!
//! ```text
//! Open ──init()──▶ Running ──close()──▶ Closed (terminal)
//! ```
//!
//! Transitions are monotonic; an operation whose precondition state does not
//! match fails with [`SessionError::InvalidState`]. Note that `init()` flips
//! the status to Running *before* backend bring-up: if compilation or
//! startup then fails, the session stays Running with no usable backend and
//! there is no edge back to Open. That ordering is carried over from the
//! lifecycle this design reproduces and is intentionally left unresolved.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use jobflow::blob::BlobHandle;
//! use jobflow::config::SessionConfig;
//! use jobflow::function::FunctionDescriptor;
//! use jobflow::session::Session;
//! # async fn example(backend: Arc<dyn jobflow::backend::ExecutionBackend>) -> Result<(), jobflow::session::SessionError> {
//! let session = Session::new(backend, SessionConfig::default());
//! session.add_job(
//!     FunctionDescriptor::new("train_step")
//!         .with_input("images")
//!         .with_output(BlobHandle::new("loss")),
//! )?;
//! session.init().await?;
//!
//! let outputs = session
//!     .launch_user_job("train_step", vec![Box::new(|slot| slot.write(&[0u8; 16]))])
//!     .await?;
//! assert_eq!(outputs[0].op_name(), "loss");
//!
//! session.sync().await?;
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::{Arc, OnceLock};

use miette::Diagnostic;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

use crate::backend::{BackendError, ExecutionBackend, InterUserJobInfo};
use crate::barrier::JobBarrier;
use crate::blob::{BlobHandle, BlobSlot, PullFn, PushFn, WatchFn};
use crate::config::SessionConfig;
use crate::function::FunctionDescriptor;
use crate::future::FutureOutputs;
use crate::job::JobInstance;
use crate::stash::{StashError, VariableStash};
use crate::utils::id_generator::IdGenerator;

/// Lifecycle state of a session. Monotonic: Open → Running → Closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    /// Functions may be registered; nothing can run.
    Open,
    /// Backend is (or should be) live; jobs may be launched.
    Running,
    /// Terminal. The backend has been stopped and destroyed.
    Closed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Running => write!(f, "running"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Execution strategy selected during `init()`, from the backend's eager
/// flag. Graph mode compiles every registered function and requires at
/// least one; eager mode skips compilation and startup entirely (per-op
/// dispatch happens elsewhere).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionMode {
    Graph,
    Eager,
}

impl ExecutionMode {
    fn detect(backend: &dyn ExecutionBackend) -> Self {
        if backend.eager_execution_enabled() {
            Self::Eager
        } else {
            Self::Graph
        }
    }
}

/// Errors surfaced by session operations.
///
/// State-precondition violations and duplicate stash writes are caller
/// contract bugs; they are reported as errors rather than panics so tests
/// and embedders can observe them, but nothing in the session retries or
/// recovers from them.
#[derive(Debug, Error, Diagnostic)]
pub enum SessionError {
    #[error("{operation} requires a {expected} session, but the session is {actual}")]
    #[diagnostic(
        code(jobflow::session::invalid_state),
        help("Session lifecycle is open -> running -> closed; check the call ordering.")
    )]
    InvalidState {
        operation: &'static str,
        expected: SessionStatus,
        actual: SessionStatus,
    },

    #[error("no function registered under job name '{job_name}'")]
    #[diagnostic(code(jobflow::session::unknown_function))]
    UnknownFunction { job_name: String },

    #[error("no functions registered; graph mode requires at least one")]
    #[diagnostic(
        code(jobflow::session::no_functions),
        help("Register functions with add_job() before init(), or enable eager execution.")
    )]
    NoFunctionsRegistered,

    #[error("job '{job_name}' declares {expected} inputs but {actual} arguments were supplied")]
    #[diagnostic(code(jobflow::session::input_arity))]
    InputArity {
        job_name: String,
        expected: usize,
        actual: usize,
    },

    #[error("inter-user-job info is not populated for this session")]
    #[diagnostic(
        code(jobflow::session::job_info_unavailable),
        help("Push/pull dispatch needs a graph-mode init(); eager sessions have no job tables.")
    )]
    InterJobInfoUnavailable,

    #[error("operator '{op_name}' has no push job in the compiled plan")]
    #[diagnostic(code(jobflow::session::unknown_push_operator))]
    UnknownPushOperator { op_name: String },

    #[error("operator '{op_name}' has no pull job in the compiled plan")]
    #[diagnostic(code(jobflow::session::unknown_pull_operator))]
    UnknownPullOperator { op_name: String },

    #[error("no watch callback registered under key {key}")]
    #[diagnostic(code(jobflow::session::unknown_watch_callback))]
    UnknownWatchCallback { key: Uuid },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Stash(#[from] StashError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Backend(#[from] BackendError),
}

/// Session state machine coordinating registration, compilation, launch,
/// and teardown against an injected [`ExecutionBackend`].
///
/// All methods take `&self`; the session is safe to share behind an `Arc`
/// across the caller thread and backend callback threads.
pub struct Session {
    id: String,
    backend: Arc<dyn ExecutionBackend>,
    status: Mutex<SessionStatus>,
    config: Mutex<SessionConfig>,
    functions: Mutex<FxHashMap<String, FunctionDescriptor>>,
    flag_defaults: FxHashMap<String, serde_json::Value>,
    inter_user_job_info: OnceLock<InterUserJobInfo>,
    mode: OnceLock<ExecutionMode>,
    barrier: Arc<JobBarrier>,
    stash: VariableStash<BlobHandle>,
    watch_callbacks: Mutex<FxHashMap<Uuid, Arc<Mutex<WatchFn>>>>,
}

impl Session {
    /// Create an Open session over `backend`. Function-config flag defaults
    /// are captured from the backend once, here.
    #[must_use]
    pub fn new(backend: Arc<dyn ExecutionBackend>, config: SessionConfig) -> Self {
        let flag_defaults = backend.function_config_defaults();
        Self {
            id: IdGenerator::new().generate_session_id(),
            backend,
            status: Mutex::new(SessionStatus::Open),
            config: Mutex::new(config),
            functions: Mutex::new(FxHashMap::default()),
            flag_defaults,
            inter_user_job_info: OnceLock::new(),
            mode: OnceLock::new(),
            barrier: Arc::new(JobBarrier::new()),
            stash: VariableStash::new(),
            watch_callbacks: Mutex::new(FxHashMap::default()),
        }
    }

    /// Generated identifier, used in tracing fields only.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        *self.status.lock()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status() == SessionStatus::Running
    }

    /// Snapshot of the (possibly normalized) resource configuration.
    #[must_use]
    pub fn config(&self) -> SessionConfig {
        self.config.lock().clone()
    }

    /// Backend-supplied per-function flag defaults, captured at construction.
    #[must_use]
    pub fn function_flag_defaults(&self) -> &FxHashMap<String, serde_json::Value> {
        &self.flag_defaults
    }

    /// Execution strategy, populated by `init()`.
    #[must_use]
    pub fn execution_mode(&self) -> Option<ExecutionMode> {
        self.mode.get().copied()
    }

    /// Push/pull job tables, populated by a graph-mode `init()`.
    #[must_use]
    pub fn inter_user_job_info(&self) -> Option<&InterUserJobInfo> {
        self.inter_user_job_info.get()
    }

    /// Number of launched jobs whose completion has not yet been signalled.
    #[must_use]
    pub fn running_jobs(&self) -> usize {
        self.barrier.count()
    }

    #[must_use]
    pub fn any_function_defined(&self) -> bool {
        !self.functions.lock().is_empty()
    }

    /// Registered descriptor for `job_name`, if any.
    #[must_use]
    pub fn function_descriptor(&self, job_name: &str) -> Option<FunctionDescriptor> {
        self.functions.lock().get(job_name).cloned()
    }

    fn require_status(
        &self,
        operation: &'static str,
        expected: SessionStatus,
    ) -> Result<(), SessionError> {
        let actual = self.status();
        if actual == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                operation,
                expected,
                actual,
            })
        }
    }

    /// Register one function. Requires Open. Re-registering a name replaces
    /// the previous descriptor; last write wins.
    #[instrument(skip(self, descriptor), fields(session = %self.id, job = descriptor.name()), err)]
    pub fn add_job(&self, descriptor: FunctionDescriptor) -> Result<(), SessionError> {
        self.require_status("add_job", SessionStatus::Open)?;
        let name = descriptor.name().to_string();
        if self.functions.lock().insert(name.clone(), descriptor).is_some() {
            tracing::debug!(job = %name, "function redefined; last write wins");
        }
        Ok(())
    }

    /// `init()` if the session is still Open; otherwise a no-op.
    pub async fn try_init(&self) -> Result<(), SessionError> {
        if self.status() == SessionStatus::Open {
            self.init().await?;
        }
        Ok(())
    }

    /// Transition Open → Running and bring the backend up.
    ///
    /// The status flips to Running first; environment bring-up, config
    /// normalization, global-session init, and (in graph mode) compilation +
    /// startup follow. A failure in any of those leaves the session Running
    /// with a partially-initialized backend: a known gap with no recovery
    /// edge, and callers own that state.
    #[instrument(skip(self), fields(session = %self.id), err)]
    pub async fn init(&self) -> Result<(), SessionError> {
        {
            let mut status = self.status.lock();
            if *status != SessionStatus::Open {
                return Err(SessionError::InvalidState {
                    operation: "init",
                    expected: SessionStatus::Open,
                    actual: *status,
                });
            }
            *status = SessionStatus::Running;
        }

        if !self.backend.is_environment_initialized() {
            self.backend.initialize_environment().await?;
        }

        // Normalization must land before the backend sees the config.
        let config = {
            let mut config = self.config.lock();
            config.normalize(&self.backend.environment_machines());
            config.clone()
        };
        self.backend.init_global_session(&config).await?;

        let mode = ExecutionMode::detect(self.backend.as_ref());
        match mode {
            ExecutionMode::Graph => self.bring_up_graph(&config).await?,
            ExecutionMode::Eager => {
                tracing::debug!(session = %self.id, "eager execution enabled; compilation and startup skipped");
            }
        }
        let _ = self.mode.set(mode);

        tracing::info!(session = %self.id, mode = ?mode, "session running");
        Ok(())
    }

    /// Graph-mode bring-up: compile every registered function, start the
    /// global session, capture the push/pull job tables.
    async fn bring_up_graph(&self, config: &SessionConfig) -> Result<(), SessionError> {
        let descriptors: Vec<FunctionDescriptor> =
            self.functions.lock().values().cloned().collect();
        if descriptors.is_empty() {
            return Err(SessionError::NoFunctionsRegistered);
        }
        for descriptor in &descriptors {
            let plan = self.backend.compile(descriptor, config).await?;
            tracing::debug!(session = %self.id, job = plan.job_name(), "function compiled");
        }
        self.backend.start_global_session().await?;
        let info = self.backend.inter_user_job_info()?;
        let _ = self.inter_user_job_info.set(info);
        Ok(())
    }

    /// `close()` if the session is Running; otherwise a no-op.
    pub async fn try_close(&self) -> Result<(), SessionError> {
        if self.status() == SessionStatus::Running {
            self.close().await?;
        }
        Ok(())
    }

    /// Drain all in-flight jobs, tear the backend down, transition to
    /// Closed. Requires Running.
    #[instrument(skip(self), fields(session = %self.id), err)]
    pub async fn close(&self) -> Result<(), SessionError> {
        self.require_status("close", SessionStatus::Running)?;
        self.sync().await?;
        self.backend.stop_global_session().await?;
        self.backend.destroy_global_session().await?;
        *self.status.lock() = SessionStatus::Closed;
        tracing::info!(session = %self.id, "session closed");
        Ok(())
    }

    /// Wait until every launched job has signalled completion. Requires
    /// Running. The wait predicate is re-checked after every wake.
    #[instrument(skip(self), fields(session = %self.id), err)]
    pub async fn sync(&self) -> Result<(), SessionError> {
        self.require_status("sync", SessionStatus::Running)?;
        self.barrier.wait_idle().await;
        Ok(())
    }

    /// Push each argument to its input operator, launch the user job, and
    /// return the output handles the binding step recorded on the
    /// descriptor. Arguments are zipped positionally against the
    /// descriptor's declared inputs.
    #[instrument(skip(self, args), fields(session = %self.id, job = job_name), err)]
    pub async fn launch_user_job(
        &self,
        job_name: &str,
        args: Vec<PushFn>,
    ) -> Result<Vec<BlobHandle>, SessionError> {
        self.require_status("launch_user_job", SessionStatus::Running)?;
        let descriptor =
            self.function_descriptor(job_name)
                .ok_or_else(|| SessionError::UnknownFunction {
                    job_name: job_name.to_string(),
                })?;
        if args.len() != descriptor.input_ops().len() {
            return Err(SessionError::InputArity {
                job_name: job_name.to_string(),
                expected: descriptor.input_ops().len(),
                actual: args.len(),
            });
        }
        for (op_name, push_cb) in descriptor.input_ops().iter().zip(args) {
            self.async_push(op_name, push_cb).await?;
        }
        self.launch_job(JobInstance::user(job_name)).await?;
        Ok(descriptor.outputs().to_vec())
    }

    /// Count the instance and hand it to the backend. Requires Running.
    ///
    /// The running-job count is incremented before the handoff and a
    /// decrement hook is registered on the instance, so no completion can
    /// outrun its own count and `sync()` can never observe a premature zero.
    pub async fn launch_job(&self, mut instance: JobInstance) -> Result<(), SessionError> {
        self.require_status("launch_job", SessionStatus::Running)?;
        self.barrier.increment();
        {
            let barrier = Arc::clone(&self.barrier);
            instance.add_post_finish_callback(move || barrier.decrement());
        }
        tracing::debug!(
            session = %self.id,
            job = instance.job_name(),
            kind = ?instance.kind(),
            in_flight = self.barrier.count(),
            "job handed to backend"
        );
        if let Err(err) = self.backend.launch_job(instance).await {
            // The instance never reached the executor and its finish hook
            // will not fire; undo the count so the barrier can still drain.
            self.barrier.decrement();
            return Err(err.into());
        }
        Ok(())
    }

    /// Launch the push job bound to `op_name`, carrying `push_cb` for the
    /// backend to invoke when it is ready to receive the data.
    pub async fn async_push(&self, op_name: &str, push_cb: PushFn) -> Result<(), SessionError> {
        self.require_status("async_push", SessionStatus::Running)?;
        let info = self
            .inter_user_job_info
            .get()
            .ok_or(SessionError::InterJobInfoUnavailable)?;
        let push_job_name =
            info.push_job_name(op_name)
                .ok_or_else(|| SessionError::UnknownPushOperator {
                    op_name: op_name.to_string(),
                })?;
        self.launch_job(JobInstance::push(push_job_name, op_name, push_cb))
            .await
    }

    /// Launch the pull job bound to `op_name`, carrying `pull_cb` for the
    /// backend to invoke when the output data is ready to be read.
    pub async fn async_pull(&self, op_name: &str, pull_cb: PullFn) -> Result<(), SessionError> {
        self.require_status("async_pull", SessionStatus::Running)?;
        let info = self
            .inter_user_job_info
            .get()
            .ok_or(SessionError::InterJobInfoUnavailable)?;
        let pull_job_name =
            info.pull_job_name(op_name)
                .ok_or_else(|| SessionError::UnknownPullOperator {
                    op_name: op_name.to_string(),
                })?;
        self.launch_job(JobInstance::pull(pull_job_name, op_name, pull_cb))
            .await
    }

    /// Launch `job_name` and wrap its outputs in a [`FutureOutputs`] handle,
    /// or `None` when the descriptor records no outputs.
    pub async fn lazy_run(
        &self,
        job_name: &str,
        args: Vec<PushFn>,
    ) -> Result<Option<FutureOutputs>, SessionError> {
        self.require_status("lazy_run", SessionStatus::Running)?;
        let outputs = self.launch_user_job(job_name, args).await?;
        if outputs.is_empty() {
            return Ok(None);
        }
        Ok(Some(FutureOutputs::new(outputs)))
    }

    /// Stash a materialized variable handle for `(job_name, var_name)`.
    /// Exactly-once per pair; a duplicate write is a contract violation.
    pub fn stash_variable(
        &self,
        job_name: &str,
        var_name: &str,
        handle: BlobHandle,
    ) -> Result<(), SessionError> {
        self.stash.stash(job_name, var_name, handle)?;
        Ok(())
    }

    /// Stashed handle for `(job_name, var_name)`; `None` is the normal
    /// not-yet-materialized outcome, not an error.
    #[must_use]
    pub fn try_get_variable(&self, job_name: &str, var_name: &str) -> Option<BlobHandle> {
        self.stash.try_get(job_name, var_name)
    }

    /// Register a side-channel callback for watched values. The map is
    /// append-only while the session runs.
    pub fn register_watch_callback(&self, callback: WatchFn) -> Uuid {
        let key = Uuid::new_v4();
        self.watch_callbacks
            .lock()
            .insert(key, Arc::new(Mutex::new(callback)));
        key
    }

    #[must_use]
    pub fn has_watch_callbacks(&self) -> bool {
        !self.watch_callbacks.lock().is_empty()
    }

    /// Deliver a watched value to the callback registered under `key`.
    ///
    /// The map lock is released before the callback runs, so the callback
    /// is free to call back into the session (register another watcher,
    /// query state). Only the per-entry lock is held while it executes.
    pub fn notify_watch(&self, key: Uuid, slot: &BlobSlot) -> Result<(), SessionError> {
        let callback = self
            .watch_callbacks
            .lock()
            .get(&key)
            .map(Arc::clone)
            .ok_or(SessionError::UnknownWatchCallback { key })?;
        (callback.lock())(slot);
        Ok(())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("status", &self.status())
            .field("running_jobs", &self.barrier.count())
            .field("functions", &self.functions.lock().len())
            .field("mode", &self.mode.get())
            .finish()
    }
}
