//! The execution backend seam.
//!
//! Everything the session delegates to the native compute engine goes
//! through [`ExecutionBackend`]: environment bring-up, global-session
//! control, compilation, and asynchronous job launch. The trait is the whole
//! boundary; tests inject a deterministic stub, production wires a real
//! engine. The session requires that a launched [`JobInstance`]'s completion
//! path runs exactly once, from whatever thread the backend chooses.

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::config::SessionConfig;
use crate::function::FunctionDescriptor;
use crate::job::JobInstance;

/// Errors surfaced by backend operations.
///
/// All variants are terminal for the triggering call; the session never
/// retries a backend operation.
#[derive(Debug, Error, Diagnostic)]
pub enum BackendError {
    /// Environment bring-up failed.
    #[error("environment initialization failed: {message}")]
    #[diagnostic(code(jobflow::backend::environment))]
    Environment { message: String },

    /// A global-session control operation (init/start/stop/destroy) failed.
    #[error("global session {operation} failed: {message}")]
    #[diagnostic(code(jobflow::backend::session_control))]
    SessionControl {
        operation: &'static str,
        message: String,
    },

    /// Compilation of one registered function failed.
    #[error("compilation of job '{job_name}' failed: {message}")]
    #[diagnostic(
        code(jobflow::backend::compile),
        help("Check the function descriptor and the resource configuration handed to init().")
    )]
    Compile { job_name: String, message: String },

    /// The inter-user-job info table could not be produced.
    #[error("inter-user-job info unavailable: {message}")]
    #[diagnostic(code(jobflow::backend::job_info))]
    JobInfo { message: String },

    /// Handing a job instance to the executor failed.
    #[error("launch of job '{job_name}' failed: {message}")]
    #[diagnostic(code(jobflow::backend::launch))]
    Launch { job_name: String, message: String },
}

/// Opaque receipt for one compiled function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledPlan {
    job_name: String,
}

impl CompiledPlan {
    #[must_use]
    pub fn new(job_name: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
        }
    }

    #[must_use]
    pub fn job_name(&self) -> &str {
        &self.job_name
    }
}

/// Backend-supplied table mapping operator names to the auxiliary push/pull
/// job names that feed or drain them.
///
/// Produced once per global-session start and immutable afterwards; the
/// session captures it during `init()` and resolves every `async_push` /
/// `async_pull` against it.
#[derive(Clone, Debug, Default)]
pub struct InterUserJobInfo {
    push_job_names: FxHashMap<String, String>,
    pull_job_names: FxHashMap<String, String>,
}

impl InterUserJobInfo {
    #[must_use]
    pub fn new(
        push_job_names: FxHashMap<String, String>,
        pull_job_names: FxHashMap<String, String>,
    ) -> Self {
        Self {
            push_job_names,
            pull_job_names,
        }
    }

    /// Push-job name bound to `op_name`, if that operator takes input data.
    #[must_use]
    pub fn push_job_name(&self, op_name: &str) -> Option<&str> {
        self.push_job_names.get(op_name).map(String::as_str)
    }

    /// Pull-job name bound to `op_name`, if that operator produces output.
    #[must_use]
    pub fn pull_job_name(&self, op_name: &str) -> Option<&str> {
        self.pull_job_names.get(op_name).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.push_job_names.is_empty() && self.pull_job_names.is_empty()
    }
}

/// Operations the session requires of the native compute engine.
///
/// `launch_job` is asynchronous in effect as well as signature: it enqueues
/// the instance and returns; the instance's completion callbacks fire later,
/// from backend-owned threads, exactly once per instance. The synchronous
/// query methods (`eager_execution_enabled`, `environment_machines`, ...)
/// must be cheap and non-blocking.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Whether the process-wide environment has already been brought up.
    fn is_environment_initialized(&self) -> bool;

    /// Bring up the process-wide environment. Idempotence is the caller's
    /// concern; the session only calls this when
    /// [`is_environment_initialized`](Self::is_environment_initialized) is false.
    async fn initialize_environment(&self) -> Result<(), BackendError>;

    /// Machines in the environment, used to default an unset machine count.
    fn environment_machines(&self) -> Vec<String>;

    fn eager_execution_enabled(&self) -> bool;

    fn set_eager_execution_enabled(&self, enabled: bool);

    /// Per-function config flags and their default values.
    fn function_config_defaults(&self) -> FxHashMap<String, serde_json::Value>;

    async fn init_global_session(&self, config: &SessionConfig) -> Result<(), BackendError>;

    async fn start_global_session(&self) -> Result<(), BackendError>;

    async fn stop_global_session(&self) -> Result<(), BackendError>;

    async fn destroy_global_session(&self) -> Result<(), BackendError>;

    /// Compile one registered function against the (normalized) session
    /// configuration.
    async fn compile(
        &self,
        descriptor: &FunctionDescriptor,
        config: &SessionConfig,
    ) -> Result<CompiledPlan, BackendError>;

    /// Table of push/pull job names for the started global session.
    fn inter_user_job_info(&self) -> Result<InterUserJobInfo, BackendError>;

    /// Hand an instance to the executor. The backend owns the instance until
    /// it calls [`JobInstance::finish`].
    async fn launch_job(&self, instance: JobInstance) -> Result<(), BackendError>;
}
