//! # Jobflow: session lifecycle & asynchronous job execution
//!
//! Jobflow is the coordination layer between user code that defines global
//! functions and a native compute engine that compiles and executes them.
//! The engine is injected behind a trait; this crate owns the lifecycle
//! state machine, the running-job join barrier, push/pull data dispatch,
//! and the per-job variable stash.
//!
//! ## Core Concepts
//!
//! - **Session**: one Open → Running → Closed lifecycle owning the function
//!   registry and job bookkeeping
//! - **JobInstance**: one schedulable unit of backend work (user function,
//!   data push, or data pull)
//! - **ExecutionBackend**: the seam to the native engine; tests inject a
//!   deterministic stub
//! - **JobBarrier**: the counter that makes `sync()` a true drain barrier
//! - **SessionRegistry**: explicit holder of the one ambient session
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use jobflow::backend::{BackendError, CompiledPlan, ExecutionBackend, InterUserJobInfo};
//! use jobflow::blob::BlobHandle;
//! use jobflow::config::SessionConfig;
//! use jobflow::function::FunctionDescriptor;
//! use jobflow::job::JobInstance;
//! use jobflow::session::Session;
//!
//! # struct NullBackend;
//! # #[async_trait::async_trait]
//! # impl ExecutionBackend for NullBackend {
//! #     fn is_environment_initialized(&self) -> bool { true }
//! #     async fn initialize_environment(&self) -> Result<(), BackendError> { Ok(()) }
//! #     fn environment_machines(&self) -> Vec<String> { vec!["localhost".into()] }
//! #     fn eager_execution_enabled(&self) -> bool { false }
//! #     fn set_eager_execution_enabled(&self, _: bool) {}
//! #     fn function_config_defaults(&self) -> rustc_hash::FxHashMap<String, serde_json::Value> { Default::default() }
//! #     async fn init_global_session(&self, _: &SessionConfig) -> Result<(), BackendError> { Ok(()) }
//! #     async fn start_global_session(&self) -> Result<(), BackendError> { Ok(()) }
//! #     async fn stop_global_session(&self) -> Result<(), BackendError> { Ok(()) }
//! #     async fn destroy_global_session(&self) -> Result<(), BackendError> { Ok(()) }
//! #     async fn compile(&self, d: &FunctionDescriptor, _: &SessionConfig) -> Result<CompiledPlan, BackendError> { Ok(CompiledPlan::new(d.name())) }
//! #     fn inter_user_job_info(&self) -> Result<InterUserJobInfo, BackendError> { Ok(InterUserJobInfo::default()) }
//! #     async fn launch_job(&self, instance: JobInstance) -> Result<(), BackendError> { instance.finish(); Ok(()) }
//! # }
//! # async fn demo() -> Result<(), jobflow::session::SessionError> {
//! let backend: Arc<dyn ExecutionBackend> = Arc::new(NullBackend);
//! let session = Session::new(backend, SessionConfig::default());
//!
//! // Functions are registered while the session is open...
//! session.add_job(FunctionDescriptor::new("f").with_output(BlobHandle::new("out")))?;
//!
//! // ...compiled when it transitions to running...
//! session.init().await?;
//!
//! // ...and launched asynchronously; sync() drains the in-flight count.
//! session.launch_user_job("f", vec![]).await?;
//! session.sync().await?;
//! session.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency model
//!
//! The session creates no threads. Callers drive submission; the backend
//! delivers completion callbacks from its own threads. The running-job
//! count is incremented before an instance reaches the backend and
//! decremented from the instance's post-finish hook, so `sync()` can never
//! observe a premature zero. `sync()` (and `close()`, which calls it) is
//! the only blocking operation in the crate.
//!
//! ## Module Guide
//!
//! - [`session`] - Lifecycle state machine and job dispatch (the core)
//! - [`backend`] - The execution-backend trait and its error taxonomy
//! - [`job`] - Job instances and completion hooks
//! - [`barrier`] - Running-job counter with a drain barrier
//! - [`function`] - Function descriptors and config flags
//! - [`blob`] - Opaque handles and transfer buffers
//! - [`future`] - Deferred output resolution via pull jobs
//! - [`stash`] - Write-once per-job variable cache
//! - [`registry`] - Explicit holder of the ambient default session
//! - [`config`] - Resource configuration and normalization
//! - [`telemetry`] - Tracing subscriber bootstrap

pub mod backend;
pub mod barrier;
pub mod blob;
pub mod config;
pub mod function;
pub mod future;
pub mod job;
pub mod registry;
pub mod session;
pub mod stash;
pub mod telemetry;
pub mod utils;
