//! Deterministic execution backend used across the integration suites.
//!
//! `StubBackend` records every control call, compiles descriptors into
//! push/pull job tables the way a real engine would, and completes launched
//! instances either immediately or only when a test calls
//! [`StubBackend::complete_one`] / [`StubBackend::complete_all`]. That makes
//! barrier and lifecycle behavior observable without any real executor.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use jobflow::backend::{
    BackendError, CompiledPlan, ExecutionBackend, InterUserJobInfo,
};
use jobflow::blob::BlobSlot;
use jobflow::config::SessionConfig;
use jobflow::function::FunctionDescriptor;
use jobflow::job::{JobInstance, JobKind};

/// How the stub disposes of launched instances.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionMode {
    /// Run data callbacks and finish the instance inside `launch_job`.
    Immediate,
    /// Park the instance; the test completes it explicitly.
    Held,
}

pub struct StubBackend {
    mode: CompletionMode,
    env_initialized: AtomicBool,
    eager: AtomicBool,
    machines: Mutex<Vec<String>>,

    compiled: Mutex<Vec<FunctionDescriptor>>,
    held: Mutex<Vec<JobInstance>>,
    launched: Mutex<Vec<String>>,
    pushed: Mutex<FxHashMap<String, Vec<u8>>>,
    pull_data: Mutex<FxHashMap<String, Vec<u8>>>,
    last_config: Mutex<Option<SessionConfig>>,

    env_inits: AtomicUsize,
    global_inits: AtomicUsize,
    starts: AtomicUsize,
    stops: AtomicUsize,
    destroys: AtomicUsize,

    fail_start: AtomicBool,
    fail_launch: AtomicBool,
    fail_compile_job: Mutex<Option<String>>,
}

impl StubBackend {
    pub fn new(mode: CompletionMode) -> Self {
        Self {
            mode,
            env_initialized: AtomicBool::new(false),
            eager: AtomicBool::new(false),
            machines: Mutex::new(vec!["machine-0".to_string()]),
            compiled: Mutex::new(Vec::new()),
            held: Mutex::new(Vec::new()),
            launched: Mutex::new(Vec::new()),
            pushed: Mutex::new(FxHashMap::default()),
            pull_data: Mutex::new(FxHashMap::default()),
            last_config: Mutex::new(None),
            env_inits: AtomicUsize::new(0),
            global_inits: AtomicUsize::new(0),
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            destroys: AtomicUsize::new(0),
            fail_start: AtomicBool::new(false),
            fail_launch: AtomicBool::new(false),
            fail_compile_job: Mutex::new(None),
        }
    }

    /// Stub that completes every instance inside `launch_job`.
    pub fn immediate() -> Self {
        Self::new(CompletionMode::Immediate)
    }

    /// Stub that parks instances until the test completes them.
    pub fn held() -> Self {
        Self::new(CompletionMode::Held)
    }

    pub fn with_machines(self, machines: Vec<String>) -> Self {
        *self.machines.lock() = machines;
        self
    }

    pub fn with_eager(self) -> Self {
        self.eager.store(true, Ordering::SeqCst);
        self
    }

    /// Make `start_global_session` fail once armed.
    pub fn arm_start_failure(&self) {
        self.fail_start.store(true, Ordering::SeqCst);
    }

    /// Make every `launch_job` fail once armed.
    pub fn arm_launch_failure(&self) {
        self.fail_launch.store(true, Ordering::SeqCst);
    }

    /// Make compilation of `job_name` fail.
    pub fn arm_compile_failure(&self, job_name: &str) {
        *self.fail_compile_job.lock() = Some(job_name.to_string());
    }

    /// Bytes to serve when the pull job for `op_name` runs. Without an entry
    /// the stub echoes whatever was last pushed under the same operator name.
    pub fn set_pull_data(&self, op_name: &str, bytes: Vec<u8>) {
        self.pull_data.lock().insert(op_name.to_string(), bytes);
    }

    /// Job names in launch order.
    pub fn launched_jobs(&self) -> Vec<String> {
        self.launched.lock().clone()
    }

    /// Bytes the push callback wrote for `op_name`, once the push job ran.
    pub fn pushed_bytes(&self, op_name: &str) -> Option<Vec<u8>> {
        self.pushed.lock().get(op_name).cloned()
    }

    pub fn compiled_job_names(&self) -> Vec<String> {
        self.compiled
            .lock()
            .iter()
            .map(|d| d.name().to_string())
            .collect()
    }

    pub fn held_len(&self) -> usize {
        self.held.lock().len()
    }

    /// Complete the oldest parked instance. Returns `false` when none is
    /// parked.
    pub fn complete_one(&self) -> bool {
        let instance = {
            let mut held = self.held.lock();
            if held.is_empty() {
                return false;
            }
            held.remove(0)
        };
        self.run_instance(instance);
        true
    }

    /// Complete every parked instance, oldest first.
    pub fn complete_all(&self) {
        while self.complete_one() {}
    }

    pub fn env_init_count(&self) -> usize {
        self.env_inits.load(Ordering::SeqCst)
    }

    pub fn global_init_count(&self) -> usize {
        self.global_inits.load(Ordering::SeqCst)
    }

    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn destroy_count(&self) -> usize {
        self.destroys.load(Ordering::SeqCst)
    }

    /// Configuration the session handed to `init_global_session`.
    pub fn last_config(&self) -> Option<SessionConfig> {
        self.last_config.lock().clone()
    }

    fn run_instance(&self, mut instance: JobInstance) {
        match instance.kind().clone() {
            JobKind::User => {}
            JobKind::Push { op_name } => {
                let mut slot = BlobSlot::new();
                instance.run_push_callback(&mut slot);
                self.pushed.lock().insert(op_name, slot.bytes().to_vec());
            }
            JobKind::Pull { op_name } => {
                let bytes = self
                    .pull_data
                    .lock()
                    .get(&op_name)
                    .cloned()
                    .or_else(|| self.pushed.lock().get(&op_name).cloned())
                    .unwrap_or_default();
                let slot = BlobSlot::from_bytes(bytes);
                instance.run_pull_callback(&slot);
            }
        }
        instance.finish();
    }
}

#[async_trait]
impl ExecutionBackend for StubBackend {
    fn is_environment_initialized(&self) -> bool {
        self.env_initialized.load(Ordering::SeqCst)
    }

    async fn initialize_environment(&self) -> Result<(), BackendError> {
        self.env_inits.fetch_add(1, Ordering::SeqCst);
        self.env_initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn environment_machines(&self) -> Vec<String> {
        self.machines.lock().clone()
    }

    fn eager_execution_enabled(&self) -> bool {
        self.eager.load(Ordering::SeqCst)
    }

    fn set_eager_execution_enabled(&self, enabled: bool) {
        self.eager.store(enabled, Ordering::SeqCst);
    }

    fn function_config_defaults(&self) -> FxHashMap<String, serde_json::Value> {
        let mut defaults = FxHashMap::default();
        defaults.insert("enable_inplace".to_string(), serde_json::json!(true));
        defaults.insert(
            "enable_auto_mixed_precision".to_string(),
            serde_json::json!(false),
        );
        defaults
    }

    async fn init_global_session(&self, config: &SessionConfig) -> Result<(), BackendError> {
        self.global_inits.fetch_add(1, Ordering::SeqCst);
        *self.last_config.lock() = Some(config.clone());
        Ok(())
    }

    async fn start_global_session(&self) -> Result<(), BackendError> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(BackendError::SessionControl {
                operation: "start",
                message: "armed start failure".to_string(),
            });
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop_global_session(&self) -> Result<(), BackendError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn destroy_global_session(&self) -> Result<(), BackendError> {
        self.destroys.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn compile(
        &self,
        descriptor: &FunctionDescriptor,
        _config: &SessionConfig,
    ) -> Result<CompiledPlan, BackendError> {
        if self.fail_compile_job.lock().as_deref() == Some(descriptor.name()) {
            return Err(BackendError::Compile {
                job_name: descriptor.name().to_string(),
                message: "armed compile failure".to_string(),
            });
        }
        self.compiled.lock().push(descriptor.clone());
        Ok(CompiledPlan::new(descriptor.name()))
    }

    fn inter_user_job_info(&self) -> Result<InterUserJobInfo, BackendError> {
        let mut push_job_names = FxHashMap::default();
        let mut pull_job_names = FxHashMap::default();
        for descriptor in self.compiled.lock().iter() {
            for op_name in descriptor.input_ops() {
                push_job_names
                    .insert(op_name.clone(), format!("System-Push-{op_name}"));
            }
            for handle in descriptor.outputs() {
                pull_job_names.insert(
                    handle.op_name().to_string(),
                    format!("System-Pull-{}", handle.op_name()),
                );
            }
        }
        Ok(InterUserJobInfo::new(push_job_names, pull_job_names))
    }

    async fn launch_job(&self, instance: JobInstance) -> Result<(), BackendError> {
        if self.fail_launch.load(Ordering::SeqCst) {
            return Err(BackendError::Launch {
                job_name: instance.job_name().to_string(),
                message: "armed launch failure".to_string(),
            });
        }
        self.launched.lock().push(instance.job_name().to_string());
        match self.mode {
            CompletionMode::Immediate => self.run_instance(instance),
            CompletionMode::Held => self.held.lock().push(instance),
        }
        Ok(())
    }
}
