//! Function descriptors: what the session compiles and launches.
//!
//! A descriptor is the caller-facing record of one global function: its job
//! name, the ordered input operator names that must be pushed before the job
//! runs, the output blob handles attached by the binding step, and any
//! per-function config flags. Descriptors are registered while a session is
//! open and become read-only once it is running.

use rustc_hash::FxHashMap;

use crate::blob::BlobHandle;

/// Descriptor for one registered global function.
///
/// Built fluently:
///
/// ```
/// use jobflow::function::FunctionDescriptor;
/// use jobflow::blob::BlobHandle;
///
/// let desc = FunctionDescriptor::new("train_step")
///     .with_input("images")
///     .with_input("labels")
///     .with_output(BlobHandle::new("loss"))
///     .with_flag("enable_auto_mixed_precision", serde_json::json!(true));
///
/// assert_eq!(desc.name(), "train_step");
/// assert_eq!(desc.input_ops().len(), 2);
/// ```
#[derive(Clone, Debug, Default)]
pub struct FunctionDescriptor {
    name: String,
    input_ops: Vec<String>,
    outputs: Vec<BlobHandle>,
    flags: FxHashMap<String, serde_json::Value>,
}

impl FunctionDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Declared job name; the registry key.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append one input operator name. Order matters: launch arguments are
    /// zipped against this list positionally.
    #[must_use]
    pub fn with_input(mut self, op_name: impl Into<String>) -> Self {
        self.input_ops.push(op_name.into());
        self
    }

    /// Append one output blob handle, as recorded by the binding step.
    #[must_use]
    pub fn with_output(mut self, handle: BlobHandle) -> Self {
        self.outputs.push(handle);
        self
    }

    /// Set one per-function config flag.
    #[must_use]
    pub fn with_flag(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.flags.insert(name.into(), value);
        self
    }

    #[must_use]
    pub fn input_ops(&self) -> &[String] {
        &self.input_ops
    }

    #[must_use]
    pub fn outputs(&self) -> &[BlobHandle] {
        &self.outputs
    }

    #[must_use]
    pub fn flags(&self) -> &FxHashMap<String, serde_json::Value> {
        &self.flags
    }

    /// Flag value for `name`, if set on this function.
    #[must_use]
    pub fn flag(&self, name: &str) -> Option<&serde_json::Value> {
        self.flags.get(name)
    }
}
