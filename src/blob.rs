//! Opaque blob surface shared between the session and its backend.
//!
//! The session never interprets tensor data; it only moves it. A
//! [`BlobHandle`] names a value produced or consumed by an operator in a
//! compiled plan, and a [`BlobSlot`] is the staging buffer a push callback
//! fills (or a pull callback reads) when the backend is ready to transfer.

/// Handle naming one operator output (or variable) in a compiled plan.
///
/// Handles are attached to a function descriptor by the binding step that
/// precedes compilation; launching a job returns clones of those handles so
/// callers can pull the corresponding values later.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlobHandle {
    op_name: String,
}

impl BlobHandle {
    pub fn new(op_name: impl Into<String>) -> Self {
        Self {
            op_name: op_name.into(),
        }
    }

    /// Name of the operator this handle refers to.
    #[must_use]
    pub fn op_name(&self) -> &str {
        &self.op_name
    }
}

/// Staging buffer for one data transfer between caller and backend.
///
/// Push callbacks receive `&mut BlobSlot` and write the bytes the backend
/// should feed into the plan; pull callbacks receive `&BlobSlot` holding the
/// bytes the backend drained out of it.
#[derive(Clone, Debug, Default)]
pub struct BlobSlot {
    bytes: Vec<u8>,
}

impl BlobSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn write(&mut self, bytes: &[u8]) {
        self.bytes.clear();
        self.bytes.extend_from_slice(bytes);
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Callback invoked by the backend when a push job is ready to receive data.
pub type PushFn = Box<dyn FnOnce(&mut BlobSlot) + Send + 'static>;

/// Callback invoked by the backend when a pull job has data ready to read.
pub type PullFn = Box<dyn FnOnce(&BlobSlot) + Send + 'static>;

/// Side-channel callback registered for watched values; may fire more than
/// once across launches, hence `FnMut`.
pub type WatchFn = Box<dyn FnMut(&BlobSlot) + Send + 'static>;
