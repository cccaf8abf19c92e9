//! Descriptor and session fixtures shared across the suites.

use std::sync::Arc;

use jobflow::backend::ExecutionBackend;
use jobflow::blob::{BlobHandle, PushFn};
use jobflow::config::SessionConfig;
use jobflow::function::FunctionDescriptor;
use jobflow::session::Session;

/// Descriptor with one input (`{name}/in0`) and one output (`{name}/out0`).
pub fn unary_fn(name: &str) -> FunctionDescriptor {
    FunctionDescriptor::new(name)
        .with_input(format!("{name}/in0"))
        .with_output(BlobHandle::new(format!("{name}/out0")))
}

/// Descriptor with no inputs and no outputs.
pub fn nullary_fn(name: &str) -> FunctionDescriptor {
    FunctionDescriptor::new(name)
}

/// Push callback writing `bytes` into the transfer slot.
pub fn push_bytes(bytes: Vec<u8>) -> PushFn {
    Box::new(move |slot| slot.write(&bytes))
}

/// Open session over `backend` with the default configuration.
pub fn open_session(backend: Arc<dyn ExecutionBackend>) -> Session {
    Session::new(backend, SessionConfig::default())
}

/// Running session with `f` registered as a unary function.
pub async fn running_session(backend: Arc<dyn ExecutionBackend>) -> Session {
    let session = open_session(backend);
    session.add_job(unary_fn("f")).unwrap();
    session.init().await.unwrap();
    session
}
