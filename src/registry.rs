//! Ambient default-session registry.
//!
//! Convenience call sites want "the" session without threading one through
//! every signature. Rather than a global constructed at import time, the
//! registry is an explicit object: build one, keep it where your
//! application keeps its other long-lived state, and hand out
//! [`SessionRegistry::current`] clones. It holds exactly one session at a
//! time; [`SessionRegistry::clear`] swaps in a fresh Open session.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::ExecutionBackend;
use crate::config::SessionConfig;
use crate::session::{Session, SessionError};

/// Process-level slot holding the one ambient [`Session`].
///
/// Construction is expected to happen once, early, on one thread; after
/// that the registry is safe to share.
pub struct SessionRegistry {
    backend: Arc<dyn ExecutionBackend>,
    default_config: SessionConfig,
    current: Mutex<Arc<Session>>,
}

impl SessionRegistry {
    /// Open a registry with one fresh Open session over `backend`.
    #[must_use]
    pub fn open(backend: Arc<dyn ExecutionBackend>, default_config: SessionConfig) -> Self {
        let session = Arc::new(Session::new(Arc::clone(&backend), default_config.clone()));
        tracing::debug!(session = %session.id(), "default session opened");
        Self {
            backend,
            default_config,
            current: Mutex::new(session),
        }
    }

    /// The current ambient session.
    #[must_use]
    pub fn current(&self) -> Arc<Session> {
        Arc::clone(&self.current.lock())
    }

    /// Close the current session if it is running (best-effort; close
    /// errors are logged and swallowed), install a fresh Open session, and
    /// reset the backend's eager-execution flag to disabled.
    pub async fn clear(&self) {
        let previous = self.current();
        if let Err(err) = previous.try_close().await {
            tracing::warn!(
                session = %previous.id(),
                error = %err,
                "closing previous default session failed; replacing it anyway"
            );
        }
        let fresh = Arc::new(Session::new(
            Arc::clone(&self.backend),
            self.default_config.clone(),
        ));
        tracing::debug!(session = %fresh.id(), "default session replaced");
        *self.current.lock() = fresh;
        self.backend.set_eager_execution_enabled(false);
    }

    /// Forward to the current session's `sync()`.
    pub async fn sync(&self) -> Result<(), SessionError> {
        self.current().sync().await
    }
}
