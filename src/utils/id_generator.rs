//! Identifier generation for sessions.

use uuid::Uuid;

/// Generates the identifiers the runtime stamps on sessions for tracing.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdGenerator;

impl IdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Short, collision-resistant session id, e.g. `sess-1f9a2c4d`.
    #[must_use]
    pub fn generate_session_id(&self) -> String {
        let uuid = Uuid::new_v4().simple().to_string();
        format!("sess-{}", &uuid[..8])
    }
}
