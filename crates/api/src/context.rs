//! Per-request context extracted by middleware.

use trolley_core::SessionId;

/// The shopper's session, taken from the request and carried as an
/// extension into the handlers.
#[derive(Debug, Clone)]
pub struct SessionContext {
    session_id: SessionId,
}

impl SessionContext {
    pub fn new(session_id: SessionId) -> Self {
        Self { session_id }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }
}
