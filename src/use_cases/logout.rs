use std::sync::Arc;

use crate::interface_adapters::session_cache::{REASON_LOGOUT, SessionCache};

// Response returned by the logout use case.
#[derive(Debug, PartialEq, Eq)]
pub struct LogoutResponse {
    pub revoked: bool,
}

// Logout use case; only forgets the locally cached session.
pub struct LogoutUseCase {
    pub cache: Arc<SessionCache>,
}

impl LogoutUseCase {
    pub fn execute(&self, scope: &str, token: &str) -> LogoutResponse {
        let revoked = self.cache.delete(scope, token, REASON_LOGOUT);
        LogoutResponse { revoked }
    }
}
