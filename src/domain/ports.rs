use async_trait::async_trait;
use std::time::Instant;

use crate::domain::entities::{AuthOutcome, Credentials, Identity, SessionCredential};
use crate::domain::errors::FlowError;

// Port for the external identity provider; use cases depend on this, not on the HTTP client.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    // Run one login or registration flow end-to-end.
    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthOutcome, FlowError>;

    // Resolve a session credential to its identity; `None` when the provider no longer knows it.
    async fn whoami(&self, credential: &SessionCredential) -> Result<Option<Identity>, FlowError>;
}

// Port for retrieving the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

// Port for session cache telemetry. Labels only; never raw tokens.
pub trait CacheMetrics: Send + Sync {
    fn hit(&self, scope: &str);
    fn miss(&self, scope: &str);
    fn evicted(&self, scope: &str, reason: &str);
}
