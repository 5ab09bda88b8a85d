pub mod catalog;
pub mod entities;
pub mod errors;
pub mod ports;

// Re-export the domain boundary types and ports.
pub use entities::{
    AuthOutcome, CachedSession, Credentials, FlowHandle, FlowKind, Identity, ProviderMessage,
    RawErrorPayload, SessionCredential,
};
pub use errors::{AuthError, ErrorCode, FlowError, FlowStep};
pub use ports::{CacheMetrics, Clock, IdentityProvider};
