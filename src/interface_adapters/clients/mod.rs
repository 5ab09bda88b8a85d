// Clients for external services the gateway talks to.
pub mod identity;

pub use identity::{ConfigError, IdentityFlowClient, ProviderConfig};
