pub mod domain;
pub mod frameworks;
pub mod interface_adapters;
pub mod use_cases;

pub use domain::catalog::ErrorCatalog;
pub use domain::{AuthError, AuthOutcome, Credentials, ErrorCode, FlowError, IdentityProvider};
pub use interface_adapters::clients::{IdentityFlowClient, ProviderConfig};
pub use interface_adapters::session_cache::SessionCache;
pub use use_cases::translate_error::translate;
