use std::{env, time::Duration};

use crate::domain::catalog::{CatalogError, ErrorCatalog};
use crate::interface_adapters::clients::{ConfigError, ProviderConfig};
use crate::interface_adapters::session_cache::DEFAULT_SESSION_TTL;

// Runtime settings read from the environment (a local `.env` is loaded by the binary).

pub fn provider_url() -> String {
    env::var("IDENTITY_PROVIDER_URL").unwrap_or_else(|_| "http://kratos:4433".to_string())
}

// Authority action URLs are rewritten to; `None` keeps the base URL's authority.
pub fn provider_internal_addr() -> Option<String> {
    env::var("IDENTITY_PROVIDER_INTERNAL_ADDR")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn flow_timeout() -> Duration {
    let millis = env::var("IDENTITY_FLOW_TIMEOUT_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|millis| *millis > 0)
        .unwrap_or(30_000);
    Duration::from_millis(millis)
}

pub fn session_cookie_name() -> Option<String> {
    env::var("IDENTITY_SESSION_COOKIE")
        .ok()
        .filter(|value| !value.trim().is_empty())
}

pub fn session_cache_ttl() -> Duration {
    env::var("SESSION_CACHE_TTL_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_SESSION_TTL)
}

// Loads the catalog override when configured, otherwise the bundled one.
pub fn error_catalog() -> Result<ErrorCatalog, CatalogError> {
    match env::var("IDENTITY_ERROR_CATALOG") {
        Ok(path) if !path.trim().is_empty() => ErrorCatalog::from_path(path.trim()),
        _ => ErrorCatalog::builtin(),
    }
}

impl ProviderConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = ProviderConfig::new(&provider_url())?.with_timeout(flow_timeout());
        if let Some(authority) = provider_internal_addr() {
            config = config.with_internal_authority(authority);
        }
        if let Some(name) = session_cookie_name() {
            config = config.with_session_cookie(name);
        }
        Ok(config)
    }
}
