// Framework bootstrap for the login probe binary.

use std::process::ExitCode;
use std::sync::Arc;

use crate::domain::ErrorCode;
use crate::frameworks::{config, telemetry};
use crate::interface_adapters::clients::{IdentityFlowClient, ProviderConfig};
use crate::interface_adapters::session_cache::{
    CacheCounters, SessionCache, SystemClock, hash_token,
};
use crate::use_cases::{LoginRequest, LoginUseCase};

const PROBE_SCOPE: &str = "probe";

pub async fn run() -> ExitCode {
    // Load .env locally; safe to ignore when not present.
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let provider_config = match ProviderConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "invalid identity provider configuration");
            return ExitCode::FAILURE;
        }
    };
    let catalog = match config::error_catalog() {
        Ok(catalog) => catalog,
        Err(err) => {
            tracing::error!(error = %err, "failed to load error catalog");
            return ExitCode::FAILURE;
        }
    };
    let (Ok(identifier), Ok(password)) = (
        std::env::var("PROBE_IDENTIFIER"),
        std::env::var("PROBE_PASSWORD"),
    ) else {
        tracing::error!("PROBE_IDENTIFIER and PROBE_PASSWORD must be set");
        return ExitCode::FAILURE;
    };

    tracing::info!(
        provider = %provider_config.base_url,
        internal_authority = %provider_config.internal_authority,
        timeout_ms = provider_config.timeout.as_millis() as u64,
        "probing identity provider"
    );

    let counters = Arc::new(CacheCounters::default());
    let cache = SessionCache::with_dependencies(
        config::session_cache_ttl(),
        Arc::new(SystemClock),
        counters.clone(),
    );
    let use_case = LoginUseCase {
        provider: IdentityFlowClient::new(provider_config),
        cache: Arc::new(cache),
        catalog: Arc::new(catalog),
    };

    let result = use_case
        .execute(LoginRequest {
            identifier,
            password,
            session_token: None,
            scope: PROBE_SCOPE.to_string(),
        })
        .await;

    match result {
        Ok(session) => {
            tracing::info!(
                user_id = %session.user_id,
                username = %session.username,
                token_hash = %hash_token(&session.session_token),
                cache = ?counters.snapshot(),
                "probe login succeeded"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            let code = err.code();
            if code == ErrorCode::SystemError {
                tracing::error!(
                    error = %err,
                    retryable = err.is_retryable(),
                    "probe login failed"
                );
            } else {
                tracing::warn!(%code, message = err.user_message(), "probe login rejected");
            }
            ExitCode::FAILURE
        }
    }
}
