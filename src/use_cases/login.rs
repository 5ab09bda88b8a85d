use std::sync::Arc;

use crate::domain::catalog::ErrorCatalog;
use crate::domain::{
    AuthError, CachedSession, Credentials, ErrorCode, IdentityProvider, SessionCredential,
};
use crate::interface_adapters::session_cache::{REASON_EXPIRED, SessionCache, hash_token};
use crate::use_cases::session::{
    SessionResponse, establish_session, invalid_input, validate_password,
};

// Request accepted by the login use case.
#[derive(Clone)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
    // Previously issued session cookie pair, if the client still holds one.
    pub session_token: Option<String>,
    pub scope: String,
}

pub type LoginResponse = SessionResponse;

// Login use case with injected dependencies.
pub struct LoginUseCase<P> {
    pub provider: P,
    pub cache: Arc<SessionCache>,
    pub catalog: Arc<ErrorCatalog>,
}

impl<P> LoginUseCase<P>
where
    P: IdentityProvider,
{
    pub async fn execute(&self, request: LoginRequest) -> Result<LoginResponse, AuthError> {
        let presented = request
            .session_token
            .as_deref()
            .filter(|token| !token.trim().is_empty());
        if let Some(token) = presented {
            if let Some(session) = self.reuse_session(&request.scope, token).await {
                return Ok(session);
            }
        }

        if request.identifier.trim().is_empty() {
            return Err(invalid_input(
                ErrorCode::Validation,
                "Please enter your email or username",
            ));
        }
        validate_password(&request.password)?;

        let credentials = Credentials::Login {
            identifier: request.identifier.trim().to_string(),
            password: request.password,
        };
        establish_session(
            &self.provider,
            &self.cache,
            &self.catalog,
            &request.scope,
            &credentials,
        )
        .await
    }

    // Cache first, then provider introspection. Any failure falls back to a password login.
    async fn reuse_session(&self, scope: &str, token: &str) -> Option<LoginResponse> {
        if let Some(session) = self.cache.get(scope, token) {
            return Some(session.into());
        }

        match self.provider.whoami(&SessionCredential::new(token)).await {
            Ok(Some(identity)) => {
                let session = CachedSession::from_identity(token, identity);
                self.cache.set(scope, session.clone());
                tracing::debug!(token_hash = %hash_token(token), "session revalidated.");
                Some(session.into())
            }
            Ok(None) => {
                self.cache.delete(scope, token, REASON_EXPIRED);
                None
            }
            Err(err) => {
                tracing::warn!(
                    token_hash = %hash_token(token),
                    error = %err,
                    "session introspection failed, falling back to password login."
                );
                None
            }
        }
    }
}
