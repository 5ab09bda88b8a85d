use std::sync::Arc;

use crate::domain::catalog::ErrorCatalog;
use crate::domain::{AuthError, Credentials, ErrorCode, IdentityProvider};
use crate::interface_adapters::session_cache::SessionCache;
use crate::use_cases::session::{
    SessionResponse, establish_session, invalid_input, validate_password,
};

// Request accepted by the registration use case.
#[derive(Clone)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub scope: String,
}

pub type RegisterResponse = SessionResponse;

// Registration use case with injected dependencies.
pub struct RegisterUseCase<P> {
    pub provider: P,
    pub cache: Arc<SessionCache>,
    pub catalog: Arc<ErrorCatalog>,
}

impl<P> RegisterUseCase<P>
where
    P: IdentityProvider,
{
    pub async fn execute(&self, request: RegisterRequest) -> Result<RegisterResponse, AuthError> {
        let email = request.email.trim();
        validate_email(email)?;
        validate_username(&request.username)?;
        validate_password(&request.password)?;

        let credentials = Credentials::Register {
            email: email.to_string(),
            username: request.username,
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
}

fn validate_email(value: &str) -> Result<(), AuthError> {
    let well_formed = value
        .split_once('@')
        .is_some_and(|(local, domain)| {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !value.chars().any(char::is_whitespace)
        });
    if !well_formed {
        return Err(invalid_input(
            ErrorCode::MalformedEmail,
            ErrorCode::MalformedEmail.default_message(),
        ));
    }
    Ok(())
}

fn validate_username(value: &str) -> Result<(), AuthError> {
    const MIN_LEN: usize = 3;
    const MAX_LEN: usize = 30;

    let len = value.chars().count();
    if !(MIN_LEN..=MAX_LEN).contains(&len) || !value.chars().all(char::is_alphanumeric) {
        return Err(invalid_input(
            ErrorCode::Validation,
            "Username must be 3 to 30 letters or digits",
        ));
    }
    Ok(())
}
