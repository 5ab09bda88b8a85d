use crate::domain::catalog::ErrorCatalog;
use crate::domain::{
    AuthError, AuthOutcome, CachedSession, Credentials, ErrorCode, FlowError, FlowStep,
    IdentityProvider,
};
use crate::interface_adapters::session_cache::{SessionCache, hash_token};
use crate::use_cases::translate_error::translate;

const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 128;

// Response returned by the login and registration use cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResponse {
    pub session_token: String,
    pub user_id: String,
    pub username: String,
    pub email: String,
}

impl From<CachedSession> for SessionResponse {
    fn from(session: CachedSession) -> Self {
        Self {
            session_token: session.token,
            user_id: session.user_id,
            username: session.username,
            email: session.email,
        }
    }
}

// Runs the provider flow, resolves the identity and caches the new session.
pub(crate) async fn establish_session<P>(
    provider: &P,
    cache: &SessionCache,
    catalog: &ErrorCatalog,
    scope: &str,
    credentials: &Credentials,
) -> Result<SessionResponse, AuthError>
where
    P: IdentityProvider,
{
    let credential = match provider.authenticate(credentials).await? {
        AuthOutcome::Session(credential) => credential,
        AuthOutcome::Rejected(payload) => {
            let translation = translate(&payload, catalog);
            return Err(AuthError::Rejected {
                code: translation.code,
                message: translation.message,
            });
        }
    };

    let identity = provider
        .whoami(&credential)
        .await?
        .ok_or(FlowError::Protocol {
            step: FlowStep::Whoami,
            reason: "fresh session has no identity".to_string(),
        })?;

    let session = CachedSession::from_identity(credential.cookie_pair(), identity);
    tracing::info!(
        kind = %credentials.kind(),
        user_id = %session.user_id,
        token_hash = %hash_token(&session.token),
        "session established."
    );
    cache.set(scope, session.clone());
    Ok(session.into())
}

pub(crate) fn validate_password(password: &str) -> Result<(), AuthError> {
    let len = password.chars().count();
    if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
        return Err(invalid_input(
            ErrorCode::Validation,
            "Password must be between 8 and 128 characters",
        ));
    }
    Ok(())
}

pub(crate) fn invalid_input(code: ErrorCode, message: &str) -> AuthError {
    AuthError::InvalidInput {
        code,
        message: message.to_string(),
    }
}
