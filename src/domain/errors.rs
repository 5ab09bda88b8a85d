use serde::Deserialize;
use std::fmt;
use thiserror::Error;

// Stable internal error codes handed to clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Validation,
    InvalidCredentials,
    DuplicateIdentity,
    PasswordPolicyViolation,
    MalformedEmail,
    FlowExpired,
    SystemError,
    Unknown,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Validation => "validation",
            ErrorCode::InvalidCredentials => "invalid_credentials",
            ErrorCode::DuplicateIdentity => "duplicate_identity",
            ErrorCode::PasswordPolicyViolation => "password_policy_violation",
            ErrorCode::MalformedEmail => "malformed_email",
            ErrorCode::FlowExpired => "flow_expired",
            ErrorCode::SystemError => "system_error",
            ErrorCode::Unknown => "unknown",
        }
    }

    // Fallback wording when the catalog has no message for the code.
    pub fn default_message(self) -> &'static str {
        match self {
            ErrorCode::Validation => "The submitted information is invalid, please check and retry",
            ErrorCode::InvalidCredentials => "Incorrect username or password",
            ErrorCode::DuplicateIdentity => "An account with these details already exists",
            ErrorCode::PasswordPolicyViolation => "The password does not meet the security policy",
            ErrorCode::MalformedEmail => "The email address is not valid",
            ErrorCode::FlowExpired => "The request expired, please start again",
            ErrorCode::SystemError => "The identity service is unavailable, please retry later",
            ErrorCode::Unknown => "Something went wrong",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Protocol step an adapter failure is attributed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowStep {
    Init,
    Detail,
    Submit,
    Whoami,
}

impl fmt::Display for FlowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FlowStep::Init => "init",
            FlowStep::Detail => "detail",
            FlowStep::Submit => "submit",
            FlowStep::Whoami => "whoami",
        })
    }
}

// Internal failures of the identity flow adapter.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("identity provider unreachable during {step}: {source}")]
    Transport {
        step: FlowStep,
        #[source]
        source: reqwest::Error,
    },
    #[error("identity flow deadline exceeded during {step}")]
    Deadline { step: FlowStep },
    #[error("identity provider response undecodable during {step}: {reason}")]
    Decode { step: FlowStep, reason: String },
    #[error("identity provider protocol mismatch during {step}: {reason}")]
    Protocol { step: FlowStep, reason: String },
    #[error("identity provider returned unexpected status {status} during {step}")]
    UnexpectedStatus {
        step: FlowStep,
        status: u16,
        body: String,
    },
    #[error("identity provider rejected the credentials with status {status}")]
    CredentialsRejected { status: u16 },
}

impl FlowError {
    pub fn step(&self) -> FlowStep {
        match self {
            FlowError::Transport { step, .. }
            | FlowError::Deadline { step }
            | FlowError::Decode { step, .. }
            | FlowError::Protocol { step, .. }
            | FlowError::UnexpectedStatus { step, .. } => *step,
            FlowError::CredentialsRejected { .. } => FlowStep::Submit,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            FlowError::CredentialsRejected { .. } => ErrorCode::InvalidCredentials,
            _ => ErrorCode::SystemError,
        }
    }

    // Transient failures the caller may retry; protocol mismatches are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            FlowError::Transport { .. } | FlowError::Deadline { .. } | FlowError::Decode { .. } => {
                true
            }
            FlowError::UnexpectedStatus { status, .. } => *status >= 500,
            FlowError::Protocol { .. } | FlowError::CredentialsRejected { .. } => false,
        }
    }
}

// Error reported by the auth use cases to the presentation layer.
#[derive(Debug)]
pub enum AuthError {
    // Caller input failed local checks before reaching the provider.
    InvalidInput { code: ErrorCode, message: String },
    // Provider rejected the attempt; already translated.
    Rejected { code: ErrorCode, message: String },
    Upstream(FlowError),
}

impl AuthError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AuthError::InvalidInput { code, .. } | AuthError::Rejected { code, .. } => *code,
            AuthError::Upstream(err) => err.code(),
        }
    }

    pub fn user_message(&self) -> &str {
        match self {
            AuthError::InvalidInput { message, .. } | AuthError::Rejected { message, .. } => {
                message
            }
            AuthError::Upstream(err) => err.code().default_message(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            AuthError::InvalidInput { .. } => false,
            AuthError::Rejected { code, .. } => *code == ErrorCode::FlowExpired,
            AuthError::Upstream(err) => err.is_retryable(),
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidInput { code, message } => write!(f, "invalid input ({code}): {message}"),
            AuthError::Rejected { code, message } => write!(f, "rejected ({code}): {message}"),
            AuthError::Upstream(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<FlowError> for AuthError {
    fn from(err: FlowError) -> Self {
        AuthError::Upstream(err)
    }
}
