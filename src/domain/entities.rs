use serde::Deserialize;
use std::fmt;

// Which self-service flow the provider should run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowKind {
    Login,
    Registration,
}

impl FlowKind {
    // Path segment used by the provider's self-service endpoints.
    pub fn as_path(self) -> &'static str {
        match self {
            FlowKind::Login => "login",
            FlowKind::Registration => "registration",
        }
    }
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_path())
    }
}

// Caller-supplied credentials; the variant decides the flow kind.
#[derive(Clone)]
pub enum Credentials {
    Login {
        identifier: String,
        password: String,
    },
    Register {
        email: String,
        username: String,
        password: String,
    },
}

impl Credentials {
    pub fn kind(&self) -> FlowKind {
        match self {
            Credentials::Login { .. } => FlowKind::Login,
            Credentials::Register { .. } => FlowKind::Registration,
        }
    }

    // Flow-specific identity fields plus the password, in submission order.
    pub fn form_fields(&self) -> Vec<(&'static str, &str)> {
        match self {
            Credentials::Login {
                identifier,
                password,
            } => vec![
                ("identifier", identifier.as_str()),
                ("password", password.as_str()),
            ],
            Credentials::Register {
                email,
                username,
                password,
            } => vec![
                ("traits.email", email.as_str()),
                ("traits.username", username.as_str()),
                ("password", password.as_str()),
            ],
        }
    }
}

// Passwords never reach logs, even through Debug.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Login { identifier, .. } => f
                .debug_struct("Login")
                .field("identifier", identifier)
                .finish_non_exhaustive(),
            Credentials::Register {
                email, username, ..
            } => f
                .debug_struct("Register")
                .field("email", email)
                .field("username", username)
                .finish_non_exhaustive(),
        }
    }
}

// Per-call flow state; never outlives a single authenticate call.
#[derive(Debug, Clone)]
pub struct FlowHandle {
    pub flow_id: String,
    pub action_url: url::Url,
    pub csrf_token: String,
}

// One validation message reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderMessage {
    #[serde(default, rename = "id")]
    pub numeric_id: i64,
    #[serde(default)]
    pub text: String,
    #[serde(default, rename = "type")]
    pub kind: String,
}

// Provider rejection payload; message order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawErrorPayload {
    pub messages: Vec<ProviderMessage>,
}

impl RawErrorPayload {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

// Raw Set-Cookie value proving a successful authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredential(String);

impl SessionCredential {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    // The `name=value` part, without cookie attributes.
    pub fn cookie_pair(&self) -> &str {
        self.0.split(';').next().unwrap_or_default().trim()
    }

    pub fn cookie_name(&self) -> &str {
        self.cookie_pair()
            .split_once('=')
            .map(|(name, _)| name.trim())
            .unwrap_or_default()
    }
}

impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionCredential({})", self.cookie_name())
    }
}

// Result of a flow that reached the provider's verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Session(SessionCredential),
    Rejected(RawErrorPayload),
}

// Identity attributes returned by session introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub username: String,
}

// Identity data kept in the session cache; expiry lives on the cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedSession {
    pub token: String,
    pub user_id: String,
    pub username: String,
    pub email: String,
}

impl CachedSession {
    pub fn from_identity(token: impl Into<String>, identity: Identity) -> Self {
        Self {
            token: token.into(),
            user_id: identity.id,
            username: identity.username,
            email: identity.email,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_set_cookie_has_attributes_then_cookie_pair_strips_them() {
        let credential =
            SessionCredential::new("ory_kratos_session=abc123; Path=/; HttpOnly; SameSite=Lax");

        assert_eq!(credential.cookie_pair(), "ory_kratos_session=abc123");
        assert_eq!(credential.cookie_name(), "ory_kratos_session");
    }

    #[test]
    fn when_credentials_are_debug_printed_then_password_is_hidden() {
        let credentials = Credentials::Login {
            identifier: "pilot@example.com".to_string(),
            password: "hunter2hunter2".to_string(),
        };

        let printed = format!("{credentials:?}");

        assert!(printed.contains("pilot@example.com"));
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn when_registering_then_form_fields_use_trait_names() {
        let credentials = Credentials::Register {
            email: "pilot@example.com".to_string(),
            username: "pilot".to_string(),
            password: "longenough".to_string(),
        };

        let fields = credentials.form_fields();

        assert_eq!(credentials.kind(), FlowKind::Registration);
        assert_eq!(
            fields,
            vec![
                ("traits.email", "pilot@example.com"),
                ("traits.username", "pilot"),
                ("password", "longenough"),
            ]
        );
    }
}
