use serde::Deserialize;
use serde_json::Value;

use crate::domain::{Identity, ProviderMessage, RawErrorPayload};

// Name of the flow node carrying the anti-forgery token.
pub const CSRF_FIELD: &str = "csrf_token";

// Typed view of the flow document; only the fields the adapter consumes.
#[derive(Debug, Default, Deserialize)]
pub struct FlowDocument {
    #[serde(default)]
    pub ui: FlowUi,
}

#[derive(Debug, Default, Deserialize)]
pub struct FlowUi {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub nodes: Vec<UiNode>,
    #[serde(default)]
    pub messages: Vec<ProviderMessage>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UiNode {
    #[serde(default)]
    pub attributes: NodeAttributes,
    // Field-level validation messages (e.g. password too short).
    #[serde(default)]
    pub messages: Vec<ProviderMessage>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NodeAttributes {
    #[serde(default)]
    pub name: Option<String>,
    // Non-input nodes carry booleans or objects here.
    #[serde(default)]
    pub value: Option<Value>,
}

impl FlowUi {
    pub fn csrf_token(&self) -> Option<&str> {
        self.nodes
            .iter()
            .find(|node| node.attributes.name.as_deref() == Some(CSRF_FIELD))
            .and_then(|node| node.attributes.value.as_ref())
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
    }

    // Flow-level messages first, then node-level ones.
    pub fn into_payload(self) -> RawErrorPayload {
        let mut messages = self.messages;
        messages.extend(self.nodes.into_iter().flat_map(|node| node.messages));
        RawErrorPayload { messages }
    }
}

// Decode a provider body into an error payload; `None` when it carries no messages.
pub fn parse_error_payload(body: &str) -> Option<RawErrorPayload> {
    if body.trim().is_empty() {
        return None;
    }
    let document: FlowDocument = serde_json::from_str(body).ok()?;
    let payload = document.ui.into_payload();
    (!payload.is_empty()).then_some(payload)
}

// Session introspection response.
#[derive(Debug, Deserialize)]
pub struct WhoamiDocument {
    #[serde(default)]
    pub identity: Option<WhoamiIdentity>,
}

#[derive(Debug, Deserialize)]
pub struct WhoamiIdentity {
    pub id: String,
    #[serde(default)]
    pub traits: IdentityTraits,
}

#[derive(Debug, Default, Deserialize)]
pub struct IdentityTraits {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
}

impl From<WhoamiIdentity> for Identity {
    fn from(identity: WhoamiIdentity) -> Self {
        Identity {
            id: identity.id,
            email: identity.traits.email,
            username: identity.traits.username,
        }
    }
}
