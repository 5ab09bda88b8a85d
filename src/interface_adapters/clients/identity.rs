use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use reqwest::{Client, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::domain::{
    AuthOutcome, Credentials, FlowError, FlowHandle, FlowKind, FlowStep, Identity,
    IdentityProvider, RawErrorPayload, SessionCredential,
};
use crate::interface_adapters::protocol::{FlowDocument, WhoamiDocument, parse_error_payload};

pub const DEFAULT_FLOW_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_SESSION_COOKIE: &str = "ory_kratos_session";

// Diagnostics keep at most this much of an unexpected response body.
const MAX_DIAGNOSTIC_BODY: usize = 512;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid identity provider url {value}: {source}")]
    InvalidUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("identity provider url {0} has no host")]
    MissingHost(String),
}

// Single configuration surface of the flow adapter.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    // Base for every GET; reachable from inside the deployment network.
    pub base_url: Url,
    // host[:port] that action URLs are rewritten to before submission.
    pub internal_authority: String,
    // Overall deadline for one authenticate call.
    pub timeout: Duration,
    pub session_cookie: String,
}

impl ProviderConfig {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let mut parsed = Url::parse(base_url).map_err(|source| ConfigError::InvalidUrl {
            value: base_url.to_string(),
            source,
        })?;
        let host = parsed
            .host_str()
            .ok_or_else(|| ConfigError::MissingHost(base_url.to_string()))?
            .to_string();
        let internal_authority = match parsed.port() {
            Some(port) => format!("{host}:{port}"),
            None => host,
        };
        // Keep the base path when joining relative endpoint paths.
        if !parsed.path().ends_with('/') {
            let path = format!("{}/", parsed.path());
            parsed.set_path(&path);
        }

        Ok(Self {
            base_url: parsed,
            internal_authority,
            timeout: DEFAULT_FLOW_TIMEOUT,
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
        })
    }

    pub fn with_internal_authority(mut self, authority: impl Into<String>) -> Self {
        self.internal_authority = authority.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_session_cookie(mut self, name: impl Into<String>) -> Self {
        self.session_cookie = name.into();
        self
    }
}

// Drives the provider's browser-oriented self-service flows over plain HTTP.
// Stateless between calls; every call gets its own client and cookie jar.
#[derive(Clone)]
pub struct IdentityFlowClient {
    config: ProviderConfig,
}

impl IdentityFlowClient {
    pub fn new(config: ProviderConfig) -> Self {
        Self { config }
    }

    // Fresh cookie store per call so concurrent flows never share cookies.
    fn http_client(&self, step: FlowStep) -> Result<Client, FlowError> {
        Client::builder()
            .cookie_provider(Arc::new(reqwest::cookie::Jar::default()))
            .redirect(reqwest::redirect::Policy::none())
            .timeout(self.config.timeout)
            .build()
            .map_err(transport(step))
    }

    fn endpoint(&self, path: &str, step: FlowStep) -> Result<Url, FlowError> {
        self.config
            .base_url
            .join(path)
            .map_err(|err| protocol(step, format!("cannot build endpoint {path}: {err}")))
    }

    fn flow_url(&self, kind: FlowKind, flow_id: &str, step: FlowStep) -> Result<Url, FlowError> {
        let mut url = self.endpoint(&format!("self-service/{}/flows", kind.as_path()), step)?;
        url.query_pairs_mut().append_pair("id", flow_id);
        Ok(url)
    }

    async fn run_flow(
        &self,
        credentials: &Credentials,
        step: &mut FlowStep,
    ) -> Result<AuthOutcome, FlowError> {
        let kind = credentials.kind();
        *step = FlowStep::Init;
        let http = self.http_client(FlowStep::Init)?;

        // 1. Start the browser flow and pick the flow id out of the redirect.
        let flow_id = self.initialize_flow(&http, kind).await?;

        // 2-3. Load the flow, capture the CSRF token and rewrite the action URL.
        *step = FlowStep::Detail;
        let handle = self.fetch_flow_handle(&http, kind, flow_id).await?;

        // 4. Submit the credentials.
        *step = FlowStep::Submit;
        let response = self.submit(&http, &handle, credentials).await?;

        // 5. Work out what the provider decided.
        self.interpret(&http, kind, &handle.flow_id, response, step)
            .await
    }

    async fn initialize_flow(&self, http: &Client, kind: FlowKind) -> Result<String, FlowError> {
        let step = FlowStep::Init;
        let url = self.endpoint(&format!("self-service/{}/browser", kind.as_path()), step)?;
        let response = http
            .get(url.clone())
            .send()
            .await
            .map_err(transport(step))?;
        let status = response.status();
        if !status.is_redirection() {
            let body = response.text().await.map_err(transport(step))?;
            return Err(FlowError::UnexpectedStatus {
                step,
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| protocol(step, format!("no Location header (status {status})")))?;
        let redirect = url
            .join(location)
            .map_err(|err| protocol(step, format!("invalid Location header: {err}")))?;

        redirect
            .query_pairs()
            .find(|(name, _)| name == "flow")
            .map(|(_, value)| value.into_owned())
            .filter(|flow_id| !flow_id.is_empty())
            .ok_or_else(|| protocol(step, "redirect carries no flow parameter".to_string()))
    }

    async fn fetch_flow_handle(
        &self,
        http: &Client,
        kind: FlowKind,
        flow_id: String,
    ) -> Result<FlowHandle, FlowError> {
        let step = FlowStep::Detail;
        let (status, body) = self.get_flow(http, kind, &flow_id).await?;
        if status != StatusCode::OK {
            return Err(FlowError::UnexpectedStatus {
                step,
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let document: FlowDocument = serde_json::from_str(&body).map_err(|err| FlowError::Decode {
            step,
            reason: err.to_string(),
        })?;
        let csrf_token = document
            .ui
            .csrf_token()
            .map(str::to_string)
            .ok_or_else(|| protocol(step, "flow has no csrf_token node".to_string()))?;
        let action = document
            .ui
            .action
            .filter(|action| !action.is_empty())
            .ok_or_else(|| protocol(step, "flow has no action url".to_string()))?;
        let action_url = rewrite_action_url(&action, &self.config.internal_authority)
            .map_err(|reason| protocol(step, reason))?;

        tracing::debug!(%flow_id, action = %action_url, "identity flow loaded.");
        Ok(FlowHandle {
            flow_id,
            action_url,
            csrf_token,
        })
    }

    async fn get_flow(
        &self,
        http: &Client,
        kind: FlowKind,
        flow_id: &str,
    ) -> Result<(StatusCode, String), FlowError> {
        let step = FlowStep::Detail;
        let response = http
            .get(self.flow_url(kind, flow_id, step)?)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport(step))?;
        let status = response.status();
        let body = response.text().await.map_err(transport(step))?;
        Ok((status, body))
    }

    async fn submit(
        &self,
        http: &Client,
        handle: &FlowHandle,
        credentials: &Credentials,
    ) -> Result<Response, FlowError> {
        // The serializer is not Send; it must not live across the await below.
        let body = {
            let mut form = url::form_urlencoded::Serializer::new(String::new());
            form.append_pair("method", "password");
            for (name, value) in credentials.form_fields() {
                form.append_pair(name, value);
            }
            form.append_pair("csrf_token", &handle.csrf_token);
            form.finish()
        };

        http.post(handle.action_url.clone())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(transport(FlowStep::Submit))
    }

    async fn interpret(
        &self,
        http: &Client,
        kind: FlowKind,
        flow_id: &str,
        response: Response,
        step: &mut FlowStep,
    ) -> Result<AuthOutcome, FlowError> {
        let status = response.status();
        let cookies: Vec<String> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(str::to_string)
            .collect();
        if let Some(credential) = pick_session_cookie(&cookies, &self.config.session_cookie) {
            tracing::info!(%status, cookie = %credential.cookie_name(), "identity flow succeeded.");
            return Ok(AuthOutcome::Session(credential));
        }

        let body = response.text().await.map_err(transport(FlowStep::Submit))?;
        if let Some(payload) = parse_error_payload(&body) {
            return Ok(rejected(payload, "response"));
        }

        // The provider often parks errors on the flow and only redirects.
        if status == StatusCode::FOUND || status == StatusCode::SEE_OTHER {
            *step = FlowStep::Detail;
            match self.get_flow(http, kind, flow_id).await {
                Ok((_, flow_body)) => {
                    if let Some(payload) = parse_error_payload(&flow_body) {
                        return Ok(rejected(payload, "flow"));
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, %flow_id, "failed to re-fetch flow after redirect.");
                }
            }
            return Err(FlowError::CredentialsRejected {
                status: status.as_u16(),
            });
        }

        Err(FlowError::UnexpectedStatus {
            step: FlowStep::Submit,
            status: status.as_u16(),
            body: truncate_body(&body),
        })
    }
}

#[async_trait]
impl IdentityProvider for IdentityFlowClient {
    #[tracing::instrument(name = "identity_flow", skip_all, fields(kind = %credentials.kind()))]
    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthOutcome, FlowError> {
        tracing::info!("identity flow started.");
        let mut step = FlowStep::Init;
        let outcome =
            tokio::time::timeout(self.config.timeout, self.run_flow(credentials, &mut step)).await;
        let result = match outcome {
            Ok(result) => result,
            Err(_) => Err(FlowError::Deadline { step }),
        };

        match &result {
            Err(err @ FlowError::CredentialsRejected { .. }) => {
                tracing::warn!(error = %err, "identity flow rejected without details.");
            }
            Err(err) => {
                tracing::error!(
                    step = %err.step(),
                    retryable = err.is_retryable(),
                    error = %err,
                    "identity flow failed."
                );
            }
            Ok(_) => {}
        }
        result
    }

    async fn whoami(&self, credential: &SessionCredential) -> Result<Option<Identity>, FlowError> {
        let step = FlowStep::Whoami;
        let http = self.http_client(step)?;
        let response = http
            .get(self.endpoint("sessions/whoami", step)?)
            .header(COOKIE, credential.cookie_pair())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport(step))?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Ok(None);
        }
        let body = response.text().await.map_err(transport(step))?;
        if status != StatusCode::OK {
            return Err(FlowError::UnexpectedStatus {
                step,
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let document: WhoamiDocument =
            serde_json::from_str(&body).map_err(|err| FlowError::Decode {
                step,
                reason: err.to_string(),
            })?;
        Ok(document.identity.map(Identity::from))
    }
}

fn rejected(payload: RawErrorPayload, source: &'static str) -> AuthOutcome {
    tracing::warn!(
        messages = payload.messages.len(),
        source,
        "identity provider rejected the attempt."
    );
    AuthOutcome::Rejected(payload)
}

// Replace host and port of the advertised action URL; scheme, path and query stay as-is.
pub fn rewrite_action_url(action: &str, authority: &str) -> Result<Url, String> {
    let mut url = Url::parse(action).map_err(|err| format!("invalid action url {action}: {err}"))?;
    // A scheme without a default port keeps an explicit port visible after parsing.
    let target = Url::parse(&format!("internal://{authority}"))
        .map_err(|err| format!("invalid internal authority {authority}: {err}"))?;
    let host = target
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| format!("internal authority {authority} has no host"))?;

    url.set_host(Some(host))
        .map_err(|err| format!("cannot rewrite action host to {host}: {err}"))?;
    url.set_port(target.port())
        .map_err(|()| format!("cannot rewrite action port for {authority}"))?;
    Ok(url)
}

// Prefer the configured session cookie; any cookie still counts as success.
fn pick_session_cookie(cookies: &[String], session_cookie: &str) -> Option<SessionCredential> {
    let prefix = format!("{session_cookie}=");
    cookies
        .iter()
        .find(|cookie| cookie.trim_start().starts_with(&prefix))
        .or_else(|| cookies.first())
        .map(|cookie| SessionCredential::new(cookie.clone()))
}

fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_DIAGNOSTIC_BODY {
        return body.to_string();
    }
    let mut end = MAX_DIAGNOSTIC_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

fn transport(step: FlowStep) -> impl FnOnce(reqwest::Error) -> FlowError {
    move |source| {
        if source.is_timeout() {
            FlowError::Deadline { step }
        } else {
            FlowError::Transport { step, source }
        }
    }
}

fn protocol(step: FlowStep, reason: String) -> FlowError {
    FlowError::Protocol { step, reason }
}
