// In-process fake identity provider shared by the integration tests.
#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};

pub const FLOW_ID: &str = "flow-1";
pub const CSRF_TOKEN: &str = "csrf-abc";
pub const CSRF_COOKIE: &str = "csrf_token_fake=antiforgery";
pub const SESSION_COOKIE: &str = "ory_kratos_session=good";

// How the fake provider behaves for one test.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scenario {
    // Submission sets the session cookie.
    Accept,
    // Submission answers 400 with messages in the body.
    RejectWithBody,
    // Submission redirects; messages are parked on the flow.
    RejectViaRedirect,
    // Submission redirects and the flow carries no messages.
    BareRedirect,
    // Initialization redirects without a flow id.
    NoFlowParam,
    // Initialization never answers in time.
    HangOnInit,
    // Flow document lacks the CSRF node.
    MissingCsrf,
    // Submission answers 500.
    ServerErrorOnSubmit,
    // Initialization answers 503 without a redirect.
    ServerErrorOnInit,
    // Flow document lacks the action URL.
    MissingAction,
    // Flow body is not JSON.
    MalformedFlow,
    // Submission never answers in time.
    HangOnSubmit,
}

#[derive(Default)]
pub struct Recorded {
    // Every form submitted to the action URL.
    pub submissions: Vec<HashMap<String, String>>,
    // Cookie header seen on each flow fetch.
    pub flow_cookies: Vec<String>,
    pub submitted: bool,
}

pub struct FakeState {
    scenario: Scenario,
    pub recorded: Mutex<Recorded>,
}

pub struct FakeProvider {
    pub base_url: String,
    pub state: Arc<FakeState>,
}

impl FakeProvider {
    pub fn submissions(&self) -> Vec<HashMap<String, String>> {
        self.state
            .recorded
            .lock()
            .expect("recorded mutex poisoned")
            .submissions
            .clone()
    }

    pub fn flow_cookies(&self) -> Vec<String> {
        self.state
            .recorded
            .lock()
            .expect("recorded mutex poisoned")
            .flow_cookies
            .clone()
    }
}

// Bind the fake on an ephemeral port inside the current test runtime.
pub async fn spawn_provider(scenario: Scenario) -> FakeProvider {
    let state = Arc::new(FakeState {
        scenario,
        recorded: Mutex::new(Recorded::default()),
    });
    let app = Router::new()
        .route("/self-service/{kind}/browser", get(init_flow))
        .route("/self-service/{kind}/flows", get(get_flow))
        .route("/self-service/{kind}", post(submit_flow))
        .route("/sessions/whoami", get(whoami))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral test port");
    let addr = listener.local_addr().expect("get local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("fake provider failed");
    });

    FakeProvider {
        base_url: format!("http://{addr}"),
        state,
    }
}

async fn init_flow(State(state): State<Arc<FakeState>>, Path(kind): Path<String>) -> Response {
    match state.scenario {
        Scenario::HangOnInit => {
            tokio::time::sleep(Duration::from_secs(10)).await;
            StatusCode::SEE_OTHER.into_response()
        }
        Scenario::ServerErrorOnInit => {
            (StatusCode::SERVICE_UNAVAILABLE, "upstream down").into_response()
        }
        Scenario::NoFlowParam => (
            StatusCode::SEE_OTHER,
            [(header::LOCATION, "/error?id=internal".to_string())],
        )
            .into_response(),
        _ => (
            StatusCode::SEE_OTHER,
            [
                (
                    header::LOCATION,
                    format!("http://ui.invalid/{kind}?flow={FLOW_ID}"),
                ),
                (header::SET_COOKIE, format!("{CSRF_COOKIE}; Path=/; HttpOnly")),
            ],
        )
            .into_response(),
    }
}

async fn get_flow(
    State(state): State<Arc<FakeState>>,
    Path(kind): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let cookie = cookie_header(&headers);
    let submitted = {
        let mut recorded = state.recorded.lock().expect("recorded mutex poisoned");
        recorded.flow_cookies.push(cookie.clone());
        recorded.submitted
    };
    if !cookie.contains(CSRF_COOKIE) {
        return (StatusCode::FORBIDDEN, "missing csrf cookie").into_response();
    }
    if query.get("id").map(String::as_str) != Some(FLOW_ID) {
        return (StatusCode::NOT_FOUND, "unknown flow").into_response();
    }

    if state.scenario == Scenario::MalformedFlow {
        return (StatusCode::OK, "{\"ui\": [truncated").into_response();
    }

    let mut nodes = vec![json!({
        "type": "input",
        "attributes": {"name": "identifier", "type": "text", "value": ""}
    })];
    if state.scenario != Scenario::MissingCsrf {
        nodes.push(json!({
            "type": "input",
            "attributes": {"name": "csrf_token", "type": "hidden", "value": CSRF_TOKEN}
        }));
    }
    let messages = if submitted && state.scenario == Scenario::RejectViaRedirect {
        vec![invalid_credentials()]
    } else {
        Vec::new()
    };

    let mut ui = json!({
        "method": "POST",
        "nodes": nodes,
        "messages": messages,
    });
    if state.scenario != Scenario::MissingAction {
        ui["action"] = json!(format!(
            "http://public.invalid:4433/self-service/{kind}?flow={FLOW_ID}"
        ));
    }

    Json(json!({"id": FLOW_ID, "ui": ui})).into_response()
}

async fn submit_flow(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let cookie = cookie_header(&headers);
    let csrf_ok = form.get("csrf_token").map(String::as_str) == Some(CSRF_TOKEN);
    {
        let mut recorded = state.recorded.lock().expect("recorded mutex poisoned");
        recorded.submissions.push(form);
        recorded.submitted = true;
    }
    if !cookie.contains(CSRF_COOKIE) || !csrf_ok {
        return (StatusCode::FORBIDDEN, "csrf violation").into_response();
    }

    match state.scenario {
        Scenario::HangOnSubmit => {
            tokio::time::sleep(Duration::from_secs(10)).await;
            StatusCode::SEE_OTHER.into_response()
        }
        Scenario::Accept => (
            StatusCode::SEE_OTHER,
            [
                (header::LOCATION, "http://ui.invalid/home".to_string()),
                (
                    header::SET_COOKIE,
                    format!("{SESSION_COOKIE}; Path=/; HttpOnly; SameSite=Lax"),
                ),
            ],
        )
            .into_response(),
        Scenario::RejectWithBody => (
            StatusCode::BAD_REQUEST,
            Json(json!({"id": FLOW_ID, "ui": {"messages": [invalid_credentials()]}})),
        )
            .into_response(),
        Scenario::RejectViaRedirect | Scenario::BareRedirect => (
            StatusCode::SEE_OTHER,
            [(header::LOCATION, format!("http://ui.invalid/login?flow={FLOW_ID}"))],
        )
            .into_response(),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal boom").into_response(),
    }
}

async fn whoami(headers: HeaderMap) -> Response {
    if !cookie_header(&headers).contains(SESSION_COOKIE) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": {"code": 401, "status": "Unauthorized"}})),
        )
            .into_response();
    }
    Json(json!({
        "id": "session-1",
        "active": true,
        "identity": {
            "id": "user-1",
            "traits": {"email": "pilot@example.com", "username": "pilot"}
        }
    }))
    .into_response()
}

fn invalid_credentials() -> Value {
    json!({
        "id": 4000006,
        "text": "The provided credentials are invalid, check for spelling mistakes in your password or username, email address, or phone number.",
        "type": "error"
    })
}

fn cookie_header(headers: &HeaderMap) -> String {
    headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
