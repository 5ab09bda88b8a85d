use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::domain::{
    AuthOutcome, CacheMetrics, Clock, Credentials, FlowError, FlowStep, Identity,
    IdentityProvider, RawErrorPayload, SessionCredential,
};

// Controllable time source for deterministic cache tests.
#[derive(Clone)]
pub(crate) struct ManualClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub(crate) fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    pub(crate) fn advance(&self, by: Duration) {
        let mut guard = self.offset.lock().expect("clock mutex poisoned");
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let guard = self.offset.lock().expect("clock mutex poisoned");
        self.origin + *guard
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum MetricEvent {
    Hit(String),
    Miss(String),
    Evicted(String, String),
}

#[derive(Clone, Default)]
pub(crate) struct RecordingMetrics {
    events: Arc<Mutex<Vec<MetricEvent>>>,
}

impl RecordingMetrics {
    pub(crate) fn events(&self) -> Vec<MetricEvent> {
        self.events.lock().expect("metrics mutex poisoned").clone()
    }

    fn push(&self, event: MetricEvent) {
        self.events.lock().expect("metrics mutex poisoned").push(event);
    }
}

impl CacheMetrics for RecordingMetrics {
    fn hit(&self, scope: &str) {
        self.push(MetricEvent::Hit(scope.to_string()));
    }

    fn miss(&self, scope: &str) {
        self.push(MetricEvent::Miss(scope.to_string()));
    }

    fn evicted(&self, scope: &str, reason: &str) {
        self.push(MetricEvent::Evicted(scope.to_string(), reason.to_string()));
    }
}

// What the fake provider answers to authenticate().
#[derive(Clone)]
pub(crate) enum Script {
    Session(String),
    Rejected(RawErrorPayload),
    Unavailable,
}

#[derive(Clone)]
pub(crate) struct ScriptedProvider {
    script: Script,
    // Keyed by cookie pair.
    identities: Arc<Mutex<HashMap<String, Identity>>>,
    whoami_fails: bool,
    authenticate_calls: Arc<AtomicUsize>,
    whoami_calls: Arc<AtomicUsize>,
}

impl ScriptedProvider {
    pub(crate) fn new(script: Script) -> Self {
        Self {
            script,
            identities: Arc::new(Mutex::new(HashMap::new())),
            whoami_fails: false,
            authenticate_calls: Arc::new(AtomicUsize::new(0)),
            whoami_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn with_identity(self, cookie_pair: &str, identity: Identity) -> Self {
        self.identities
            .lock()
            .expect("identities mutex poisoned")
            .insert(cookie_pair.to_string(), identity);
        self
    }

    pub(crate) fn with_failing_whoami(mut self) -> Self {
        self.whoami_fails = true;
        self
    }

    pub(crate) fn authenticate_calls(&self) -> usize {
        self.authenticate_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn whoami_calls(&self) -> usize {
        self.whoami_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for ScriptedProvider {
    async fn authenticate(&self, _credentials: &Credentials) -> Result<AuthOutcome, FlowError> {
        self.authenticate_calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Session(cookie) => Ok(AuthOutcome::Session(SessionCredential::new(
                cookie.clone(),
            ))),
            Script::Rejected(payload) => Ok(AuthOutcome::Rejected(payload.clone())),
            Script::Unavailable => Err(FlowError::Deadline {
                step: FlowStep::Submit,
            }),
        }
    }

    async fn whoami(&self, credential: &SessionCredential) -> Result<Option<Identity>, FlowError> {
        self.whoami_calls.fetch_add(1, Ordering::SeqCst);
        if self.whoami_fails {
            return Err(FlowError::UnexpectedStatus {
                step: FlowStep::Whoami,
                status: 500,
                body: "boom".to_string(),
            });
        }
        let guard = self.identities.lock().expect("identities mutex poisoned");
        Ok(guard.get(credential.cookie_pair()).cloned())
    }
}

pub(crate) fn pilot() -> Identity {
    Identity {
        id: "user-1".to_string(),
        email: "pilot@example.com".to_string(),
        username: "pilot".to_string(),
    }
}
