use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::domain::{CacheMetrics, CachedSession, Clock};

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(10 * 60);

// Eviction reasons emitted by the cache itself.
pub const REASON_EXPIRED: &str = "expired";
pub const REASON_LOGOUT: &str = "logout";

// System clock adapter used by the cache.
#[derive(Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

// Metrics sink for embedders that do not export cache telemetry.
#[derive(Clone, Default)]
pub struct NoopMetrics;

impl CacheMetrics for NoopMetrics {
    fn hit(&self, _scope: &str) {}
    fn miss(&self, _scope: &str) {}
    fn evicted(&self, _scope: &str, _reason: &str) {}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

// Process-local counters; cheap enough to share behind an Arc.
#[derive(Default)]
pub struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl CacheCounters {
    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

impl CacheMetrics for CacheCounters {
    fn hit(&self, _scope: &str) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn miss(&self, _scope: &str) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn evicted(&self, _scope: &str, _reason: &str) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }
}

struct Entry {
    session: CachedSession,
    expires_at: Instant,
}

enum Lookup {
    Hit(CachedSession),
    Expired,
    Vanished,
}

type ScopedKey = (String, String);

// Volatile TTL cache of validated sessions with sliding, lazily enforced expiry.
pub struct SessionCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    metrics: Arc<dyn CacheMetrics>,
    store: RwLock<HashMap<ScopedKey, Entry>>,
}

impl SessionCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_dependencies(ttl, Arc::new(SystemClock), Arc::new(NoopMetrics))
    }

    pub fn with_dependencies(
        ttl: Duration,
        clock: Arc<dyn Clock>,
        metrics: Arc<dyn CacheMetrics>,
    ) -> Self {
        let ttl = if ttl.is_zero() { DEFAULT_SESSION_TTL } else { ttl };
        Self {
            ttl,
            clock,
            metrics,
            store: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // Entries still held in memory, including expired ones not yet looked up.
    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Returns the cached session and slides its expiry, or `None` on a miss.
    pub fn get(&self, scope: &str, token: &str) -> Option<CachedSession> {
        let scope = normalize_scope(scope);
        if token.is_empty() {
            self.metrics.miss(&scope);
            return None;
        }
        let key = (scope, token.to_string());

        if !self.store.read().contains_key(&key) {
            self.record_miss(&key.0, token);
            return None;
        }

        // Re-check under the write lock; a concurrent delete must not be resurrected.
        let now = self.clock.now();
        let mut store = self.store.write();
        let lookup = match store.get_mut(&key) {
            None => Lookup::Vanished,
            Some(entry) if entry.expires_at < now => Lookup::Expired,
            Some(entry) => {
                entry.expires_at = now + self.ttl;
                Lookup::Hit(entry.session.clone())
            }
        };
        if matches!(lookup, Lookup::Expired) {
            store.remove(&key);
        }
        drop(store);

        let (scope, _) = key;
        match lookup {
            Lookup::Hit(session) => {
                self.metrics.hit(&scope);
                tracing::debug!(scope = %scope, token_hash = %hash_token(token), "session cache hit.");
                Some(session)
            }
            Lookup::Expired => {
                self.record_eviction(&scope, token, REASON_EXPIRED);
                self.record_miss(&scope, token);
                None
            }
            Lookup::Vanished => {
                self.record_miss(&scope, token);
                None
            }
        }
    }

    // Inserts or overwrites the entry for `session.token`.
    pub fn set(&self, scope: &str, session: CachedSession) {
        let scope = normalize_scope(scope);
        if session.token.is_empty() {
            return;
        }
        let token_hash = hash_token(&session.token);
        let entry = Entry {
            expires_at: self.clock.now() + self.ttl,
            session,
        };
        let key = (scope, entry.session.token.clone());

        self.store.write().insert(key.clone(), entry);
        tracing::debug!(scope = %key.0, token_hash = %token_hash, "session cache updated.");
    }

    // Removes the entry regardless of TTL; `reason` only labels telemetry.
    pub fn delete(&self, scope: &str, token: &str, reason: &str) -> bool {
        let scope = normalize_scope(scope);
        if token.is_empty() {
            return false;
        }
        let key = (scope, token.to_string());

        let removed = self.store.write().remove(&key).is_some();
        if removed {
            self.record_eviction(&key.0, token, reason);
        }
        removed
    }

    fn record_miss(&self, scope: &str, token: &str) {
        self.metrics.miss(scope);
        tracing::debug!(scope = %scope, token_hash = %hash_token(token), "session cache miss.");
    }

    fn record_eviction(&self, scope: &str, token: &str, reason: &str) {
        self.metrics.evicted(scope, reason);
        tracing::info!(
            scope = %scope,
            reason = %reason,
            token_hash = %hash_token(token),
            "session cache evicted."
        );
    }
}

// Scope labels are trimmed; blank ones collapse to "unknown".
pub fn normalize_scope(scope: &str) -> String {
    let trimmed = scope.trim();
    if trimmed.is_empty() {
        "unknown".to_string()
    } else {
        trimmed.to_string()
    }
}

// Truncated one-way hash; the only form in which tokens reach logs.
pub fn hash_token(token: &str) -> String {
    if token.is_empty() {
        return String::new();
    }
    let digest = Sha256::digest(token.as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(12);
    encoded
}
