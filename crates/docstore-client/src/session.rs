//! Session caching with TTL
//!
//! Connecting to the workflow engine is expensive, so sessions are cached
//! per user and reused until they age out. The cache is an explicit injected
//! value owned by whoever wires the application together; there is no global
//! state. The TTL defaults to 25 minutes against the engine's 30-minute
//! session timeout, leaving a safety margin.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::error::DocStoreError;
use crate::types::SessionId;
use crate::workflow::WorkflowEngine;

#[derive(Debug, Clone, Copy)]
struct CachedSession {
    session_id: SessionId,
    issued_at: DateTime<Utc>,
}

/// Per-user session cache in front of a [`WorkflowEngine`].
pub struct SessionCache<E> {
    engine: E,
    ttl: Duration,
    entries: Mutex<HashMap<String, CachedSession>>,
}

impl<E: WorkflowEngine> SessionCache<E> {
    pub fn new(engine: E, ttl: Duration) -> Self {
        Self {
            engine,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_default_ttl(engine: E) -> Self {
        Self::new(engine, Duration::minutes(25))
    }

    /// A valid cached session for `user_name`, or a fresh one from the engine.
    pub async fn get_or_connect(
        &self,
        user_name: &str,
        password: &str,
    ) -> Result<SessionId, DocStoreError> {
        let now = Utc::now();
        {
            let mut entries = self.entries.lock().expect("session cache poisoned");
            match entries.get(user_name) {
                Some(cached) if now - cached.issued_at < self.ttl => {
                    debug!(user_name, "reusing cached session");
                    return Ok(cached.session_id);
                }
                Some(_) => {
                    info!(user_name, "cached session expired");
                    entries.remove(user_name);
                }
                None => {}
            }
        }

        let session_id = self.engine.connect(user_name, password).await?;
        self.entries
            .lock()
            .expect("session cache poisoned")
            .insert(
                user_name.to_string(),
                CachedSession {
                    session_id,
                    issued_at: Utc::now(),
                },
            );

        info!(user_name, session_id, "new workflow session cached");
        Ok(session_id)
    }

    /// Drop the cached session for one user.
    pub fn invalidate(&self, user_name: &str) {
        if self
            .entries
            .lock()
            .expect("session cache poisoned")
            .remove(user_name)
            .is_some()
        {
            info!(user_name, "session invalidated");
        }
    }

    /// Drop whichever cached session carries `session_id`. Used when the
    /// store reports an invalid session handle.
    pub fn invalidate_by_id(&self, session_id: SessionId) {
        self.entries
            .lock()
            .expect("session cache poisoned")
            .retain(|_, cached| cached.session_id != session_id);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("session cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::sync::atomic::{AtomicI64, Ordering};

    struct CountingEngine {
        connects: AtomicI64,
    }

    impl WorkflowEngine for CountingEngine {
        async fn connect(&self, _user: &str, _password: &str) -> Result<SessionId, DocStoreError> {
            Ok(1000 + self.connects.fetch_add(1, Ordering::SeqCst))
        }

        async fn disconnect(&self, _session: SessionId) -> Result<(), DocStoreError> {
            Ok(())
        }

        async fn fetch_work_item_attributes(
            &self,
            _process_instance_id: &str,
            _work_item_id: &str,
            _session: SessionId,
        ) -> Result<Value, DocStoreError> {
            Ok(Value::Null)
        }
    }

    fn cache(ttl: Duration) -> SessionCache<CountingEngine> {
        SessionCache::new(
            CountingEngine {
                connects: AtomicI64::new(0),
            },
            ttl,
        )
    }

    #[tokio::test]
    async fn test_session_reused_within_ttl() {
        let cache = cache(Duration::minutes(25));
        let first = cache.get_or_connect("clerk", "pw").await.unwrap();
        let second = cache.get_or_connect("clerk", "pw").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_session_reconnects() {
        let cache = cache(Duration::zero());
        let first = cache.get_or_connect("clerk", "pw").await.unwrap();
        let second = cache.get_or_connect("clerk", "pw").await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reconnect() {
        let cache = cache(Duration::minutes(25));
        let first = cache.get_or_connect("clerk", "pw").await.unwrap();
        cache.invalidate("clerk");
        let second = cache.get_or_connect("clerk", "pw").await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_invalidate_by_id() {
        let cache = cache(Duration::minutes(25));
        let first = cache.get_or_connect("clerk", "pw").await.unwrap();
        let other = cache.get_or_connect("reviewer", "pw").await.unwrap();
        cache.invalidate_by_id(first);
        assert_eq!(cache.len(), 1);
        let again = cache.get_or_connect("reviewer", "pw").await.unwrap();
        assert_eq!(again, other);
    }
}
