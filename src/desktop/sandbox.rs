//! Remote desktop sandbox boundary and session-keyed handle table.

use crate::types::{Error, Result, SessionId};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// One remote desktop, as exposed by the desktop SDK.
#[async_trait]
pub trait DesktopSandbox: Send + Sync {
    fn sandbox_id(&self) -> &str;
    async fn start_stream(&self) -> Result<()>;
    async fn stream_url(&self) -> Result<String>;
    async fn click(&self, x: i64, y: i64) -> Result<()>;
    async fn type_text(&self, text: &str) -> Result<()>;
    async fn press(&self, key: &str) -> Result<()>;
    async fn launch(&self, app: &str) -> Result<()>;
    /// PNG bytes of the current screen.
    async fn screenshot(&self) -> Result<Bytes>;
    async fn kill(&self) -> Result<()>;
}

/// Creates sandboxes.
#[async_trait]
pub trait SandboxFactory: Send + Sync {
    async fn create(&self) -> Result<Arc<dyn DesktopSandbox>>;
}

/// Sandbox handles keyed by session id.
pub struct SessionManager {
    factory: Arc<dyn SandboxFactory>,
    sessions: Mutex<HashMap<SessionId, Arc<dyn DesktopSandbox>>>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager").finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(factory: Arc<dyn SandboxFactory>) -> Self {
        Self {
            factory,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Existing sandbox for the session, or a freshly created one with its
    /// stream started. Only sandboxes whose stream started enter the table.
    ///
    /// The flag is `true` when the sandbox was created by this call.
    pub async fn get_or_create(&self, session: &SessionId) -> Result<(Arc<dyn DesktopSandbox>, bool)> {
        if let Some(existing) = self.sessions.lock().await.get(session).cloned() {
            return Ok((existing, false));
        }

        let sandbox = self.factory.create().await?;
        if let Err(err) = sandbox.start_stream().await {
            tracing::warn!(
                session_id = %session,
                sandbox_id = sandbox.sandbox_id(),
                error = %err,
                "desktop stream failed to start"
            );
            discard(sandbox.as_ref()).await;
            return Err(err);
        }

        let winner = match self.sessions.lock().await.entry(session.clone()) {
            Entry::Occupied(existing) => Some(existing.get().clone()),
            Entry::Vacant(slot) => {
                slot.insert(sandbox.clone());
                None
            }
        };
        match winner {
            // a concurrent init for the same session got there first
            Some(existing) => {
                discard(sandbox.as_ref()).await;
                Ok((existing, false))
            }
            None => {
                tracing::info!(session_id = %session, sandbox_id = sandbox.sandbox_id(), "desktop sandbox created");
                Ok((sandbox, true))
            }
        }
    }

    pub async fn get(&self, session: &SessionId) -> Result<Arc<dyn DesktopSandbox>> {
        self.sessions
            .lock()
            .await
            .get(session)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("desktop not initialized for session {}", session)))
    }

    /// Kill and forget the session's sandbox. Returns whether one existed.
    pub async fn close(&self, session: &SessionId) -> Result<bool> {
        let removed = self.sessions.lock().await.remove(session);
        match removed {
            Some(sandbox) => {
                sandbox.kill().await?;
                tracing::info!(session_id = %session, "desktop sandbox closed");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

async fn discard(sandbox: &dyn DesktopSandbox) {
    if let Err(err) = sandbox.kill().await {
        tracing::warn!(sandbox_id = sandbox.sandbox_id(), error = %err, "failed to kill discarded sandbox");
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records every call as a string.
    #[derive(Debug, Default)]
    pub struct FakeSandbox {
        pub id: String,
        pub stream_fails: bool,
        pub calls: std::sync::Mutex<Vec<String>>,
    }

    impl FakeSandbox {
        fn record(&self, call: String) {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(call);
            }
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl DesktopSandbox for FakeSandbox {
        fn sandbox_id(&self) -> &str {
            &self.id
        }
        async fn start_stream(&self) -> Result<()> {
            self.record("start_stream".into());
            if self.stream_fails {
                return Err(Error::external("stream relay unreachable"));
            }
            Ok(())
        }
        async fn stream_url(&self) -> Result<String> {
            Ok(format!("https://stream.local/{}", self.id))
        }
        async fn click(&self, x: i64, y: i64) -> Result<()> {
            self.record(format!("click {} {}", x, y));
            Ok(())
        }
        async fn type_text(&self, text: &str) -> Result<()> {
            self.record(format!("type {}", text));
            Ok(())
        }
        async fn press(&self, key: &str) -> Result<()> {
            self.record(format!("press {}", key));
            Ok(())
        }
        async fn launch(&self, app: &str) -> Result<()> {
            self.record(format!("launch {}", app));
            Ok(())
        }
        async fn screenshot(&self) -> Result<Bytes> {
            Ok(Bytes::from_static(b"\x89PNG"))
        }
        async fn kill(&self) -> Result<()> {
            self.record("kill".into());
            Ok(())
        }
    }

    /// Hands out numbered fake sandboxes and keeps them for inspection.
    #[derive(Debug, Default)]
    pub struct FakeFactory {
        pub created: AtomicUsize,
        /// Number of upcoming sandboxes whose stream refuses to start.
        pub stream_failures: AtomicUsize,
        pub sandboxes: std::sync::Mutex<Vec<Arc<FakeSandbox>>>,
    }

    impl FakeFactory {
        pub fn last(&self) -> Option<Arc<FakeSandbox>> {
            self.sandboxes.lock().ok().and_then(|s| s.last().cloned())
        }
    }

    #[async_trait]
    impl SandboxFactory for FakeFactory {
        async fn create(&self) -> Result<Arc<dyn DesktopSandbox>> {
            let n = self.created.fetch_add(1, Ordering::SeqCst);
            let stream_fails = self
                .stream_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_ok();
            let sandbox = Arc::new(FakeSandbox {
                id: format!("sbx_{}", n),
                stream_fails,
                ..FakeSandbox::default()
            });
            if let Ok(mut all) = self.sandboxes.lock() {
                all.push(sandbox.clone());
            }
            Ok(sandbox)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeFactory;
    use super::*;
    use std::sync::atomic::Ordering;

    fn session(s: &str) -> SessionId {
        SessionId::from_string(s.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let factory = Arc::new(FakeFactory::default());
        let manager = SessionManager::new(factory.clone());

        let (a, created) = manager.get_or_create(&session("a")).await.unwrap();
        assert!(created);
        let (again, created) = manager.get_or_create(&session("a")).await.unwrap();
        assert!(!created);
        assert_eq!(a.sandbox_id(), again.sandbox_id());

        let (b, _) = manager.get_or_create(&session("b")).await.unwrap();
        assert_ne!(a.sandbox_id(), b.sandbox_id());
        assert_eq!(factory.created.load(Ordering::SeqCst), 2);
        assert_eq!(manager.active_count().await, 2);
    }

    #[tokio::test]
    async fn test_get_requires_init() {
        let manager = SessionManager::new(Arc::new(FakeFactory::default()));
        let err = manager.get(&session("x")).await.err().unwrap();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_close_kills_sandbox() {
        let factory = Arc::new(FakeFactory::default());
        let manager = SessionManager::new(factory.clone());
        manager.get_or_create(&session("a")).await.unwrap();

        assert!(manager.close(&session("a")).await.unwrap());
        assert!(!manager.close(&session("a")).await.unwrap());
        assert_eq!(factory.last().unwrap().calls(), vec!["start_stream", "kill"]);
        assert_eq!(manager.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_failed_stream_is_not_kept() {
        let factory = Arc::new(FakeFactory::default());
        factory.stream_failures.store(1, Ordering::SeqCst);
        let manager = SessionManager::new(factory.clone());

        let err = manager.get_or_create(&session("a")).await.err().unwrap();
        assert!(matches!(err, Error::ExternalCall(_)));
        assert_eq!(factory.last().unwrap().calls(), vec!["start_stream", "kill"]);
        assert_eq!(manager.active_count().await, 0);
        assert!(manager.get(&session("a")).await.is_err());

        let (sandbox, created) = manager.get_or_create(&session("a")).await.unwrap();
        assert!(created);
        assert_eq!(sandbox.sandbox_id(), "sbx_1");
        assert_eq!(factory.last().unwrap().calls(), vec!["start_stream"]);
    }

    #[tokio::test]
    async fn test_concurrent_init_keeps_one_sandbox() {
        let factory = Arc::new(FakeFactory::default());
        let manager = Arc::new(SessionManager::new(factory.clone()));

        let (id_a, id_b) = (session("a"), session("a"));
        let (first, second) = tokio::join!(
            manager.get_or_create(&id_a),
            manager.get_or_create(&id_b)
        );
        let (first, first_created) = first.unwrap();
        let (second, second_created) = second.unwrap();

        assert_eq!(first.sandbox_id(), second.sandbox_id());
        assert!(first_created ^ second_created);
        assert_eq!(manager.active_count().await, 1);
    }
}
