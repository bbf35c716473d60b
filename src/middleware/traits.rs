use std::collections::HashMap;
use std::future::Future;

use tokio::sync::RwLock;

use crate::session::MemorySession;

pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Consumer-provided session persistence.
///
/// Sessions are identified by the opaque ID carried in the private session
/// cookie. The middleware loads the session, lets the CAS state machine
/// read and write its slots, and saves it back when it changed.
///
/// # Example
///
/// ```rust,ignore
/// impl SessionStore for RedisSessions {
///     async fn load(&self, session_id: &str) -> Result<Option<MemorySession>, StoreError> {
///         let raw: Option<String> = self.conn().await?.get(session_id).await?;
///         Ok(raw.map(|r| serde_json::from_str(&r)).transpose()?)
///     }
///
///     async fn save(&self, session_id: &str, session: MemorySession) -> Result<(), StoreError> {
///         self.conn().await?.set(session_id, serde_json::to_string(&session)?).await?;
///         Ok(())
///     }
///
///     async fn delete(&self, session_id: &str) -> Result<(), StoreError> {
///         self.conn().await?.del(session_id).await?;
///         Ok(())
///     }
/// }
/// ```
pub trait SessionStore: Send + Sync + 'static {
    /// Look up a session by ID.
    fn load(
        &self,
        session_id: &str,
    ) -> impl Future<Output = Result<Option<MemorySession>, StoreError>> + Send;

    /// Insert or replace a session.
    fn save(
        &self,
        session_id: &str,
        session: MemorySession,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Delete a session (logout with `destroy_session`).
    fn delete(&self, session_id: &str) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Process-local session store. Sessions are lost on restart and never
/// expire, so use it for development and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<String, MemorySession>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl SessionStore for MemoryStore {
    async fn load(&self, session_id: &str) -> Result<Option<MemorySession>, StoreError> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn save(&self, session_id: &str, session: MemorySession) -> Result<(), StoreError> {
        self.sessions
            .write()
            .await
            .insert(session_id.to_owned(), session);
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<(), StoreError> {
        self.sessions.write().await.remove(session_id);
        Ok(())
    }
}
