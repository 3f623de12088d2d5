use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::session::Session;
use crate::store::{DEFAULT_MAX_SESSION_SIZE, SessionStore, StoreError, check_size};

/// Stores serialized sessions in a process-local map. For development and
/// testing; state is lost on restart.
#[derive(Debug)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<Uuid, (DateTime<Utc>, Vec<u8>)>>,
    max_session_size: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SESSION_SIZE)
    }
}

impl MemoryStore {
    pub fn new(max_session_size: usize) -> Self {
        Self { sessions: RwLock::new(HashMap::new()), max_session_size }
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self, id: Uuid) -> Result<Option<Session>, StoreError> {
        let sessions = self.sessions.read().await;
        let Some((expires, serialized)) = sessions.get(&id) else {
            return Ok(None);
        };
        if *expires <= Utc::now() {
            return Ok(None);
        }

        let data = serde_json::from_slice(serialized)?;
        Ok(Some(Session::from_parts(id, *expires, data)))
    }

    async fn save(&self, session: &Session) -> Result<(), StoreError> {
        let serialized = serde_json::to_vec(&session.to_record().data)?;
        check_size(&serialized, self.max_session_size)?;

        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id(), (session.expires(), serialized));
        Ok(())
    }

    async fn purge_expired_sessions(&self) -> Result<(), StoreError> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, (expires, _)| *expires > now);
        debug!(purged = before - sessions.len(), "purged expired sessions");
        Ok(())
    }
}
