use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::session::Session;
use crate::{FileStore, MemoryStore};

/// Default cap on the serialized size of one session, in bytes.
pub const DEFAULT_MAX_SESSION_SIZE: usize = 65536;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("session data limit exceeded ({size} bytes > {limit} bytes)")]
    SessionTooLarge { size: usize, limit: usize },

    #[error("failed to (de)serialize session data")]
    Serialization(#[from] serde_json::Error),

    #[error("session storage I/O failed")]
    Io(#[from] std::io::Error),
}

/// The persistence contract for sessions.
///
/// `save` is an upsert; `load` returns `None` for unknown or expired ids;
/// `purge_expired_sessions` is a maintenance pass removing expired entries.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, id: Uuid) -> Result<Option<Session>, StoreError>;

    async fn save(&self, session: &Session) -> Result<(), StoreError>;

    async fn purge_expired_sessions(&self) -> Result<(), StoreError>;
}

/// Store selection, as a closed set of known implementations.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    Memory {
        #[serde(default = "default_max_session_size")]
        max_session_size: usize,
    },
    File {
        directory: PathBuf,
        #[serde(default = "default_max_session_size")]
        max_session_size: usize,
    },
}

fn default_max_session_size() -> usize {
    DEFAULT_MAX_SESSION_SIZE
}

impl StoreConfig {
    pub fn build(self) -> Arc<dyn SessionStore> {
        match self {
            Self::Memory { max_session_size } => Arc::new(MemoryStore::new(max_session_size)),
            Self::File { directory, max_session_size } => Arc::new(FileStore::new(directory, max_session_size)),
        }
    }
}

pub(crate) fn check_size(serialized: &[u8], limit: usize) -> Result<(), StoreError> {
    if serialized.len() > limit {
        return Err(StoreError::SessionTooLarge { size: serialized.len(), limit });
    }
    Ok(())
}
