use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::session::{Session, SessionRecord};
use crate::store::{DEFAULT_MAX_SESSION_SIZE, SessionStore, StoreError, check_size};

/// Persists each session as one JSON document under a directory.
///
/// Writes go to a temporary sibling first and are moved into place with a
/// rename, so a concurrent load never observes a half-written document.
#[derive(Debug)]
pub struct FileStore {
    directory: PathBuf,
    max_session_size: usize,
}

impl FileStore {
    pub fn new(directory: impl Into<PathBuf>, max_session_size: usize) -> Self {
        Self { directory: directory.into(), max_session_size }
    }

    pub fn with_defaults(directory: impl Into<PathBuf>) -> Self {
        Self::new(directory, DEFAULT_MAX_SESSION_SIZE)
    }

    fn session_path(&self, id: Uuid) -> PathBuf {
        self.directory.join(format!("{id}.json"))
    }

    async fn read_record(path: &Path) -> Result<Option<SessionRecord>, StoreError> {
        let serialized = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&serialized)?))
    }
}

#[async_trait]
impl SessionStore for FileStore {
    async fn load(&self, id: Uuid) -> Result<Option<Session>, StoreError> {
        let Some(record) = Self::read_record(&self.session_path(id)).await? else {
            return Ok(None);
        };
        if record.expires <= Utc::now() {
            return Ok(None);
        }
        Ok(Some(record.into()))
    }

    async fn save(&self, session: &Session) -> Result<(), StoreError> {
        let serialized = serde_json::to_vec(&session.to_record())?;
        check_size(&serialized, self.max_session_size)?;

        fs::create_dir_all(&self.directory).await?;
        let path = self.session_path(session.id());
        let staging = path.with_extension("tmp");
        fs::write(&staging, &serialized).await?;
        fs::rename(&staging, &path).await?;
        Ok(())
    }

    async fn purge_expired_sessions(&self) -> Result<(), StoreError> {
        let mut entries = match fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let now = Utc::now();
        let mut purged = 0_usize;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }

            match Self::read_record(&path).await {
                Ok(Some(record)) if record.expires <= now => {
                    fs::remove_file(&path).await?;
                    purged += 1;
                }
                Ok(_) => {}
                Err(e) => warn!(path = %path.display(), cause = %e, "skipping unreadable session file"),
            }
        }
        debug!(purged, "purged expired sessions");
        Ok(())
    }
}
