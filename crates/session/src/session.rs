use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A web session: a JSON-typed key/value bag with an identity and an
/// expiration time.
///
/// The dirty flag tracks whether the session needs to be written back.
/// A freshly created session starts dirty (it exists nowhere yet); a loaded
/// one starts clean. Shared reads leave the flag alone, mutable access and
/// modification set it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: Uuid,
    expires: DateTime<Utc>,
    data: HashMap<String, Value>,
    dirty: bool,
}

/// The serialized form of a session, shared by the stores.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct SessionRecord {
    pub(crate) id: Uuid,
    pub(crate) expires: DateTime<Utc>,
    pub(crate) data: HashMap<String, Value>,
}

impl Session {
    /// Create a new, empty session with a random id. Starts dirty.
    pub fn new(expires: DateTime<Utc>) -> Self {
        Self { id: Uuid::new_v4(), expires, data: HashMap::new(), dirty: true }
    }

    /// Reconstruct a previously persisted session. Starts clean.
    pub fn from_parts(id: Uuid, expires: DateTime<Utc>, data: HashMap<String, Value>) -> Self {
        Self { id, expires, data, dirty: false }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn expires(&self) -> DateTime<Utc> {
        self.expires
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires <= now
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Mark the session as persisted. Called by stores after a successful
    /// save.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Extend the session's lifetime, e.g. on each request that touches it.
    pub fn set_expires(&mut self, expires: DateTime<Utc>) {
        if self.expires != expires {
            self.expires = expires;
            self.dirty = true;
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Mutable access to a session variable. Marks the session dirty, since
    /// the caller can change the value through the returned reference.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        let value = self.data.get_mut(key)?;
        self.dirty = true;
        Some(value)
    }

    /// Set a session variable. The session only becomes dirty when the
    /// stored value actually changes.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        if self.data.get(&key) != Some(&value) {
            self.data.insert(key, value);
            self.dirty = true;
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.data.remove(key);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub(crate) fn to_record(&self) -> SessionRecord {
        SessionRecord { id: self.id, expires: self.expires, data: self.data.clone() }
    }
}

impl From<SessionRecord> for Session {
    fn from(record: SessionRecord) -> Self {
        Session::from_parts(record.id, record.expires, record.data)
    }
}
