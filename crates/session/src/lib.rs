//! Web session state behind pluggable async stores.
//!
//! A [`Session`] is a bag of JSON-typed values identified by a UUID, with an
//! expiration time and a dirty flag so callers only persist sessions that
//! actually changed. Stores implement the [`SessionStore`] contract
//! (load/save/purge) and cap the serialized payload size; oversize writes
//! fail with [`StoreError::SessionTooLarge`] instead of being truncated.
//!
//! Two stores are provided: [`MemoryStore`] for development and testing, and
//! [`FileStore`] persisting one JSON document per session. Which one to use
//! is selected through the closed [`StoreConfig`] enum, never by a runtime
//! class-name lookup.

mod file;
mod memory;
mod session;
mod store;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use session::Session;
pub use store::{DEFAULT_MAX_SESSION_SIZE, SessionStore, StoreConfig, StoreError};
