//! Server-side modules for the pawtrack sync server.

pub mod auth;
pub mod storage;

pub use auth::{ApiKeyEntry, ApiKeyStore, AuthUser, KeysFile};
pub use storage::{CollectionStore, ServerStorageError};
