//! Token store - single source of truth for the credential pair
//!
//! Reads are served from an in-memory snapshot loaded once from the backend.
//! Writes update the snapshot under a write lock and then write through, so
//! a reader never observes a half-cleared pair. Backend failures are logged
//! and otherwise ignored.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::backend::{CredentialBackend, FileBackend, KeyringBackend, MemoryBackend};
use crate::config::{ClientConfig, StorageKind, StorageSettings};
use crate::security::SecureString;

#[derive(Default)]
struct CredentialPair {
    access: Option<SecureString>,
    refresh: Option<SecureString>,
}

/// Storage for the access and refresh credentials
///
/// # Example
///
/// ```
/// use newsfeed_client::auth::{MemoryBackend, TokenStore};
///
/// let store = TokenStore::new(Box::new(MemoryBackend::new()), "access", "refresh");
/// store.set_pair("tok1", "ref1");
/// assert_eq!(store.get_access().as_deref(), Some("tok1"));
///
/// store.clear_all();
/// assert!(store.get_access().is_none());
/// assert!(store.get_refresh().is_none());
/// ```
pub struct TokenStore {
    backend: Box<dyn CredentialBackend>,
    access_key: String,
    refresh_key: String,
    pair: RwLock<CredentialPair>,
}

impl TokenStore {
    /// Creates a store over `backend`, loading any persisted credentials
    pub fn new(
        backend: Box<dyn CredentialBackend>,
        access_key: impl Into<String>,
        refresh_key: impl Into<String>,
    ) -> Self {
        let access_key = access_key.into();
        let refresh_key = refresh_key.into();

        let pair = CredentialPair {
            access: load_or_warn(backend.as_ref(), &access_key),
            refresh: load_or_warn(backend.as_ref(), &refresh_key),
        };

        Self {
            backend,
            access_key,
            refresh_key,
            pair: RwLock::new(pair),
        }
    }

    /// Creates a store with the backend and keys named in `settings`
    pub fn from_settings(settings: &StorageSettings) -> Self {
        let backend: Box<dyn CredentialBackend> = match settings.kind {
            StorageKind::Keyring => Box::new(KeyringBackend::new(settings.service.clone())),
            StorageKind::File => match ClientConfig::credentials_path() {
                Some(path) => Box::new(FileBackend::new(path)),
                None => {
                    tracing::warn!("No config directory; credentials will not persist");
                    Box::new(MemoryBackend::new())
                }
            },
            StorageKind::Memory => Box::new(MemoryBackend::new()),
        };
        Self::new(backend, &settings.access_key, &settings.refresh_key)
    }

    /// Creates a store that keeps credentials in memory only
    pub fn in_memory() -> Self {
        let settings = StorageSettings::default();
        Self::new(
            Box::new(MemoryBackend::new()),
            settings.access_key,
            settings.refresh_key,
        )
    }

    /// Stores or clears the access credential
    pub fn set_access(&self, token: Option<&str>) {
        self.write().access = token.map(SecureString::from);
        self.persist(&self.access_key, token);
    }

    /// Returns the access credential, if any
    pub fn get_access(&self) -> Option<SecureString> {
        self.read().access.clone()
    }

    /// Stores or clears the refresh credential
    pub fn set_refresh(&self, token: Option<&str>) {
        self.write().refresh = token.map(SecureString::from);
        self.persist(&self.refresh_key, token);
    }

    /// Returns the refresh credential, if any
    pub fn get_refresh(&self) -> Option<SecureString> {
        self.read().refresh.clone()
    }

    /// Stores both credentials, as returned by sign-in
    pub fn set_pair(&self, access: &str, refresh: &str) {
        {
            let mut pair = self.write();
            pair.access = Some(access.into());
            pair.refresh = Some(refresh.into());
        }
        self.persist(&self.access_key, Some(access));
        self.persist(&self.refresh_key, Some(refresh));
    }

    /// Removes both credentials
    pub fn clear_all(&self) {
        {
            let mut pair = self.write();
            pair.access = None;
            pair.refresh = None;
        }
        let keys = [self.access_key.clone(), self.refresh_key.clone()];
        if let Err(e) = self.backend.remove_all(&keys) {
            tracing::warn!("Failed to remove stored credentials: {}", e);
        }
    }

    /// True when a refresh credential is stored
    pub fn has_session(&self) -> bool {
        self.read().refresh.is_some()
    }

    fn persist(&self, key: &str, value: Option<&str>) {
        let result = match value {
            Some(value) => self.backend.save(key, value),
            None => self.backend.remove(key),
        };
        if let Err(e) = result {
            tracing::warn!("Failed to persist credential {}: {}", key, e);
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, CredentialPair> {
        self.pair
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, CredentialPair> {
        self.pair
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn load_or_warn(backend: &dyn CredentialBackend, key: &str) -> Option<SecureString> {
    match backend.load(key) {
        Ok(value) => value.map(SecureString::new),
        Err(e) => {
            tracing::warn!("Failed to load credential {}: {}", key, e);
            None
        }
    }
}
