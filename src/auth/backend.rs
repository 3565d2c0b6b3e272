//! Durable credential backends
//!
//! A backend is a flat string key/value store. The token store only ever
//! writes two keys, so backends need no enumeration support.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use keyring::Entry;
use thiserror::Error;

/// Errors that can occur in a credential backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// Keyring operation failed
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    /// File read/write failed
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be parsed
    #[error("Invalid data format: {0}")]
    InvalidFormat(#[from] serde_json::Error),
}

/// Key/value storage for credential strings
#[cfg_attr(test, mockall::automock)]
pub trait CredentialBackend: Send + Sync {
    /// Reads a value, `None` if the key is not stored
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores a value, replacing any previous one
    fn save(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes a value; removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Removes several values, in one write where the backend allows it
    fn remove_all(&self, keys: &[String]) -> Result<(), StoreError> {
        for key in keys {
            self.remove(key)?;
        }
        Ok(())
    }
}

/// Backend using the OS credential manager
///
/// Windows Credential Manager, macOS Keychain or the Linux Secret Service,
/// accessed via the keyring crate. Entries are scoped by service name.
pub struct KeyringBackend {
    service: String,
}

impl KeyringBackend {
    /// Creates a backend for the given keyring service name
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Returns the service name used for this backend
    pub fn service(&self) -> &str {
        &self.service
    }
}

impl CredentialBackend for KeyringBackend {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entry = Entry::new(&self.service, key)?;
        match entry.get_password() {
            Ok(password) => Ok(Some(password)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(StoreError::Keyring(e)),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let entry = Entry::new(&self.service, key)?;
        entry.set_password(value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let entry = Entry::new(&self.service, key)?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StoreError::Keyring(e)),
        }
    }
}

/// Backend persisting a JSON object to a single file
///
/// Survives restarts but not removal of the user profile. The file is
/// rewritten as a whole on every change.
pub struct FileBackend {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileBackend {
    /// Creates a backend writing to `path`; the file is created lazily
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<HashMap<String, String>, StoreError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn write_map(&self, map: &HashMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(map)?;

        // Owner-only: the file holds the refresh credential
        #[cfg(unix)]
        {
            use std::io::Write;
            use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

            let mut file = fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.path)?;
            // mode() only applies on creation
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
            file.write_all(content.as_bytes())?;
        }

        #[cfg(not(unix))]
        {
            fs::write(&self.path, content)?;
        }

        Ok(())
    }

    fn update<F>(&self, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut HashMap<String, String>),
    {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut map = self.read_map()?;
        change(&mut map);
        self.write_map(&map)
    }
}

impl CredentialBackend for FileBackend {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read_map()?.remove(key))
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.update(|map| {
            map.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.update(|map| {
            map.remove(key);
        })
    }

    fn remove_all(&self, keys: &[String]) -> Result<(), StoreError> {
        self.update(|map| {
            for key in keys {
                map.remove(key);
            }
        })
    }
}

/// Backend keeping values in process memory
#[derive(Default)]
pub struct MemoryBackend {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CredentialBackend for MemoryBackend {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values().get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.values().remove(key);
        Ok(())
    }
}
