//! Durable credential persistence.
//!
//! The store is a best-effort optimization so sessions survive restarts — it
//! is never required for correctness. Every failure degrades to a warning
//! plus an absent read or a no-op write; the manager never fails because the
//! store does.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

/// The fixed key set the manager persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKey {
    /// Short-lived access credential.
    Access,
    /// Longer-lived refresh credential.
    Refresh,
    /// Cached `UserProfile` snapshot, JSON-encoded.
    Profile,
}

impl CredentialKey {
    pub const ALL: [Self; 3] = [Self::Access, Self::Refresh, Self::Profile];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
            Self::Profile => "profile",
        }
    }
}

impl fmt::Display for CredentialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key/value persistence for the current credentials.
///
/// No validation, no side effects beyond storage. Implementations must treat
/// an unavailable backend as "absent" on read and a no-op on write.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: CredentialKey) -> Option<String>;
    fn set(&self, key: CredentialKey, value: &str);
    fn clear(&self, key: CredentialKey);
}

impl<S: CredentialStore> CredentialStore for std::sync::Arc<S> {
    fn get(&self, key: CredentialKey) -> Option<String> {
        self.as_ref().get(key)
    }

    fn set(&self, key: CredentialKey, value: &str) {
        self.as_ref().set(key, value);
    }

    fn clear(&self, key: CredentialKey) {
        self.as_ref().clear(key);
    }
}

/// In-memory store for tests and ephemeral embeds.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<CredentialKey, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no key holds a value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.lock().map_or(true, |values| values.is_empty())
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: CredentialKey) -> Option<String> {
        self.values
            .lock()
            .ok()
            .and_then(|values| values.get(&key).cloned())
    }

    fn set(&self, key: CredentialKey, value: &str) {
        if let Ok(mut values) = self.values.lock() {
            values.insert(key, value.to_string());
        }
    }

    fn clear(&self, key: CredentialKey) {
        if let Ok(mut values) = self.values.lock() {
            values.remove(&key);
        }
    }
}

const DEFAULT_KEYRING_SERVICE: &str = "tidegate";

/// OS keychain store with a permission-restricted file fallback.
///
/// Writes go to the keychain first and fall back to
/// `~/.tidegate/credentials/<key>` (0700 dir, 0600 files) when the keychain
/// is unavailable (headless hosts, locked keyrings). Reads try the keychain,
/// then the file. Per the [`CredentialStore`] contract, every failure
/// downgrades to a warning.
#[derive(Debug)]
pub struct KeyringStore {
    service: String,
    file_dir: Option<PathBuf>,
}

impl KeyringStore {
    /// Store under the given keychain service name, with the file fallback
    /// under `~/.tidegate/credentials`.
    ///
    /// The service name can be overridden via `TIDEGATE_KEYRING_SERVICE`
    /// (e.g. `"tidegate-test"`) to avoid touching production credentials.
    #[must_use]
    pub fn new(service: impl Into<String>) -> Self {
        let service = std::env::var("TIDEGATE_KEYRING_SERVICE")
            .unwrap_or_else(|_| service.into());
        Self {
            service,
            file_dir: dirs::home_dir().map(|h| h.join(".tidegate").join("credentials")),
        }
    }

    /// Store using the service name from config.
    #[must_use]
    pub fn from_config(config: &tide_config::AuthConfig) -> Self {
        if config.keyring_service.is_empty() {
            Self::new(DEFAULT_KEYRING_SERVICE)
        } else {
            Self::new(config.keyring_service.clone())
        }
    }

    /// Redirect the file fallback to `dir` (tests, sandboxed embeds).
    #[must_use]
    pub fn with_file_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.file_dir = Some(dir.into());
        self
    }

    fn entry(&self, key: CredentialKey) -> Option<keyring::Entry> {
        match keyring::Entry::new(&self.service, key.as_str()) {
            Ok(entry) => Some(entry),
            Err(error) => {
                tracing::warn!(%error, %key, "keyring unavailable; using file fallback");
                None
            }
        }
    }

    fn file_path(&self, key: CredentialKey) -> Option<PathBuf> {
        self.file_dir.as_ref().map(|dir| dir.join(key.as_str()))
    }

    fn set_file(&self, key: CredentialKey, value: &str) {
        let Some(path) = self.file_path(key) else {
            tracing::warn!(%key, "no home directory; credential not persisted");
            return;
        };
        if let Some(parent) = path.parent() {
            if let Err(error) = fs::create_dir_all(parent) {
                tracing::warn!(%error, %key, "mkdir failed; credential not persisted");
                return;
            }
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Err(error) = fs::set_permissions(parent, fs::Permissions::from_mode(0o700)) {
                    tracing::warn!(%error, "failed to chmod 0700 {}", parent.display());
                }
            }
        }
        if let Err(error) = fs::write(&path, value) {
            tracing::warn!(%error, %key, "write failed; credential not persisted");
            return;
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(error) = fs::set_permissions(&path, fs::Permissions::from_mode(0o600)) {
                tracing::warn!(%error, "failed to chmod 0600 {}", path.display());
            }
        }
    }

    fn get_file(&self, key: CredentialKey) -> Option<String> {
        let path = self.file_path(key)?;
        fs::read_to_string(&path)
            .ok()
            .filter(|s| !s.trim().is_empty())
    }

    fn clear_file(&self, key: CredentialKey) {
        let Some(path) = self.file_path(key) else {
            return;
        };
        if path.exists() {
            if let Err(error) = fs::remove_file(&path) {
                tracing::warn!(%error, %key, "failed to delete credential file");
            }
        }
    }
}

impl CredentialStore for KeyringStore {
    fn get(&self, key: CredentialKey) -> Option<String> {
        if let Some(entry) = self.entry(key)
            && let Ok(value) = entry.get_password()
            && !value.is_empty()
        {
            return Some(value);
        }
        self.get_file(key)
    }

    fn set(&self, key: CredentialKey, value: &str) {
        if let Some(entry) = self.entry(key) {
            match entry.set_password(value) {
                Ok(()) => return,
                Err(error) => {
                    tracing::warn!(%error, %key, "keyring store failed; falling back to file");
                }
            }
        }
        self.set_file(key, value);
    }

    fn clear(&self, key: CredentialKey) {
        // Clear both tiers — a stale fallback file must not resurrect a session.
        if let Some(entry) = self.entry(key) {
            let _ = entry.delete_credential();
        }
        self.clear_file(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn memory_store_cycle() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        assert_eq!(store.get(CredentialKey::Access), None);

        store.set(CredentialKey::Access, "acc_123");
        store.set(CredentialKey::Refresh, "ref_456");
        assert_eq!(store.get(CredentialKey::Access).as_deref(), Some("acc_123"));
        assert_eq!(store.get(CredentialKey::Refresh).as_deref(), Some("ref_456"));

        store.clear(CredentialKey::Access);
        assert_eq!(store.get(CredentialKey::Access), None);
        assert_eq!(store.get(CredentialKey::Refresh).as_deref(), Some("ref_456"));
    }

    #[test]
    fn clear_is_a_no_op_when_absent() {
        let store = MemoryStore::new();
        store.clear(CredentialKey::Profile);
        assert!(store.is_empty());
    }

    #[test]
    fn file_fallback_cycle() {
        let tmp = tempfile::TempDir::new().expect("tmp dir");
        let store =
            KeyringStore::new("tidegate-test-fallback").with_file_dir(tmp.path().join("creds"));

        store.set_file(CredentialKey::Refresh, "ref_789");
        assert_eq!(
            store.get_file(CredentialKey::Refresh).as_deref(),
            Some("ref_789")
        );

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let path = store.file_path(CredentialKey::Refresh).expect("path");
            let mode = fs::metadata(&path).expect("metadata").permissions().mode() & 0o777;
            assert_eq!(mode, 0o600, "credential file should be 0600");
        }

        store.clear_file(CredentialKey::Refresh);
        assert_eq!(store.get_file(CredentialKey::Refresh), None);
    }

    #[test]
    fn file_fallback_ignores_empty_content() {
        let tmp = tempfile::TempDir::new().expect("tmp dir");
        let store = KeyringStore::new("tidegate-test-empty").with_file_dir(tmp.path());
        fs::write(tmp.path().join("access"), "   \n  ").expect("write");
        assert_eq!(store.get_file(CredentialKey::Access), None);
    }
}
