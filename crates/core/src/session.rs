//! Who is logged in.
//!
//! [`SessionStore`] is the single source of truth for the current identity. It is an explicit
//! context object: the console and the CLI build one at startup and pass it to whatever needs
//! identity. Observers either take snapshot reads (`id`, `name`, `role`, `current`) or
//! subscribe to a `watch` channel; dropping the receiver unsubscribes.
//!
//! The identity is persisted under a single storage key so that a restart keeps the user
//! logged in for as long as the storage is intact. There is no expiry and no revalidation
//! against the accounts service.

use crate::constants::SESSION_STORAGE_KEY;
use crate::records::SessionIdentity;
use crate::{ConsoleError, ConsoleResult};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

// ============================================================================
// STORAGE
// ============================================================================

/// Durable client-side key/value storage.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> ConsoleResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> ConsoleResult<()>;
    fn remove(&self, key: &str) -> ConsoleResult<()>;
}

/// Storage kept in a single JSON object file.
///
/// The file is read and rewritten whole on every operation; it only ever holds a handful of
/// keys. A missing file is an empty store.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    /// Opens storage at `path`, creating the parent directory if needed.
    pub fn open(path: impl Into<PathBuf>) -> ConsoleResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(ConsoleError::StateDirCreation)?;
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> ConsoleResult<Map<String, Value>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(ConsoleError::StorageRead(e)),
        };
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&contents).map_err(ConsoleError::Deserialization)
    }

    fn write_all(&self, map: &Map<String, Value>) -> ConsoleResult<()> {
        let json = serde_json::to_string_pretty(map).map_err(ConsoleError::Serialization)?;
        fs::write(&self.path, json).map_err(ConsoleError::StorageWrite)
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> ConsoleResult<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let map = self.read_all()?;
        Ok(map.get(key).and_then(Value::as_str).map(str::to_owned))
    }

    fn set(&self, key: &str, value: &str) -> ConsoleResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut map = self.read_all()?;
        map.insert(key.to_string(), Value::String(value.to_string()));
        self.write_all(&map)
    }

    fn remove(&self, key: &str) -> ConsoleResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut map = self.read_all()?;
        if map.remove(key).is_some() {
            self.write_all(&map)?;
        }
        Ok(())
    }
}

/// In-process storage, for tests and for running without a state directory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> ConsoleResult<Option<String>> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> ConsoleResult<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> ConsoleResult<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.remove(key);
        Ok(())
    }
}

// ============================================================================
// SESSION STORE
// ============================================================================

/// Holds the current identity in memory and mirrors it to storage.
pub struct SessionStore {
    storage: Arc<dyn SessionStorage>,
    state: watch::Sender<Option<SessionIdentity>>,
}

impl SessionStore {
    /// Seeds the in-memory state from persisted storage.
    ///
    /// A value that cannot be read or parsed is logged and treated as "not logged in".
    pub fn open(storage: Arc<dyn SessionStorage>) -> Self {
        let seeded = match storage.get(SESSION_STORAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<SessionIdentity>(&raw) {
                Ok(identity) => Some(identity),
                Err(e) => {
                    tracing::warn!("ignoring malformed persisted session: {e}");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("failed to read persisted session: {e}");
                None
            }
        };

        let (state, _) = watch::channel(seeded);
        Self { storage, state }
    }

    /// Persists `identity` and makes it the current user.
    ///
    /// The in-memory state only changes once storage has accepted the write.
    pub fn set_user(&self, identity: SessionIdentity) -> ConsoleResult<()> {
        let json = serde_json::to_string(&identity).map_err(ConsoleError::Serialization)?;
        self.storage.set(SESSION_STORAGE_KEY, &json)?;
        tracing::info!("session set for user {} (role {})", identity.id, identity.role.code());
        self.state.send_replace(Some(identity));
        Ok(())
    }

    /// Clears the current user in storage, then in memory.
    pub fn logout(&self) -> ConsoleResult<()> {
        self.storage.remove(SESSION_STORAGE_KEY)?;
        if let Some(previous) = self.state.send_replace(None) {
            tracing::info!("session cleared for user {}", previous.id);
        }
        Ok(())
    }

    pub fn current(&self) -> Option<SessionIdentity> {
        self.state.borrow().clone()
    }

    pub fn id(&self) -> Option<i64> {
        self.state.borrow().as_ref().map(|user| user.id)
    }

    /// The user's name, or an empty string when nobody is logged in.
    pub fn name(&self) -> String {
        self.state
            .borrow()
            .as_ref()
            .map(|user| user.name.clone())
            .unwrap_or_default()
    }

    /// The user's role code, or `0` when nobody is logged in.
    pub fn role(&self) -> i64 {
        self.state
            .borrow()
            .as_ref()
            .map(|user| user.role.code())
            .unwrap_or(0)
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// Receives every identity change from now on. The current value is marked as seen.
    pub fn subscribe(&self) -> watch::Receiver<Option<SessionIdentity>> {
        self.state.subscribe()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("current", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Role;
    use tempfile::TempDir;

    fn identity(id: i64, name: &str, role: Role) -> SessionIdentity {
        SessionIdentity {
            id,
            name: name.into(),
            role,
        }
    }

    #[test]
    fn set_user_then_logout() {
        let storage = Arc::new(MemoryStorage::new());
        let store = SessionStore::open(storage.clone());

        store.set_user(identity(7, "A", Role::Admin)).unwrap();
        assert_eq!(store.id(), Some(7));
        assert_eq!(store.role(), 2);
        assert_eq!(store.name(), "A");
        assert!(storage.get(SESSION_STORAGE_KEY).unwrap().is_some());

        store.logout().unwrap();
        assert_eq!(store.id(), None);
        assert_eq!(store.name(), "");
        assert_eq!(store.role(), 0);
        assert!(storage.get(SESSION_STORAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn reopen_seeds_from_file_storage() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("state").join("session.json");

        {
            let store = SessionStore::open(Arc::new(FileStorage::open(&path).unwrap()));
            store.set_user(identity(3, "Dr Grey", Role::Doctor)).unwrap();
        }

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\"user\""));

        let reopened = SessionStore::open(Arc::new(FileStorage::open(&path).unwrap()));
        assert_eq!(reopened.current(), Some(identity(3, "Dr Grey", Role::Doctor)));

        reopened.logout().unwrap();
        let storage = FileStorage::open(&path).unwrap();
        assert_eq!(storage.get(SESSION_STORAGE_KEY).unwrap(), None);
    }

    #[test]
    fn malformed_persisted_value_is_ignored() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(SESSION_STORAGE_KEY, "{not json").unwrap();

        let store = SessionStore::open(storage);
        assert!(!store.is_authenticated());
    }

    #[test]
    fn file_storage_keeps_other_keys() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let storage = FileStorage::open(temp_dir.path().join("kv.json")).unwrap();

        storage.set("theme", "dark").unwrap();
        storage.set(SESSION_STORAGE_KEY, "{}").unwrap();
        storage.remove(SESSION_STORAGE_KEY).unwrap();

        assert_eq!(storage.get("theme").unwrap().as_deref(), Some("dark"));
    }

    #[test]
    fn subscribers_see_every_change() {
        let store = SessionStore::open(Arc::new(MemoryStorage::new()));
        let mut first = store.subscribe();
        let second = store.subscribe();

        store.set_user(identity(1, "B", Role::Doctor)).unwrap();
        assert!(first.has_changed().unwrap());
        assert_eq!(first.borrow_and_update().as_ref().map(|u| u.id), Some(1));
        assert_eq!(second.borrow().as_ref().map(|u| u.id), Some(1));

        store.logout().unwrap();
        assert!(first.has_changed().unwrap());
        assert!(first.borrow_and_update().is_none());
    }

    /// Storage that holds what it is seeded with but refuses every change.
    struct ReadOnlyStorage {
        inner: MemoryStorage,
    }

    impl SessionStorage for ReadOnlyStorage {
        fn get(&self, key: &str) -> ConsoleResult<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, _key: &str, _value: &str) -> ConsoleResult<()> {
            Err(ConsoleError::StorageWrite(std::io::Error::other("read-only")))
        }

        fn remove(&self, _key: &str) -> ConsoleResult<()> {
            Err(ConsoleError::StorageWrite(std::io::Error::other("read-only")))
        }
    }

    #[test]
    fn failed_writes_leave_memory_matching_storage() {
        let inner = MemoryStorage::new();
        let persisted = serde_json::to_string(&identity(7, "A", Role::Admin)).unwrap();
        inner.set(SESSION_STORAGE_KEY, &persisted).unwrap();
        let storage = Arc::new(ReadOnlyStorage { inner });
        let store = SessionStore::open(storage.clone());
        let changes = store.subscribe();

        assert!(matches!(store.logout(), Err(ConsoleError::StorageWrite(_))));
        assert_eq!(store.id(), Some(7));
        assert_eq!(
            storage.get(SESSION_STORAGE_KEY).unwrap().as_deref(),
            Some(persisted.as_str())
        );

        assert!(store.set_user(identity(8, "B", Role::Doctor)).is_err());
        assert_eq!(store.id(), Some(7));
        assert!(!changes.has_changed().unwrap());

        let restarted = SessionStore::open(storage);
        assert_eq!(restarted.current(), store.current());
    }
}
