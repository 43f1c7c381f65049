//! Anonymous device identity.
//!
//! The identity is created lazily on first use and persisted through a
//! [`DeviceStore`]. Storage failures never surface to the caller: a fresh id
//! is handed out instead, it just won't survive a restart.

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::types::DeviceId;

/// Persistent storage for the device identifier.
pub trait DeviceStore: Send + Sync {
    /// Loads the stored identifier, if any.
    fn load(&self) -> io::Result<Option<String>>;

    /// Persists the identifier.
    fn save(&self, id: &str) -> io::Result<()>;
}

/// Stores the identifier in a single text file.
#[derive(Debug, Clone)]
pub struct FileDeviceStore {
    path: PathBuf,
}

impl FileDeviceStore {
    /// Creates a store backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DeviceStore for FileDeviceStore {
    fn load(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let id = content.trim();
                Ok((!id.is_empty()).then(|| id.to_string()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn save(&self, id: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, id)
    }
}

/// In-memory store, scoped to the process.
#[derive(Debug, Default)]
pub struct MemoryDeviceStore {
    id: Mutex<Option<String>>,
}

impl DeviceStore for MemoryDeviceStore {
    fn load(&self) -> io::Result<Option<String>> {
        Ok(self.id.lock().clone())
    }

    fn save(&self, id: &str) -> io::Result<()> {
        *self.id.lock() = Some(id.to_string());
        Ok(())
    }
}

/// Lazily initialized, init-once device identity.
pub struct DeviceIdentity<S: DeviceStore> {
    store: S,
    id: OnceLock<DeviceId>,
}

impl<S: DeviceStore> DeviceIdentity<S> {
    /// Creates an identity over the given store. Nothing is read until first use.
    pub fn new(store: S) -> Self {
        Self {
            store,
            id: OnceLock::new(),
        }
    }

    /// Returns the persisted identifier, creating and persisting one on first use.
    pub fn get_or_create(&self) -> DeviceId {
        self.id.get_or_init(|| self.load_or_generate()).clone()
    }

    fn load_or_generate(&self) -> DeviceId {
        match self.store.load() {
            Ok(Some(id)) => return DeviceId::new(id),
            Ok(None) => {}
            Err(e) => {
                warn!("device store unreadable, using an unpersisted id: {}", e);
                return DeviceId::generate();
            }
        }

        let id = DeviceId::generate();
        match self.store.save(id.as_str()) {
            Ok(()) => debug!("created device id {}", id),
            Err(e) => warn!("failed to persist device id: {}", e),
        }
        id
    }
}
