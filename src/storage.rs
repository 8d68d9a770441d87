use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::PathBuf;

/// Storage key for the user's display name.
pub const KEY_NAME: &str = "weedo-name";
/// Storage key for the JSON task collection.
pub const KEY_TASKS: &str = "weedo-tasks";
/// Storage key for the JSON list of daily recurring task templates.
pub const KEY_TEMPLATES: &str = "weedo-daily-tasks";
/// Storage key for the JSON array of day keys already materialized.
pub const KEY_INITIALIZED: &str = "weedo-tasks-initialized";
/// Storage key for the remote sync identifier, when one is assigned.
pub const KEY_USER_ID: &str = "weedo-user-id";

/// Every key the profile owns, in the order logout clears them.
pub const PROFILE_KEYS: [&str; 5] = [
    KEY_NAME,
    KEY_TASKS,
    KEY_TEMPLATES,
    KEY_INITIALIZED,
    KEY_USER_ID,
];

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "io error: {err}"),
            StorageError::Json(err) => write!(f, "json error: {err}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(value: std::io::Error) -> Self {
        StorageError::Io(value)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(value: serde_json::Error) -> Self {
        StorageError::Json(value)
    }
}

/// The local persistence collaborator: a string key-value store.
///
/// The core only ever reads and writes whole values for the `weedo-*`
/// keys; the backend may be a file tree, a browser localStorage bridge or
/// an in-memory map in tests.
pub trait KeyValueStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// File-backed key-value store: one file per key under a root directory,
/// written atomically via a temp file + rename.
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn ensure_dirs(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.key_path(key);
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        Ok(Some(buf))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.key_path(key);
        let temp_path = path.with_extension("tmp");
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(temp_path, path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.key_path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
