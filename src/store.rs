use std::collections::BTreeSet;

use crate::models::{Profile, Task};
use crate::storage::{
    KeyValueStorage, StorageError, KEY_INITIALIZED, KEY_NAME, KEY_TASKS, KEY_TEMPLATES,
    KEY_USER_ID, PROFILE_KEYS,
};

/// Typed accessor over the persisted profile keys. Holds no business
/// logic: day classification, materialization and guards live elsewhere.
///
/// Reads degrade to the type's default when the backend is unavailable or
/// a stored value is corrupt; the view must never crash over bad storage.
pub struct TaskStore<S: KeyValueStorage> {
    storage: S,
}

impl<S: KeyValueStorage> TaskStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn load_profile(&self) -> Profile {
        Profile {
            name: self.load_string(KEY_NAME),
            tasks: self.load_json(KEY_TASKS),
            templates: self.load_json(KEY_TEMPLATES),
            initialized_days: self.load_json(KEY_INITIALIZED),
        }
    }

    pub fn save_profile(&self, profile: &Profile) -> Result<(), StorageError> {
        self.save_name(&profile.name)?;
        self.save_tasks(&profile.tasks)?;
        self.save_templates(&profile.templates)?;
        self.save_initialized_days(&profile.initialized_days)
    }

    pub fn save_name(&self, name: &str) -> Result<(), StorageError> {
        self.storage.set(KEY_NAME, name)
    }

    pub fn save_tasks(&self, tasks: &[Task]) -> Result<(), StorageError> {
        self.storage.set(KEY_TASKS, &serde_json::to_string(tasks)?)
    }

    pub fn save_templates(&self, templates: &[String]) -> Result<(), StorageError> {
        self.storage
            .set(KEY_TEMPLATES, &serde_json::to_string(templates)?)
    }

    pub fn save_initialized_days(&self, days: &BTreeSet<String>) -> Result<(), StorageError> {
        self.storage
            .set(KEY_INITIALIZED, &serde_json::to_string(days)?)
    }

    pub fn load_user_id(&self) -> Option<String> {
        let id = self.load_string(KEY_USER_ID);
        if id.is_empty() {
            None
        } else {
            Some(id)
        }
    }

    pub fn save_user_id(&self, id: &str) -> Result<(), StorageError> {
        self.storage.set(KEY_USER_ID, id)
    }

    /// Adopts a remote sync identity: persists the identifier and removes
    /// the local name, tasks and initialized-days keys so the next load
    /// starts from whatever the remote profile pushes. Templates stay.
    pub fn adopt_sync_identity(&self, id: &str) -> Result<(), StorageError> {
        self.save_user_id(id)?;
        for key in [KEY_NAME, KEY_TASKS, KEY_INITIALIZED] {
            self.storage.remove(key)?;
        }
        Ok(())
    }

    /// Full-account reset: removes every profile key.
    pub fn clear(&self) -> Result<(), StorageError> {
        for key in PROFILE_KEYS {
            self.storage.remove(key)?;
        }
        Ok(())
    }

    fn load_string(&self, key: &str) -> String {
        match self.storage.get(key) {
            Ok(Some(value)) => value,
            Ok(None) => String::new(),
            Err(err) => {
                log::warn!("storage read failed key={key}: {err}");
                String::new()
            }
        }
    }

    fn load_json<T: Default + serde::de::DeserializeOwned>(&self, key: &str) -> T {
        let raw = match self.storage.get(key) {
            Ok(Some(value)) => value,
            Ok(None) => return T::default(),
            Err(err) => {
                log::warn!("storage read failed key={key}: {err}");
                return T::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                log::warn!("discarding corrupt value key={key}: {err}");
                T::default()
            }
        }
    }
}
