//! Durable per-client key/value preferences.
//!
//! Writes are last-writer-wins with no locking. Two processes sharing one
//! profile file can race; the later rename wins.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use job_logging::{job_debug, job_info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::persist::{AtomicFileWriter, PersistError};

/// Key holding the remembered login identity.
pub const IDENTITY_KEY: &str = "identity";
/// Key holding the user's saved API key.
pub const API_KEY_KEY: &str = "api_key";

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("failed to read preferences from {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("preferences file {path:?} is corrupt: {message}")]
    Corrupt { path: PathBuf, message: String },
    #[error("failed to encode preferences: {0}")]
    Encode(String),
    #[error("failed to write preferences: {0}")]
    Write(#[from] PersistError),
}

pub trait PreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError>;
    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError>;
    fn delete(&self, key: &str) -> Result<(), PreferenceError>;
}

/// Process-local store, used by tests and as a stand-in when no profile is configured.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clones the current contents into a fresh store, as if read back after a restart.
    pub fn snapshot(&self) -> Self {
        Self {
            values: Mutex::new(self.lock().clone()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A poisoned map is still a valid map.
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), PreferenceError> {
        self.lock().remove(key);
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PersistedPreferences {
    values: BTreeMap<String, String>,
}

/// RON-backed profile file. Every call re-reads the file so concurrent
/// writers from other processes are observed.
#[derive(Debug, Clone)]
pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<PersistedPreferences, PreferenceError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(PersistedPreferences::default());
            }
            Err(source) => {
                return Err(PreferenceError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        ron::from_str(&content).map_err(|err| PreferenceError::Corrupt {
            path: self.path.clone(),
            message: err.to_string(),
        })
    }

    fn save(&self, prefs: &PersistedPreferences) -> Result<(), PreferenceError> {
        let pretty = ron::ser::PrettyConfig::new();
        let content = ron::ser::to_string_pretty(prefs, pretty)
            .map_err(|err| PreferenceError::Encode(err.to_string()))?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let filename = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                PreferenceError::Write(PersistError::TargetDir(format!(
                    "{} has no file name",
                    self.path.display()
                )))
            })?;
        AtomicFileWriter::new(dir).write(&filename, content)?;
        job_debug!("Saved preferences to {:?}", self.path);
        Ok(())
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        Ok(self.load()?.values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        let mut prefs = self.load()?;
        prefs.values.insert(key.to_string(), value.to_string());
        self.save(&prefs)
    }

    fn delete(&self, key: &str) -> Result<(), PreferenceError> {
        let mut prefs = self.load()?;
        if prefs.values.remove(key).is_none() {
            return Ok(());
        }
        job_info!("Removed preference '{}' from {:?}", key, self.path);
        self.save(&prefs)
    }
}
