use std::fs;
use std::path::{Path, PathBuf};

use job_logging::{job_debug, job_info, job_warn};
use thiserror::Error;

use crate::prefs::{PreferenceError, PreferenceStore, API_KEY_KEY};
use crate::settings::CredentialStore;
use crate::types::{MappingMode, MappingSource, UploadedFile};

const MAPPING_EXTENSION: &str = "xlsx";
const OFFICE_LOCK_PREFIX: &str = "~$";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("enter an API key before saving")]
    EmptyApiKey,
    #[error(transparent)]
    Preferences(#[from] PreferenceError),
}

/// Computes run parameters from explicit input, saved preferences and system defaults.
pub struct ConfigResolver<'a> {
    credentials: &'a CredentialStore,
    prefs: &'a dyn PreferenceStore,
}

impl<'a> ConfigResolver<'a> {
    pub fn new(credentials: &'a CredentialStore, prefs: &'a dyn PreferenceStore) -> Self {
        Self { credentials, prefs }
    }

    /// Explicit input, then the saved key, then the system default. Blank values count as absent.
    pub fn resolve_api_key(&self, explicit: Option<&str>) -> Option<String> {
        if let Some(key) = non_blank(explicit) {
            job_debug!("Using API key from explicit input");
            return Some(key.to_string());
        }

        match self.prefs.get(API_KEY_KEY) {
            Ok(saved) => {
                if let Some(key) = non_blank(saved.as_deref()) {
                    job_debug!("Using saved API key");
                    return Some(key.to_string());
                }
            }
            Err(err) => job_warn!("Could not read saved API key: {}", err),
        }

        let fallback = self.credentials.default_api_key().map(str::to_string);
        if fallback.is_some() {
            job_debug!("Using system default API key");
        }
        fallback
    }

    pub fn save_api_key(&self, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }
        self.prefs.set(API_KEY_KEY, value)?;
        job_info!("API key saved");
        Ok(())
    }

    pub fn clear_api_key(&self) -> Result<(), ConfigError> {
        self.prefs.delete(API_KEY_KEY)?;
        job_info!("API key cleared");
        Ok(())
    }

    pub fn saved_api_key_present(&self) -> bool {
        matches!(self.prefs.get(API_KEY_KEY), Ok(Some(ref key)) if !key.trim().is_empty())
    }
}

/// Picks the mapping for a run. Never invents one: anything other than an upload in
/// upload mode or exactly one selected default yields `None`.
pub fn resolve_mapping(
    mode: MappingMode,
    uploaded: Option<UploadedFile>,
    selected_defaults: &[PathBuf],
) -> Option<MappingSource> {
    match (mode, uploaded, selected_defaults) {
        (MappingMode::Upload, Some(file), _) => Some(MappingSource::Uploaded(file)),
        (MappingMode::SystemDefault, _, [only]) => Some(MappingSource::SystemDefault(only.clone())),
        _ => None,
    }
}

/// Lists `*.xlsx` mapping files directly inside `dir`, skipping Office lock files.
/// A missing or unreadable directory yields an empty list.
pub fn discover_default_mappings(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            job_debug!("No default mappings in {:?}: {}", dir, err);
            return Vec::new();
        }
    };

    let mut found: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .filter(|e| {
            let name = e.file_name();
            let name = name.to_string_lossy();
            !name.starts_with(OFFICE_LOCK_PREFIX)
                && Path::new(name.as_ref())
                    .extension()
                    .and_then(|ext| ext.to_str())
                    == Some(MAPPING_EXTENSION)
        })
        .map(|e| e.path())
        .collect();
    found.sort();
    found
}

/// Finds a discovered default mapping by its file name.
pub fn find_default_mapping(candidates: &[PathBuf], name: &str) -> Option<PathBuf> {
    candidates
        .iter()
        .find(|path| path.file_name().and_then(|n| n.to_str()) == Some(name))
        .cloned()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
