use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use job_logging::{job_info, job_warn};
use quizpress_core::AllowList;
use serde::Deserialize;
use thiserror::Error;

/// Environment variable overriding `general.default_imgbb_key`.
pub const DEFAULT_API_KEY_ENV: &str = "QUIZPRESS_DEFAULT_API_KEY";
/// Environment variable overriding `mapping.default_dir`.
pub const MAPPING_DIR_ENV: &str = "QUIZPRESS_MAPPING_DIR";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("invalid settings in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Read-only allow-list plus fallback API key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialStore {
    allowed: AllowList,
    default_api_key: Option<String>,
}

impl CredentialStore {
    pub fn new<I, S>(allowed_identities: I, default_api_key: Option<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed: AllowList::new(allowed_identities),
            default_api_key: default_api_key.filter(|key| !key.trim().is_empty()),
        }
    }

    /// Open mode with no default key.
    pub fn open() -> Self {
        Self::default()
    }

    pub fn allowed(&self) -> &AllowList {
        &self.allowed
    }

    pub fn default_api_key(&self) -> Option<&str> {
        self.default_api_key.as_deref()
    }
}

/// External pipeline command line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PipelineCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub credentials: CredentialStore,
    pub pipeline: Option<PipelineCommand>,
    pub mapping_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            credentials: CredentialStore::open(),
            pipeline: None,
            mapping_dir: PathBuf::from("ID"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    #[serde(default)]
    general: RawGeneral,
    pipeline: Option<PipelineCommand>,
    #[serde(default)]
    mapping: RawMapping,
}

#[derive(Debug, Default, Deserialize)]
struct RawGeneral {
    #[serde(default)]
    allowed_emails: Vec<String>,
    default_imgbb_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawMapping {
    default_dir: Option<PathBuf>,
}

impl Settings {
    /// Loads `path`, falling back to defaults (open mode) when the file does not exist,
    /// then applies environment overrides.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let settings = match fs::read_to_string(path) {
            Ok(text) => {
                let settings = Self::from_toml_str(&text).map_err(|source| SettingsError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?;
                job_info!(
                    "Loaded settings from {:?} ({} allowed identities)",
                    path,
                    settings.credentials.allowed().len()
                );
                settings
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                job_warn!("No settings at {:?}; running in open (demo) mode", path);
                Self::default()
            }
            Err(source) => {
                return Err(SettingsError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Ok(settings.with_overrides(|name| std::env::var(name).ok()))
    }

    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        let raw: RawSettings = toml::from_str(text)?;
        let defaults = Self::default();
        Ok(Self {
            credentials: CredentialStore::new(
                raw.general.allowed_emails,
                raw.general.default_imgbb_key,
            ),
            pipeline: raw.pipeline,
            mapping_dir: raw.mapping.default_dir.unwrap_or(defaults.mapping_dir),
        })
    }

    /// Applies overrides looked up through `lookup` (the process environment in production).
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup(DEFAULT_API_KEY_ENV).filter(|v| !v.trim().is_empty()) {
            self.credentials.default_api_key = Some(key);
        }
        if let Some(dir) = lookup(MAPPING_DIR_ENV).filter(|v| !v.trim().is_empty()) {
            self.mapping_dir = PathBuf::from(dir);
        }
        self
    }
}
