use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use job_logging::{job_debug, job_info, job_warn};
use tempfile::TempDir;
use thiserror::Error;

use crate::types::{MappingSource, UploadedFile};

const WORKSPACE_PREFIX: &str = "quizpress-job-";
const INPUT_DIR: &str = "input";
const OUTPUT_DIR: &str = "output";
const MAPPING_DIR: &str = "mapping";

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("failed to create workspace: {0}")]
    CreateWorkspace(#[source] io::Error),
    #[error("failed to write {name}: {source}")]
    Write { name: String, source: io::Error },
    #[error("failed to copy mapping file {path:?}: {source}")]
    CopyMapping { path: PathBuf, source: io::Error },
    #[error("unusable file name {0:?}")]
    InvalidName(String),
}

/// Ephemeral per-job directory tree. Dropping it deletes everything under it.
#[derive(Debug)]
pub struct Workspace {
    root: TempDir,
    input_dir: PathBuf,
    output_dir: PathBuf,
    mapping_dir: Option<PathBuf>,
}

impl Workspace {
    /// Unique name of this workspace, usable as a job tag.
    pub fn id(&self) -> String {
        self.root
            .path()
            .file_name()
            .map(|name| name.to_string_lossy().trim_start_matches(WORKSPACE_PREFIX).to_string())
            .unwrap_or_default()
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Set only when the job has a mapping file.
    pub fn mapping_dir(&self) -> Option<&Path> {
        self.mapping_dir.as_deref()
    }

    /// Deletes the workspace now, reporting any error instead of ignoring it like `Drop` does.
    pub fn close(self) -> io::Result<()> {
        self.root.close()
    }
}

/// Stages into a fresh workspace under the system temp directory.
pub fn stage(
    inputs: &[UploadedFile],
    mapping: Option<&MappingSource>,
) -> Result<Workspace, StagingError> {
    stage_in(&std::env::temp_dir(), inputs, mapping)
}

/// Stages into a fresh workspace under `base`.
///
/// Inputs are written byte-for-byte under `input/`; two inputs with the same
/// name overwrite each other, last one wins. On error the partially built
/// workspace is removed before returning.
pub fn stage_in(
    base: &Path,
    inputs: &[UploadedFile],
    mapping: Option<&MappingSource>,
) -> Result<Workspace, StagingError> {
    let root = tempfile::Builder::new()
        .prefix(WORKSPACE_PREFIX)
        .tempdir_in(base)
        .map_err(StagingError::CreateWorkspace)?;

    let input_dir = root.path().join(INPUT_DIR);
    let output_dir = root.path().join(OUTPUT_DIR);
    let mapping_root = root.path().join(MAPPING_DIR);
    for dir in [&input_dir, &output_dir, &mapping_root] {
        fs::create_dir(dir).map_err(StagingError::CreateWorkspace)?;
    }

    for file in inputs {
        let name = safe_file_name(&file.name)?;
        let target = input_dir.join(name);
        if target.exists() {
            job_warn!("Input {} appears more than once; keeping the last copy", name);
        }
        fs::write(&target, &file.bytes).map_err(|source| StagingError::Write {
            name: name.to_string(),
            source,
        })?;
        job_debug!("Staged input {} ({} bytes)", name, file.bytes.len());
    }

    let mapping_dir = match mapping {
        Some(source) => {
            write_mapping(source, &mapping_root)?;
            Some(mapping_root)
        }
        None => None,
    };

    job_info!(
        "Workspace {:?} ready: {} input(s), mapping {}",
        root.path(),
        inputs.len(),
        if mapping_dir.is_some() { "present" } else { "absent" }
    );

    Ok(Workspace {
        root,
        input_dir,
        output_dir,
        mapping_dir,
    })
}

fn write_mapping(source: &MappingSource, mapping_root: &Path) -> Result<(), StagingError> {
    match source {
        MappingSource::Uploaded(file) => {
            let name = safe_file_name(&file.name)?;
            fs::write(mapping_root.join(name), &file.bytes).map_err(|source| {
                StagingError::Write {
                    name: name.to_string(),
                    source,
                }
            })?;
        }
        MappingSource::SystemDefault(path) => {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| StagingError::InvalidName(path.display().to_string()))?;
            let name = safe_file_name(name)?;
            fs::copy(path, mapping_root.join(name)).map_err(|source| {
                StagingError::CopyMapping {
                    path: path.clone(),
                    source,
                }
            })?;
        }
    }
    Ok(())
}

/// Keeps only the last path component of an uploaded name, whichever separator it uses.
fn safe_file_name(raw: &str) -> Result<&str, StagingError> {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    if name.is_empty() || name == "." || name == ".." {
        return Err(StagingError::InvalidName(raw.to_string()));
    }
    Ok(name)
}
