use std::fs;
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};

use job_logging::{job_debug, job_info, job_warn};
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::persist::{AtomicFileWriter, PersistError};

pub const DEFAULT_ARCHIVE_NAME: &str = "quiz_results.zip";
pub const DEFAULT_MANIFEST_NAME: &str = "manifest.json";

#[derive(Debug, Error)]
pub enum PackagingError {
    #[error("failed to read {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to build archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("{0:?} is outside the output directory")]
    Walk(PathBuf),
    #[error("failed to write package: {0}")]
    Persist(#[from] PersistError),
    #[error("failed to encode manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackagedFile {
    /// Path relative to the output root, `/`-separated.
    pub path: String,
    pub size: u64,
    pub sha256: String,
}

#[derive(Serialize)]
struct ManifestDocument<'a> {
    file_count: usize,
    total_bytes: u64,
    files: &'a [PackagedFile],
}

/// A zip archive of a job's output plus the list of files it holds.
#[derive(Debug, Clone)]
pub struct ResultPackage {
    archive: Vec<u8>,
    files: Vec<PackagedFile>,
}

impl ResultPackage {
    pub fn archive(&self) -> &[u8] {
        &self.archive
    }

    pub fn files(&self) -> &[PackagedFile] {
        &self.files
    }

    /// Relative paths in walk order (names sorted within each directory).
    pub fn manifest(&self) -> Vec<String> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }

    pub fn manifest_json(&self) -> Result<String, PackagingError> {
        let manifest = ManifestDocument {
            file_count: self.files.len(),
            total_bytes: self.files.iter().map(|f| f.size).sum(),
            files: &self.files,
        };
        Ok(serde_json::to_string_pretty(&manifest)?)
    }

    /// Writes the archive (and its JSON manifest, when named) into `dir`.
    pub fn write_to(
        &self,
        dir: &Path,
        archive_name: &str,
        manifest_name: Option<&str>,
    ) -> Result<PathBuf, PackagingError> {
        let writer = AtomicFileWriter::new(dir);
        let archive_path = writer.write(archive_name, &self.archive)?;
        if let Some(name) = manifest_name {
            writer.write(name, self.manifest_json()?)?;
        }
        job_info!("Wrote result archive to {:?}", archive_path);
        Ok(archive_path)
    }
}

/// Archives every regular file under `output_dir`. Symbolic links are skipped
/// so the walk never leaves the output tree.
pub fn package(output_dir: &Path) -> Result<ResultPackage, PackagingError> {
    let mut found = Vec::new();
    walk(output_dir, output_dir, &mut found)?;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut files = Vec::with_capacity(found.len());
    for (path, archive_name) in found {
        let bytes = fs::read(&path).map_err(|source| PackagingError::Io {
            path: path.clone(),
            source,
        })?;
        zip.start_file(&archive_name, options)?;
        zip.write_all(&bytes).map_err(|source| PackagingError::Io {
            path: path.clone(),
            source,
        })?;
        job_debug!("Archived {} ({} bytes)", archive_name, bytes.len());

        files.push(PackagedFile {
            path: archive_name,
            size: bytes.len() as u64,
            sha256: hex_digest(&bytes),
        });
    }

    let archive = zip.finish()?.into_inner();
    job_info!(
        "Packaged {} file(s) into {} byte archive",
        files.len(),
        archive.len()
    );
    Ok(ResultPackage { archive, files })
}

fn walk(root: &Path, dir: &Path, found: &mut Vec<(PathBuf, String)>) -> Result<(), PackagingError> {
    let io_err = |source| PackagingError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries: Vec<_> = fs::read_dir(dir)
        .map_err(io_err)?
        .collect::<Result<Vec<_>, io::Error>>()
        .map_err(io_err)?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let file_type = entry.file_type().map_err(|source| PackagingError::Io {
            path: path.clone(),
            source,
        })?;
        if file_type.is_symlink() {
            job_warn!("Skipping symbolic link {:?}", path);
        } else if file_type.is_dir() {
            walk(root, &path, found)?;
        } else if file_type.is_file() {
            let name = archive_name(root, &path)?;
            found.push((path, name));
        }
    }
    Ok(())
}

fn archive_name(root: &Path, path: &Path) -> Result<String, PackagingError> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| PackagingError::Walk(path.to_path_buf()))?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}

fn hex_digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest.iter() {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}
