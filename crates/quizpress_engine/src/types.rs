use std::path::PathBuf;

/// A file received from the client: raw bytes plus the name it was uploaded under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Where a job's ID mapping file comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingSource {
    Uploaded(UploadedFile),
    SystemDefault(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MappingMode {
    #[default]
    Upload,
    SystemDefault,
}
