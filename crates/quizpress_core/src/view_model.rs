use crate::{FailureKind, JobStatus, Warning};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobViewModel {
    pub status: JobStatus,
    pub percent: u8,
    pub message: String,
    pub warnings: Vec<Warning>,
    /// Present only once the output has been archived.
    pub manifest: Option<Vec<String>>,
    pub failure: Option<FailureView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureView {
    pub kind: FailureKind,
    pub message: String,
}

impl JobViewModel {
    /// A download is offered only after a clean run that produced an archive.
    pub fn download_ready(&self) -> bool {
        self.status == JobStatus::Succeeded && self.failure.is_none() && self.manifest.is_some()
    }
}
