use std::fmt;

use crate::view_model::{FailureView, JobViewModel};
use crate::{Progress, Warning};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobStatus {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Staging,
    Pipeline,
    Packaging,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Staging => write!(f, "staging failed"),
            FailureKind::Pipeline => write!(f, "pipeline failed"),
            FailureKind::Packaging => write!(f, "packaging failed"),
        }
    }
}

/// Lifecycle state of a single job. Mutated only through [`crate::update`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobState {
    status: JobStatus,
    progress: Progress,
    percent: u8,
    warnings: Vec<Warning>,
    manifest: Option<Vec<String>>,
    failure: Option<(FailureKind, String)>,
    // Set once a notification with a positive total has been applied.
    sized: bool,
    dirty: bool,
}

impl JobState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn view(&self) -> JobViewModel {
        JobViewModel {
            status: self.status,
            percent: self.percent,
            message: self.progress.message.clone(),
            warnings: self.warnings.clone(),
            manifest: self.manifest.clone(),
            failure: self.failure.as_ref().map(|(kind, message)| FailureView {
                kind: *kind,
                message: message.clone(),
            }),
        }
    }

    /// Returns whether anything changed since the last call, and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn push_warning(&mut self, warning: Warning) -> bool {
        if self.warnings.contains(&warning) {
            return false;
        }
        self.warnings.push(warning);
        self.dirty = true;
        true
    }

    pub(crate) fn set_status(&mut self, status: JobStatus) {
        if self.status != status {
            self.status = status;
            self.dirty = true;
        }
    }

    /// A notification without a positive total keeps the last sized percentage;
    /// before any sized notification it shows 0%.
    pub(crate) fn apply_progress(&mut self, current: i64, total: i64, message: String) {
        self.progress = Progress {
            current,
            total,
            message,
        };
        if total > 0 {
            self.sized = true;
            self.percent = self.progress.percent();
        } else if !self.sized {
            self.percent = 0;
        }
        self.dirty = true;
    }

    pub(crate) fn complete(&mut self) {
        self.percent = 100;
        self.set_status(JobStatus::Succeeded);
    }

    pub(crate) fn record_failure(&mut self, kind: FailureKind, message: String) {
        self.failure = Some((kind, message));
        self.manifest = None;
        self.dirty = true;
    }

    pub(crate) fn set_manifest(&mut self, manifest: Vec<String>) {
        self.manifest = Some(manifest);
        self.dirty = true;
    }

    pub(crate) fn has_failure(&self) -> bool {
        self.failure.is_some()
    }
}
