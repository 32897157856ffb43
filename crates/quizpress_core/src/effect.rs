use crate::{FailureKind, JobStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Warn(Warning),
    Note(String),
    StatusChanged(JobStatus),
    ShowProgress { percent: u8, message: String },
    OfferDownload { manifest: Vec<String> },
    ReportFailure { kind: FailureKind, message: String },
}

/// Non-fatal conditions surfaced to the user; processing continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Warning {
    /// No mapping file selected; question IDs may be assigned incorrectly.
    MissingMapping,
    /// No API key resolved; image upload may fail inside the pipeline.
    MissingApiKey,
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::MissingMapping => {
                write!(f, "no ID mapping file selected; question IDs may be wrong")
            }
            Warning::MissingApiKey => {
                write!(f, "no API key configured; image upload may fail")
            }
        }
    }
}
