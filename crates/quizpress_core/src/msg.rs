use crate::FailureKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// No mapping source resolved for this job.
    MappingMissing,
    /// No API key resolved for this job.
    ApiKeyMissing,
    /// Workspace built with `inputs` documents and an optional mapping file.
    Staged { inputs: usize, mapping: bool },
    /// Pipeline invocation began.
    Started,
    /// Pipeline progress notification.
    Progress {
        current: i64,
        total: i64,
        message: String,
    },
    /// Pipeline returned normally.
    Succeeded,
    /// Staging or pipeline failure.
    Failed { kind: FailureKind, message: String },
    /// Output archived; `manifest` lists the archived files.
    Packaged { manifest: Vec<String> },
    /// Archiving the output failed after a successful run.
    PackagingFailed { message: String },
}
