//! Quizpress engine: session handling, run configuration, workspace staging,
//! pipeline invocation and result packaging.
mod command;
mod job;
mod package;
mod persist;
mod pipeline;
mod prefs;
mod resolve;
mod session;
mod settings;
mod stage;
mod types;

pub use command::{parse_progress_line, CommandPipeline, API_KEY_ENV};
pub use job::{JobError, JobObserver, JobOutcome, JobRequest, JobRunner};
pub use package::{
    package, PackagedFile, PackagingError, ResultPackage, DEFAULT_ARCHIVE_NAME,
    DEFAULT_MANIFEST_NAME,
};
pub use persist::{ensure_dir, AtomicFileWriter, PersistError};
pub use pipeline::{
    invoke, Pipeline, PipelineError, PipelineFailure, PipelineRequest, ProgressSink,
};
pub use prefs::{
    FilePreferenceStore, MemoryPreferenceStore, PreferenceError, PreferenceStore, API_KEY_KEY,
    IDENTITY_KEY,
};
pub use resolve::{
    discover_default_mappings, find_default_mapping, resolve_mapping, ConfigError,
    ConfigResolver,
};
pub use session::{AuthError, SessionManager};
pub use settings::{
    CredentialStore, PipelineCommand, Settings, SettingsError, DEFAULT_API_KEY_ENV,
    MAPPING_DIR_ENV,
};
pub use stage::{stage, stage_in, StagingError, Workspace};
pub use types::{MappingMode, MappingSource, UploadedFile};
