use std::path::PathBuf;

use job_logging::{clear_job_tag, job_error, job_info, job_warn, set_job_tag};
use quizpress_core::{update, Effect, FailureKind, JobState, JobViewModel, Msg};
use thiserror::Error;

use crate::package::{package, PackagingError, ResultPackage};
use crate::pipeline::{invoke, Pipeline, PipelineError, ProgressSink};
use crate::stage::{stage_in, StagingError, Workspace};
use crate::types::{MappingSource, UploadedFile};

#[derive(Debug, Error)]
pub enum JobError {
    #[error("could not prepare files: {0}")]
    Staging(#[from] StagingError),
    #[error("processing failed: {0}")]
    Pipeline(#[from] PipelineError),
    #[error("could not package results: {0}")]
    Packaging(#[from] PackagingError),
}

impl JobError {
    pub fn kind(&self) -> FailureKind {
        match self {
            JobError::Staging(_) => FailureKind::Staging,
            JobError::Pipeline(_) => FailureKind::Pipeline,
            JobError::Packaging(_) => FailureKind::Packaging,
        }
    }

    /// The underlying error text, without the stage prefix.
    pub fn detail(&self) -> String {
        match self {
            JobError::Staging(err) => err.to_string(),
            JobError::Pipeline(err) => err.message.clone(),
            JobError::Packaging(err) => err.to_string(),
        }
    }
}

/// Everything one "start processing" action needs.
#[derive(Debug, Clone, Default)]
pub struct JobRequest {
    pub inputs: Vec<UploadedFile>,
    pub mapping: Option<MappingSource>,
    pub api_key: Option<String>,
}

impl JobRequest {
    pub fn new(inputs: Vec<UploadedFile>) -> Self {
        Self {
            inputs,
            ..Default::default()
        }
    }

    pub fn with_mapping(mut self, mapping: Option<MappingSource>) -> Self {
        self.mapping = mapping;
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }
}

/// Receives what a running job produces: every effect, in order, and a fresh view
/// after each message that changed the job's state.
pub trait JobObserver {
    fn on_effect(&mut self, _effect: &Effect) {}

    fn on_view(&mut self, _view: &JobViewModel) {}
}

impl JobObserver for Vec<Effect> {
    fn on_effect(&mut self, effect: &Effect) {
        self.push(effect.clone());
    }
}

#[derive(Debug)]
pub struct JobOutcome {
    pub package: ResultPackage,
    pub view: JobViewModel,
}

struct JobTracker<'o> {
    state: JobState,
    observer: &'o mut dyn JobObserver,
}

impl<'o> JobTracker<'o> {
    fn new(observer: &'o mut dyn JobObserver) -> Self {
        Self {
            state: JobState::new(),
            observer,
        }
    }

    fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        for effect in &effects {
            self.observer.on_effect(effect);
        }
        if self.state.consume_dirty() {
            self.observer.on_view(&self.state.view());
        }
    }

    fn fail(&mut self, err: &JobError) {
        let message = err.detail();
        match err.kind() {
            FailureKind::Packaging => self.dispatch(Msg::PackagingFailed { message }),
            kind => self.dispatch(Msg::Failed { kind, message }),
        }
    }
}

impl ProgressSink for JobTracker<'_> {
    fn report(&mut self, current: i64, total: i64, message: &str) {
        self.dispatch(Msg::Progress {
            current,
            total,
            message: message.to_string(),
        });
    }
}

/// Clears the thread's job tag however the job ends.
struct JobTagGuard;

impl JobTagGuard {
    fn set(tag: String) -> Self {
        set_job_tag(tag);
        Self
    }
}

impl Drop for JobTagGuard {
    fn drop(&mut self) {
        clear_job_tag();
    }
}

/// Runs jobs sequentially: stage, invoke, package. Each job gets its own workspace,
/// removed before [`run`](Self::run) returns.
pub struct JobRunner<'p> {
    pipeline: &'p dyn Pipeline,
    workspace_base: PathBuf,
}

impl<'p> JobRunner<'p> {
    pub fn new(pipeline: &'p dyn Pipeline) -> Self {
        Self {
            pipeline,
            workspace_base: std::env::temp_dir(),
        }
    }

    /// Creates workspaces under `base` instead of the system temp directory.
    pub fn with_workspace_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.workspace_base = base.into();
        self
    }

    pub fn run(
        &self,
        request: JobRequest,
        observer: &mut dyn JobObserver,
    ) -> Result<JobOutcome, JobError> {
        let mut tracker = JobTracker::new(observer);
        let api_key = request
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty());

        if request.mapping.is_none() {
            job_warn!("No mapping file selected; continuing without one");
            tracker.dispatch(Msg::MappingMissing);
        }
        if api_key.is_none() {
            job_warn!("No API key resolved; continuing without one");
            tracker.dispatch(Msg::ApiKeyMissing);
        }

        let workspace = match stage_in(
            &self.workspace_base,
            &request.inputs,
            request.mapping.as_ref(),
        ) {
            Ok(workspace) => workspace,
            Err(err) => {
                let err = JobError::from(err);
                job_error!("{}", err);
                tracker.fail(&err);
                return Err(err);
            }
        };

        let _tag = JobTagGuard::set(workspace.id());
        tracker.dispatch(Msg::Staged {
            inputs: request.inputs.len(),
            mapping: workspace.mapping_dir().is_some(),
        });

        let result = self.run_staged(&workspace, api_key, &mut tracker);
        if let Err(err) = &result {
            tracker.fail(err);
        }

        let root = workspace.root().to_path_buf();
        if let Err(err) = workspace.close() {
            job_warn!("Failed to remove workspace {:?}: {}", root, err);
        }

        let package = result?;
        job_info!("Job complete with {} file(s)", package.files().len());
        Ok(JobOutcome {
            package,
            view: tracker.state.view(),
        })
    }

    fn run_staged(
        &self,
        workspace: &Workspace,
        api_key: Option<&str>,
        tracker: &mut JobTracker<'_>,
    ) -> Result<ResultPackage, JobError> {
        tracker.dispatch(Msg::Started);
        invoke(self.pipeline, workspace, api_key, tracker)?;
        tracker.dispatch(Msg::Succeeded);

        let package = package(workspace.output_dir())?;
        tracker.dispatch(Msg::Packaged {
            manifest: package.manifest(),
        });
        Ok(package)
    }
}
