use std::any::Any;
use std::error::Error as StdError;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use job_logging::{job_error, job_info};
use thiserror::Error;

use crate::stage::Workspace;

/// Error type a pipeline implementation may return.
pub type PipelineFailure = Box<dyn StdError + Send + Sync>;

/// Arguments handed to the external pipeline.
#[derive(Debug, Clone, Copy)]
pub struct PipelineRequest<'a> {
    pub input_dir: &'a Path,
    pub output_dir: &'a Path,
    pub api_key: Option<&'a str>,
    pub mapping_dir: Option<&'a Path>,
}

impl<'a> PipelineRequest<'a> {
    pub fn for_workspace(workspace: &'a Workspace, api_key: Option<&'a str>) -> Self {
        Self {
            input_dir: workspace.input_dir(),
            output_dir: workspace.output_dir(),
            api_key,
            mapping_dir: workspace.mapping_dir(),
        }
    }
}

/// Synchronous observer for `(current, total, message)` notifications.
pub trait ProgressSink {
    fn report(&mut self, current: i64, total: i64, message: &str);
}

impl<F> ProgressSink for F
where
    F: FnMut(i64, i64, &str),
{
    fn report(&mut self, current: i64, total: i64, message: &str) {
        self(current, total, message)
    }
}

/// The document-to-quiz conversion process. Returns normally once `output_dir`
/// holds the produced artifacts.
pub trait Pipeline {
    fn run(
        &self,
        request: &PipelineRequest<'_>,
        progress: &mut dyn ProgressSink,
    ) -> Result<(), PipelineFailure>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct PipelineError {
    pub message: String,
}

impl PipelineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Runs `pipeline` against `workspace`. Failures, including panics inside the
/// pipeline, come back as [`PipelineError`]; nothing is retried.
pub fn invoke(
    pipeline: &dyn Pipeline,
    workspace: &Workspace,
    api_key: Option<&str>,
    progress: &mut dyn ProgressSink,
) -> Result<(), PipelineError> {
    let request = PipelineRequest::for_workspace(workspace, api_key);
    job_info!(
        "Invoking pipeline (api key {}, mapping {})",
        if api_key.is_some() { "present" } else { "absent" },
        if request.mapping_dir.is_some() { "present" } else { "absent" }
    );

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| pipeline.run(&request, progress)));
    match outcome {
        Ok(Ok(())) => {
            job_info!("Pipeline finished");
            Ok(())
        }
        Ok(Err(err)) => {
            job_error!("Pipeline failed: {}", err);
            Err(PipelineError::new(err.to_string()))
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            job_error!("Pipeline panicked: {}", message);
            Err(PipelineError::new(message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "pipeline panicked".to_string()
    }
}
