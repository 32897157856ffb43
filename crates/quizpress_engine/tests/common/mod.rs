#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;

use quizpress_core::{Effect, JobViewModel};
use quizpress_engine::{JobObserver, Pipeline, PipelineFailure, PipelineRequest, ProgressSink};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(job_logging::initialize_for_tests);
}

/// What a fake pipeline observed when it was called.
#[derive(Debug, Clone, Default)]
pub struct SeenRequest {
    pub input_files: Vec<String>,
    pub mapping_dir: Option<PathBuf>,
    pub mapping_files: Vec<String>,
    pub api_key: Option<String>,
    pub output_was_empty: bool,
    pub workspace_root: PathBuf,
}

pub fn list_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn observe(request: &PipelineRequest<'_>) -> SeenRequest {
    SeenRequest {
        input_files: list_names(request.input_dir),
        mapping_dir: request.mapping_dir.map(Path::to_path_buf),
        mapping_files: request.mapping_dir.map(list_names).unwrap_or_default(),
        api_key: request.api_key.map(str::to_string),
        output_was_empty: list_names(request.output_dir).is_empty(),
        workspace_root: request.output_dir.parent().unwrap().to_path_buf(),
    }
}

/// Reports the given progress steps, then writes `outputs` under the output dir.
#[derive(Default)]
pub struct WritingPipeline {
    pub steps: Vec<(i64, i64)>,
    pub outputs: Vec<(&'static str, &'static str)>,
    pub seen: RefCell<Option<SeenRequest>>,
}

impl WritingPipeline {
    pub fn new(outputs: Vec<(&'static str, &'static str)>) -> Self {
        Self {
            outputs,
            ..Default::default()
        }
    }

    pub fn seen(&self) -> SeenRequest {
        self.seen.borrow().clone().expect("pipeline was called")
    }
}

impl Pipeline for WritingPipeline {
    fn run(
        &self,
        request: &PipelineRequest<'_>,
        progress: &mut dyn ProgressSink,
    ) -> Result<(), PipelineFailure> {
        *self.seen.borrow_mut() = Some(observe(request));
        for (current, total) in &self.steps {
            progress.report(*current, *total, "working");
        }
        for (name, contents) in &self.outputs {
            let path = request.output_dir.join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, contents)?;
        }
        Ok(())
    }
}

/// Reports one progress step, writes a partial file, then fails.
#[derive(Default)]
pub struct FailingPipeline {
    pub seen: RefCell<Option<SeenRequest>>,
}

impl Pipeline for FailingPipeline {
    fn run(
        &self,
        request: &PipelineRequest<'_>,
        progress: &mut dyn ProgressSink,
    ) -> Result<(), PipelineFailure> {
        *self.seen.borrow_mut() = Some(observe(request));
        progress.report(1, 4, "parsing");
        fs::write(request.output_dir.join("partial.xml"), b"<quiz>")?;
        Err("question 3 has no answer key".into())
    }
}

pub struct PanickingPipeline;

impl Pipeline for PanickingPipeline {
    fn run(
        &self,
        _request: &PipelineRequest<'_>,
        _progress: &mut dyn ProgressSink,
    ) -> Result<(), PipelineFailure> {
        panic!("index out of range in image extractor");
    }
}

/// Succeeds after deleting its output directory, so packaging has nothing to walk.
#[derive(Default)]
pub struct RemovesOutputPipeline {
    pub seen: RefCell<Option<SeenRequest>>,
}

impl Pipeline for RemovesOutputPipeline {
    fn run(
        &self,
        request: &PipelineRequest<'_>,
        _progress: &mut dyn ProgressSink,
    ) -> Result<(), PipelineFailure> {
        *self.seen.borrow_mut() = Some(observe(request));
        fs::remove_dir_all(request.output_dir)?;
        Ok(())
    }
}

/// Keeps every effect and every view a job hands to its observer.
#[derive(Default)]
pub struct RecordingObserver {
    pub effects: Vec<Effect>,
    pub views: Vec<JobViewModel>,
}

impl JobObserver for RecordingObserver {
    fn on_effect(&mut self, effect: &Effect) {
        self.effects.push(effect.clone());
    }

    fn on_view(&mut self, view: &JobViewModel) {
        self.views.push(view.clone());
    }
}
