mod common;

use std::fs;

use pretty_assertions::assert_eq;
use quizpress_core::{Effect, FailureKind, JobStatus, Warning};
use quizpress_engine::{
    JobError, JobRequest, JobRunner, MappingSource, UploadedFile,
};
use tempfile::TempDir;

use common::{
    init_logging, list_names, FailingPipeline, PanickingPipeline, RecordingObserver,
    RemovesOutputPipeline, WritingPipeline,
};

fn two_docs() -> Vec<UploadedFile> {
    vec![
        UploadedFile::new("de_1.docx", b"doc one".to_vec()),
        UploadedFile::new("de_2.docx", b"doc two".to_vec()),
    ]
}

fn progress_effects(effects: &[Effect]) -> Vec<u8> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::ShowProgress { percent, .. } => Some(*percent),
            _ => None,
        })
        .collect()
}

#[test]
fn full_job_with_mapping_and_key() {
    init_logging();
    let base = TempDir::new().unwrap();
    let mut pipeline =
        WritingPipeline::new(vec![("quiz.xml", "<quiz/>"), ("img/q1.png", "png")]);
    pipeline.steps = vec![(0, 2), (1, 2), (2, 2)];

    let request = JobRequest::new(two_docs())
        .with_mapping(Some(MappingSource::Uploaded(UploadedFile::new(
            "ids.xlsx",
            b"map".to_vec(),
        ))))
        .with_api_key(Some("key-1".to_string()));

    let mut effects = Vec::new();
    let outcome = JobRunner::new(&pipeline)
        .with_workspace_base(base.path())
        .run(request, &mut effects)
        .unwrap();

    let seen = pipeline.seen();
    assert_eq!(seen.input_files, vec!["de_1.docx", "de_2.docx"]);
    assert_eq!(seen.mapping_files, vec!["ids.xlsx"]);
    assert!(seen.mapping_dir.is_some());
    assert_eq!(seen.api_key.as_deref(), Some("key-1"));
    assert!(seen.output_was_empty);

    assert_eq!(outcome.package.manifest(), vec!["img/q1.png", "quiz.xml"]);
    assert_eq!(outcome.view.status, JobStatus::Succeeded);
    assert!(outcome.view.download_ready());
    assert!(outcome.view.warnings.is_empty());
    assert_eq!(progress_effects(&effects), vec![0, 50, 100]);
    assert_eq!(
        effects.last(),
        Some(&Effect::OfferDownload {
            manifest: vec!["img/q1.png".to_string(), "quiz.xml".to_string()],
        })
    );

    // Workspace reclaimed.
    assert!(!seen.workspace_root.exists());
    assert!(list_names(base.path()).is_empty());
}

#[test]
fn missing_mapping_warns_but_still_runs() {
    init_logging();
    let base = TempDir::new().unwrap();
    let pipeline = WritingPipeline::new(vec![("quiz.xml", "<quiz/>")]);

    let mut effects = Vec::new();
    let outcome = JobRunner::new(&pipeline)
        .with_workspace_base(base.path())
        .run(
            JobRequest::new(two_docs()).with_api_key(Some("k".to_string())),
            &mut effects,
        )
        .unwrap();

    assert_eq!(effects[0], Effect::Warn(Warning::MissingMapping));
    assert!(pipeline.seen().mapping_dir.is_none());
    assert_eq!(outcome.view.warnings, vec![Warning::MissingMapping]);
    assert_eq!(outcome.view.status, JobStatus::Succeeded);
}

#[test]
fn blank_api_key_is_treated_as_absent() {
    init_logging();
    let base = TempDir::new().unwrap();
    let pipeline = WritingPipeline::new(vec![]);

    let mut effects = Vec::new();
    JobRunner::new(&pipeline)
        .with_workspace_base(base.path())
        .run(
            JobRequest::new(two_docs()).with_api_key(Some("  ".to_string())),
            &mut effects,
        )
        .unwrap();

    assert!(effects.contains(&Effect::Warn(Warning::MissingApiKey)));
    assert_eq!(pipeline.seen().api_key, None);
}

#[test]
fn pipeline_failure_fails_job_and_skips_packaging() {
    init_logging();
    let base = TempDir::new().unwrap();
    let pipeline = FailingPipeline::default();

    let mut effects = Vec::new();
    let err = JobRunner::new(&pipeline)
        .with_workspace_base(base.path())
        .run(JobRequest::new(two_docs()), &mut effects)
        .unwrap_err();

    match &err {
        JobError::Pipeline(inner) => assert_eq!(inner.message, "question 3 has no answer key"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(effects.contains(&Effect::StatusChanged(JobStatus::Failed)));
    assert!(effects.contains(&Effect::ReportFailure {
        kind: FailureKind::Pipeline,
        message: "question 3 has no answer key".to_string(),
    }));
    assert!(!effects
        .iter()
        .any(|e| matches!(e, Effect::OfferDownload { .. })));

    let root = pipeline.seen.borrow().clone().unwrap().workspace_root;
    assert!(!root.exists());
    assert!(list_names(base.path()).is_empty());
}

#[test]
fn pipeline_panic_is_contained() {
    init_logging();
    let base = TempDir::new().unwrap();

    let mut effects = Vec::new();
    let err = JobRunner::new(&PanickingPipeline)
        .with_workspace_base(base.path())
        .run(JobRequest::new(two_docs()), &mut effects)
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::Pipeline);
    assert_eq!(err.detail(), "index out of range in image extractor");
    assert!(list_names(base.path()).is_empty());
}

#[test]
fn staging_failure_never_invokes_pipeline() {
    init_logging();
    let base = TempDir::new().unwrap();
    let pipeline = WritingPipeline::new(vec![("quiz.xml", "<quiz/>")]);
    let request = JobRequest::new(two_docs()).with_mapping(Some(MappingSource::SystemDefault(
        base.path().join("missing.xlsx"),
    )));

    let mut effects = Vec::new();
    let err = JobRunner::new(&pipeline)
        .with_workspace_base(base.path())
        .run(request, &mut effects)
        .unwrap_err();

    assert!(matches!(err, JobError::Staging(_)));
    assert!(pipeline.seen.borrow().is_none());
    assert!(effects.contains(&Effect::StatusChanged(JobStatus::Failed)));
    assert!(list_names(base.path()).is_empty());
}

#[test]
fn system_default_mapping_reaches_pipeline() {
    init_logging();
    let base = TempDir::new().unwrap();
    let defaults = TempDir::new().unwrap();
    let default_path = defaults.path().join("khoi_10.xlsx");
    fs::write(&default_path, b"ids").unwrap();
    let pipeline = WritingPipeline::new(vec![("quiz.xml", "<quiz/>")]);

    let mut effects = Vec::new();
    JobRunner::new(&pipeline)
        .with_workspace_base(base.path())
        .run(
            JobRequest::new(two_docs())
                .with_mapping(Some(MappingSource::SystemDefault(default_path)))
                .with_api_key(Some("k".to_string())),
            &mut effects,
        )
        .unwrap();

    assert_eq!(pipeline.seen().mapping_files, vec!["khoi_10.xlsx"]);
    assert!(effects.contains(&Effect::Note("ID mapping file loaded".to_string())));
}

#[test]
fn packaging_failure_offers_no_download() {
    init_logging();
    let base = TempDir::new().unwrap();
    let pipeline = RemovesOutputPipeline::default();

    let mut observer = RecordingObserver::default();
    let err = JobRunner::new(&pipeline)
        .with_workspace_base(base.path())
        .run(JobRequest::new(two_docs()), &mut observer)
        .unwrap_err();

    assert!(matches!(err, JobError::Packaging(_)), "{err}");
    assert_eq!(err.kind(), FailureKind::Packaging);
    assert!(!observer
        .effects
        .iter()
        .any(|e| matches!(e, Effect::OfferDownload { .. })));
    assert!(observer.effects.iter().any(|e| matches!(
        e,
        Effect::ReportFailure {
            kind: FailureKind::Packaging,
            ..
        }
    )));

    let last = observer.views.last().unwrap();
    assert_eq!(last.status, JobStatus::Succeeded);
    assert_eq!(last.failure.as_ref().map(|f| f.kind), Some(FailureKind::Packaging));
    assert!(!last.download_ready());

    let root = pipeline.seen.borrow().clone().unwrap().workspace_root;
    assert!(!root.exists());
    assert!(list_names(base.path()).is_empty());
}

#[test]
fn views_follow_state_changes() {
    init_logging();
    let base = TempDir::new().unwrap();
    let mut pipeline = WritingPipeline::new(vec![("quiz.xml", "<quiz/>")]);
    pipeline.steps = vec![(1, 2), (2, 2)];

    let mut observer = RecordingObserver::default();
    let outcome = JobRunner::new(&pipeline)
        .with_workspace_base(base.path())
        .run(
            JobRequest::new(two_docs()).with_api_key(Some("k".to_string())),
            &mut observer,
        )
        .unwrap();

    let statuses: Vec<JobStatus> = observer.views.iter().map(|v| v.status).collect();
    // Warning, Started, two progress steps, Succeeded, Packaged. Staged only adds notes.
    assert_eq!(
        statuses,
        vec![
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Running,
            JobStatus::Running,
            JobStatus::Succeeded,
            JobStatus::Succeeded,
        ]
    );
    assert_eq!(observer.views.last(), Some(&outcome.view));
}
