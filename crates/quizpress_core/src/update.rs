use crate::{Effect, FailureKind, JobState, JobStatus, Msg, Warning};

/// Pure update function: applies a message to job state and returns any effects.
pub fn update(mut state: JobState, msg: Msg) -> (JobState, Vec<Effect>) {
    let effects = match msg {
        Msg::MappingMissing => warn(&mut state, Warning::MissingMapping),
        Msg::ApiKeyMissing => warn(&mut state, Warning::MissingApiKey),
        Msg::Staged { inputs, mapping } => {
            if state.status() != JobStatus::Pending {
                return (state, Vec::new());
            }
            let mut effects = Vec::with_capacity(2);
            if mapping {
                effects.push(Effect::Note("ID mapping file loaded".to_string()));
            }
            effects.push(Effect::Note(format!("staged {inputs} input document(s)")));
            effects
        }
        Msg::Started => {
            // Terminal states never re-enter Running.
            if state.status() != JobStatus::Pending {
                return (state, Vec::new());
            }
            state.set_status(JobStatus::Running);
            vec![Effect::StatusChanged(JobStatus::Running)]
        }
        Msg::Progress {
            current,
            total,
            message,
        } => {
            if state.status() != JobStatus::Running {
                return (state, Vec::new());
            }
            state.apply_progress(current, total, message.clone());
            vec![Effect::ShowProgress {
                percent: state.percent(),
                message,
            }]
        }
        Msg::Succeeded => {
            if state.status() != JobStatus::Running {
                return (state, Vec::new());
            }
            state.complete();
            vec![Effect::StatusChanged(JobStatus::Succeeded)]
        }
        Msg::Failed { kind, message } => match state.status() {
            JobStatus::Pending | JobStatus::Running => {
                state.set_status(JobStatus::Failed);
                state.record_failure(kind, message.clone());
                vec![
                    Effect::StatusChanged(JobStatus::Failed),
                    Effect::ReportFailure { kind, message },
                ]
            }
            JobStatus::Succeeded | JobStatus::Failed => Vec::new(),
        },
        Msg::Packaged { manifest } => {
            if state.status() != JobStatus::Succeeded || state.has_failure() {
                return (state, Vec::new());
            }
            state.set_manifest(manifest.clone());
            vec![Effect::OfferDownload { manifest }]
        }
        Msg::PackagingFailed { message } => {
            if state.status() != JobStatus::Succeeded || state.has_failure() {
                return (state, Vec::new());
            }
            state.record_failure(FailureKind::Packaging, message.clone());
            vec![Effect::ReportFailure {
                kind: FailureKind::Packaging,
                message,
            }]
        }
    };

    (state, effects)
}

fn warn(state: &mut JobState, warning: Warning) -> Vec<Effect> {
    if state.push_warning(warning) {
        vec![Effect::Warn(warning)]
    } else {
        Vec::new()
    }
}
