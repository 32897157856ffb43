use indicatif::{ProgressBar, ProgressStyle};
use quizpress_core::JobViewModel;
use quizpress_engine::JobObserver;

const BAR_TEMPLATE: &str = "{bar:40.cyan/blue} {pos:>3}% {msg}";

/// Renders the job as a terminal progress bar, redrawn from each changed view.
///
/// Warnings, notes and failures already reach the terminal through the engine
/// log, so effects are not rendered.
pub struct TerminalObserver {
    bar: ProgressBar,
}

impl TerminalObserver {
    pub fn new() -> Self {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        Self { bar }
    }
}

impl Default for TerminalObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl JobObserver for TerminalObserver {
    fn on_view(&mut self, view: &JobViewModel) {
        self.bar.set_position(u64::from(view.percent));
        if let Some(failure) = &view.failure {
            self.bar.abandon_with_message(failure.kind.to_string());
        } else if view.status.is_terminal() {
            let message = match &view.manifest {
                Some(files) => format!("{} result file(s) ready", files.len()),
                None => "processing complete".to_string(),
            };
            self.bar.finish_with_message(message);
        } else if view.message.is_empty() {
            self.bar.set_message(view.status.to_string());
        } else {
            self.bar.set_message(view.message.clone());
        }
    }
}
