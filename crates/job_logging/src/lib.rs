#![deny(missing_docs)]
//! Shared logging utilities for the quizpress workspace.
//!
//! This crate provides the `job_*` logging macros used across the codebase,
//! a per-thread job tag that prefixes every line emitted while a job runs,
//! and a minimal test initializer for the global logger.

use std::cell::RefCell;

thread_local! {
    /// Tag of the job currently running on this thread, if any.
    static JOB_TAG: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Sets the job tag for the current thread.
/// The orchestrator calls this once when a job starts.
pub fn set_job_tag(tag: impl Into<String>) {
    let tag = tag.into();
    JOB_TAG.with(|v| *v.borrow_mut() = Some(tag));
}

/// Clears the job tag for the current thread.
pub fn clear_job_tag() {
    JOB_TAG.with(|v| *v.borrow_mut() = None);
}

/// Retrieves the job tag for the current thread.
/// Returns `None` outside of a running job.
pub fn job_tag() -> Option<String> {
    JOB_TAG.with(|v| v.borrow().clone())
}

/// Renders the `[job <tag>] ` prefix, or an empty string when no job is tagged.
#[doc(hidden)]
pub fn tag_prefix() -> String {
    match job_tag() {
        Some(tag) => format!("[job {tag}] "),
        None => String::new(),
    }
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! job_trace {
    ($($arg:tt)*) => {{
        log::trace!("{}{}", $crate::tag_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! job_info {
    ($($arg:tt)*) => {{
        log::info!("{}{}", $crate::tag_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! job_debug {
    ($($arg:tt)*) => {{
        log::debug!("{}{}", $crate::tag_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! job_warn {
    ($($arg:tt)*) => {{
        log::warn!("{}{}", $crate::tag_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! job_error {
    ($($arg:tt)*) => {{
        log::error!("{}{}", $crate::tag_prefix(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
