use std::io::{self, BufRead, BufReader, Read};
use std::process::{Command, Stdio};
use std::thread;

use job_logging::{job_debug, job_trace};

use crate::pipeline::{Pipeline, PipelineFailure, PipelineRequest, ProgressSink};
use crate::settings::PipelineCommand;

/// Environment variable that carries the API key to the child process.
pub const API_KEY_ENV: &str = "QUIZPRESS_API_KEY";

const PROGRESS_PREFIX: &str = "PROGRESS ";
const STDERR_TAIL_LINES: usize = 20;

/// Runs an external program as the pipeline.
///
/// The program receives `--input <dir> --output <dir> [--mapping <dir>]` after its
/// configured arguments. Stdout lines shaped `PROGRESS <current> <total> <message>`
/// become progress notifications; others are logged at trace level.
#[derive(Debug, Clone)]
pub struct CommandPipeline {
    command: PipelineCommand,
}

impl CommandPipeline {
    pub fn new(command: PipelineCommand) -> Self {
        Self { command }
    }
}

impl Pipeline for CommandPipeline {
    fn run(
        &self,
        request: &PipelineRequest<'_>,
        progress: &mut dyn ProgressSink,
    ) -> Result<(), PipelineFailure> {
        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args)
            .arg("--input")
            .arg(request.input_dir)
            .arg("--output")
            .arg(request.output_dir);
        if let Some(mapping_dir) = request.mapping_dir {
            cmd.arg("--mapping").arg(mapping_dir);
        }
        match request.api_key {
            Some(key) => cmd.env(API_KEY_ENV, key),
            None => cmd.env_remove(API_KEY_ENV),
        };
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        job_debug!("Spawning pipeline command {:?}", self.command.program);
        let mut child = cmd
            .spawn()
            .map_err(|err| format!("failed to start {}: {err}", self.command.program))?;

        // Drain stderr on its own thread so a chatty child cannot block on a full pipe.
        let stderr = child.stderr.take();
        let stderr_reader = thread::spawn(move || {
            let mut text = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut text);
            }
            text
        });

        // The child is always reaped, even when reading its stdout fails.
        let relayed = match child.stdout.take() {
            Some(stdout) => relay_stdout(stdout, progress),
            None => Ok(()),
        };
        let status = child.wait()?;
        let stderr_text = stderr_reader.join().unwrap_or_default();
        relayed?;
        if status.success() {
            return Ok(());
        }

        let tail = tail_lines(&stderr_text, STDERR_TAIL_LINES);
        let message = if tail.is_empty() {
            format!("pipeline exited with {status}")
        } else {
            format!("pipeline exited with {status}: {tail}")
        };
        Err(message.into())
    }
}

/// Reads stdout line by line until EOF. Bytes that are not UTF-8 are replaced
/// rather than treated as a failure.
fn relay_stdout(stdout: impl Read, progress: &mut dyn ProgressSink) -> io::Result<()> {
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\n', '\r']);
        match parse_progress_line(line) {
            Some((current, total, message)) => progress.report(current, total, message),
            None => job_trace!("pipeline: {}", line),
        }
    }
}

/// Parses `PROGRESS <current> <total> <message>`; the message may be empty.
pub fn parse_progress_line(line: &str) -> Option<(i64, i64, &str)> {
    let rest = line.strip_prefix(PROGRESS_PREFIX)?;
    let mut parts = rest.splitn(3, ' ');
    let current = parts.next()?.parse().ok()?;
    let total = parts.next()?.trim_end().parse().ok()?;
    let message = parts.next().unwrap_or("").trim_end();
    Some((current, total, message))
}

fn tail_lines(text: &str, max: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(max);
    lines[start..].join("\n")
}
