use crate::error::{RunError, SpawnError, WaitError};
use crate::output_stream::StreamType;
use std::process::ExitStatus;

/// Terminator appended to every captured line.
#[cfg(windows)]
pub const LINE_SEPARATOR: &str = "\r\n";

/// Terminator appended to every captured line.
#[cfg(not(windows))]
pub const LINE_SEPARATOR: &str = "\n";

/// Text captured from both output streams of a process.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct CapturedOutput {
    pub(crate) full_output: String,
    pub(crate) output: String,
    pub(crate) error_output: String,
}

impl CapturedOutput {
    pub(crate) fn push(&mut self, stream: StreamType, line: &str) {
        let target = match stream {
            StreamType::StdOut => &mut self.output,
            StreamType::StdErr => &mut self.error_output,
        };
        for buffer in [&mut self.full_output, target] {
            buffer.push_str(line);
            buffer.push_str(LINE_SEPARATOR);
        }
    }
}

/// Full output of a process that exited.
///
/// Every line is terminated with [LINE_SEPARATOR], including a last line the process did not
/// terminate itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Status the process exited with.
    pub status: ExitStatus,

    /// Every line received on either stream, in the order received.
    ///
    /// Each stream's own order is preserved. How stdout and stderr lines interleave depends on
    /// OS scheduling and must not be relied upon.
    pub full_output: String,

    /// Lines received on `stdout`.
    pub output: String,

    /// Lines received on `stderr`.
    pub error_output: String,
}

impl Completion {
    pub(crate) fn new(status: ExitStatus, captured: CapturedOutput) -> Self {
        Self {
            status,
            full_output: captured.full_output,
            output: captured.output,
            error_output: captured.error_output,
        }
    }

    /// The exit code of the process.
    ///
    /// `None` if the process was terminated by a signal (unix only).
    pub fn exit_code(&self) -> Option<i32> {
        self.status.code()
    }

    /// Whether the process exited with code 0.
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Lifecycle of a single run of a [crate::CliCommand].
///
/// Nothing but `Completed` carries an exit code or output, so "never completed" can not be
/// mistaken for any real exit code.
#[derive(Debug, Default)]
pub enum RunState {
    /// The command was not run yet.
    #[default]
    NotStarted,

    /// The process ran to its exit.
    Completed(Completion),

    /// The process could not be started.
    LaunchFailed(SpawnError),

    /// The process was started but did not run to its exit (timeout, cancellation, IO error).
    Interrupted(WaitError),
}

impl RunState {
    /// The completed run. `None` unless `Completed`.
    pub fn completion(&self) -> Option<&Completion> {
        match self {
            RunState::Completed(completion) => Some(completion),
            RunState::NotStarted | RunState::LaunchFailed(_) | RunState::Interrupted(_) => None,
        }
    }

    /// Exit code of the completed run. `None` unless `Completed`, or if a signal ended the process.
    pub fn exit_code(&self) -> Option<i32> {
        self.completion().and_then(Completion::exit_code)
    }

    /// Both streams combined. `None` unless `Completed`.
    pub fn full_output(&self) -> Option<&str> {
        self.completion().map(|c| c.full_output.as_str())
    }

    /// Lines received on `stdout`. `None` unless `Completed`.
    pub fn output(&self) -> Option<&str> {
        self.completion().map(|c| c.output.as_str())
    }

    /// Lines received on `stderr`. `None` unless `Completed`.
    pub fn error_output(&self) -> Option<&str> {
        self.completion().map(|c| c.error_output.as_str())
    }

    /// Whether the process ran to its exit.
    pub fn is_completed(&self) -> bool {
        matches!(self, RunState::Completed(_))
    }
}

impl From<Result<Completion, RunError>> for RunState {
    fn from(result: Result<Completion, RunError>) -> Self {
        match result {
            Ok(completion) => RunState::Completed(completion),
            Err(RunError::Spawn(err)) => RunState::LaunchFailed(err),
            Err(RunError::Wait(err)) => RunState::Interrupted(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assertr::prelude::*;
    use std::borrow::Cow;
    use std::io;

    #[test]
    fn captured_output_keeps_streams_apart() {
        let mut captured = CapturedOutput::default();
        captured.push(StreamType::StdOut, "On branch main");
        captured.push(StreamType::StdErr, "warning: something");
        captured.push(StreamType::StdOut, "");

        let sep = LINE_SEPARATOR;
        assert_that(captured.output).is_equal_to(format!("On branch main{sep}{sep}"));
        assert_that(captured.error_output).is_equal_to(format!("warning: something{sep}"));
        assert_that(captured.full_output)
            .is_equal_to(format!("On branch main{sep}warning: something{sep}{sep}"));
    }

    #[test]
    fn not_started_has_neither_exit_code_nor_output() {
        let state = RunState::default();

        assert_that(state.is_completed()).is_false();
        assert_that(state.exit_code()).is_none();
        assert_that(state.full_output()).is_none();
        assert_that(state.output()).is_none();
        assert_that(state.error_output()).is_none();
    }

    #[test]
    fn launch_failure_has_no_exit_code() {
        let state = RunState::from(Err::<Completion, _>(RunError::Spawn(
            SpawnError::SpawnFailed {
                process_name: Cow::Borrowed("does-not-exist"),
                source: io::Error::from(io::ErrorKind::NotFound),
            },
        )));

        assert!(matches!(state, RunState::LaunchFailed(_)));
        assert_that(state.exit_code()).is_none();
        assert_that(state.output()).is_none();
    }
}
