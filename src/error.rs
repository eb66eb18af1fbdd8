//! Error types for process and git operations.

use std::borrow::Cow;
use std::io;
use std::time::Duration;
use thiserror::Error;

use crate::output_stream::StreamType;

/// Errors that can occur when spawning a process.
///
/// A launch failure never produces an exit code. See [crate::RunState::LaunchFailed].
#[derive(Debug, Error)]
pub enum SpawnError {
    /// The OS refused to start the process (executable not found, permission denied,
    /// missing working directory, ...).
    #[error("Failed to spawn process '{process_name}': {source}")]
    SpawnFailed {
        /// The name of the process.
        process_name: Cow<'static, str>,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// The process was started, but one of its output pipes was not handed to us.
    #[error("Process '{process_name}' was spawned without a piped {stream}")]
    StreamNotCaptured {
        /// The name of the process.
        process_name: Cow<'static, str>,
        /// The stream that is missing.
        stream: StreamType,
    },
}

/// Errors that can occur when terminating a process.
#[derive(Debug, Error)]
pub enum TerminationError {
    /// Failed to send a signal to the process.
    #[error("Failed to send '{signal}' signal to process '{process_name}': {source}")]
    SignallingFailed {
        /// The name of the process.
        process_name: Cow<'static, str>,
        /// The underlying IO error.
        source: io::Error,
        /// The signal that could not be sent.
        signal: &'static str,
    },

    /// Failed to terminate the process after trying all signals (SIGINT, SIGTERM, SIGKILL).
    #[error(
        "Failed to terminate process '{process_name}'. SIGINT failed: {sigint_error}. SIGTERM failed: {sigterm_error}. SIGKILL failed: {sigkill_error}"
    )]
    TerminationFailed {
        /// The name of the process.
        process_name: Cow<'static, str>,
        /// Error from SIGINT attempt.
        sigint_error: String,
        /// Error from SIGTERM attempt.
        sigterm_error: String,
        /// Error from SIGKILL attempt.
        #[source]
        sigkill_error: io::Error,
    },
}

/// Errors that can occur while the collector gathers output lines.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// The collector task panicked or was aborted.
    #[error("The collector task could not be joined: {0}")]
    TaskJoin(#[source] tokio::task::JoinError),
}

/// Errors that can occur when waiting for a spawned process.
#[derive(Debug, Error)]
pub enum WaitError {
    /// A general IO error occurred.
    #[error("IO error occurred while waiting for process '{process_name}': {source}")]
    IoError {
        /// The name of the process.
        process_name: Cow<'static, str>,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// The process did not exit in time and was terminated.
    #[error("Process '{process_name}' did not complete within {timeout:?}")]
    Timeout {
        /// The name of the process.
        process_name: Cow<'static, str>,
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// The caller cancelled the run and the process was terminated.
    #[error("Waiting for process '{process_name}' was cancelled")]
    Cancelled {
        /// The name of the process.
        process_name: Cow<'static, str>,
    },

    /// Could not terminate the process.
    #[error("Could not terminate process: {0}")]
    TerminationError(#[from] TerminationError),

    /// Collector failed to collect output.
    #[error("Collector failed to collect output: {0}")]
    CollectorFailed(#[from] CollectorError),
}

/// Errors returned by the one-shot `run` operations of [crate::CliCommand].
#[derive(Debug, Error)]
pub enum RunError {
    /// The process could not be started.
    #[error(transparent)]
    Spawn(#[from] SpawnError),

    /// The process was started, but waiting for it failed.
    #[error(transparent)]
    Wait(#[from] WaitError),
}

/// Errors returned by [crate::GitApi] implementations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Running git itself failed.
    #[error(transparent)]
    Run(#[from] RunError),

    /// Git ran, but exited unsuccessfully.
    #[error("'{command}' exited with code {exit_code:?}: {error_output}")]
    CommandFailed {
        /// The full command line that was run.
        command: String,
        /// The exit code, `None` if git was killed by a signal.
        exit_code: Option<i32>,
        /// Everything git wrote to stderr.
        error_output: String,
    },
}
