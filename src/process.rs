//! Builder API for running a command line tool and capturing its output.

use crate::error::{RunError, SpawnError};
use crate::output::{Completion, RunState};
use crate::output_stream::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_CHUNK_SIZE};
use crate::ProcessHandle;
use std::borrow::Cow;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default time a process is given to exit after SIGINT before SIGTERM is sent.
pub const DEFAULT_INTERRUPT_TIMEOUT: Duration = Duration::from_secs(2);

/// Default time a process is given to exit after SIGTERM before it is killed.
pub const DEFAULT_TERMINATE_TIMEOUT: Duration = Duration::from_secs(2);

/// An invocation of a command line tool: the executable, its arguments and the directory to run
/// it in.
///
/// The arguments are passed to the process as a list. No shell is involved, so nothing needs to
/// be escaped. Quoting only happens in [CliCommand::full_command], which is meant for display.
///
/// # Examples
///
/// ```no_run
/// use gitflow_cli::CliCommand;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), gitflow_cli::RunError> {
/// let completion = CliCommand::new("git", ["status"], ".").run().await?;
/// println!("{}", completion.output);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliCommand {
    command: String,
    arguments: Vec<String>,
    working_directory: PathBuf,
    name: Option<Cow<'static, str>>,
    timeout: Option<Duration>,
    interrupt_timeout: Duration,
    terminate_timeout: Duration,
    chunk_size: usize,
    channel_capacity: usize,
}

impl CliCommand {
    /// Creates a new invocation of `command`.
    ///
    /// `command` is either a path or a name looked up in `PATH`.
    pub fn new<I, S>(
        command: impl Into<String>,
        arguments: I,
        working_directory: impl Into<PathBuf>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into(),
            arguments: arguments.into_iter().map(Into::into).collect(),
            working_directory: working_directory.into(),
            name: None,
            timeout: None,
            interrupt_timeout: DEFAULT_INTERRUPT_TIMEOUT,
            terminate_timeout: DEFAULT_TERMINATE_TIMEOUT,
            chunk_size: DEFAULT_CHUNK_SIZE,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    /// The command followed by all arguments, separated by spaces.
    ///
    /// Arguments containing a space are wrapped in double quotes. Leading and trailing whitespace
    /// is trimmed.
    ///
    /// Example: `git commit -m "fix bug"`
    pub fn full_command(&self) -> String {
        let arguments = self
            .arguments
            .iter()
            .map(|arg| match arg.contains(' ') {
                true => Cow::Owned(format!("\"{arg}\"")),
                false => Cow::Borrowed(arg.as_str()),
            })
            .collect::<Vec<_>>()
            .join(" ");
        format!("{} {}", self.command, arguments).trim().to_owned()
    }

    /// Sets the name used for this process in logs and errors.
    ///
    /// Defaults to [CliCommand::full_command].
    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Limits how long [CliCommand::run] waits for the process to exit.
    ///
    /// A process still running when the timeout elapses is terminated. No timeout by default.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets how long a process that is stopped early is given to react to SIGINT and then SIGTERM
    /// before it gets killed.
    ///
    /// Defaults to [DEFAULT_INTERRUPT_TIMEOUT] and [DEFAULT_TERMINATE_TIMEOUT].
    pub fn termination_timeouts(
        mut self,
        interrupt_timeout: Duration,
        terminate_timeout: Duration,
    ) -> Self {
        self.interrupt_timeout = interrupt_timeout;
        self.terminate_timeout = terminate_timeout;
        self
    }

    /// Sets the size of the buffer used when reading from `stdout` and `stderr`.
    ///
    /// Default is [DEFAULT_CHUNK_SIZE].
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Sets how many lines may be buffered between the stream readers and the collector.
    ///
    /// Default is [DEFAULT_CHANNEL_CAPACITY].
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    fn process_name(&self) -> Cow<'static, str> {
        match &self.name {
            Some(name) => name.clone(),
            None => Cow::Owned(self.full_command()),
        }
    }

    /// Starts the process without waiting for it.
    pub fn spawn(&self) -> Result<ProcessHandle, SpawnError> {
        let mut cmd = tokio::process::Command::new(&self.command);
        cmd.args(&self.arguments).current_dir(&self.working_directory);
        ProcessHandle::spawn(
            self.process_name(),
            cmd,
            self.chunk_size,
            self.channel_capacity,
            self.interrupt_timeout,
            self.terminate_timeout,
        )
    }

    /// Runs the process and waits for it to exit.
    ///
    /// A non-zero exit code is not an error. It is reported through [Completion::exit_code].
    pub async fn run(&self) -> Result<Completion, RunError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the process and waits for it to exit, unless `cancel` resolves first.
    ///
    /// On cancellation, the process is terminated and [crate::WaitError::Cancelled] returned.
    pub async fn run_until(&self, cancel: impl Future<Output = ()>) -> Result<Completion, RunError> {
        let process = self.spawn()?;
        let completion = process
            .wait_for_completion_with_output_or_cancel(self.timeout, cancel)
            .await?;
        Ok(completion)
    }

    /// Runs the process once, folding the outcome into a [RunState].
    pub async fn execute(&self) -> RunState {
        RunState::from(self.run().await)
    }
}

impl Display for CliCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.full_command())
    }
}
