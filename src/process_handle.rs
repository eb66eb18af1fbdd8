use crate::collector::Collector;
use crate::error::{SpawnError, TerminationError, WaitError};
use crate::output::Completion;
use crate::output_stream::StreamType;
use crate::signal::{self, GracefulSignal};
use std::borrow::Cow;
use std::future::Future;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};

/// Represents the running state of a process.
#[derive(Debug)]
pub enum RunningState {
    /// Process is still running.
    Running,

    /// Process has terminated with the given exit status.
    Terminated(ExitStatus),

    /// Failed to determine process state.
    Uncertain(io::Error),
}

impl RunningState {
    pub fn as_bool(&self) -> bool {
        match self {
            RunningState::Running => true,
            RunningState::Terminated(_) | RunningState::Uncertain(_) => false,
        }
    }
}

impl From<RunningState> for bool {
    fn from(is_running: RunningState) -> Self {
        is_running.as_bool()
    }
}

/// Why waiting for a process stopped before it exited.
enum Interruption {
    TimedOut(Duration),
    Cancelled,
}

impl Interruption {
    fn into_error(self, process_name: Cow<'static, str>) -> WaitError {
        match self {
            Interruption::TimedOut(timeout) => WaitError::Timeout {
                process_name,
                timeout,
            },
            Interruption::Cancelled => WaitError::Cancelled { process_name },
        }
    }
}

/// A spawned process whose `stdout` and `stderr` are being collected.
///
/// Created through [crate::CliCommand::spawn]. The child is killed when this handle is dropped
/// before the process exited.
#[derive(Debug)]
pub struct ProcessHandle {
    name: Cow<'static, str>,
    child: Child,
    collector: Collector,
    interrupt_timeout: Duration,
    terminate_timeout: Duration,
}

impl ProcessHandle {
    pub(crate) fn spawn(
        name: Cow<'static, str>,
        mut cmd: Command,
        chunk_size: usize,
        channel_capacity: usize,
        interrupt_timeout: Duration,
        terminate_timeout: Duration,
    ) -> Result<Self, SpawnError> {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| SpawnError::SpawnFailed {
            process_name: name.clone(),
            source,
        })?;

        let Some(stdout) = child.stdout.take() else {
            return Err(SpawnError::StreamNotCaptured {
                process_name: name,
                stream: StreamType::StdOut,
            });
        };
        let Some(stderr) = child.stderr.take() else {
            return Err(SpawnError::StreamNotCaptured {
                process_name: name,
                stream: StreamType::StdErr,
            });
        };

        tracing::debug!(process = %name, pid = ?child.id(), "Spawned process");

        let collector = Collector::spawn(name.clone(), stdout, stderr, chunk_size, channel_capacity);
        Ok(Self {
            name,
            child,
            collector,
            interrupt_timeout,
            terminate_timeout,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The OS process id. `None` once the process was polled to completion.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    //noinspection RsSelfConvention
    pub fn is_running(&mut self) -> RunningState {
        match self.child.try_wait() {
            Ok(None) => RunningState::Running,
            Ok(Some(exit_status)) => RunningState::Terminated(exit_status),
            Err(err) => RunningState::Uncertain(err),
        }
    }

    /// Waits for the process to exit and both of its output streams to be read to their end.
    ///
    /// With a `timeout`, a process still running after it elapsed is terminated and
    /// [WaitError::Timeout] is returned.
    pub async fn wait_for_completion_with_output(
        self,
        timeout: Option<Duration>,
    ) -> Result<Completion, WaitError> {
        self.wait_for_completion_with_output_or_cancel(timeout, std::future::pending())
            .await
    }

    /// Like [ProcessHandle::wait_for_completion_with_output], but additionally terminates the
    /// process as soon as `cancel` resolves, returning [WaitError::Cancelled].
    ///
    /// `timeout` and `cancel` also bound reading the output streams after the process exited. A
    /// grandchild keeping a pipe open is left alone, but its output is no longer awaited.
    pub async fn wait_for_completion_with_output_or_cancel(
        mut self,
        timeout: Option<Duration>,
        cancel: impl Future<Output = ()>,
    ) -> Result<Completion, WaitError> {
        let interrupted = async move {
            let timed_out = async {
                match timeout {
                    Some(timeout) => {
                        tokio::time::sleep(timeout).await;
                        timeout
                    }
                    None => std::future::pending().await,
                }
            };
            tokio::select! {
                timeout = timed_out => Interruption::TimedOut(timeout),
                () = cancel => Interruption::Cancelled,
            }
        };
        tokio::pin!(interrupted);

        let exited = tokio::select! {
            status = self.child.wait() => Ok(status),
            interruption = &mut interrupted => Err(interruption),
        };

        let status = match exited {
            Ok(status) => status.map_err(|source| WaitError::IoError {
                process_name: self.name.clone(),
                source,
            })?,
            Err(interruption) => {
                tracing::debug!(process = %self.name, "Stopped waiting, terminating process");
                let (interrupt_timeout, terminate_timeout) =
                    (self.interrupt_timeout, self.terminate_timeout);
                self.terminate(interrupt_timeout, terminate_timeout).await?;
                return Err(interruption.into_error(self.name));
            }
        };

        tracing::debug!(process = %self.name, ?status, "Process exited");
        if !self.collector.is_finished() {
            tracing::trace!(process = %self.name, "Waiting for output streams to close");
        }

        // Losing this race drops the collector, which aborts both stream readers.
        let captured = tokio::select! {
            captured = self.collector.wait() => captured?,
            interruption = &mut interrupted => {
                tracing::debug!(
                    process = %self.name,
                    "Stopped waiting, output streams are still held open"
                );
                return Err(interruption.into_error(self.name));
            }
        };
        Ok(Completion::new(status, captured))
    }

    /// Terminates the process.
    ///
    /// Sends SIGINT and waits up to `interrupt_timeout`, then sends SIGTERM and waits up to
    /// `terminate_timeout`, then kills the process.
    pub async fn terminate(
        &mut self,
        interrupt_timeout: Duration,
        terminate_timeout: Duration,
    ) -> Result<ExitStatus, TerminationError> {
        if let RunningState::Terminated(exit_status) = self.is_running() {
            return Ok(exit_status);
        }

        let sigint_error = match self
            .signal_and_await(GracefulSignal::Interrupt, interrupt_timeout)
            .await
        {
            Ok(exit_status) => return Ok(exit_status),
            Err(err) => err,
        };
        tracing::warn!(
            process = %self.name,
            error = %sigint_error,
            "Interrupting process failed, sending SIGTERM"
        );

        let sigterm_error = match self
            .signal_and_await(GracefulSignal::Terminate, terminate_timeout)
            .await
        {
            Ok(exit_status) => return Ok(exit_status),
            Err(err) => err,
        };
        tracing::warn!(
            process = %self.name,
            error = %sigterm_error,
            "Graceful termination failed, killing process"
        );

        match self.child.kill().await {
            Ok(()) => self
                .child
                .wait()
                .await
                .map_err(|source| TerminationError::SignallingFailed {
                    process_name: self.name.clone(),
                    source,
                    signal: "SIGKILL",
                }),
            Err(sigkill_error) => Err(TerminationError::TerminationFailed {
                process_name: self.name.clone(),
                sigint_error: sigint_error.to_string(),
                sigterm_error: sigterm_error.to_string(),
                sigkill_error,
            }),
        }
    }

    async fn signal_and_await(
        &mut self,
        sig: GracefulSignal,
        timeout: Duration,
    ) -> io::Result<ExitStatus> {
        tracing::debug!(process = %self.name, signal = sig.name(), "Sending signal");
        signal::send(&self.child, sig)?;
        match tokio::time::timeout(timeout, self.child.wait()).await {
            Ok(exit_status) => exit_status,
            Err(elapsed) => Err(elapsed.into()),
        }
    }
}
