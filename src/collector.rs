use crate::error::CollectorError;
use crate::output::CapturedOutput;
use crate::output_stream::{OutputLine, OutputStream, StreamType};
use std::borrow::Cow;
use tokio::io::AsyncRead;
use tokio::sync::mpsc::Receiver;
use tokio::task::JoinHandle;

/// Collects the lines of both output streams of a process into one [CapturedOutput].
///
/// Both stream readers feed the same channel, so lines land in `full_output` in the order they
/// were received. The collecting task ends once both readers reached EOF.
///
/// For proper cleanup, call `wait()`.
/// If dropped without calling `wait()`, the collecting task and both stream readers are aborted.
#[derive(Debug)]
pub(crate) struct Collector {
    task: Option<JoinHandle<CapturedOutput>>,
    stdout: OutputStream,
    stderr: OutputStream,
}

impl Collector {
    pub(crate) fn spawn<O, E>(
        process_name: Cow<'static, str>,
        stdout: O,
        stderr: E,
        chunk_size: usize,
        channel_capacity: usize,
    ) -> Self
    where
        O: AsyncRead + Unpin + Send + 'static,
        E: AsyncRead + Unpin + Send + 'static,
    {
        let (sender, receiver) = tokio::sync::mpsc::channel::<OutputLine>(channel_capacity);
        let stdout = OutputStream::from_stream(
            process_name.clone(),
            stdout,
            StreamType::StdOut,
            chunk_size,
            sender.clone(),
        );
        let stderr = OutputStream::from_stream(
            process_name.clone(),
            stderr,
            StreamType::StdErr,
            chunk_size,
            sender,
        );
        Self {
            task: Some(tokio::spawn(collect(process_name, receiver))),
            stdout,
            stderr,
        }
    }

    /// Checks if both streams were read to their end and all lines were collected.
    pub(crate) fn is_finished(&self) -> bool {
        self.stdout.is_finished()
            && self.stderr.is_finished()
            && self.task.as_ref().is_none_or(|t| t.is_finished())
    }

    /// Waits until both streams reached EOF and returns everything collected.
    pub(crate) async fn wait(mut self) -> Result<CapturedOutput, CollectorError> {
        let Some(task) = self.task.take() else {
            unreachable!("The task is only taken here, which consumes the collector, or on drop");
        };
        task.await.map_err(CollectorError::TaskJoin)
    }
}

impl Drop for Collector {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn collect(
    process_name: Cow<'static, str>,
    mut receiver: Receiver<OutputLine>,
) -> CapturedOutput {
    let mut captured = CapturedOutput::default();
    while let Some(OutputLine { stream, line }) = receiver.recv().await {
        tracing::trace!(process = %process_name, %stream, line = %line, "Received output line");
        captured.push(stream, &line);
    }
    captured
}
