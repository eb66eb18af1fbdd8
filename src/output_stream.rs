use bytes::BytesMut;
use std::borrow::Cow;
use std::fmt::{Debug, Display, Formatter};
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

/// Default size of the buffer used when reading from a pipe: 16 kb.
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

/// Default number of lines buffered between the pipe readers and the collector.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 128;

/// Represents the type of the stream (stdout or stderr).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamType {
    StdOut,
    StdErr,
}

impl Display for StreamType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamType::StdOut => f.write_str("stdout"),
            StreamType::StdErr => f.write_str("stderr"),
        }
    }
}

/// A single line read from one of the child's output pipes, without its line terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OutputLine {
    pub(crate) stream: StreamType,
    pub(crate) line: String,
}

/// Background reader of one output pipe.
///
/// Every line read is sent to the collector. Reaching EOF drops the sender, which is how the
/// collector learns about the end of this stream. Dropping this aborts the reader task.
pub(crate) struct OutputStream {
    ty: StreamType,
    stream_reader: JoinHandle<()>,
}

impl OutputStream {
    pub(crate) fn from_stream<S: AsyncRead + Unpin + Send + 'static>(
        process_name: Cow<'static, str>,
        stream: S,
        ty: StreamType,
        chunk_size: usize,
        sender: Sender<OutputLine>,
    ) -> Self {
        let reader = BufReader::with_capacity(chunk_size, stream);
        OutputStream {
            ty,
            stream_reader: read_lines(process_name, reader, ty, chunk_size, sender),
        }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.stream_reader.is_finished()
    }
}

impl Drop for OutputStream {
    fn drop(&mut self) {
        self.stream_reader.abort();
    }
}

impl Debug for OutputStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputStream")
            .field("ty", &self.ty)
            .field("stream_reader", &"non-debug < JoinHandle<()> >")
            .finish()
    }
}

fn read_lines<B: AsyncRead + Unpin + Send + 'static>(
    process_name: Cow<'static, str>,
    mut reader: BufReader<B>,
    ty: StreamType,
    chunk_size: usize,
    sender: Sender<OutputLine>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut buf = BytesMut::with_capacity(chunk_size);
        let mut line_buffer = BytesMut::new();
        'outer: loop {
            match reader.read_buf(&mut buf).await {
                Ok(0) => {
                    // EOF. An unterminated last line still counts as a line.
                    if !line_buffer.is_empty() {
                        let line = decode_line(&line_buffer);
                        let _ = sender.send(OutputLine { stream: ty, line }).await;
                    }
                    break;
                }
                Ok(_bytes_read) => {
                    for line in LineReader::new(&buf[..], &mut line_buffer) {
                        if sender.send(OutputLine { stream: ty, line }).await.is_err() {
                            // The collector is gone. Nobody is interested in further output.
                            break 'outer;
                        }
                    }
                    buf.clear();
                }
                Err(err) => {
                    tracing::warn!(
                        process = %process_name,
                        stream = %ty,
                        error = %err,
                        "Could not read from stream, treating it as closed"
                    );
                    break;
                }
            }
        }
    })
}

/// Converts raw line bytes to a `String`, dropping a trailing `\r` of a `\r\n` terminator.
fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Conceptually, this iterator appends the given byte slice to the current line buffer, which may
/// already hold some previously read data.
/// The resulting view of data is split by newlines (`\n`). Every completed line is yielded.
/// The remainder of the chunk, not completed with a newline character, will become the new content
/// of `line_buffer`.
///
/// # Members
/// * `chunk` - New slice of bytes to process.
/// * `line_buffer` - Buffer for reading one line.
///   May hold previously seen, not-yet-closed, line-data.
pub(crate) struct LineReader<'c, 'b> {
    chunk: &'c [u8],
    line_buffer: &'b mut BytesMut,
}

impl<'c, 'b> LineReader<'c, 'b> {
    pub(crate) fn new(chunk: &'c [u8], line_buffer: &'b mut BytesMut) -> Self {
        Self { chunk, line_buffer }
    }
}

impl Iterator for LineReader<'_, '_> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        if self.chunk.is_empty() {
            return None;
        }

        match self.chunk.iter().position(|b| *b == b'\n') {
            None => {
                // No more line breaks. Keep the rest for the next chunk.
                self.line_buffer.extend_from_slice(self.chunk);
                self.chunk = &[];
                None
            }
            Some(pos) => {
                let (until_line_break, rest) = self.chunk.split_at(pos);
                let line = if self.line_buffer.is_empty() {
                    decode_line(until_line_break)
                } else {
                    self.line_buffer.extend_from_slice(until_line_break);
                    let line = decode_line(&self.line_buffer[..]);
                    self.line_buffer.clear();
                    line
                };

                // Skip the newline itself.
                self.chunk = &rest[1..];

                Some(line)
            }
        }
    }
}
