//! I/O primitives for communicating with the agent subprocess.

use std::collections::VecDeque;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{ChildStderr, ChildStdin, ChildStdout};

use crate::protocol::{strip_ansi, PROMPT_MARKER};

const READ_CHUNK: usize = 8 * 1024;

/// Splits raw agent output into lines.
///
/// The agent prints its prompt without a newline and then blocks on input, so
/// prompts need framing of their own:
///
/// - a pending fragment that is exactly the prompt marker (after removing
///   colors) is released as a line immediately;
/// - a prompt read together with the output that followed it is split off,
///   and the remainder is returned as its own line, without colors.
///
/// Splitting is not lossless. The reference agent only ever shares a line
/// between its initial prompt and the first reply. If a closing prompt were
/// followed by text on the same line, that text would be queued and read as
/// the first line of the next turn instead of being discarded with the prompt.
#[derive(Debug, Default)]
pub struct LineDecoder {
    pending: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes, returning every line they complete.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            push_line(&mut lines, decode(&raw[..pos]));
        }

        if !self.pending.is_empty() {
            let fragment = String::from_utf8_lossy(&self.pending);
            if strip_ansi(&fragment) == PROMPT_MARKER {
                lines.push(fragment.into_owned());
                self.pending.clear();
            }
        }
        lines
    }

    /// Flush an unterminated last line at end of stream.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = decode(&self.pending);
        self.pending.clear();
        Some(line)
    }
}

fn push_line(lines: &mut Vec<String>, line: String) {
    match text_after_prompt(&line) {
        Some(rest) => {
            lines.push(PROMPT_MARKER.to_string());
            push_line(lines, rest);
        }
        None => lines.push(line),
    }
}

/// Output printed on the same line after a leading prompt, if any.
fn text_after_prompt(line: &str) -> Option<String> {
    strip_ansi(line)
        .strip_prefix(PROMPT_MARKER)
        .filter(|rest| !rest.is_empty())
        .map(str::to_owned)
}

/// Decode one line without its terminator, tolerating CRLF and bad UTF-8.
fn decode(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// Reads output lines from the agent's stdout.
///
/// Lines are returned raw, colors included; classification happens in
/// [`TurnParser`](crate::protocol::TurnParser).
pub struct ProcessReader<R = ChildStdout> {
    reader: R,
    decoder: LineDecoder,
    ready: VecDeque<String>,
    chunk: Box<[u8]>,
    eof: bool,
}

impl<R: AsyncRead + Unpin> ProcessReader<R> {
    /// Create a new reader over the agent's stdout.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            decoder: LineDecoder::new(),
            ready: VecDeque::new(),
            chunk: vec![0; READ_CHUNK].into_boxed_slice(),
            eof: false,
        }
    }

    /// Read the next output line.
    ///
    /// Returns `Ok(None)` once the stream has closed and every buffered line
    /// has been returned. Cancel safe: a dropped call loses no output.
    pub async fn read_line(&mut self) -> std::io::Result<Option<String>> {
        loop {
            if let Some(line) = self.ready.pop_front() {
                return Ok(Some(line));
            }
            if self.eof {
                return Ok(None);
            }

            let n = self.reader.read(&mut self.chunk).await?;
            if n == 0 {
                self.eof = true;
                self.ready.extend(self.decoder.finish());
            } else {
                self.ready.extend(self.decoder.push(&self.chunk[..n]));
            }
        }
    }
}

/// Writes request lines to the agent's stdin.
pub struct ProcessWriter<W = ChildStdin> {
    stdin: W,
}

impl<W: AsyncWrite + Unpin> ProcessWriter<W> {
    /// Create a new writer over the agent's stdin.
    pub fn new(stdin: W) -> Self {
        Self { stdin }
    }

    /// Write one request line, newline-terminated, and flush it.
    pub async fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        let mut framed = String::with_capacity(line.len() + 1);
        framed.push_str(line);
        framed.push('\n');
        self.stdin.write_all(framed.as_bytes()).await?;
        self.stdin.flush().await
    }

    /// Get the underlying writer back.
    pub fn into_inner(self) -> W {
        self.stdin
    }
}

/// Reads stderr output from the agent process.
///
/// The reference agent reports input validation problems on stderr.
pub struct StderrReader<R = ChildStderr> {
    reader: BufReader<R>,
}

impl<R: AsyncRead + Unpin> StderrReader<R> {
    /// Create a new stderr reader.
    pub fn new(stderr: R) -> Self {
        Self {
            reader: BufReader::new(stderr),
        }
    }

    /// Read the next line from stderr, without its terminator.
    pub async fn read_line(&mut self) -> std::io::Result<Option<String>> {
        let mut buf = Vec::new();
        let bytes = self.reader.read_until(b'\n', &mut buf).await?;
        if bytes == 0 {
            return Ok(None);
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        Ok(Some(decode(&buf)))
    }

    /// Forward every stderr line to the log until the stream closes.
    ///
    /// Keeps the pipe drained so the agent never blocks on a full buffer.
    pub async fn forward_to_log(mut self, pid: Option<u32>) {
        loop {
            match self.read_line().await {
                Ok(Some(line)) => {
                    let line = strip_ansi(&line);
                    tracing::debug!(pid, line = %line, "agent stderr");
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(pid, error = %e, "agent stderr read failed");
                    break;
                }
            }
        }
    }
}
