// src/exec/output.rs

//! Output multiplexing: raw bytes in, discrete text lines out.
//!
//! Both `\r` and `\n` end a line. Progress reporters rewrite one terminal
//! line with bare carriage returns (`"50%\r60%\r70%\n"`), and each rewrite
//! is delivered as its own line so consumers can follow the percentage.
//! Blank lines are dropped and trailing whitespace is trimmed.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::launcher::OutputEvent;

const READ_CHUNK: usize = 8192;

/// Incremental line splitter over arbitrarily chunked bytes.
///
/// Delimiters are ASCII, so a multi-byte UTF-8 sequence is never cut in
/// half by a split; a sequence cut by a chunk boundary simply waits in the
/// pending buffer for the next chunk.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed `chunk` and return every line it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in chunk {
            if byte == b'\n' || byte == b'\r' {
                if let Some(line) = decode_line(&self.pending) {
                    lines.push(line);
                }
                self.pending.clear();
            } else {
                self.pending.push(byte);
            }
        }
        lines
    }

    /// Flush whatever is left once the source is exhausted.
    pub fn finish(&mut self) -> Option<String> {
        let line = decode_line(&self.pending);
        self.pending.clear();
        line
    }
}

/// Decode one line, skipping (and logging) any invalid UTF-8 sequence.
fn decode_line(bytes: &[u8]) -> Option<String> {
    let mut out = String::with_capacity(bytes.len());
    let mut rest = bytes;
    loop {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                out.push_str(valid);
                break;
            }
            Err(e) => {
                let (valid, tail) = rest.split_at(e.valid_up_to());
                out.push_str(&String::from_utf8_lossy(valid));
                let skip = e.error_len().unwrap_or(tail.len());
                warn!(
                    bytes = ?&tail[..skip],
                    "skipping undecodable bytes in process output"
                );
                rest = &tail[skip..];
            }
        }
    }

    let trimmed = out.trim_end();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Read `reader` to the end, forwarding each line as an
/// [`OutputEvent::Line`] tagged with `is_error`.
///
/// A read error ends the stream and is itself reported as an error line.
/// Returns the number of lines forwarded.
pub async fn pump_lines<R>(mut reader: R, is_error: bool, tx: mpsc::Sender<OutputEvent>) -> usize
where
    R: AsyncRead + Unpin,
{
    let mut splitter = LineSplitter::new();
    let mut buf = vec![0u8; READ_CHUNK];
    let mut forwarded = 0;

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                for text in splitter.push(&buf[..n]) {
                    forwarded += send_line(&tx, text, is_error).await;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!(is_error, error = %e, "output stream read failed");
                forwarded += send_line(&tx, format!("output read error: {e}"), true).await;
                break;
            }
        }
    }

    if let Some(text) = splitter.finish() {
        forwarded += send_line(&tx, text, is_error).await;
    }
    forwarded
}

async fn send_line(tx: &mpsc::Sender<OutputEvent>, text: String, is_error: bool) -> usize {
    // A dropped receiver only means nobody is listening; keep draining so
    // the child never blocks on a full pipe.
    usize::from(tx.send(OutputEvent::Line { text, is_error }).await.is_ok())
}
