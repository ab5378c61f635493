//! Line-by-line relay of an upstream event stream.
//!
//! A producer task reads the upstream body one line at a time and hands each
//! non-empty line, newline-terminated, to the consumer through a channel that
//! holds at most one line. The producer owns the upstream body and drops it
//! when the source is exhausted, when it fails, or as soon as the consumer
//! goes away.

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt, TryStreamExt};
use log::debug;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_util::codec::{AnyDelimiterCodec, FramedRead};
use tokio_util::io::StreamReader;

/// Longest line the relay buffers before giving up on the upstream.
pub const MAX_LINE_LENGTH: usize = 1024 * 1024;

#[derive(Debug, thiserror::Error)]
#[error("upstream stream error: {0}")]
pub struct RelayError(pub String);

pub struct LineRelay {
    rx: mpsc::Receiver<Result<Bytes, RelayError>>,
}

impl LineRelay {
    /// Start relaying `source`. Must be called from within a tokio runtime.
    pub fn spawn<S, E>(source: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: std::fmt::Display + Send + 'static,
    {
        Self::spawn_with_max_line_length(source, MAX_LINE_LENGTH)
    }

    /// Like [`LineRelay::spawn`]. A line longer than `max_line_length` bytes
    /// ends the relay with an error.
    pub fn spawn_with_max_line_length<S, E>(source: S, max_line_length: usize) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: std::fmt::Display + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(1);
        tokio::spawn(async move {
            let reader = StreamReader::new(
                Box::pin(source).map_err(|e| std::io::Error::other(e.to_string())),
            );
            // Lines are split on raw bytes; content is never decoded.
            let codec =
                AnyDelimiterCodec::new_with_max_length(vec![b'\n'], vec![b'\n'], max_line_length);
            let mut lines = FramedRead::new(reader, codec);
            loop {
                let next = tokio::select! {
                    _ = tx.closed() => {
                        debug!("Relay consumer went away, closing upstream");
                        break;
                    }
                    next = lines.next() => next,
                };
                let item = match next {
                    None => break,
                    Some(Ok(line)) => match terminated_line(line) {
                        Some(line) => Ok(line),
                        None => continue,
                    },
                    Some(Err(e)) => Err(RelayError(e.to_string())),
                };
                let failed = item.is_err();
                if tx.send(item).await.is_err() || failed {
                    break;
                }
            }
        });
        Self { rx }
    }
}

/// Drop a trailing `\r` and terminate with `\n`. Blank lines yield `None`.
fn terminated_line(line: Bytes) -> Option<Bytes> {
    let line = line.strip_suffix(b"\r").unwrap_or(&line);
    if line.is_empty() {
        return None;
    }
    let mut out = BytesMut::with_capacity(line.len() + 1);
    out.extend_from_slice(line);
    out.extend_from_slice(b"\n");
    Some(out.freeze())
}

impl Stream for LineRelay {
    type Item = Result<Bytes, RelayError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl std::fmt::Debug for LineRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineRelay").finish_non_exhaustive()
    }
}
