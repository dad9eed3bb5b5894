//! Content streamer — produces response bodies from a connected peer.
//!
//! Two shapes of content:
//!   1. ledger summary — a two-line text rendering of the peer's metadata
//!   2. file transfer  — raw bytes of one file, exactly `transfer_size` long
//!
//! A `FileTransfer` owns both the upstream reader and the peer session. Both
//! are released exactly once: when the last byte is yielded, when the
//! upstream fails, when the write deadline passes, or when the transfer is
//! dropped because the client went away.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use std::future::Future;
use tokio::io::{AsyncReadExt, Take};
use tokio::time::{Instant, Sleep};
use tokio_util::io::ReaderStream;
use tokio_util::sync::{CancellationToken, DropGuard};

use peerway_core::ContentHash;

use crate::error::StreamError;
use crate::network::{FileReader, PeerHandle, PeerInfo, StreamWindow};

/// Read buffer size for file transfers.
const TRANSFER_CHUNK_SIZE: usize = 64 * 1024;

// ── Ledger summary ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSummary {
    pub info: PeerInfo,
}

impl fmt::Display for LedgerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Peer {} blockchain height {} version {}\nUser Agent: {}\n",
            self.info.node_id,
            self.info.blockchain_height,
            self.info.blockchain_version,
            self.info.user_agent
        )
    }
}

/// Read the ledger metadata of a connected peer. Never fails once connected.
pub fn ledger_summary(peer: &dyn PeerHandle) -> LedgerSummary {
    LedgerSummary {
        info: peer.info().clone(),
    }
}

// ── File transfer ─────────────────────────────────────────────────────────────

/// Open `hash` on `peer` and wrap the cursor in a [`FileTransfer`].
///
/// `cancel` is fired when the returned transfer is dropped, or when this
/// future is dropped before the peer answers.
pub async fn stream_file(
    peer: Box<dyn PeerHandle>,
    hash: &ContentHash,
    window: StreamWindow,
    cancel: CancellationToken,
) -> Result<FileTransfer, StreamError> {
    let guard = cancel.clone().drop_guard();

    let stream = match peer.open_file(hash, window, cancel).await {
        Ok(Some(stream)) => stream,
        Ok(None) => {
            tracing::debug!(hash = %hash, "peer returned no stream");
            return Err(StreamError::NotFound);
        }
        Err(e) => {
            tracing::debug!(hash = %hash, error = %e, "failed to open file stream");
            return Err(StreamError::NotFound);
        }
    };

    tracing::debug!(
        hash = %hash,
        node_id = %peer.info().node_id,
        file_size = stream.file_size,
        transfer_size = stream.transfer_size,
        "file stream opened"
    );

    Ok(FileTransfer {
        inner: Some(ReaderStream::with_capacity(
            stream.reader.take(stream.transfer_size),
            TRANSFER_CHUNK_SIZE,
        )),
        peer: Some(peer),
        hash: *hash,
        file_size: stream.file_size,
        transfer_size: stream.transfer_size,
        sent: 0,
        deadline: None,
        _cancel: guard,
    })
}

/// How a transfer ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Completed,
    ShortRead,
    UpstreamFailed,
    DeadlineExceeded,
    Aborted,
}

/// A streamed file body. Yields at most `transfer_size` bytes.
pub struct FileTransfer {
    inner: Option<ReaderStream<Take<FileReader>>>,
    peer: Option<Box<dyn PeerHandle>>,
    hash: ContentHash,
    file_size: u64,
    transfer_size: u64,
    sent: u64,
    deadline: Option<Pin<Box<Sleep>>>,
    _cancel: DropGuard,
}

impl FileTransfer {
    /// Stop the transfer with an error once `deadline` passes.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(Box::pin(tokio::time::sleep_until(deadline)));
        self
    }

    pub fn transfer_size(&self) -> u64 {
        self.transfer_size
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn bytes_sent(&self) -> u64 {
        self.sent
    }

    fn is_released(&self) -> bool {
        self.inner.is_none()
    }

    fn release(&mut self, outcome: Outcome) {
        if self.is_released() {
            return;
        }
        self.inner = None;
        self.peer = None;
        self.deadline = None;

        match outcome {
            Outcome::Completed => tracing::debug!(
                hash = %self.hash,
                bytes = self.sent,
                "file transfer complete"
            ),
            Outcome::Aborted => tracing::debug!(
                hash = %self.hash,
                bytes = self.sent,
                expected = self.transfer_size,
                "file transfer aborted by client"
            ),
            Outcome::DeadlineExceeded => tracing::warn!(
                hash = %self.hash,
                bytes = self.sent,
                expected = self.transfer_size,
                "file transfer cut off by write timeout"
            ),
            Outcome::ShortRead | Outcome::UpstreamFailed => tracing::warn!(
                hash = %self.hash,
                bytes = self.sent,
                expected = self.transfer_size,
                ?outcome,
                "file transfer ended early"
            ),
        }
    }
}

impl Stream for FileTransfer {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.is_released() {
            return Poll::Ready(None);
        }

        if let Some(deadline) = this.deadline.as_mut() {
            if deadline.as_mut().poll(cx).is_ready() {
                this.release(Outcome::DeadlineExceeded);
                return Poll::Ready(Some(Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "write timeout exceeded",
                ))));
            }
        }

        let Some(inner) = this.inner.as_mut() else {
            return Poll::Ready(None);
        };

        match Pin::new(inner).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.sent += chunk.len() as u64;
                if this.sent >= this.transfer_size {
                    this.release(Outcome::Completed);
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                this.release(Outcome::UpstreamFailed);
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                if this.sent < this.transfer_size {
                    this.release(Outcome::ShortRead);
                    return Poll::Ready(Some(Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "upstream ended before transfer size",
                    ))));
                }
                this.release(Outcome::Completed);
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for FileTransfer {
    fn drop(&mut self) {
        self.release(Outcome::Aborted);
    }
}
