use thiserror::Error;

/// Failures reported by a network backend.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("peer not found")]
    PeerNotFound,
    #[error("peer refused connection")]
    Refused,
    #[error("timed out")]
    Timeout,
    #[error("cancelled")]
    Cancelled,
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Why a peer connection could not be established.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("invalid peer identifier")]
    InvalidIdentifier,
    #[error("peer unreachable")]
    Unreachable,
}

/// Why a file stream could not be opened.
///
/// Unknown hashes, refusals and I/O failures are not told apart.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("file not found")]
    NotFound,
}
