use std::path::PathBuf;

use thiserror::Error;

/// Failure kinds for a single sync run. Callers branch on the variant;
/// no kind is ever reported by string matching.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The store directory does not exist. Checked before any other I/O.
    #[error("manifest dir does not exist: {0}")]
    Precondition(PathBuf),

    /// Transport failure, timeout, or non-success HTTP status.
    #[error("request failed: {0}")]
    Network(String),

    /// Response body was expected to be UTF-8 text and was not.
    #[error("response body is not valid utf-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    /// The remote manifest response did not have the expected shape.
    #[error("malformed remote manifest response: {0}")]
    MalformedRemoteResponse(String),

    /// The persisted local record did not have the expected shape.
    #[error("malformed local manifest record: {0}")]
    MalformedLocalRecord(String),

    /// A local descriptor file exists but cannot be parsed. Distinct from
    /// the file being absent.
    #[error("corrupt local manifest state: {0}")]
    CorruptLocalState(String),

    /// The downloaded blob is not a readable archive or contains no entries.
    #[error("archive error: {0}")]
    Archive(String),

    /// Unexpected I/O failure while reading the store.
    #[error("store read error: {0}")]
    StoreRead(std::io::Error),

    /// Failure while staging or renaming the new payload or descriptor.
    #[error("store write error: {0}")]
    StoreWrite(String),
}

impl SyncError {
    /// True for the kinds the engine tolerates when loading local state.
    pub fn is_unusable_local(&self) -> bool {
        matches!(
            self,
            SyncError::CorruptLocalState(_) | SyncError::MalformedLocalRecord(_)
        )
    }
}
