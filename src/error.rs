use std::net::SocketAddr;
use thiserror::Error;

/// Everything that can go wrong while transferring a single file. None of these is fatal to a
///  batch run: the sequencer reports them and moves on to the next file.
#[derive(Error, Debug)]
pub enum TransferError {
    /// no reply arrived after the configured number of attempts
    #[error("no reply from {to} after {attempts} attempts")]
    Timeout { to: SocketAddr, attempts: u32 },
    /// the reply had an unexpected shape, or belonged to a different file
    #[error("protocol violation: {0}")]
    Protocol(String),
    /// the server answered with an explicit `ERR` reply
    #[error("server rejected {name}: {reason}")]
    Rejected { name: String, reason: String },
    /// the chunk payload was not valid base64
    #[error("invalid chunk payload: {0}")]
    Decode(#[from] base64::DecodeError),
    /// the server did not confirm closing the session. Bytes already written stay in place.
    #[error("close handshake failed: {0}")]
    CloseFailed(#[source] Box<TransferError>),
    /// the file name cannot be sent on the wire or used as a local path
    #[error("invalid file name {0:?}")]
    InvalidName(String),
    #[error("local I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransferError {
    pub fn protocol(msg: impl Into<String>) -> TransferError {
        TransferError::Protocol(msg.into())
    }
}

pub type TransferResult<T> = Result<T, TransferError>;
