use thiserror::Error;

pub type Result<T, E = LinkError> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("controller not connected")]
    NotConnected,
    #[error("controller rejected command: {0}")]
    Rejected(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("timeout waiting for acknowledgement")]
    Timeout,
    #[error("invalid command: {0}")]
    InvalidCommand(&'static str),
}
