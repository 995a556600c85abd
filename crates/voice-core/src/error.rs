use thiserror::Error;

pub type Result<T, E = VoiceError> = core::result::Result<T, E>;

/// Errors surfaced through the crate's fallible seams. Machine-link
/// failures are reported per-dispatch as session outcomes, not through
/// this type.
#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("settings store error: {0}")]
    Store(String),
}

impl From<serde_json::Error> for VoiceError {
    fn from(e: serde_json::Error) -> Self {
        VoiceError::Store(e.to_string())
    }
}
