use crate::limits::LimitsError;

#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    /// The binary could not be launched or did not finish the handshake.
    #[error("Engine unavailable: {0}")]
    Unavailable(String),
    /// I/O failure, EOF, bad terminal line or timeout. The session is dead.
    #[error("Engine protocol error: {0}")]
    Protocol(String),
    #[error("Engine is already searching")]
    Busy,
    #[error("No search in progress")]
    NoSearch,
    #[error("No position has been set")]
    NoPosition,
    #[error("Invalid analysis limits: {0}")]
    Limits(#[from] LimitsError),
}

impl EngineError {
    /// True when the session that produced this error must be discarded.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Protocol(_))
    }
}
