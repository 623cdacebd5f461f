use std::fmt;

use chess::{FenError, MoveError};
use serde::Serialize;
use serde_json::{json, Value};

use crate::remote::RemoteError;
use crate::scheduler::AnalysisError;

/// Error kinds reported at the tool boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidPosition,
    InvalidMove,
    InvalidArgument,
    UnknownTool,
    EngineUnavailable,
    EngineProtocolError,
    AnalysisTimeout,
    RemoteServiceError,
    ConfigurationError,
    Canceled,
    /// A result could not be encoded.
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidPosition => "invalid_position",
            Self::InvalidMove => "invalid_move",
            Self::InvalidArgument => "invalid_argument",
            Self::UnknownTool => "unknown_tool",
            Self::EngineUnavailable => "engine_unavailable",
            Self::EngineProtocolError => "engine_protocol_error",
            Self::AnalysisTimeout => "analysis_timeout",
            Self::RemoteServiceError => "remote_service_error",
            Self::ConfigurationError => "configuration_error",
            Self::Canceled => "canceled",
            Self::Internal => "internal_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed tool call, shaped for the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ToolError {
    pub kind: ErrorKind,
    pub message: String,
    /// HTTP status of a failed remote call.
    pub status: Option<u16>,
}

impl ToolError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    pub fn invalid_position(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidPosition, message)
    }

    /// `{"error": {"kind", "message", "status"?}}`
    pub fn to_json(&self) -> Value {
        let mut error = json!({
            "kind": self.kind,
            "message": self.message,
        });
        if let Some(status) = self.status {
            error["status"] = json!(status);
        }
        json!({ "error": error })
    }
}

impl From<FenError> for ToolError {
    fn from(err: FenError) -> Self {
        Self::invalid_position(err.to_string())
    }
}

impl From<MoveError> for ToolError {
    fn from(err: MoveError) -> Self {
        Self::new(ErrorKind::InvalidMove, err.to_string())
    }
}

impl From<AnalysisError> for ToolError {
    fn from(err: AnalysisError) -> Self {
        let kind = match &err {
            AnalysisError::Timeout => ErrorKind::AnalysisTimeout,
            AnalysisError::Canceled => ErrorKind::Canceled,
            AnalysisError::EngineUnavailable(_) | AnalysisError::SchedulerClosed => {
                ErrorKind::EngineUnavailable
            }
            AnalysisError::EngineProtocol(_) => ErrorKind::EngineProtocolError,
            AnalysisError::InvalidLimits(_) => ErrorKind::InvalidArgument,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<RemoteError> for ToolError {
    fn from(err: RemoteError) -> Self {
        let kind = match &err {
            RemoteError::MissingCredential => ErrorKind::ConfigurationError,
            RemoteError::Status { .. } | RemoteError::Transport(_) | RemoteError::Decode(_) => {
                ErrorKind::RemoteServiceError
            }
        };
        Self {
            kind,
            status: err.status(),
            message: err.to_string(),
        }
    }
}
