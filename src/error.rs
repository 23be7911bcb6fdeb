use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("invalid hook input: {0}")]
    InvalidInput(String),

    #[error("invalid session id {id:?}: {reason}")]
    InvalidSessionId { id: String, reason: &'static str },

    #[error("no session record for {session_id} at {}", path.display())]
    MissingSession { session_id: String, path: PathBuf },

    #[error("corrupt session record {}: {reason}", path.display())]
    CorruptRecord { path: PathBuf, reason: String },

    #[error("{command} timed out after {} seconds", timeout.as_secs())]
    ToolTimeout { command: String, timeout: Duration },

    #[error("{command} failed: {reason}")]
    ToolFailed { command: String, reason: String },

    #[error("idle checkpoints cannot be empty")]
    EmptyCheckpoints,

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl NotifierError {
    /// Stable label written to the diagnostic log next to the message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "InvalidInput",
            Self::InvalidSessionId { .. } => "InvalidSessionId",
            Self::MissingSession { .. } => "MissingSession",
            Self::CorruptRecord { .. } => "CorruptRecord",
            Self::ToolTimeout { .. } => "ToolTimeout",
            Self::ToolFailed { .. } => "ToolFailed",
            Self::EmptyCheckpoints => "EmptyCheckpoints",
            Self::Io { .. } => "Io",
        }
    }

    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T, E = NotifierError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_includes_duration() {
        let err = NotifierError::ToolTimeout {
            command: "hs".to_string(),
            timeout: Duration::from_secs(10),
        };
        assert_eq!(err.to_string(), "hs timed out after 10 seconds");
        assert_eq!(err.kind(), "ToolTimeout");
    }

    #[test]
    fn io_errors_keep_their_context() {
        let err = NotifierError::io(
            "failed to create /tmp/x",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.kind(), "Io");
        assert!(err.to_string().starts_with("failed to create /tmp/x"));
    }
}
