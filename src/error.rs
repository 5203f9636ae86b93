use std::time::Duration;

/// Crate-level error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Metric unavailable: {metric}: {reason}")]
    MetricUnavailable { metric: String, reason: String },

    #[error("Action {action} on {target} failed: {reason}")]
    ActionFailed { action: String, target: String, reason: String },

    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl Error {
    pub(crate) fn metric_unavailable(metric: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MetricUnavailable { metric: metric.into(), reason: reason.into() }
    }

    pub(crate) fn action_failed(
        action: impl Into<String>,
        target: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::ActionFailed { action: action.into(), target: target.into(), reason: reason.into() }
    }

    pub(crate) fn config_invalid<S: Into<String>>(msg: S) -> Self {
        Error::ConfigInvalid(msg.into())
    }

    pub(crate) fn invalid_data<S: Into<String>>(msg: S) -> Self {
        Error::InvalidData(msg.into())
    }
}

/// Result type for host-sentinel operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failure of a single metric backend call.
///
/// A source treats every variant the same way (fall through to the next
/// backend); the variants exist so logs and `MetricUnavailable` reasons say
/// what actually went wrong.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("tool not found: {0}")]
    ToolMissing(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("unsupported on this host: {0}")]
    Unsupported(String),

    #[error("unparseable output: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("library error: {0}")]
    Library(String),
}

impl BackendError {
    pub(crate) fn tool_missing<S: Into<String>>(msg: S) -> Self {
        BackendError::ToolMissing(msg.into())
    }

    pub(crate) fn permission_denied<S: Into<String>>(msg: S) -> Self {
        BackendError::PermissionDenied(msg.into())
    }

    pub(crate) fn unsupported<S: Into<String>>(msg: S) -> Self {
        BackendError::Unsupported(msg.into())
    }

    pub(crate) fn parse<S: Into<String>>(msg: S) -> Self {
        BackendError::Parse(msg.into())
    }

    pub(crate) fn library<S: Into<String>>(msg: S) -> Self {
        BackendError::Library(msg.into())
    }

    /// Maps an IO error from a file read or process spawn onto the narrower
    /// variants where the kind tells us more.
    pub(crate) fn from_io(context: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => BackendError::tool_missing(context),
            std::io::ErrorKind::PermissionDenied => BackendError::permission_denied(context),
            _ => BackendError::Io(err),
        }
    }
}

/// Result type for a single backend call
pub type BackendResult<T> = std::result::Result<T, BackendError>;
