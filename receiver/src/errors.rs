use crate::handler::Signal;
use hyper::StatusCode;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type alias for receiver lifecycle operations
pub type Result<T, E = ReceiverError> = std::result::Result<T, E>;

/// Errors returned on the export path, from an endpoint to the transport.
#[derive(Error, Debug)]
pub enum ExportError {
    /// No handler is installed, or the installed one is draining. Retry shortly.
    #[error("temporarily unavailable: reloading")]
    Unavailable,

    /// The signal is disabled by configuration. Do not retry.
    #[error("{0} not enabled")]
    NotEnabled(Signal),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Anything the backend itself reported, passed through untouched.
    #[error(transparent)]
    Backend(BoxError),
}

impl ExportError {
    pub fn backend<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        ExportError::Backend(err.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ExportError::Unavailable)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ExportError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ExportError::NotEnabled(_) => StatusCode::NOT_IMPLEMENTED,
            ExportError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ExportError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short tag used for the `outcome` metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            ExportError::Unavailable => "unavailable",
            ExportError::NotEnabled(_) => "not_enabled",
            ExportError::InvalidRequest(_) => "invalid_request",
            ExportError::Backend(_) => "backend_error",
        }
    }
}

/// Errors that can occur while configuring, starting or stopping a receiver
#[derive(Error, Debug)]
pub enum ReceiverError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ValidationError),

    #[error("receiver {0} is already started")]
    AlreadyStarted(String),
}
