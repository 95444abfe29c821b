use crate::errors::ExportError;
use async_trait::async_trait;
use hyper::body::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The independent telemetry categories, each served by its own endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Traces,
    Metrics,
    Logs,
}

impl Signal {
    pub const ALL: [Signal; 3] = [Signal::Traces, Signal::Metrics, Signal::Logs];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Signal::Traces => "traces",
            Signal::Metrics => "metrics",
            Signal::Logs => "logs",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One export call as handed over by the transport. The payload is opaque
/// to everything in this crate except the backend that consumes it.
#[derive(Clone, Debug, Default)]
pub struct ExportRequest {
    pub payload: Bytes,
    pub content_type: Option<String>,
}

impl ExportRequest {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            content_type: None,
        }
    }
}

/// Result of a successful export. The default value means every item was
/// accepted; a non-zero `rejected` reports a partial success.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExportResponse {
    pub rejected: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ExportResponse {
    pub fn partial(rejected: u64, message: impl Into<String>) -> Self {
        Self {
            rejected,
            message: Some(message.into()),
        }
    }

    pub fn is_partial(&self) -> bool {
        self.rejected > 0 || self.message.is_some()
    }
}

/// Backend for one signal class.
///
/// Implementations are invoked concurrently and are expected to finish in
/// bounded time: a call that never returns keeps its endpoint from draining.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Name used in logs and metric tags
    fn name(&self) -> &'static str;

    async fn call(&self, request: ExportRequest) -> Result<ExportResponse, ExportError>;
}
