//! Backends the receiver can install for a signal.

use crate::config::{ExporterConfig, ValidationError, Verbosity};
use crate::errors::ExportError;
use crate::handler::{ExportRequest, ExportResponse, Handler, Signal};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Exporter types accepted in configuration, sorted.
pub const EXPORTER_TYPES: &[&str] = &["discard", "logging"];

/// Builds the backend described by `config` for `signal`.
pub fn build(signal: Signal, config: &ExporterConfig) -> Result<Arc<dyn Handler>, ValidationError> {
    match config.kind.as_str() {
        "logging" => Ok(Arc::new(LoggingExporter::new(signal, config.verbosity))),
        "discard" => Ok(Arc::new(DiscardExporter)),
        other => Err(ValidationError::UnknownExporter {
            signal,
            kind: other.to_string(),
        }),
    }
}

pub fn validate(signal: Signal, config: &ExporterConfig) -> Result<(), ValidationError> {
    if EXPORTER_TYPES.contains(&config.kind.as_str()) {
        Ok(())
    } else {
        Err(ValidationError::UnknownExporter {
            signal,
            kind: config.kind.clone(),
        })
    }
}

/// Writes every export to the log.
///
/// `basic` logs the size of each payload, `detailed` also logs the payload
/// itself, rendered as lossy UTF-8, at trace level.
pub struct LoggingExporter {
    signal: Signal,
    verbosity: Verbosity,
    exported: AtomicU64,
}

impl LoggingExporter {
    pub fn new(signal: Signal, verbosity: Verbosity) -> Self {
        Self {
            signal,
            verbosity,
            exported: AtomicU64::new(0),
        }
    }

    /// Number of exports handled so far.
    pub fn exported(&self) -> u64 {
        self.exported.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Handler for LoggingExporter {
    fn name(&self) -> &'static str {
        "logging"
    }

    async fn call(&self, request: ExportRequest) -> Result<ExportResponse, ExportError> {
        let seq = self.exported.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!(
            signal = %self.signal,
            seq,
            bytes = request.payload.len(),
            content_type = request.content_type.as_deref().unwrap_or("-"),
            "export received"
        );

        if self.verbosity == Verbosity::Detailed {
            tracing::trace!(
                signal = %self.signal,
                seq,
                payload = %String::from_utf8_lossy(&request.payload),
                "export payload"
            );
        }

        Ok(ExportResponse::default())
    }
}

/// Accepts and drops everything.
pub struct DiscardExporter;

#[async_trait]
impl Handler for DiscardExporter {
    fn name(&self) -> &'static str {
        "discard"
    }

    async fn call(&self, _request: ExportRequest) -> Result<ExportResponse, ExportError> {
        Ok(ExportResponse::default())
    }
}
