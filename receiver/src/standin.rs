//! Fixed-response handlers used when no real backend is installed.

use crate::errors::ExportError;
use crate::handler::{ExportRequest, ExportResponse, Handler, Signal};
use async_trait::async_trait;

/// Tells callers to come back shortly. This is what an endpoint answers
/// while nothing is installed, e.g. between a retire and the next install.
pub struct UnavailableHandler;

#[async_trait]
impl Handler for UnavailableHandler {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    async fn call(&self, _request: ExportRequest) -> Result<ExportResponse, ExportError> {
        Err(ExportError::Unavailable)
    }
}

/// Installed for a signal the current configuration leaves disabled.
/// Callers should not retry until the collector is reconfigured.
pub struct UnimplementedHandler {
    signal: Signal,
}

impl UnimplementedHandler {
    pub fn new(signal: Signal) -> Self {
        Self { signal }
    }
}

#[async_trait]
impl Handler for UnimplementedHandler {
    fn name(&self) -> &'static str {
        "unimplemented"
    }

    async fn call(&self, _request: ExportRequest) -> Result<ExportResponse, ExportError> {
        Err(ExportError::NotEnabled(self.signal))
    }
}
