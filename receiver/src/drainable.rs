use crate::errors::ExportError;
use crate::gate::Gate;
use crate::handler::{ExportRequest, ExportResponse, Handler};
use std::fmt;
use std::sync::Arc;

/// One installed backend together with the gate that guards it.
///
/// Retiring the wrapper is a graceful shutdown of that single backend
/// instance: calls already running finish, calls arriving afterwards are
/// told to retry.
pub struct DrainableHandler {
    handler: Arc<dyn Handler>,
    gate: Gate,
}

impl DrainableHandler {
    pub fn new(handler: Arc<dyn Handler>) -> Self {
        Self {
            handler,
            gate: Gate::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.handler.name()
    }

    pub async fn call(&self, request: ExportRequest) -> Result<ExportResponse, ExportError> {
        // Held for the whole backend call, released on every exit path
        let Some(_ticket) = self.gate.enter() else {
            return Err(ExportError::Unavailable);
        };
        self.handler.call(request).await
    }

    /// Closes the gate and waits for every running call to finish.
    ///
    /// # Panics
    ///
    /// Panics when the same wrapper is retired twice.
    pub async fn retire(&self) {
        self.gate.close().await;
    }

    pub fn in_flight(&self) -> u64 {
        self.gate.outstanding()
    }
}

impl fmt::Debug for DrainableHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrainableHandler")
            .field("handler", &self.handler.name())
            .field("gate", &self.gate)
            .finish()
    }
}
