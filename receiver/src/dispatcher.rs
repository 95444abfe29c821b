use crate::endpoint::SwitchableEndpoint;
use crate::errors::ExportError;
use crate::handler::{ExportRequest, ExportResponse, Handler, Signal};
use std::collections::HashMap;
use std::sync::Arc;

/// Backends to install on the next reconfiguration. A signal without an
/// entry is installed as not enabled.
pub type Backends = HashMap<Signal, Arc<dyn Handler>>;

/// One switchable endpoint per signal class.
#[derive(Debug)]
pub struct Dispatcher {
    traces: SwitchableEndpoint,
    metrics: SwitchableEndpoint,
    logs: SwitchableEndpoint,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            traces: SwitchableEndpoint::new(Signal::Traces),
            metrics: SwitchableEndpoint::new(Signal::Metrics),
            logs: SwitchableEndpoint::new(Signal::Logs),
        }
    }

    pub fn endpoint(&self, signal: Signal) -> &SwitchableEndpoint {
        match signal {
            Signal::Traces => &self.traces,
            Signal::Metrics => &self.metrics,
            Signal::Logs => &self.logs,
        }
    }

    pub async fn call(
        &self,
        signal: Signal,
        request: ExportRequest,
    ) -> Result<ExportResponse, ExportError> {
        self.endpoint(signal).call(request).await
    }

    /// Retires the current handler of every endpoint and installs the new
    /// ones. Endpoints are switched concurrently; within one endpoint the
    /// new handler goes in only after the old one has drained.
    pub async fn reconfigure(&self, mut backends: Backends) {
        tokio::join!(
            Self::switch(&self.traces, backends.remove(&Signal::Traces)),
            Self::switch(&self.metrics, backends.remove(&Signal::Metrics)),
            Self::switch(&self.logs, backends.remove(&Signal::Logs)),
        );
    }

    async fn switch(endpoint: &SwitchableEndpoint, backend: Option<Arc<dyn Handler>>) {
        endpoint.retire_and_clear().await;
        match backend {
            Some(backend) => endpoint.install(backend),
            None => endpoint.install_unimplemented(),
        }
    }

    /// Retires every endpoint, waiting for their in-flight calls.
    pub async fn shutdown(&self) {
        tokio::join!(
            self.traces.retire_and_clear(),
            self.metrics.retire_and_clear(),
            self.logs.retire_and_clear(),
        );
    }

    /// True once every endpoint has a handler, real or stand-in.
    pub fn is_ready(&self) -> bool {
        Signal::ALL
            .iter()
            .all(|signal| self.endpoint(*signal).is_installed())
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
