use crate::drainable::DrainableHandler;
use crate::errors::ExportError;
use crate::handler::{ExportRequest, ExportResponse, Handler, Signal};
use crate::metrics_defs::{DRAIN_DURATION, HANDLER_SWAPS, REQUEST_DURATION, REQUESTS};
use crate::standin::{UnavailableHandler, UnimplementedHandler};
use arc_swap::ArcSwapOption;
use shared::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;

/// The public face of one signal class.
///
/// Holds the currently installed backend, if any, behind an atomically
/// swappable slot. Calls load the slot once and stay with what they loaded,
/// so a swap never redirects a call that is already running. Swapping does
/// not wait for anything; the waiting happens in the gate of the handler
/// that was swapped out.
///
/// `install` and `retire_and_clear` are not serialized against each other.
/// Callers drive them sequentially per endpoint, from a control task and
/// never from inside a call.
#[derive(Debug)]
pub struct SwitchableEndpoint {
    signal: Signal,
    current: ArcSwapOption<DrainableHandler>,
}

impl SwitchableEndpoint {
    pub fn new(signal: Signal) -> Self {
        Self {
            signal,
            current: ArcSwapOption::empty(),
        }
    }

    pub fn signal(&self) -> Signal {
        self.signal
    }

    pub async fn call(&self, request: ExportRequest) -> Result<ExportResponse, ExportError> {
        let start = Instant::now();

        // Own a reference so the handler outlives a concurrent swap
        let result = match self.current.load_full() {
            Some(handler) => handler.call(request).await,
            None => UnavailableHandler.call(request).await,
        };

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        counter!(REQUESTS, "signal" => self.signal.as_str(), "outcome" => outcome).increment(1);
        histogram!(REQUEST_DURATION, "signal" => self.signal.as_str())
            .record(start.elapsed().as_secs_f64());

        result
    }

    /// Wraps `handler` in a fresh gate and makes it current.
    ///
    /// Whatever was installed before is dropped from the slot without being
    /// drained; retire it first with [`SwitchableEndpoint::retire_and_clear`].
    pub fn install(&self, handler: Arc<dyn Handler>) {
        tracing::info!(signal = %self.signal, handler = handler.name(), "installing handler");
        self.current.store(Some(Arc::new(DrainableHandler::new(handler))));
        counter!(HANDLER_SWAPS, "signal" => self.signal.as_str(), "kind" => "install")
            .increment(1);
    }

    /// Installs the stand-in that reports this signal as not enabled.
    pub fn install_unimplemented(&self) {
        self.install(Arc::new(UnimplementedHandler::new(self.signal)));
    }

    /// Clears the slot, then waits until every call that was admitted by the
    /// previous handler has finished.
    ///
    /// Calls arriving after the slot is cleared see no handler and get
    /// [`ExportError::Unavailable`], even while the drain is still running.
    pub async fn retire_and_clear(&self) {
        let Some(previous) = self.current.swap(None) else {
            return;
        };

        tracing::info!(
            signal = %self.signal,
            handler = previous.name(),
            in_flight = previous.in_flight(),
            "retiring handler"
        );
        counter!(HANDLER_SWAPS, "signal" => self.signal.as_str(), "kind" => "retire")
            .increment(1);

        let start = Instant::now();
        previous.retire().await;
        let elapsed = start.elapsed();

        histogram!(DRAIN_DURATION, "signal" => self.signal.as_str()).record(elapsed.as_secs_f64());
        tracing::info!(
            signal = %self.signal,
            handler = previous.name(),
            elapsed_ms = elapsed.as_millis() as u64,
            "handler drained"
        );
    }

    pub fn is_installed(&self) -> bool {
        self.current.load().is_some()
    }

    /// Calls currently running against the installed handler.
    pub fn in_flight(&self) -> u64 {
        match &*self.current.load() {
            Some(handler) => handler.in_flight(),
            None => 0,
        }
    }
}
