use crate::errors::ExportError;
use crate::handler::{ExportRequest, ExportResponse, Handler};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Notify, Semaphore};

/// Answers every call immediately with its tag in the response message.
pub struct StaticHandler {
    pub tag: &'static str,
}

impl StaticHandler {
    pub fn new(tag: &'static str) -> Arc<Self> {
        Arc::new(Self { tag })
    }
}

#[async_trait]
impl Handler for StaticHandler {
    fn name(&self) -> &'static str {
        self.tag
    }

    async fn call(&self, _request: ExportRequest) -> Result<ExportResponse, ExportError> {
        Ok(tagged(self.tag))
    }
}

/// Parks every call until the test releases it.
pub struct GatedHandler {
    pub tag: &'static str,
    started: Notify,
    release: Semaphore,
    calls: AtomicUsize,
}

impl GatedHandler {
    pub fn new(tag: &'static str) -> Arc<Self> {
        Arc::new(Self {
            tag,
            started: Notify::new(),
            release: Semaphore::new(0),
            calls: AtomicUsize::new(0),
        })
    }

    /// Resolves once a call has entered the handler.
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    /// Lets `n` parked calls return.
    pub fn release(&self, n: usize) {
        self.release.add_permits(n);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Handler for GatedHandler {
    fn name(&self) -> &'static str {
        self.tag
    }

    async fn call(&self, _request: ExportRequest) -> Result<ExportResponse, ExportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        let permit = self
            .release
            .acquire()
            .await
            .map_err(|e| ExportError::backend(e.to_string()))?;
        permit.forget();
        Ok(tagged(self.tag))
    }
}

/// Fails every call with a backend error.
pub struct FailingHandler;

#[async_trait]
impl Handler for FailingHandler {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn call(&self, _request: ExportRequest) -> Result<ExportResponse, ExportError> {
        Err(ExportError::backend("backend exploded"))
    }
}

pub fn tagged(tag: &str) -> ExportResponse {
    ExportResponse {
        rejected: 0,
        message: Some(tag.to_string()),
    }
}
