use crate::config::{Config, Pipelines};
use crate::dispatcher::{Backends, Dispatcher};
use crate::errors::{ReceiverError, Result};
use crate::exporter;
use crate::handler::{Handler, Signal};
use crate::service::ExportService;
use parking_lot::Mutex;
use shared::admin_service::AdminService;
use shared::http::{bind, serve};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Local addresses a started receiver is listening on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReceiverAddrs {
    pub data: SocketAddr,
    pub admin: SocketAddr,
}

/// One running receiver: a dispatcher with an endpoint per signal, served
/// over HTTP, plus an admin listener for probes.
pub struct Receiver {
    config: Config,
    dispatcher: Arc<Dispatcher>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<std::io::Result<()>>>>,
}

impl Receiver {
    /// Creates the receiver without binding anything. Every endpoint
    /// answers "unavailable" until a handler is registered or `apply` runs.
    pub fn new(config: Config) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            config,
            dispatcher: Arc::new(Dispatcher::new()),
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Installs `handler` for `signal`. The endpoint must have been retired
    /// before if a handler was installed already.
    pub fn register(&self, signal: Signal, handler: Arc<dyn Handler>) {
        self.dispatcher.endpoint(signal).install(handler);
    }

    /// Marks `signal` as not enabled.
    pub fn disable(&self, signal: Signal) {
        self.dispatcher.endpoint(signal).install_unimplemented();
    }

    /// Switches every endpoint to the backends described by `pipelines`.
    ///
    /// All backends are built before anything is retired, so an invalid
    /// pipeline leaves the running handlers in place.
    pub async fn apply(&self, pipelines: &Pipelines) -> Result<()> {
        let mut backends = Backends::new();
        for signal in Signal::ALL {
            if let Some(pipeline) = pipelines.get(signal) {
                backends.insert(signal, exporter::build(signal, &pipeline.exporter)?);
            }
        }

        tracing::info!(
            receiver = %self.config.id,
            enabled = ?backends.keys().map(Signal::as_str).collect::<Vec<_>>(),
            "applying pipelines"
        );
        self.dispatcher.reconfigure(backends).await;
        Ok(())
    }

    /// Binds the data and admin listeners and serves them in the background
    /// until [`Receiver::shutdown`].
    pub async fn start(&self) -> Result<ReceiverAddrs> {
        if !self.tasks.lock().is_empty() {
            return Err(ReceiverError::AlreadyStarted(self.config.id.clone()));
        }

        let data_listener = bind(&self.config.listener.host, self.config.listener.port).await?;
        let admin_listener = bind(
            &self.config.admin_listener.host,
            self.config.admin_listener.port,
        )
        .await?;
        let addrs = ReceiverAddrs {
            data: data_listener.local_addr()?,
            admin: admin_listener.local_addr()?,
        };

        let export_service = ExportService::new(self.dispatcher.clone());
        let dispatcher = self.dispatcher.clone();
        let admin_service = AdminService::new(move || dispatcher.is_ready());

        let data_task = tokio::spawn(serve(
            data_listener,
            export_service,
            self.wait_for_shutdown(),
        ));
        let admin_task = tokio::spawn(serve(
            admin_listener,
            admin_service,
            self.wait_for_shutdown(),
        ));
        self.tasks.lock().extend([data_task, admin_task]);

        tracing::info!(
            receiver = %self.config.id,
            data = %addrs.data,
            admin = %addrs.admin,
            "receiver started"
        );
        Ok(addrs)
    }

    /// Retires every endpoint, letting in-flight calls finish, then stops
    /// both listeners.
    pub async fn shutdown(&self) {
        tracing::info!(receiver = %self.config.id, "shutting down receiver");
        self.dispatcher.shutdown().await;

        self.shutdown_tx.send_replace(true);
        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(receiver = %self.config.id, error = %e, "listener failed"),
                Err(e) => tracing::error!(receiver = %self.config.id, error = %e, "listener task panicked"),
            }
        }
        tracing::info!(receiver = %self.config.id, "receiver stopped");
    }

    fn wait_for_shutdown(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.shutdown_tx.subscribe();
        async move {
            let _ = rx.wait_for(|stopped| *stopped).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExporterConfig, Listener, Pipeline, Verbosity};
    use crate::errors::ExportError;
    use crate::handler::ExportRequest;
    use crate::testutils::{StaticHandler, tagged};

    fn test_config() -> Config {
        Config {
            id: "test".into(),
            listener: Listener {
                host: "127.0.0.1".into(),
                port: 0,
            },
            admin_listener: Listener {
                host: "127.0.0.1".into(),
                port: 0,
            },
            pipelines: Pipelines::default(),
        }
    }

    fn pipeline(kind: &str) -> Option<Pipeline> {
        Some(Pipeline {
            exporter: ExporterConfig {
                kind: kind.into(),
                verbosity: Verbosity::Basic,
            },
        })
    }

    #[tokio::test]
    async fn test_register_and_disable() {
        let receiver = Receiver::new(test_config());
        receiver.register(Signal::Traces, StaticHandler::new("t"));
        receiver.disable(Signal::Logs);

        let dispatcher = receiver.dispatcher();
        assert_eq!(
            dispatcher
                .call(Signal::Traces, ExportRequest::default())
                .await
                .unwrap(),
            tagged("t")
        );
        assert!(matches!(
            dispatcher.call(Signal::Logs, ExportRequest::default()).await,
            Err(ExportError::NotEnabled(Signal::Logs))
        ));
        assert!(matches!(
            dispatcher.call(Signal::Metrics, ExportRequest::default()).await,
            Err(ExportError::Unavailable)
        ));
        assert!(!dispatcher.is_ready());
    }

    #[tokio::test]
    async fn test_invalid_pipelines_keep_running_handlers() {
        let receiver = Receiver::new(test_config());
        receiver
            .apply(&Pipelines {
                traces: pipeline("discard"),
                ..Default::default()
            })
            .await
            .unwrap();

        let result = receiver
            .apply(&Pipelines {
                traces: pipeline("zipkin"),
                ..Default::default()
            })
            .await;
        assert!(matches!(result, Err(ReceiverError::Config(_))));

        let response = receiver
            .dispatcher()
            .call(Signal::Traces, ExportRequest::default())
            .await;
        assert!(response.is_ok());
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let receiver = Receiver::new(test_config());
        receiver
            .apply(&Pipelines {
                logs: pipeline("logging"),
                ..Default::default()
            })
            .await
            .unwrap();

        let addrs = receiver.start().await.unwrap();
        assert!(matches!(
            receiver.start().await,
            Err(ReceiverError::AlreadyStarted(_))
        ));

        let ready = reqwest::get(format!("http://{}/ready", addrs.admin))
            .await
            .unwrap();
        assert_eq!(ready.status(), reqwest::StatusCode::OK);

        let export = reqwest::Client::new()
            .post(format!("http://{}/v1/logs", addrs.data))
            .header("content-type", "application/json")
            .body(r#"{"resourceLogs":[]}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(export.status(), reqwest::StatusCode::OK);

        receiver.shutdown().await;
        assert!(!receiver.dispatcher().is_ready());
        assert!(reqwest::get(format!("http://{}/health", addrs.admin))
            .await
            .is_err());
    }
}
