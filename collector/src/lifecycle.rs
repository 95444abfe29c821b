use crate::config::{Config, ConfigError};
use crate::metrics_defs::RELOADS;
use receiver::Receiver;
use receiver::errors::ReceiverError;
use receiver::shared_component::SharedComponents;
use shared::counter;
use std::path::Path;
use tokio::signal::unix::{SignalKind, signal};

#[derive(thiserror::Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Receiver(#[from] ReceiverError),
    #[error("could not install signal handler: {0}")]
    Signal(#[from] std::io::Error),
}

/// Starts the configured receiver and serves it until SIGTERM or Ctrl-C.
///
/// SIGHUP re-reads `config_path` and switches the pipelines of the running
/// receiver. A reload that fails leaves the current pipelines in place.
pub async fn run(config_path: &Path, config: Config) -> Result<(), RunError> {
    let receivers = SharedComponents::new();
    let receiver_config = config.receiver;
    let id = receiver_config.id.clone();

    let receiver = receivers.get_or_add(id.clone(), || Receiver::new(receiver_config.clone()));
    receiver.apply(&receiver_config.pipelines).await?;
    receiver.start().await?;

    let mut hangup = signal(SignalKind::hangup())?;
    let mut terminate = signal(SignalKind::terminate())?;

    loop {
        tokio::select! {
            _ = hangup.recv() => match reload(config_path, &receiver).await {
                Ok(()) => counter!(RELOADS, "outcome" => "ok").increment(1),
                Err(e) => {
                    tracing::error!(error = %e, "reload failed, keeping current pipelines");
                    counter!(RELOADS, "outcome" => "failed").increment(1);
                }
            },
            _ = terminate.recv() => break,
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    receiver.shutdown().await;
    receivers.remove(&id);
    Ok(())
}

/// Applies the pipelines found in `config_path` to `receiver`.
///
/// Only pipelines are reloaded. Changes to the receiver id or its listeners
/// are reported and otherwise ignored until the next restart.
pub async fn reload(config_path: &Path, receiver: &Receiver) -> Result<(), RunError> {
    tracing::info!(path = %config_path.display(), "reloading configuration");
    let config = Config::load(config_path)?;

    let current = receiver.config();
    if config.receiver.id != current.id
        || config.receiver.listener != current.listener
        || config.receiver.admin_listener != current.admin_listener
    {
        tracing::warn!(
            receiver = %current.id,
            "receiver id and listener changes require a restart"
        );
    }

    receiver.apply(&config.receiver.pipelines).await?;
    Ok(())
}
