use crate::handler::Signal;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Port cannot be 0 ({0})")]
    InvalidPort(&'static str),

    #[error("Receiver id cannot be empty")]
    EmptyReceiverId,

    #[error("listener and admin_listener both bind {0}")]
    ListenerConflict(String),

    #[error(
        "unknown exporter type: {kind:?} for signal \"{signal}\" (valid values: {valid:?})",
        valid = crate::exporter::EXPORTER_TYPES
    )]
    UnknownExporter { signal: Signal, kind: String },
}

/// Receiver configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Identity of the receiver instance. Two configurations with the same
    /// id share one running receiver.
    #[serde(default = "default_id")]
    pub id: String,
    /// Listener for export requests
    #[serde(default = "Listener::default_data")]
    pub listener: Listener,
    /// Listener for health and readiness probes
    #[serde(default = "Listener::default_admin")]
    pub admin_listener: Listener,
    /// Backend per signal. A signal without a pipeline is not enabled.
    #[serde(default)]
    pub pipelines: Pipelines,
}

fn default_id() -> String {
    "otlp".into()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            id: default_id(),
            listener: Listener::default_data(),
            admin_listener: Listener::default_admin(),
            pipelines: Pipelines::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::EmptyReceiverId);
        }

        self.listener.validate("listener")?;
        self.admin_listener.validate("admin_listener")?;
        if self.listener.conflicts_with(&self.admin_listener) {
            return Err(ValidationError::ListenerConflict(self.listener.address()));
        }

        self.pipelines.validate()
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    pub fn default_data() -> Self {
        Listener {
            host: "0.0.0.0".into(),
            port: 4318,
        }
    }

    pub fn default_admin() -> Self {
        Listener {
            host: "127.0.0.1".into(),
            port: 13133,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// True if binding both listeners would claim the same socket. A
    /// wildcard host overlaps every host on the same port.
    pub fn conflicts_with(&self, other: &Listener) -> bool {
        self.port == other.port
            && (self.host == other.host || is_wildcard(&self.host) || is_wildcard(&other.host))
    }

    fn validate(&self, name: &'static str) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort(name));
        }
        Ok(())
    }
}

fn is_wildcard(host: &str) -> bool {
    matches!(host, "" | "0.0.0.0" | "::" | "[::]")
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Pipelines {
    pub traces: Option<Pipeline>,
    pub metrics: Option<Pipeline>,
    pub logs: Option<Pipeline>,
}

impl Pipelines {
    pub fn get(&self, signal: Signal) -> Option<&Pipeline> {
        match signal {
            Signal::Traces => self.traces.as_ref(),
            Signal::Metrics => self.metrics.as_ref(),
            Signal::Logs => self.logs.as_ref(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for signal in Signal::ALL {
            if let Some(pipeline) = self.get(signal) {
                crate::exporter::validate(signal, &pipeline.exporter)?;
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Pipeline {
    pub exporter: ExporterConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ExporterConfig {
    /// One of [`crate::exporter::EXPORTER_TYPES`]
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub verbosity: Verbosity,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    #[default]
    Basic,
    Detailed,
}
