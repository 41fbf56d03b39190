use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0} not found in environment")]
    MissingEnv(String),

    #[error("invalid QoS level {0}, expected 0, 1 or 2")]
    InvalidQos(u8),

    #[cfg(feature = "mqtt")]
    #[error("failed to connect to {uri}: {source}")]
    Connect {
        uri: String,
        #[source]
        source: paho_mqtt::Error,
    },

    #[error("failed to publish to {topic}: {source}")]
    Publish {
        topic: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("unknown scenario '{0}'")]
    UnknownScenario(String),

    #[error("scenario '{0}' is already running")]
    AlreadyRunning(String),

    #[error("failed to read scenario file {path}: {source}")]
    ReadScenario {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid scenario file {path}: {source}")]
    ParseScenario {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
