use tokio::sync::OnceCell;

use crate::config::BrokerConfig;
use crate::error::Result;

pub mod client;

pub use client::MqttPublisher;

/// Process-wide client used by `Telemetry::publish`.
pub static MQTTCLIENT: OnceCell<MqttPublisher> = OnceCell::const_new();

/// Returns the shared client, connecting it from the environment the first
/// time it is needed. A failed connect is not cached.
pub async fn shared_client() -> Result<&'static MqttPublisher> {
    MQTTCLIENT
        .get_or_try_init(|| async {
            let config = BrokerConfig::from_env()?;
            MqttPublisher::connect(&config).await
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shared_client_requires_host() {
        // MQTT_HOST is never set by this crate's tests.
        if std::env::var("MQTT_HOST").is_ok() {
            return;
        }
        let result = shared_client().await;
        assert!(matches!(result, Err(crate::Error::MissingEnv(key)) if key == "MQTT_HOST"));
        assert!(MQTTCLIENT.get().is_none());
    }
}
