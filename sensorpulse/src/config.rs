use crate::error::{Error, Result};

/// Connection settings for the MQTT broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    /// Server URI, e.g. `tcp://localhost:1883`.
    pub host: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: String,
}

impl BrokerConfig {
    /// Reads `MQTT_HOST`, `MQTT_USERNAME`, `MQTT_PASSWORD` and `MQTT_CLIENT_ID`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = get_var(&lookup, "MQTT_HOST")?;
        let client_id = lookup("MQTT_CLIENT_ID")
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("sensorpulse-{}", uuid::Uuid::new_v4()));

        Ok(Self {
            host,
            username: lookup("MQTT_USERNAME"),
            password: lookup("MQTT_PASSWORD"),
            client_id,
        })
    }
}

fn get_var(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    match lookup(key) {
        Some(val) if !val.is_empty() => Ok(val),
        _ => Err(Error::MissingEnv(key.to_string())),
    }
}
