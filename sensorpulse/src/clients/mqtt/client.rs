use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::BrokerConfig;
use crate::error::{Error, Result};
use crate::{Message, Publish};

const KEEP_ALIVE: Duration = Duration::from_secs(20);

/// Publishes messages to a broker through paho's async client.
pub struct MqttPublisher {
    client: paho_mqtt::AsyncClient,
    uri: String,
}

impl MqttPublisher {
    /// Creates a client for `config.host` and connects with a clean session.
    pub async fn connect(config: &BrokerConfig) -> Result<Self> {
        let create_opts = paho_mqtt::CreateOptionsBuilder::new()
            .server_uri(config.host.clone())
            .client_id(config.client_id.clone())
            .finalize();
        let client = paho_mqtt::AsyncClient::new(create_opts).map_err(|source| Error::Connect {
            uri: config.host.clone(),
            source,
        })?;

        let options = {
            let mut builder = paho_mqtt::ConnectOptionsBuilder::new();
            builder.keep_alive_interval(KEEP_ALIVE).clean_session(true);
            if let Some(username) = &config.username {
                builder.user_name(username.clone());
            }
            if let Some(password) = &config.password {
                builder.password(password.clone());
            }
            builder.finalize()
        };

        client
            .connect(options)
            .await
            .map_err(|source| Error::Connect {
                uri: config.host.clone(),
                source,
            })?;
        info!(uri = %config.host, client_id = %config.client_id, "connected to broker");

        Ok(Self {
            client,
            uri: config.host.clone(),
        })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub async fn disconnect(&self) {
        match self.client.disconnect(None).await {
            Ok(_) => info!(uri = %self.uri, "disconnected from broker"),
            Err(err) => warn!(uri = %self.uri, error = %err, "disconnect failed"),
        }
    }
}

impl Publish for MqttPublisher {
    fn publish(&self, message: Message) -> impl Future<Output = Result<()>> + Send {
        let token = self.client.publish(to_paho(&message));
        let topic = message.topic;
        async move {
            token.await.map_err(|source| Error::Publish {
                topic: topic.clone(),
                source: Box::new(source),
            })?;
            debug!(%topic, "delivered");
            Ok(())
        }
    }
}

fn to_paho(message: &Message) -> paho_mqtt::Message {
    paho_mqtt::MessageBuilder::new()
        .topic(message.topic.clone())
        .payload(message.payload.to_string())
        .qos(i32::from(u8::from(message.qos)))
        .retained(message.retain)
        .finalize()
}
