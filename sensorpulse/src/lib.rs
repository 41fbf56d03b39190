//! This crate simulates periodic sensor telemetry published over MQTT.
//! A scenario loops a fixed number of times, samples a reading in a narrow
//! sensor band, publishes it and pauses. Stopping a scenario interrupts its
//! pause and ends the loop early.
//! Adding sensorpulse to your project is as simple as adding the following to your Cargo.toml
//! ```toml
//! [dependencies]
//! sensorpulse = { version = "0.1.0", features = ["mqtt"] }
//! ```
extern crate self as sensorpulse;

use std::future::Future;

pub mod clients;
pub mod config;
pub mod error;
pub mod manager;
pub mod message;
pub mod readings;
pub mod scenario;

pub use error::{Error, Result};
pub use message::{Message, Payload, QoS};

/// The publish capability scenarios run against:
/// `publish(topic, payload, qos, retain)`.
/// # Example:
/// ```
/// use sensorpulse::prelude::*;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let publisher = RecordingPublisher::new();
/// let message = Message::new("home/kitchen/current", 20.4, QoS::AtMostOnce, false);
/// publisher.publish(message).await.unwrap();
/// assert_eq!(publisher.messages().len(), 1);
/// # }
/// ```
pub trait Publish {
    fn publish(&self, message: Message) -> impl Future<Output = Result<()>> + Send;
}

/// Turns a reading into the body of its message.
pub trait ToPayload {
    fn to_payload(&self) -> Payload;
}

/// A reading bound to the topic, QoS and retain flag it is published with.
/// Usually derived:
/// ```
/// use sensorpulse::prelude::*;
///
/// #[derive(Telemetry)]
/// #[telemetry(topic = "home/garage/current", qos = 1)]
/// struct GarageCurrent(f64);
///
/// impl ToPayload for GarageCurrent {
///     fn to_payload(&self) -> Payload {
///         Payload::Number(self.0)
///     }
/// }
///
/// let message = GarageCurrent(18.5).message();
/// assert_eq!(message.topic, "home/garage/current");
/// assert_eq!(message.qos, QoS::AtLeastOnce);
/// assert!(!message.retain);
/// ```
///
/// The topic is required:
/// ```compile_fail
/// use sensorpulse::prelude::*;
///
/// #[derive(Telemetry)]
/// struct Untitled(f64);
///
/// impl ToPayload for Untitled {
///     fn to_payload(&self) -> Payload {
///         Payload::Number(self.0)
///     }
/// }
/// ```
///
/// QoS must be 0, 1 or 2:
/// ```compile_fail
/// use sensorpulse::prelude::*;
///
/// #[derive(Telemetry)]
/// #[telemetry(topic = "home/garage/current", qos = 3)]
/// struct GarageCurrent(f64);
///
/// impl ToPayload for GarageCurrent {
///     fn to_payload(&self) -> Payload {
///         Payload::Number(self.0)
///     }
/// }
/// ```
///
/// Unknown keys are rejected:
/// ```compile_fail
/// use sensorpulse::prelude::*;
///
/// #[derive(Telemetry)]
/// #[telemetry(topic = "home/garage/current", interval = 5)]
/// struct GarageCurrent(f64);
///
/// impl ToPayload for GarageCurrent {
///     fn to_payload(&self) -> Payload {
///         Payload::Number(self.0)
///     }
/// }
/// ```
pub trait Telemetry: ToPayload {
    const TOPIC: &'static str;
    const QOS: QoS;
    const RETAIN: bool;

    fn message(&self) -> Message {
        Message::new(Self::TOPIC, self.to_payload(), Self::QOS, Self::RETAIN)
    }

    fn publish_to<P: Publish + ?Sized>(
        &self,
        publisher: &P,
    ) -> impl Future<Output = Result<()>> + Send {
        publisher.publish(self.message())
    }

    /// Publishes through the process-wide MQTT client, connecting it from
    /// the environment on first use.
    #[cfg(feature = "mqtt")]
    fn publish(&self) -> impl Future<Output = Result<()>> + Send {
        let message = self.message();
        async move {
            clients::mqtt::shared_client()
                .await?
                .publish(message)
                .await
        }
    }
}

// prelude
pub mod prelude {
    #[cfg(feature = "mqtt")]
    pub use super::clients::mqtt::{MqttPublisher, MQTTCLIENT};
    pub use super::clients::recording::RecordingPublisher;
    pub use super::config::BrokerConfig;
    pub use super::manager::{ScenarioManager, ScenarioState};
    pub use super::readings::{FloorAverage, KitchenCurrent, Reading};
    pub use super::scenario::{RunOutcome, Scenario, StopHandle, StopSignal};
    pub use super::Error;
    pub use super::Message;
    pub use super::Payload;
    pub use super::Publish;
    pub use super::QoS;
    pub use super::Telemetry;
    pub use super::ToPayload;

    // re-exports
    #[cfg(feature = "mqtt")]
    pub use paho_mqtt;
    pub use sensorpulse_derive::Telemetry;
    pub use serde::{Deserialize, Serialize};
    pub use serde_json;
}
