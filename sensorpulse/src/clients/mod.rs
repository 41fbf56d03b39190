#[cfg(feature = "mqtt")]
pub mod mqtt;
pub mod recording;
