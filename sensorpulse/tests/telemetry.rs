use std::sync::Arc;
use std::time::Duration;

use sensorpulse::prelude::*;

#[derive(Debug, Telemetry)]
#[telemetry(topic = "home/garden/humidity", qos = 2, retain = true)]
struct GardenHumidity {
    percent: u8,
}

impl ToPayload for GardenHumidity {
    fn to_payload(&self) -> Payload {
        Payload::Text(format!("{}%", self.percent))
    }
}

#[tokio::test]
async fn test_derived_reading_publishes_with_its_flags() {
    let publisher = RecordingPublisher::new();
    GardenHumidity { percent: 64 }
        .publish_to(&publisher)
        .await
        .unwrap();

    let messages = publisher.messages();
    assert_eq!(
        messages,
        vec![Message::new("home/garden/humidity", "64%", QoS::ExactlyOnce, true)]
    );
}

#[tokio::test]
async fn test_builtin_readings_publish_to_their_topics() {
    let publisher = RecordingPublisher::new();
    FloorAverage { temp: 20.6, energy: 108 }
        .publish_to(&publisher)
        .await
        .unwrap();
    KitchenCurrent(21.0).publish_to(&publisher).await.unwrap();

    let messages = publisher.messages();
    assert_eq!(messages[0].topic, "/home/floor1/average");
    assert_eq!(messages[0].payload.to_string(), "{ temp: 20.6, energy: 108}");
    assert_eq!(messages[1].topic, "home/kitchen/current");
    assert_eq!(messages[1].payload.to_string(), "21");
}

#[tokio::test(start_paused = true)]
async fn test_both_builtin_scenarios_run_side_by_side() {
    let publisher = RecordingPublisher::new();
    let manager = ScenarioManager::with_builtin(Arc::new(publisher.clone()));

    let floor = manager.start("floor1").unwrap();
    let kitchen = manager.start("kitchen").unwrap();

    let floor = floor.await.unwrap().unwrap();
    assert!(floor.succeeded());
    // the kitchen's ten second gap keeps it running after floor1 is done
    assert_eq!(manager.state("kitchen"), Some(ScenarioState::Running));

    let kitchen = kitchen.await.unwrap().unwrap();
    assert!(kitchen.succeeded());
    assert_eq!(publisher.messages_on("/home/floor1/average").len(), 20);
    assert_eq!(publisher.messages_on("home/kitchen/current").len(), 20);
}

#[tokio::test(start_paused = true)]
async fn test_stop_signal_interrupts_pause() {
    let (handle, mut signal) = StopSignal::channel();
    let pause = tokio::spawn(async move { signal.pause(Duration::from_secs(60)).await });

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(!handle.is_stopped());
    handle.stop();

    assert!(pause.await.unwrap().is_err());
    assert!(handle.is_stopped());
}

/// Needs a broker, e.g. `MQTT_HOST=tcp://localhost:1883 cargo test -- --ignored`.
#[cfg(feature = "mqtt")]
#[tokio::test]
#[ignore]
async fn test_publish_to_broker() {
    let config = BrokerConfig::from_env().unwrap();
    let publisher = MqttPublisher::connect(&config).await.unwrap();
    KitchenCurrent(20.5).publish_to(&publisher).await.unwrap();
    publisher.disconnect().await;

    let result = FloorAverage { temp: 20.1, energy: 101 }.publish().await;
    assert!(result.is_ok());
}
