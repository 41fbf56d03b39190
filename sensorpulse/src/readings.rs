//! Simulated sensor readings. Temperatures fall in `20.1..=21.0` in steps of
//! 0.1 and energy in `101..=110`.
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::prelude::*;

const BASE_TEMP: f64 = 20.0;
const BASE_ENERGY: u32 = 100;

fn step<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    rng.gen_range(1..=10)
}

fn sample_temp<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    BASE_TEMP + f64::from(step(rng)) / 10.0
}

/// Average temperature and energy use for a floor, sent as structured text.
#[derive(Debug, Clone, Copy, PartialEq, Telemetry)]
#[telemetry(topic = "/home/floor1/average")]
pub struct FloorAverage {
    pub temp: f64,
    pub energy: u32,
}

impl FloorAverage {
    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let temp = sample_temp(rng);
        let energy = BASE_ENERGY + step(rng);
        Self { temp, energy }
    }
}

impl ToPayload for FloorAverage {
    fn to_payload(&self) -> Payload {
        Payload::Text(format!("{{ temp: {}, energy: {}}}", self.temp, self.energy))
    }
}

/// Current kitchen temperature, sent as a bare number.
#[derive(Debug, Clone, Copy, PartialEq, Telemetry)]
#[telemetry(topic = "home/kitchen/current")]
pub struct KitchenCurrent(pub f64);

impl KitchenCurrent {
    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(sample_temp(rng))
    }
}

impl ToPayload for KitchenCurrent {
    fn to_payload(&self) -> Payload {
        Payload::Number(self.0)
    }
}

/// Which reading a scenario samples on each iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reading {
    FloorAverage,
    KitchenCurrent,
}

impl Reading {
    pub fn topic(&self) -> &'static str {
        match self {
            Reading::FloorAverage => FloorAverage::TOPIC,
            Reading::KitchenCurrent => KitchenCurrent::TOPIC,
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Payload {
        match self {
            Reading::FloorAverage => FloorAverage::sample(rng).to_payload(),
            Reading::KitchenCurrent => KitchenCurrent::sample(rng).to_payload(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn in_temp_band(temp: f64) -> bool {
        (20.1 - 1e-9..=21.0 + 1e-9).contains(&temp)
    }

    #[test]
    fn test_floor_average_stays_in_band() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let reading = FloorAverage::sample(&mut rng);
            assert!(in_temp_band(reading.temp), "temp out of band: {}", reading.temp);
            assert!((101..=110).contains(&reading.energy), "energy out of band: {}", reading.energy);
        }
    }

    #[test]
    fn test_kitchen_current_covers_band() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..1000 {
            let KitchenCurrent(temp) = KitchenCurrent::sample(&mut rng);
            assert!(in_temp_band(temp));
            seen.insert(Payload::Number(temp).to_string());
        }
        assert_eq!(seen.len(), 10);
        assert!(seen.contains("20.1"));
        assert!(seen.contains("21"));
    }

    #[test]
    fn test_floor_average_payload_format() {
        let reading = FloorAverage { temp: 20.3, energy: 105 };
        assert_eq!(reading.to_payload(), Payload::Text("{ temp: 20.3, energy: 105}".to_string()));
    }

    #[test]
    fn test_derived_telemetry_flags() {
        let message = KitchenCurrent(20.8).message();
        assert_eq!(message.topic, "home/kitchen/current");
        assert_eq!(message.payload, Payload::Number(20.8));
        assert_eq!(message.qos, QoS::AtMostOnce);
        assert!(!message.retain);
        assert_eq!(FloorAverage::TOPIC, "/home/floor1/average");
    }

    #[test]
    fn test_reading_selector() {
        let reading: Reading = serde_json::from_str("\"kitchen_current\"").unwrap();
        assert_eq!(reading, Reading::KitchenCurrent);
        assert_eq!(reading.topic(), "home/kitchen/current");

        let mut rng = StdRng::seed_from_u64(3);
        match Reading::FloorAverage.sample(&mut rng) {
            Payload::Text(text) => assert!(text.starts_with("{ temp: 2") && text.ends_with('}')),
            other => panic!("unexpected payload {:?}", other),
        }
    }
}
