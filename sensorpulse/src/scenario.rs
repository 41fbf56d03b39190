use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::readings::Reading;
use crate::{Message, Publish, QoS};

const DEFAULT_ITERATIONS: u32 = 20;
const DEFAULT_INTERVAL_MS: u64 = 1000;

fn default_iterations() -> u32 {
    DEFAULT_ITERATIONS
}

fn default_interval_ms() -> u64 {
    DEFAULT_INTERVAL_MS
}

/// One extra pause taken after the publish of iteration `at_iteration`
/// (zero based), before the regular interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongPause {
    pub at_iteration: u32,
    pub duration_ms: u64,
}

impl LongPause {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

/// A publish loop: sample a reading, publish it, pause, repeat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    pub reading: Reading,
    /// Overrides the reading's own topic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_pause: Option<LongPause>,
    #[serde(default)]
    pub qos: QoS,
    #[serde(default)]
    pub retain: bool,
}

impl Scenario {
    pub fn new(name: impl Into<String>, reading: Reading) -> Self {
        Self {
            name: name.into(),
            reading,
            topic: None,
            iterations: DEFAULT_ITERATIONS,
            interval_ms: DEFAULT_INTERVAL_MS,
            long_pause: None,
            qos: QoS::AtMostOnce,
            retain: false,
        }
    }

    /// Floor averages as structured text on `/home/floor1/average`.
    pub fn floor1() -> Self {
        Self::new("floor1", Reading::FloorAverage)
    }

    /// Bare kitchen temperatures on `home/kitchen/current`, with a ten
    /// second gap after the eleventh reading.
    pub fn kitchen() -> Self {
        Self {
            long_pause: Some(LongPause {
                at_iteration: 10,
                duration_ms: 10_000,
            }),
            ..Self::new("kitchen", Reading::KitchenCurrent)
        }
    }

    pub fn builtin() -> Vec<Self> {
        vec![Self::floor1(), Self::kitchen()]
    }

    /// Loads a scenario from a JSON file. Without a `name` field the file
    /// stem is used.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ReadScenario {
            path: path.to_path_buf(),
            source,
        })?;
        let mut scenario: Scenario =
            serde_json::from_str(&content).map_err(|source| Error::ParseScenario {
                path: path.to_path_buf(),
                source,
            })?;
        if scenario.name.is_empty() {
            scenario.name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        Ok(scenario)
    }

    pub fn topic(&self) -> &str {
        self.topic.as_deref().unwrap_or_else(|| self.reading.topic())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Runs the loop to the end or until `stop` interrupts a pause.
    /// A failed publish ends the run with an error.
    #[tracing::instrument(name = "scenario", skip_all, fields(scenario = %self.name))]
    pub async fn run<P, R>(
        &self,
        publisher: &P,
        rng: &mut R,
        stop: &mut StopSignal,
    ) -> Result<RunOutcome>
    where
        P: Publish + ?Sized,
        R: Rng + ?Sized,
    {
        let topic = self.topic();
        info!(iterations = self.iterations, topic, "starting");

        let mut published = 0;
        for iteration in 0..self.iterations {
            let payload = self.reading.sample(rng);
            debug!(iteration, %payload, "publishing");
            publisher
                .publish(Message::new(topic, payload, self.qos, self.retain))
                .await?;
            published += 1;

            if let Some(long_pause) = self.long_pause.filter(|p| p.at_iteration == iteration) {
                if stop.pause(long_pause.duration()).await.is_err() {
                    warn!(published, "interrupted");
                    return Ok(RunOutcome::Interrupted { published });
                }
            }

            if stop.pause(self.interval()).await.is_err() {
                warn!(published, "interrupted");
                return Ok(RunOutcome::Interrupted { published });
            }
        }

        info!(published, "finished");
        Ok(RunOutcome::Completed { published })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed { published: u32 },
    Interrupted { published: u32 },
}

impl RunOutcome {
    /// `true` only when no pause was interrupted.
    pub fn succeeded(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }

    pub fn published(&self) -> u32 {
        match self {
            RunOutcome::Completed { published } | RunOutcome::Interrupted { published } => {
                *published
            }
        }
    }
}

/// Returned by [`StopSignal::pause`] when a stop was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupted;

/// Requests a running scenario to stop.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

/// The scenario's side of a stop channel.
#[derive(Debug, Clone)]
pub struct StopSignal {
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    pub fn channel() -> (StopHandle, StopSignal) {
        let (tx, rx) = watch::channel(false);
        (StopHandle { tx: Arc::new(tx) }, StopSignal { rx })
    }

    /// A signal nobody can raise.
    pub fn never() -> Self {
        let (_, signal) = Self::channel();
        signal
    }

    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Sleeps for `duration` unless a stop is requested first.
    pub async fn pause(&mut self, duration: Duration) -> Result<(), Interrupted> {
        if self.is_stopped() {
            return Err(Interrupted);
        }

        let sleep = tokio::time::sleep(duration);
        tokio::pin!(sleep);

        let stop_requested = tokio::select! {
            _ = &mut sleep => return Ok(()),
            res = self.rx.wait_for(|stopped| *stopped) => res.is_ok(),
        };
        if stop_requested {
            return Err(Interrupted);
        }

        // all handles dropped
        sleep.await;
        Ok(())
    }
}
