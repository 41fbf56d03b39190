use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use tokio::task::JoinHandle;
use sensorpulse::prelude::*;
use tracing::{error, info, warn};

#[derive(Args)]
pub struct ListCommand {
    /// Directory with additional scenario files (*.json)
    #[arg(long, short = 'd')]
    pub scenario_dir: Option<PathBuf>,
}

impl ListCommand {
    pub fn execute(&self) -> Result<()> {
        let mut manager = ScenarioManager::with_builtin(Arc::new(RecordingPublisher::new()));
        load_scenarios(&mut manager, self.scenario_dir.as_deref())?;

        for name in manager.names() {
            if let Some(scenario) = manager.get(&name) {
                println!("{}", describe(scenario));
            }
        }
        Ok(())
    }
}

#[derive(Args)]
pub struct RunCommand {
    /// Scenarios to run (default: all known scenarios)
    pub names: Vec<String>,

    /// Directory with additional scenario files (*.json)
    #[arg(long, short = 'd')]
    pub scenario_dir: Option<PathBuf>,

    /// Log messages instead of publishing them to the broker
    #[arg(long)]
    pub dry_run: bool,

    /// Seed for reproducible readings
    #[arg(long)]
    pub seed: Option<u64>,
}

impl RunCommand {
    /// Returns `true` when every scenario ran to the end.
    pub async fn execute(&self) -> Result<bool> {
        if self.dry_run {
            return self.run_with(Arc::new(RecordingPublisher::new())).await;
        }

        let config = BrokerConfig::from_env().context("broker configuration")?;
        let publisher = MqttPublisher::connect(&config)
            .await
            .with_context(|| format!("connecting to {}", config.host))?;
        let publisher = Arc::new(publisher);
        let result = self.run_with(Arc::clone(&publisher)).await;
        publisher.disconnect().await;
        result
    }

    pub async fn run_with<P>(&self, publisher: Arc<P>) -> Result<bool>
    where
        P: Publish + Send + Sync + 'static,
    {
        let mut manager = ScenarioManager::with_builtin(publisher);
        if let Some(seed) = self.seed {
            manager = manager.with_seed(seed);
        }
        load_scenarios(&mut manager, self.scenario_dir.as_deref())?;

        let mut names = if self.names.is_empty() {
            manager.names()
        } else {
            self.names.clone()
        };
        let mut seen = HashSet::new();
        names.retain(|name| seen.insert(name.clone()));
        for name in &names {
            if manager.get(name).is_none() {
                bail!("unknown scenario '{}', see `simclient list`", name);
            }
        }

        let mut tasks = Vec::with_capacity(names.len());
        for name in names {
            match manager.start(&name) {
                Ok(task) => tasks.push((name, task)),
                Err(err) => {
                    manager.stop_all();
                    return Err(err.into());
                }
            }
        }

        Ok(supervise(&manager, join_all(tasks), tokio::signal::ctrl_c()).await)
    }
}

/// Waits for `all_done`. A successful `interrupt` stops every scenario
/// first; a failed one only means runs cannot be interrupted.
async fn supervise<P: Publish>(
    manager: &ScenarioManager<P>,
    all_done: impl Future<Output = bool>,
    interrupt: impl Future<Output = std::io::Result<()>>,
) -> bool {
    tokio::pin!(all_done);

    tokio::select! {
        all_succeeded = &mut all_done => all_succeeded,
        signal = interrupt => {
            match signal {
                Ok(()) => {
                    warn!("interrupt received, stopping scenarios");
                    manager.stop_all();
                }
                Err(err) => warn!(error = %err, "cannot listen for interrupts"),
            }
            all_done.await
        }
    }
}

async fn join_all(tasks: Vec<(String, JoinHandle<sensorpulse::Result<RunOutcome>>)>) -> bool {
    let mut all_succeeded = true;
    for (name, task) in tasks {
        match task.await {
            Ok(Ok(outcome)) => {
                info!(scenario = %name, published = outcome.published(), succeeded = outcome.succeeded(), "done");
                all_succeeded &= outcome.succeeded();
            }
            Ok(Err(err)) => {
                error!(scenario = %name, error = %err, "scenario failed");
                all_succeeded = false;
            }
            Err(err) => {
                error!(scenario = %name, error = %err, "scenario task panicked");
                all_succeeded = false;
            }
        }
    }
    all_succeeded
}

fn load_scenarios<P: Publish>(manager: &mut ScenarioManager<P>, dir: Option<&Path>) -> Result<()> {
    if let Some(dir) = dir {
        let names = manager
            .load_dir(dir)
            .with_context(|| format!("loading scenarios from {}", dir.display()))?;
        info!(count = names.len(), dir = %dir.display(), "loaded scenarios");
    }
    Ok(())
}

fn describe(scenario: &Scenario) -> String {
    let mut line = format!(
        "{:<16} {:<24} {} x every {}ms, qos {}{}",
        scenario.name,
        scenario.topic(),
        scenario.iterations,
        scenario.interval_ms,
        u8::from(scenario.qos),
        if scenario.retain { ", retained" } else { "" },
    );
    if let Some(long_pause) = &scenario.long_pause {
        line.push_str(&format!(
            ", {}ms pause after #{}",
            long_pause.duration_ms,
            long_pause.at_iteration + 1
        ));
    }
    line
}
