use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::task::JoinHandle;
use tracing::{info, info_span, warn, Instrument};

use crate::error::{Error, Result};
use crate::scenario::{RunOutcome, Scenario, StopHandle, StopSignal};
use crate::{Message, Publish};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioState {
    NotStarted,
    Running,
    /// Interrupted by a stop request.
    Stopped,
    Finished,
    Failed,
}

struct Entry {
    scenario: Scenario,
    state: Mutex<ScenarioState>,
    published: AtomicU32,
    stop: Mutex<Option<StopHandle>>,
}

impl Entry {
    fn new(scenario: Scenario) -> Self {
        Self {
            scenario,
            state: Mutex::new(ScenarioState::NotStarted),
            published: AtomicU32::new(0),
            stop: Mutex::new(None),
        }
    }

    fn state(&self) -> ScenarioState {
        *lock(&self.state)
    }

    /// Marks the entry as running and hands out the guard and signal for
    /// this run.
    fn begin(self: &Arc<Self>) -> Result<(RunGuard, StopSignal)> {
        let mut state = lock(&self.state);
        if *state == ScenarioState::Running {
            return Err(Error::AlreadyRunning(self.scenario.name.clone()));
        }
        *state = ScenarioState::Running;
        self.published.store(0, Ordering::SeqCst);

        let (handle, signal) = StopSignal::channel();
        *lock(&self.stop) = Some(handle);
        let guard = RunGuard {
            entry: Arc::clone(self),
            finished: false,
        };
        Ok((guard, signal))
    }

    fn finish(&self, state: ScenarioState) {
        lock(&self.stop).take();
        *lock(&self.state) = state;
    }
}

/// Leaves the entry `Stopped` when a run is dropped before it finishes,
/// e.g. a cancelled `run` future or an aborted task.
struct RunGuard {
    entry: Arc<Entry>,
    finished: bool,
}

impl RunGuard {
    fn finish(mut self, state: ScenarioState) {
        self.entry.finish(state);
        self.finished = true;
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if !self.finished {
            warn!(scenario = %self.entry.scenario.name, "run dropped before it finished");
            self.entry.finish(ScenarioState::Stopped);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Counts successful publishes of a single run.
struct Counting<'a, P: ?Sized> {
    inner: &'a P,
    count: &'a AtomicU32,
}

impl<P: Publish + ?Sized> Publish for Counting<'_, P> {
    fn publish(&self, message: Message) -> impl Future<Output = Result<()>> + Send {
        let delivery = self.inner.publish(message);
        let count = self.count;
        async move {
            delivery.await?;
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}

/// Named scenarios sharing one publisher. Each scenario runs at most once
/// at a time and keeps the state of its latest run.
pub struct ScenarioManager<P> {
    publisher: Arc<P>,
    scenarios: BTreeMap<String, Arc<Entry>>,
    seed: Option<u64>,
}

impl<P: Publish> ScenarioManager<P> {
    pub fn new(publisher: Arc<P>) -> Self {
        Self {
            publisher,
            scenarios: BTreeMap::new(),
            seed: None,
        }
    }

    /// A manager holding `floor1` and `kitchen`.
    pub fn with_builtin(publisher: Arc<P>) -> Self {
        let mut manager = Self::new(publisher);
        for scenario in Scenario::builtin() {
            manager
                .scenarios
                .insert(scenario.name.clone(), Arc::new(Entry::new(scenario)));
        }
        manager
    }

    /// Every run starts its random source from `seed`.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn publisher(&self) -> &Arc<P> {
        &self.publisher
    }

    /// Registers a scenario under its name, replacing any previous one that
    /// is not running.
    pub fn add(&mut self, scenario: Scenario) -> Result<()> {
        if let Some(existing) = self.scenarios.get(&scenario.name) {
            if existing.state() == ScenarioState::Running {
                return Err(Error::AlreadyRunning(scenario.name));
            }
        }
        info!(scenario = %scenario.name, "adding scenario");
        self.scenarios
            .insert(scenario.name.clone(), Arc::new(Entry::new(scenario)));
        Ok(())
    }

    /// Adds every `*.json` scenario in `dir` and returns their names.
    pub fn load_dir(&mut self, dir: &Path) -> Result<Vec<String>> {
        let read_error = |source| Error::ReadScenario {
            path: dir.to_path_buf(),
            source,
        };
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(read_error)? {
            let path = entry.map_err(read_error)?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut names = Vec::with_capacity(paths.len());
        for path in paths {
            let scenario = Scenario::load(&path)?;
            names.push(scenario.name.clone());
            self.add(scenario)?;
        }
        if names.is_empty() {
            warn!(dir = %dir.display(), "no scenario files found");
        }
        Ok(names)
    }

    pub fn names(&self) -> Vec<String> {
        self.scenarios.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&Scenario> {
        self.scenarios.get(name).map(|entry| &entry.scenario)
    }

    pub fn state(&self, name: &str) -> Option<ScenarioState> {
        self.scenarios.get(name).map(|entry| entry.state())
    }

    /// Messages published by the current or latest run.
    pub fn published(&self, name: &str) -> Option<u32> {
        self.scenarios
            .get(name)
            .map(|entry| entry.published.load(Ordering::SeqCst))
    }

    pub fn any_running(&self) -> bool {
        self.scenarios
            .values()
            .any(|entry| entry.state() == ScenarioState::Running)
    }

    /// Runs a scenario on the current task until it finishes or is stopped.
    pub async fn run(&self, name: &str) -> Result<RunOutcome> {
        let (guard, signal) = self.entry(name)?.begin()?;
        execute(guard, Arc::clone(&self.publisher), signal, self.rng()).await
    }

    /// Runs a scenario on its own task.
    pub fn start(&self, name: &str) -> Result<JoinHandle<Result<RunOutcome>>>
    where
        P: Send + Sync + 'static,
    {
        let (guard, signal) = self.entry(name)?.begin()?;
        let publisher = Arc::clone(&self.publisher);
        let rng = self.rng();
        Ok(tokio::spawn(execute(guard, publisher, signal, rng)))
    }

    /// Requests a stop. Returns `false` when the scenario was not running.
    pub fn stop(&self, name: &str) -> Result<bool> {
        let entry = self.entry(name)?;
        let stopped = match lock(&entry.stop).as_ref() {
            Some(handle) => {
                handle.stop();
                true
            }
            None => false,
        };
        if stopped {
            info!(scenario = name, "stop requested");
        }
        Ok(stopped)
    }

    pub fn stop_all(&self) {
        for (name, entry) in &self.scenarios {
            if let Some(handle) = lock(&entry.stop).as_ref() {
                info!(scenario = %name, "stop requested");
                handle.stop();
            }
        }
    }

    fn entry(&self, name: &str) -> Result<Arc<Entry>> {
        self.scenarios
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownScenario(name.to_string()))
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

async fn execute<P: Publish + ?Sized>(
    guard: RunGuard,
    publisher: Arc<P>,
    mut signal: StopSignal,
    mut rng: StdRng,
) -> Result<RunOutcome> {
    let entry = Arc::clone(&guard.entry);
    let run_id = uuid::Uuid::new_v4();
    let counting = Counting {
        inner: &*publisher,
        count: &entry.published,
    };

    let result = entry
        .scenario
        .run(&counting, &mut rng, &mut signal)
        .instrument(info_span!("run", %run_id))
        .await;

    let state = match &result {
        Ok(RunOutcome::Completed { .. }) => ScenarioState::Finished,
        Ok(RunOutcome::Interrupted { .. }) => ScenarioState::Stopped,
        Err(err) => {
            warn!(scenario = %entry.scenario.name, %run_id, error = %err, "scenario failed");
            ScenarioState::Failed
        }
    };
    guard.finish(state);
    result
}
