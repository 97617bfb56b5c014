//! Per-document analysis scheduling.
//!
//! Every key moves through `Idle → Debouncing → Queued → Running` and back
//! to `Idle`, or to `Queued` again when requests arrived mid-run. Requests
//! made while a run is in flight collapse into a single rerun that uses the
//! most recent task.
//!
//! Timers are spawned tasks that race `sleep` against a cancellation token.
//! Runs take a permit from a FIFO-fair semaphore, so at most
//! `max_concurrent_analyses` tasks run at once and waiters start in arrival
//! order.
//!
//! All methods that arm timers must be called from within a Tokio runtime.

use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::options::SchedulerConfig;

type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type AnalysisTask = Box<dyn FnOnce() -> BoxFuture + Send>;

/// Where a key is in its analysis lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalysisPhase {
    #[default]
    Idle,
    /// Timer armed
    Debouncing,
    /// Waiting for a concurrency slot
    Queued,
    Running,
}

/// One scheduling request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleRequest {
    /// Document version the task will analyze
    pub version: u64,
    /// Skip the debounce delay unless the key is throttled
    pub immediate: bool,
    /// Lower bound on the timer delay
    pub min_delay: Duration,
}

impl ScheduleRequest {
    pub fn debounced(version: u64) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }

    pub fn immediate(version: u64) -> Self {
        Self {
            version,
            immediate: true,
            ..Self::default()
        }
    }

    pub fn with_min_delay(mut self, delay: Duration) -> Self {
        self.min_delay = delay;
        self
    }
}

#[derive(Default)]
struct KeyState {
    phase: AnalysisPhase,
    timer: Option<CancellationToken>,
    /// Bumped on every arm so a superseded timer cannot fire
    generation: u64,
    task: Option<(AnalysisTask, u64)>,
    pending_rerun: Option<(AnalysisTask, u64)>,
    cancelled: bool,
    last_completed: Option<Instant>,
    last_version: Option<u64>,
}

impl fmt::Debug for KeyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyState")
            .field("phase", &self.phase)
            .field("generation", &self.generation)
            .field("has_task", &self.task.is_some())
            .field("has_rerun", &self.pending_rerun.is_some())
            .field("cancelled", &self.cancelled)
            .field("last_version", &self.last_version)
            .finish()
    }
}

#[derive(Debug)]
struct State<K> {
    keys: FxHashMap<K, KeyState>,
    disposed: bool,
}

#[derive(Debug)]
struct Shared<K> {
    config: SchedulerConfig,
    state: Mutex<State<K>>,
    slots: Semaphore,
    shutdown: CancellationToken,
}

/// Debounces, throttles and serializes analysis runs per key.
#[derive(Debug)]
pub struct AnalysisScheduler<K> {
    shared: Arc<Shared<K>>,
}

impl<K> Clone for AnalysisScheduler<K> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<K> AnalysisScheduler<K>
where
    K: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static,
{
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(State {
                    keys: FxHashMap::default(),
                    disposed: false,
                }),
                slots: Semaphore::new(config.max_concurrent_analyses.max(1)),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn config(&self) -> SchedulerConfig {
        self.shared.config
    }

    /// Request a run of `task` for `key`.
    ///
    /// Returns `false` when the request was dropped: the scheduler is
    /// disposed, or the same version already completed less than
    /// `min_analysis_interval` ago and the request is not immediate.
    pub fn schedule<F, Fut>(&self, key: K, request: ScheduleRequest, task: F) -> bool
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let task: AnalysisTask = Box::new(move || Box::pin(task()) as BoxFuture);
        let config = self.shared.config;

        let mut state = self.shared.state.lock();
        if state.disposed {
            debug!("[SCHEDULER] {key:?}: request after dispose dropped");
            return false;
        }
        let entry = state.keys.entry(key.clone()).or_default();

        match entry.phase {
            AnalysisPhase::Running => {
                trace!("[SCHEDULER] {key:?}: running, rerun v{} queued", request.version);
                entry.pending_rerun = Some((task, request.version));
                entry.cancelled = false;
                return true;
            }
            AnalysisPhase::Queued => {
                trace!("[SCHEDULER] {key:?}: queued task replaced by v{}", request.version);
                entry.task = Some((task, request.version));
                return true;
            }
            AnalysisPhase::Idle | AnalysisPhase::Debouncing => {}
        }

        let throttle_remaining = entry.last_completed.and_then(|at| {
            let elapsed = Instant::now().saturating_duration_since(at);
            config.min_analysis_interval.checked_sub(elapsed)
        }).filter(|remaining| !remaining.is_zero());

        if throttle_remaining.is_some()
            && !request.immediate
            && entry.last_version == Some(request.version)
        {
            debug!("[SCHEDULER] {key:?}: v{} unchanged since last run, dropped", request.version);
            return false;
        }

        let delay = match throttle_remaining {
            None if request.immediate => Duration::ZERO,
            remaining => config.debounce_delay.max(remaining.unwrap_or_default()),
        }
        .max(request.min_delay);

        if let Some(old) = entry.timer.take() {
            old.cancel();
        }
        let token = self.shared.shutdown.child_token();
        entry.timer = Some(token.clone());
        entry.generation += 1;
        entry.task = Some((task, request.version));
        entry.phase = AnalysisPhase::Debouncing;
        let generation = entry.generation;
        drop(state);

        trace!("[SCHEDULER] {key:?}: v{} armed for {delay:?}", request.version);
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            if shared.mark_queued(&key, generation) {
                shared.drive(key).await;
            }
        });
        true
    }

    /// Stop pending work for `key`.
    ///
    /// An armed timer and any pending rerun are discarded. A run already in
    /// flight is left to finish but will not trigger a rerun.
    pub fn cancel(&self, key: &K) {
        let mut state = self.shared.state.lock();
        let Some(entry) = state.keys.get_mut(key) else {
            return;
        };
        if let Some(timer) = entry.timer.take() {
            timer.cancel();
        }
        entry.pending_rerun = None;

        if entry.phase == AnalysisPhase::Running {
            entry.cancelled = true;
        } else {
            state.keys.remove(key);
        }
        trace!("[SCHEDULER] {key:?}: cancelled");
    }

    /// Drop all timers, waiters and bookkeeping. Later requests are refused.
    pub fn dispose(&self) {
        self.shared.shutdown.cancel();
        self.shared.slots.close();
        let mut state = self.shared.state.lock();
        state.disposed = true;
        state.keys.clear();
        debug!("[SCHEDULER] disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.state.lock().disposed
    }

    pub fn phase(&self, key: &K) -> AnalysisPhase {
        self.shared
            .state
            .lock()
            .keys
            .get(key)
            .map(|entry| entry.phase)
            .unwrap_or_default()
    }

    /// Number of keys with live scheduling state.
    pub fn tracked_keys(&self) -> usize {
        self.shared.state.lock().keys.len()
    }
}

impl<K> Shared<K>
where
    K: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static,
{
    /// Timer fired: move to `Queued` unless superseded.
    fn mark_queued(&self, key: &K, generation: u64) -> bool {
        let mut state = self.state.lock();
        let Some(entry) = state.keys.get_mut(key) else {
            return false;
        };
        if entry.generation != generation || entry.phase != AnalysisPhase::Debouncing {
            return false;
        }
        entry.timer = None;
        entry.phase = AnalysisPhase::Queued;
        true
    }

    async fn drive(self: Arc<Self>, key: K) {
        loop {
            let Ok(permit) = self.slots.acquire().await else {
                trace!("[SCHEDULER] {key:?}: slots closed");
                return;
            };
            let Some((task, version)) = self.begin_run(&key) else {
                return;
            };

            let mut guard = RunGuard {
                shared: &*self,
                key: &key,
                finished: false,
            };
            task().await;
            let rerun = guard.finish(version);
            drop(permit);

            if !rerun {
                return;
            }
        }
    }

    fn begin_run(&self, key: &K) -> Option<(AnalysisTask, u64)> {
        let mut state = self.state.lock();
        if state.disposed {
            return None;
        }
        let entry = state.keys.get_mut(key)?;
        if entry.phase != AnalysisPhase::Queued {
            return None;
        }
        let Some((task, version)) = entry.task.take() else {
            entry.phase = AnalysisPhase::Idle;
            return None;
        };
        entry.phase = AnalysisPhase::Running;
        entry.cancelled = false;
        trace!("[SCHEDULER] {key:?}: running v{version}");
        Some((task, version))
    }

    /// Record completion. Returns true when a rerun was queued.
    fn finish_run(&self, key: &K, version: u64) -> bool {
        let mut state = self.state.lock();
        let Some(entry) = state.keys.get_mut(key) else {
            return false;
        };
        entry.last_completed = Some(Instant::now());
        entry.last_version = Some(version);

        if entry.cancelled {
            state.keys.remove(key);
            return false;
        }

        match entry.pending_rerun.take() {
            Some(rerun) => {
                trace!("[SCHEDULER] {key:?}: rerun v{} queued", rerun.1);
                entry.task = Some(rerun);
                entry.phase = AnalysisPhase::Queued;
                true
            }
            None => {
                entry.phase = AnalysisPhase::Idle;
                false
            }
        }
    }

    /// A run that never reached `finish_run` (panicked or was dropped).
    fn abandon_run(&self, key: &K) {
        let mut state = self.state.lock();
        if let Some(entry) = state.keys.get_mut(key) {
            if entry.phase == AnalysisPhase::Running {
                entry.phase = AnalysisPhase::Idle;
                entry.pending_rerun = None;
                entry.last_completed = Some(Instant::now());
            }
        }
    }
}

/// Resets a key to `Idle` if its run ends without completing.
struct RunGuard<'a, K>
where
    K: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static,
{
    shared: &'a Shared<K>,
    key: &'a K,
    finished: bool,
}

impl<K> RunGuard<'_, K>
where
    K: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static,
{
    fn finish(&mut self, version: u64) -> bool {
        self.finished = true;
        self.shared.finish_run(self.key, version)
    }
}

impl<K> Drop for RunGuard<'_, K>
where
    K: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static,
{
    fn drop(&mut self) {
        if !self.finished {
            warn!("[SCHEDULER] {:?}: run ended without completing", self.key);
            self.shared.abandon_run(self.key);
        }
    }
}
