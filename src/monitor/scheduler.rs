//! Repeating timer that drives poll cycles.
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{info, warn};

use super::cycle::PollCycle;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Poll scheduler is already running")]
    AlreadyRunning,
    #[error("Poll scheduler is not running")]
    NotRunning,
    #[error("Polling interval must be a positive number of seconds")]
    InvalidInterval,
}

enum SchedulerState {
    Idle,
    Running {
        interval: Duration,
        handle: JoinHandle<()>,
        shutdown_tx: oneshot::Sender<()>,
    },
}

/// Runs [`PollCycle`] on a fixed interval.
///
/// There is at most one live timer. Changing the interval swaps the timer
/// under the state lock: the old one is told to stop and the new one first
/// fires a full interval later. A cycle already in flight is never cancelled,
/// and cycles never overlap, even across a swap.
pub struct PollScheduler {
    cycle: Arc<PollCycle>,
    state: Mutex<SchedulerState>,
    cycle_lock: Arc<AsyncMutex<()>>,
}

impl PollScheduler {
    pub fn new(cycle: Arc<PollCycle>) -> Self {
        Self {
            cycle,
            state: Mutex::new(SchedulerState::Idle),
            cycle_lock: Arc::new(AsyncMutex::new(())),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn start(&self, interval_secs: u64) -> Result<(), SchedulerError> {
        let interval = interval_from_secs(interval_secs)?;
        let mut state = self.lock_state();
        if matches!(*state, SchedulerState::Running { .. }) {
            return Err(SchedulerError::AlreadyRunning);
        }
        *state = self.spawn_timer(interval);
        info!(interval_secs, "Poll scheduler started.");
        Ok(())
    }

    /// Replaces the running timer. Time already waited on the old timer is discarded.
    pub fn reconfigure(&self, interval_secs: u64) -> Result<(), SchedulerError> {
        let interval = interval_from_secs(interval_secs)?;
        let mut state = self.lock_state();
        let previous = std::mem::replace(&mut *state, SchedulerState::Idle);
        let SchedulerState::Running { shutdown_tx, .. } = previous else {
            return Err(SchedulerError::NotRunning);
        };
        if shutdown_tx.send(()).is_err() {
            warn!("Previous poll timer had already stopped.");
        }
        *state = self.spawn_timer(interval);
        info!(interval_secs, "Poll interval reconfigured.");
        Ok(())
    }

    /// Stops the timer. Returns `false` if it was not running.
    pub fn stop(&self) -> bool {
        let previous = std::mem::replace(&mut *self.lock_state(), SchedulerState::Idle);
        match previous {
            SchedulerState::Running { shutdown_tx, .. } => {
                let _ = shutdown_tx.send(());
                info!("Poll scheduler stopped.");
                true
            }
            SchedulerState::Idle => false,
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        match &*self.lock_state() {
            SchedulerState::Running { interval, .. } => Some(*interval),
            SchedulerState::Idle => None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.interval().is_some()
    }

    fn spawn_timer(&self, interval: Duration) -> SchedulerState {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(run_timer(
            interval,
            self.cycle.clone(),
            self.cycle_lock.clone(),
            shutdown_rx,
        ));
        SchedulerState::Running {
            interval,
            handle,
            shutdown_tx,
        }
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let SchedulerState::Running { handle, .. } = state {
            handle.abort();
        }
    }
}

fn interval_from_secs(secs: u64) -> Result<Duration, SchedulerError> {
    if secs == 0 {
        return Err(SchedulerError::InvalidInterval);
    }
    Ok(Duration::from_secs(secs))
}

async fn run_timer(
    period: Duration,
    cycle: Arc<PollCycle>,
    cycle_lock: Arc<AsyncMutex<()>>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    // An overrunning cycle pushes the next fire back instead of queueing catch-up fires.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown_rx => break,
            _ = ticker.tick() => {
                // A superseded timer may still be finishing its cycle; wait for it
                // unless this timer is itself superseded meanwhile.
                let guard = tokio::select! {
                    biased;
                    _ = &mut shutdown_rx => None,
                    guard = cycle_lock.lock() => Some(guard),
                };
                let Some(_guard) = guard else {
                    break;
                };
                cycle.run().await;
            }
        }
    }
}
