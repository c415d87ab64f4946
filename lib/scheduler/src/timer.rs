//! One-shot timers keyed by trigger ID.
//!
//! Each armed trigger gets its own tokio task that sleeps until the fire
//! time and then hands the trigger ID to a [`FireHandler`]. Timers live
//! only in process memory; nothing here touches storage.

use crate::error::ScheduleError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chime_core::TriggerId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::AbortHandle;
use tracing::{debug, info};

/// Action run when a timer expires.
#[async_trait]
pub trait FireHandler: Send + Sync {
    /// Handles the firing of `trigger_id`.
    async fn fire(&self, trigger_id: TriggerId);
}

#[derive(Default)]
struct TimerState {
    armed: HashMap<TriggerId, AbortHandle>,
    shut_down: bool,
}

/// In-memory set of armed one-shot timers.
///
/// Per trigger the lifecycle is `Unarmed -> Armed -> Fired`. An entry is
/// removed just before its handler runs, so a firing handler is never
/// aborted and never runs twice.
#[derive(Clone, Default)]
pub struct TimerSet {
    state: Arc<Mutex<TimerState>>,
}

impl TimerSet {
    /// Creates an empty timer set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, TimerState> {
        lock(&self.state)
    }

    /// Arms a timer that runs `handler` for `trigger_id` at `fire_at`.
    ///
    /// A fire time in the past fires as soon as the runtime gets to it.
    /// Must be called from within a tokio runtime.
    pub fn arm(
        &self,
        trigger_id: TriggerId,
        fire_at: DateTime<Utc>,
        handler: Arc<dyn FireHandler>,
    ) -> Result<(), ScheduleError> {
        let mut state = self.state();
        if state.shut_down {
            return Err(ScheduleError::ShutDown);
        }
        if state.armed.contains_key(&trigger_id) {
            return Err(ScheduleError::AlreadyArmed { trigger_id });
        }

        let delay = (fire_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        let timers = Arc::clone(&self.state);
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            lock(&timers).armed.remove(&trigger_id);

            info!(%trigger_id, "timer fired");
            handler.fire(trigger_id).await;
        });
        state.armed.insert(trigger_id, task.abort_handle());

        debug!(%trigger_id, %fire_at, ?delay, "armed timer");
        Ok(())
    }

    /// Returns whether a timer is pending for `trigger_id`.
    #[must_use]
    pub fn is_armed(&self, trigger_id: TriggerId) -> bool {
        self.state().armed.contains_key(&trigger_id)
    }

    /// Returns the number of pending timers.
    #[must_use]
    pub fn armed_count(&self) -> usize {
        self.state().armed.len()
    }

    /// Aborts every pending timer and refuses further arms.
    ///
    /// Returns the number of timers that were aborted.
    pub fn shutdown(&self) -> usize {
        let mut state = self.state();
        state.shut_down = true;

        let aborted = state.armed.len();
        for (_, handle) in state.armed.drain() {
            handle.abort();
        }
        if aborted > 0 {
            info!(aborted, "aborted pending timers");
        }
        aborted
    }
}

fn lock(state: &Mutex<TimerState>) -> MutexGuard<'_, TimerState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
