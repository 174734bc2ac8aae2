//! Mutual exclusion between manual dispensing and schedule editing.
//!
//! The lock has at most one holder. Every successful acquisition (re)starts
//! an inactivity timer; when it fires the lock goes back to idle. There is no
//! explicit release: a flow ends when the user stops interacting.
//!
//! ```text
//! Idle ──manual──▶ HeldByManual ──(timeout)──▶ Idle
//! Idle ─schedule─▶ HeldBySchedule ─(timeout)─▶ Idle
//! HeldByX ──X──▶ HeldByX   (timer reset)
//! HeldByX ──Y──▶ denied    (holder unchanged)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::bus::{BusEvent, SharedBus};

/// Default inactivity period after which the lock is released.
pub const DEFAULT_MODE_TIMEOUT: Duration = Duration::from_secs(30);

/// Interactive flow that can hold the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Manual,
    Schedule,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manual => write!(f, "manual dispensing"),
            Self::Schedule => write!(f, "schedule editing"),
        }
    }
}

/// Returned when the other mode holds the lock.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot start {requested} while {active} is in progress. Try again once it has been idle for a moment.")]
pub struct ModeConflict {
    pub active: Mode,
    pub requested: Mode,
}

#[derive(Default)]
struct GuardState {
    holder: Option<Mode>,
    /// Bumped on every acquisition so a stale timer never clears a newer hold
    generation: u64,
    release: Option<CancellationToken>,
}

/// Shared mode lock. Cheap to clone.
#[derive(Clone)]
pub struct ModeGuard {
    state: Arc<Mutex<GuardState>>,
    timeout: Duration,
    bus: SharedBus,
}

impl ModeGuard {
    pub fn new(timeout: Duration, bus: SharedBus) -> Self {
        Self {
            state: Arc::new(Mutex::new(GuardState::default())),
            timeout,
            bus,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn holder(&self) -> Option<Mode> {
        self.state.lock().await.holder
    }

    /// Take or refresh the lock for `mode`.
    ///
    /// Must be called from within a tokio runtime (the release timer is a
    /// spawned task).
    pub async fn acquire(&self, mode: Mode) -> Result<(), ModeConflict> {
        let mut state = self.state.lock().await;

        if let Some(active) = state.holder {
            if active != mode {
                debug!(%active, requested = %mode, "Mode lock denied");
                return Err(ModeConflict {
                    active,
                    requested: mode,
                });
            }
        }

        let newly_held = state.holder.is_none();

        // Cancel and reschedule under the same lock
        if let Some(previous) = state.release.take() {
            previous.cancel();
        }
        state.holder = Some(mode);
        state.generation += 1;
        let token = CancellationToken::new();
        state.release = Some(token.clone());
        self.spawn_release(state.generation, token);
        drop(state);

        if newly_held {
            info!(%mode, "Mode lock acquired");
            self.bus.publish(BusEvent::ModeChanged { holder: Some(mode) });
        }
        Ok(())
    }

    fn spawn_release(&self, generation: u64, token: CancellationToken) {
        let state = self.state.clone();
        let bus = self.bus.clone();
        let timeout = self.timeout;

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(timeout) => {
                    let mut guard = state.lock().await;
                    if guard.generation == generation {
                        let released = guard.holder.take();
                        guard.release = None;
                        drop(guard);
                        if let Some(mode) = released {
                            info!(%mode, "Mode lock released after inactivity");
                            bus.publish(BusEvent::ModeChanged { holder: None });
                        }
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::create_bus;
    use tokio::time::sleep;

    fn guard() -> ModeGuard {
        ModeGuard::new(DEFAULT_MODE_TIMEOUT, create_bus())
    }

    #[tokio::test(start_paused = true)]
    async fn other_mode_is_denied_and_holder_kept() {
        let guard = guard();
        guard.acquire(Mode::Schedule).await.unwrap();

        let err = guard.acquire(Mode::Manual).await.unwrap_err();
        assert_eq!(
            err,
            ModeConflict {
                active: Mode::Schedule,
                requested: Mode::Manual
            }
        );
        assert_eq!(guard.holder().await, Some(Mode::Schedule));
        let notice = err.to_string();
        assert!(notice.contains("manual dispensing") && notice.contains("schedule editing"));
    }

    #[tokio::test(start_paused = true)]
    async fn released_after_timeout() {
        let guard = guard();
        guard.acquire(Mode::Schedule).await.unwrap();

        sleep(Duration::from_secs(29)).await;
        assert_eq!(guard.holder().await, Some(Mode::Schedule));

        sleep(Duration::from_secs(2)).await;
        assert_eq!(guard.holder().await, None);
        assert!(guard.acquire(Mode::Manual).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn same_mode_resets_timer() {
        let guard = guard();
        guard.acquire(Mode::Manual).await.unwrap();

        sleep(Duration::from_secs(20)).await;
        guard.acquire(Mode::Manual).await.unwrap();

        // 40s after the first acquisition, 20s after the second
        sleep(Duration::from_secs(20)).await;
        assert_eq!(guard.holder().await, Some(Mode::Manual));

        sleep(Duration::from_secs(11)).await;
        assert_eq!(guard.holder().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_mode_changes() {
        let bus = create_bus();
        let mut rx = bus.subscribe();
        let guard = ModeGuard::new(Duration::from_secs(5), bus);

        guard.acquire(Mode::Manual).await.unwrap();
        guard.acquire(Mode::Manual).await.unwrap();
        sleep(Duration::from_secs(6)).await;

        assert!(matches!(
            rx.recv().await.unwrap(),
            BusEvent::ModeChanged {
                holder: Some(Mode::Manual)
            }
        ));
        // The refresh does not publish again
        assert!(matches!(
            rx.recv().await.unwrap(),
            BusEvent::ModeChanged { holder: None }
        ));
    }
}
