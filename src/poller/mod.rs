//! Fixed-interval polling of the dispenser.
//!
//! One loop per [`PollKind`]. Every tick starts an independent fetch; a
//! per-kind busy flag skips the tick while the previous fetch of the same
//! kind is still in flight. There is no backoff: a failed poll records the
//! error (the page shows the device as offline) and the next tick simply
//! tries again.
//!
//! Results land in a shared [`DeviceSnapshot`] and are published on the bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bus::{BusEvent, SharedBus};
use crate::client::{self, ClientError, DispenserClient};
use crate::model::{DeviceStatus, DispenserStatus, LastAction, UpcomingSchedule};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollKind {
    Status,
    Logs,
    LastAction,
    UpcomingSchedules,
    DispenserStatus,
}

impl PollKind {
    pub const ALL: [PollKind; 5] = [
        PollKind::Status,
        PollKind::Logs,
        PollKind::LastAction,
        PollKind::UpcomingSchedules,
        PollKind::DispenserStatus,
    ];

    pub fn endpoint(self) -> &'static str {
        match self {
            Self::Status => client::STATUS,
            Self::Logs => client::LOGS,
            Self::LastAction => client::LAST_ACTION,
            Self::UpcomingSchedules => client::UPCOMING_SCHEDULES,
            Self::DispenserStatus => client::DISPENSER_STATUS,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Poll period per kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollIntervals {
    pub status: Duration,
    pub logs: Duration,
    pub last_action: Duration,
    pub upcoming_schedules: Duration,
    pub dispenser_status: Duration,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            status: Duration::from_secs(5),
            logs: Duration::from_secs(10),
            last_action: Duration::from_secs(5),
            upcoming_schedules: Duration::from_secs(30),
            dispenser_status: Duration::from_secs(15),
        }
    }
}

impl PollIntervals {
    pub fn get(&self, kind: PollKind) -> Duration {
        match kind {
            PollKind::Status => self.status,
            PollKind::Logs => self.logs,
            PollKind::LastAction => self.last_action,
            PollKind::UpcomingSchedules => self.upcoming_schedules,
            PollKind::DispenserStatus => self.dispenser_status,
        }
    }
}

/// Latest result of one poll kind.
///
/// A failure keeps the last good `data` and sets `error`.
#[derive(Debug, Clone, Serialize)]
pub struct PollSlot<T> {
    pub data: Option<T>,
    pub error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl<T> Default for PollSlot<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            updated_at: None,
        }
    }
}

impl<T: Clone> PollSlot<T> {
    pub fn online(&self) -> bool {
        self.data.is_some() && self.error.is_none()
    }

    fn apply(&mut self, result: Result<T, ClientError>) -> Result<T, String> {
        match result {
            Ok(data) => {
                self.data = Some(data.clone());
                self.error = None;
                self.updated_at = Some(Utc::now());
                Ok(data)
            }
            Err(e) => {
                let error = e.to_string();
                self.error = Some(error.clone());
                Err(error)
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DeviceSnapshot {
    pub status: PollSlot<DeviceStatus>,
    pub logs: PollSlot<String>,
    pub last_action: PollSlot<LastAction>,
    pub upcoming_schedules: PollSlot<Vec<UpcomingSchedule>>,
    pub dispenser_status: PollSlot<DispenserStatus>,
}

/// Clears a busy flag when the fetch ends, even if it panics.
struct BusyGuard {
    busy: Arc<[AtomicBool; 5]>,
    index: usize,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.busy[self.index].store(false, Ordering::Release);
    }
}

/// Runs the poll loops. Cheap to clone.
#[derive(Clone)]
pub struct Poller {
    client: DispenserClient,
    bus: SharedBus,
    snapshot: Arc<RwLock<DeviceSnapshot>>,
    busy: Arc<[AtomicBool; 5]>,
    intervals: PollIntervals,
    shutdown: CancellationToken,
}

impl Poller {
    pub fn new(client: DispenserClient, bus: SharedBus, intervals: PollIntervals) -> Self {
        Self {
            client,
            bus,
            snapshot: Arc::new(RwLock::new(DeviceSnapshot::default())),
            busy: Arc::new(std::array::from_fn(|_| AtomicBool::new(false))),
            intervals,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn intervals(&self) -> &PollIntervals {
        &self.intervals
    }

    /// Spawn one loop per kind. The first tick fires immediately, which
    /// doubles as the initial load.
    pub fn start(&self) {
        for kind in PollKind::ALL {
            self.spawn_loop(kind);
        }
        info!("Pollers started");
    }

    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    pub async fn snapshot(&self) -> DeviceSnapshot {
        self.snapshot.read().await.clone()
    }

    pub fn is_busy(&self, kind: PollKind) -> bool {
        self.busy[kind.index()].load(Ordering::Acquire)
    }

    fn try_begin(&self, kind: PollKind) -> Option<BusyGuard> {
        let index = kind.index();
        self.busy[index]
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard {
                busy: self.busy.clone(),
                index,
            })
    }

    /// Start a fetch of `kind` in the background.
    ///
    /// Returns false if one is already in flight.
    pub fn trigger(&self, kind: PollKind) -> bool {
        let Some(guard) = self.try_begin(kind) else {
            debug!(?kind, "Poll still in flight, skipping");
            return false;
        };
        let poller = self.clone();
        tokio::spawn(async move {
            let _guard = guard;
            poller.fetch(kind).await;
        });
        true
    }

    /// Fetch `kind` and wait for the result.
    ///
    /// Returns false if one is already in flight.
    pub async fn poll_once(&self, kind: PollKind) -> bool {
        let Some(_guard) = self.try_begin(kind) else {
            debug!(?kind, "Poll still in flight, skipping");
            return false;
        };
        self.fetch(kind).await;
        true
    }

    fn spawn_loop(&self, kind: PollKind) {
        let poller = self.clone();
        let period = self.intervals.get(kind);

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = poller.shutdown.cancelled() => {
                        debug!(?kind, "Poll loop stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        poller.trigger(kind);
                    }
                }
            }
        });
    }

    async fn fetch(&self, kind: PollKind) {
        // Each arm awaits the device first, then takes the write lock briefly
        let outcome = match kind {
            PollKind::Status => {
                let result = self.client.status().await;
                let mut snapshot = self.snapshot.write().await;
                snapshot
                    .status
                    .apply(result)
                    .map(|status| BusEvent::StatusUpdated { status })
            }
            PollKind::Logs => {
                let result = self.client.logs().await;
                let mut snapshot = self.snapshot.write().await;
                snapshot
                    .logs
                    .apply(result)
                    .map(|logs| BusEvent::LogsUpdated { logs })
            }
            PollKind::LastAction => {
                let result = self.client.last_action().await;
                let mut snapshot = self.snapshot.write().await;
                snapshot
                    .last_action
                    .apply(result)
                    .map(|action| BusEvent::LastActionUpdated { action })
            }
            PollKind::UpcomingSchedules => {
                let result = self.client.upcoming_schedules().await;
                let mut snapshot = self.snapshot.write().await;
                snapshot
                    .upcoming_schedules
                    .apply(result)
                    .map(|schedules| BusEvent::UpcomingSchedulesUpdated { schedules })
            }
            PollKind::DispenserStatus => {
                let result = self.client.dispenser_status().await;
                let mut snapshot = self.snapshot.write().await;
                snapshot
                    .dispenser_status
                    .apply(result)
                    .map(|status| BusEvent::DispenserStatusUpdated { status })
            }
        };

        match outcome {
            Ok(event) => self.bus.publish(event),
            Err(error) => {
                warn!(?kind, endpoint = kind.endpoint(), "Poll failed: {}", error);
                self.bus.publish(BusEvent::PollFailed { kind, error });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_intervals() {
        let intervals = PollIntervals::default();
        assert_eq!(intervals.get(PollKind::Status), Duration::from_secs(5));
        assert_eq!(intervals.get(PollKind::Logs), Duration::from_secs(10));
        assert_eq!(intervals.get(PollKind::LastAction), Duration::from_secs(5));
        assert_eq!(
            intervals.get(PollKind::UpcomingSchedules),
            Duration::from_secs(30)
        );
        assert_eq!(
            intervals.get(PollKind::DispenserStatus),
            Duration::from_secs(15)
        );
    }

    #[test]
    fn failed_poll_keeps_last_data() {
        let mut slot = PollSlot::<String>::default();
        assert!(!slot.online());

        assert_eq!(slot.apply(Ok("boot".into())), Ok("boot".into()));
        assert!(slot.online());

        let err = ClientError::Rejected {
            endpoint: client::LOGS,
            status: 500,
            message: "sd card error".into(),
        };
        assert_eq!(slot.apply(Err(err)), Err("sd card error".into()));
        assert!(!slot.online());
        assert_eq!(slot.data.as_deref(), Some("boot"));
    }

    #[tokio::test]
    async fn busy_flag_blocks_second_fetch() {
        let client = DispenserClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let poller = Poller::new(client, crate::bus::create_bus(), PollIntervals::default());

        let guard = poller.try_begin(PollKind::Logs).unwrap();
        assert!(poller.is_busy(PollKind::Logs));
        assert!(!poller.trigger(PollKind::Logs));
        assert!(!poller.poll_once(PollKind::Logs).await);
        // Other kinds are independent
        assert!(!poller.is_busy(PollKind::Status));

        drop(guard);
        assert!(!poller.is_busy(PollKind::Logs));
    }
}
