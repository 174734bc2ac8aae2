//! Event bus for inter-component communication
//!
//! Uses tokio::sync::broadcast for pub/sub pattern.
//! Pollers, the console and the mode guard publish here; the SSE endpoint
//! forwards every event to open pages.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::model::{DeviceStatus, DispenserStatus, LastAction, MedicineEntry, UpcomingSchedule};
use crate::mode_guard::Mode;
use crate::poller::PollKind;

/// Event types that can be published on the bus
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum BusEvent {
    // Poll results
    StatusUpdated { status: DeviceStatus },
    LogsUpdated { logs: String },
    LastActionUpdated { action: LastAction },
    UpcomingSchedulesUpdated { schedules: Vec<UpcomingSchedule> },
    DispenserStatusUpdated { status: DispenserStatus },
    PollFailed { kind: PollKind, error: String },

    // Console state
    SlotMapUpdated { medicines: Vec<MedicineEntry> },
    ModeChanged { holder: Option<Mode> },
    SchedulesSaved,
    DrumsCleared,
}

/// Event bus handle for publishing and subscribing
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BusEvent>,
}

impl EventBus {
    /// Create a new event bus with specified capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: BusEvent) {
        // No subscribers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Shared event bus wrapped in Arc for thread-safe sharing
pub type SharedBus = Arc<EventBus>;

pub fn create_bus() -> SharedBus {
    Arc::new(EventBus::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pubsub() {
        let bus = create_bus();
        let mut rx = bus.subscribe();

        bus.publish(BusEvent::LogsUpdated {
            logs: "dispensed drum 1".to_string(),
        });

        match rx.recv().await.unwrap() {
            BusEvent::LogsUpdated { logs } => assert_eq!(logs, "dispensed drum 1"),
            other => panic!("Wrong event type: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = create_bus();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(BusEvent::DrumsCleared);

        assert!(matches!(rx1.recv().await.unwrap(), BusEvent::DrumsCleared));
        assert!(matches!(rx2.recv().await.unwrap(), BusEvent::DrumsCleared));
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(BusEvent::ModeChanged {
            holder: Some(Mode::Manual),
        })
        .unwrap();
        assert_eq!(json["type"], "ModeChanged");
        assert_eq!(json["payload"]["holder"], "manual");
    }
}
