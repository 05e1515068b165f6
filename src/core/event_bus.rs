// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Event bus for fanning pipeline output out to observers

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::analysis::GaitMetrics;
use crate::detection::Alert;

/// Event types in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    Alert,
    GaitMetrics,
    SampleDropped,
    Upload,
}

/// Generic event wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    pub event_type: EventType,
    /// Wall-clock time the event was published
    pub published_at: DateTime<Utc>,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    Alert(Alert),
    GaitMetrics(GaitMetrics),
    SampleDropped { reason: String },
    Upload { records: usize, ok: bool },
}

/// Central event bus for pub/sub communication
pub struct EventBus {
    alert_tx: broadcast::Sender<Alert>,
    metrics_tx: broadcast::Sender<GaitMetrics>,
    event_tx: broadcast::Sender<Event>,
    event_counter: AtomicU64,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (alert_tx, _) = broadcast::channel(capacity);
        let (metrics_tx, _) = broadcast::channel(capacity);
        let (event_tx, _) = broadcast::channel(capacity);

        Self {
            alert_tx,
            metrics_tx,
            event_tx,
            event_counter: AtomicU64::new(0),
        }
    }

    pub fn publish_alert(&self, alert: Alert) {
        let _ = self.alert_tx.send(alert.clone());
        self.publish_event(EventType::Alert, EventPayload::Alert(alert));
    }

    pub fn publish_metrics(&self, metrics: GaitMetrics) {
        let _ = self.metrics_tx.send(metrics.clone());
        self.publish_event(EventType::GaitMetrics, EventPayload::GaitMetrics(metrics));
    }

    pub fn publish_dropped(&self, reason: &str) {
        self.publish_event(
            EventType::SampleDropped,
            EventPayload::SampleDropped {
                reason: reason.to_string(),
            },
        );
    }

    pub fn publish_upload(&self, records: usize, ok: bool) {
        self.publish_event(EventType::Upload, EventPayload::Upload { records, ok });
    }

    fn publish_event(&self, event_type: EventType, payload: EventPayload) {
        let id = self.event_counter.fetch_add(1, Ordering::Relaxed);
        let event = Event {
            id,
            event_type,
            published_at: Utc::now(),
            payload,
        };
        let _ = self.event_tx.send(event);
    }

    pub fn subscribe_alerts(&self) -> broadcast::Receiver<Alert> {
        self.alert_tx.subscribe()
    }

    pub fn subscribe_metrics(&self) -> broadcast::Receiver<GaitMetrics> {
        self.metrics_tx.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{AlertType, Severity};

    #[test]
    fn test_alert_reaches_both_channels() {
        let bus = EventBus::new(8);
        let mut alerts = bus.subscribe_alerts();
        let mut events = bus.subscribe_events();

        bus.publish_alert(Alert::new(1.0, AlertType::Fall, Severity::Critical, "Possible fall detected"));
        bus.publish_dropped("unknown modality");

        assert_eq!(alerts.try_recv().unwrap().alert_type, AlertType::Fall);
        let first = events.try_recv().unwrap();
        let second = events.try_recv().unwrap();
        assert_eq!(first.event_type, EventType::Alert);
        assert_eq!(second.event_type, EventType::SampleDropped);
        assert_eq!(second.id, first.id + 1);
    }

    #[test]
    fn test_publish_without_subscribers_is_harmless() {
        let bus = EventBus::default();
        bus.publish_upload(3, true);
        bus.publish_metrics(GaitMetrics {
            timestamp: 0.0,
            cadence: 0.0,
            step_time_variability: 0.0,
            estimated_stride_length: 0.0,
            gait_speed: 0.0,
            steps_in_window: 1,
        });
    }
}
