//! Fall detection state machine: impact followed by sustained stillness

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::FallDetectionConfig;

/// Impact that armed the detector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Impact {
    pub timestamp: f64,
    pub magnitude: f64,
}

/// Fall detector state. `since` is the start of the current stillness clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FallState {
    Idle,
    /// Armed by an impact; last sample showed movement (or was the impact)
    ImpactPending { impact: Impact, since: f64 },
    /// Armed and the wearer has been still since `since`
    ConfirmingInactivity { impact: Impact, since: f64 },
}

impl FallState {
    pub fn is_armed(&self) -> bool {
        !matches!(self, FallState::Idle)
    }
}

/// A confirmed fall
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FallEvent {
    pub timestamp: f64,
    pub impact: Impact,
    /// Length of the stillness that confirmed the fall
    pub inactivity_s: f64,
}

/// Pure transition function of the fall state machine
pub fn transition(
    state: FallState,
    timestamp: f64,
    magnitude: f64,
    config: &FallDetectionConfig,
) -> (FallState, Option<FallEvent>) {
    if magnitude > config.impact_threshold_g {
        let impact = Impact { timestamp, magnitude };
        return (FallState::ImpactPending { impact, since: timestamp }, None);
    }

    let (impact, since) = match state {
        FallState::Idle => return (FallState::Idle, None),
        FallState::ImpactPending { impact, since } | FallState::ConfirmingInactivity { impact, since } => {
            (impact, since)
        }
    };

    if magnitude < config.low_activity_threshold {
        let still_for = timestamp - since;
        if still_for >= config.inactivity_time_s {
            let event = FallEvent {
                timestamp,
                impact,
                inactivity_s: still_for,
            };
            (FallState::Idle, Some(event))
        } else {
            (FallState::ConfirmingInactivity { impact, since }, None)
        }
    } else {
        // Movement restarts the stillness clock but keeps the detector armed
        (FallState::ImpactPending { impact, since: timestamp }, None)
    }
}

/// Stateful wrapper driving [`transition`] from the acceleration stream
pub struct FallDetector {
    config: FallDetectionConfig,
    state: FallState,
}

impl FallDetector {
    pub fn new(config: FallDetectionConfig) -> Self {
        Self {
            config,
            state: FallState::Idle,
        }
    }

    /// Feed one acceleration magnitude; returns the fall once confirmed
    pub fn update(&mut self, timestamp: f64, magnitude: f64) -> Option<FallEvent> {
        let previous = self.state;
        let (next, event) = transition(previous, timestamp, magnitude, &self.config);
        self.state = next;

        if !previous.is_armed() && next.is_armed() {
            debug!("Impact of {:.2}g at {:.3}s, waiting for inactivity", magnitude, timestamp);
        }
        if let Some(ref fall) = event {
            info!(
                "Fall confirmed at {:.3}s: impact {:.2}g, still for {:.1}s",
                fall.timestamp, fall.impact.magnitude, fall.inactivity_s
            );
        }
        event
    }

    pub fn state(&self) -> FallState {
        self.state
    }

    pub fn config(&self) -> &FallDetectionConfig {
        &self.config
    }
}
