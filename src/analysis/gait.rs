//! Step detection and gait metrics

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::statistics;
use super::FeatureRecord;
use crate::config::{GaitConfig, StepDetectionConfig};

/// A single detected foot-strike
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepEvent {
    pub timestamp: f64,
    /// |vertical acceleration| at the strike, in g
    pub magnitude: f64,
}

/// Rolling gait metrics over the step buffer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaitMetrics {
    pub timestamp: f64,
    /// Steps per minute
    pub cadence: f64,
    /// Coefficient of variation of inter-step intervals
    pub step_time_variability: f64,
    pub estimated_stride_length: f64,
    pub gait_speed: f64,
    pub steps_in_window: usize,
}

impl GaitMetrics {
    /// Metrics carrying only the buffer state, timing fields zeroed
    fn idle(timestamp: f64, steps_in_window: usize) -> Self {
        Self {
            timestamp,
            cadence: 0.0,
            step_time_variability: 0.0,
            estimated_stride_length: 0.0,
            gait_speed: 0.0,
            steps_in_window,
        }
    }
}

/// Detects steps from the feature stream and derives cadence, variability,
/// stride length and gait speed over a time-bounded step buffer.
pub struct GaitAnalyzer {
    step_config: StepDetectionConfig,
    window_size_s: f64,

    last_step_time: Option<f64>,
    steps: VecDeque<StepEvent>,

    // Feature records never span modalities, so the foot-strike confirmation
    // uses the most recent pressure total seen.
    last_pressure_total: Option<f64>,

    total_steps: u64,
}

impl GaitAnalyzer {
    pub fn new(step_config: StepDetectionConfig, gait_config: &GaitConfig) -> Self {
        Self {
            step_config,
            window_size_s: gait_config.window_size_s,
            last_step_time: None,
            steps: VecDeque::new(),
            last_pressure_total: None,
            total_steps: 0,
        }
    }

    /// Analyze one feature record. Empty in, empty out.
    pub fn analyze(&mut self, record: Option<&FeatureRecord>) -> Option<GaitMetrics> {
        let record = record?;
        let timestamp = record.timestamp;

        let pressure_total = match record.total_pressure() {
            Some(total) => {
                self.last_pressure_total = Some(total);
                total
            }
            None => self.last_pressure_total.unwrap_or(0.0),
        };

        let step_detected = match record.vertical_acceleration() {
            Some(vertical) => self.detect_step(timestamp, vertical, pressure_total),
            None => false,
        };

        if step_detected {
            self.compute_metrics(timestamp)
        } else {
            self.current_metrics()
        }
    }

    /// Threshold, refractory and pressure-confirmation checks; records the
    /// step when all pass.
    pub fn detect_step(&mut self, timestamp: f64, vertical_acc: f64, pressure_total: f64) -> bool {
        if vertical_acc.abs() < self.step_config.acc_threshold_g {
            return false;
        }

        if let Some(last) = self.last_step_time {
            if timestamp - last < self.step_config.min_step_interval_s() {
                return false;
            }
        }

        if pressure_total < self.step_config.pressure_confirm_threshold {
            return false;
        }

        self.last_step_time = Some(timestamp);
        self.total_steps += 1;
        self.steps.push_back(StepEvent {
            timestamp,
            magnitude: vertical_acc.abs(),
        });

        while self
            .steps
            .front()
            .map(|s| timestamp - s.timestamp > self.window_size_s)
            .unwrap_or(false)
        {
            self.steps.pop_front();
        }

        debug!(
            "Step at {:.3}s (|a|={:.2}g, pressure={:.2}, {} in window)",
            timestamp,
            vertical_acc.abs(),
            pressure_total,
            self.steps.len()
        );
        true
    }

    fn compute_metrics(&self, timestamp: f64) -> Option<GaitMetrics> {
        if self.steps.len() < 2 {
            return self.current_metrics();
        }

        let times: Vec<f64> = self.steps.iter().map(|s| s.timestamp).collect();
        let magnitudes: Vec<f64> = self.steps.iter().map(|s| s.magnitude).collect();
        let intervals = statistics::diffs(&times);

        let mean_interval = statistics::mean(&intervals);
        if mean_interval <= 0.0 {
            return Some(GaitMetrics::idle(timestamp, self.steps.len()));
        }

        let cadence = 60.0 / mean_interval;
        let step_time_variability = statistics::coefficient_of_variation(&intervals);
        // Simple kinematic proxy, not a calibrated stride model
        let estimated_stride_length = 0.5 * statistics::mean(&magnitudes) * mean_interval.powi(2);
        let gait_speed = estimated_stride_length * cadence / 120.0;

        Some(GaitMetrics {
            timestamp,
            cadence,
            step_time_variability,
            estimated_stride_length,
            gait_speed,
            steps_in_window: self.steps.len(),
        })
    }

    fn current_metrics(&self) -> Option<GaitMetrics> {
        let last = self.steps.back()?;
        Some(GaitMetrics::idle(last.timestamp, self.steps.len()))
    }

    pub fn steps(&self) -> impl Iterator<Item = &StepEvent> + '_ {
        self.steps.iter()
    }

    pub fn steps_in_window(&self) -> usize {
        self.steps.len()
    }

    /// Steps accepted since construction, including evicted ones
    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }
}
