//! Gait deviation scoring against a one-shot baseline

use tracing::info;

use super::{Alert, AlertType, Severity};
use crate::analysis::GaitMetrics;
use crate::config::AnomalyDetectionConfig;

/// Flags gait speed drifting away from the wearer's baseline and irregular
/// step timing. The baseline is taken from the first positive gait speed and
/// never recalibrated.
pub struct GaitDeviationDetector {
    config: AnomalyDetectionConfig,
    baseline_gait_speed: Option<f64>,
}

impl GaitDeviationDetector {
    pub fn new(config: AnomalyDetectionConfig) -> Self {
        Self {
            config,
            baseline_gait_speed: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_baseline(config: AnomalyDetectionConfig, baseline: f64) -> Self {
        Self {
            config,
            baseline_gait_speed: (baseline > 0.0).then_some(baseline),
        }
    }

    pub fn baseline(&self) -> Option<f64> {
        self.baseline_gait_speed
    }

    pub fn check(&mut self, metrics: Option<&GaitMetrics>) -> Vec<Alert> {
        let mut alerts = Vec::new();
        let Some(metrics) = metrics else {
            return alerts;
        };

        if self.baseline_gait_speed.is_none() && metrics.gait_speed > 0.0 {
            info!("Baseline gait speed calibrated at {:.3} m/s", metrics.gait_speed);
            self.baseline_gait_speed = Some(metrics.gait_speed);
        }

        if let Some(baseline) = self.baseline_gait_speed {
            let deviation = (metrics.gait_speed - baseline).abs() / baseline;
            if deviation > self.config.speed_deviation_threshold {
                alerts.push(
                    Alert::new(
                        metrics.timestamp,
                        AlertType::SpeedDeviation,
                        Severity::Warning,
                        format!("Gait speed deviation of {:.2}", deviation),
                    )
                    .with_detail("deviation", deviation)
                    .with_detail("gait_speed", metrics.gait_speed)
                    .with_detail("baseline_gait_speed", baseline)
                    .with_detail("threshold", self.config.speed_deviation_threshold),
                );
            }
        }

        let variability = metrics.step_time_variability;
        if variability > self.config.cadence_variation_threshold {
            alerts.push(
                Alert::new(
                    metrics.timestamp,
                    AlertType::IrregularCadence,
                    Severity::Warning,
                    format!("High step timing variability: {:.2}", variability),
                )
                .with_detail("step_time_variability", variability)
                .with_detail("cadence", metrics.cadence)
                .with_detail("threshold", self.config.cadence_variation_threshold),
            );
        }

        alerts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AnomalyDetectionConfig {
        AnomalyDetectionConfig {
            speed_deviation_threshold: 0.3,
            cadence_variation_threshold: 0.2,
        }
    }

    fn metrics(gait_speed: f64, step_time_variability: f64) -> GaitMetrics {
        GaitMetrics {
            timestamp: 5.0,
            cadence: 110.0,
            step_time_variability,
            estimated_stride_length: 0.6,
            gait_speed,
            steps_in_window: 8,
        }
    }

    #[test]
    fn test_speed_deviation_threshold() {
        let mut detector = GaitDeviationDetector::with_baseline(config(), 1.0);

        let alerts = detector.check(Some(&metrics(1.5, 0.0)));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::SpeedDeviation);
        assert_eq!(alerts[0].severity, Severity::Warning);

        assert!(detector.check(Some(&metrics(1.2, 0.0))).is_empty());
    }

    #[test]
    fn test_baseline_is_one_shot() {
        let mut detector = GaitDeviationDetector::new(config());
        assert!(detector.check(Some(&metrics(0.0, 0.0))).is_empty());
        assert_eq!(detector.baseline(), None);

        assert!(detector.check(Some(&metrics(0.8, 0.0))).is_empty());
        assert_eq!(detector.baseline(), Some(0.8));

        detector.check(Some(&metrics(0.0, 0.0)));
        detector.check(Some(&metrics(-1.0, 0.0)));
        detector.check(Some(&metrics(2.0, 0.0)));
        assert_eq!(detector.baseline(), Some(0.8));
    }

    #[test]
    fn test_deviation_fires_every_qualifying_call() {
        let mut detector = GaitDeviationDetector::with_baseline(config(), 1.0);
        for _ in 0..3 {
            assert_eq!(detector.check(Some(&metrics(0.5, 0.0))).len(), 1);
        }
    }

    #[test]
    fn test_irregular_cadence_independent_of_speed() {
        let mut detector = GaitDeviationDetector::new(config());
        let alerts = detector.check(Some(&metrics(1.0, 0.35)));

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::IrregularCadence);
        assert_eq!(alerts[0].message, "High step timing variability: 0.35");

        let alerts = detector.check(Some(&metrics(2.0, 0.35)));
        let types: Vec<_> = alerts.iter().map(|a| a.alert_type).collect();
        assert_eq!(types, vec![AlertType::SpeedDeviation, AlertType::IrregularCadence]);
    }

    #[test]
    fn test_empty_metrics_yield_nothing() {
        let mut detector = GaitDeviationDetector::with_baseline(config(), 1.0);
        assert!(detector.check(None).is_empty());
    }
}
