//! Detection module - fall detection and gait anomaly alerts

mod alert;
mod deviation;
mod fall;

pub use alert::*;
pub use deviation::*;
pub use fall::*;

use crate::analysis::{FeatureRecord, GaitMetrics};
use crate::config::Config;

/// Runs the fall state machine and the gait-deviation checks over one
/// feature record and its gait metrics.
pub struct AnomalyDetector {
    fall: FallDetector,
    gait: GaitDeviationDetector,
}

impl AnomalyDetector {
    pub fn new(config: &Config) -> Self {
        Self {
            fall: FallDetector::new(config.fall_detection.clone()),
            gait: GaitDeviationDetector::new(config.anomaly_detection.clone()),
        }
    }

    /// At most one alert of each type per call
    pub fn detect(&mut self, record: Option<&FeatureRecord>, metrics: Option<&GaitMetrics>) -> Vec<Alert> {
        let mut alerts = Vec::new();

        if let Some((timestamp, magnitude)) = record.and_then(|r| Some((r.timestamp, r.acc_magnitude()?))) {
            if let Some(fall) = self.fall.update(timestamp, magnitude) {
                alerts.push(self.fall_alert(&fall));
            }
        }

        alerts.extend(self.gait.check(metrics));
        alerts
    }

    fn fall_alert(&self, fall: &FallEvent) -> Alert {
        Alert::new(fall.timestamp, AlertType::Fall, Severity::Critical, "Possible fall detected")
            .with_detail("impact_time", fall.impact.timestamp)
            .with_detail("impact_magnitude", fall.impact.magnitude)
            .with_detail("impact_threshold_g", self.fall.config().impact_threshold_g)
            .with_detail("inactivity_s", fall.inactivity_s)
    }

    pub fn fall_state(&self) -> FallState {
        self.fall.state()
    }

    pub fn baseline_gait_speed(&self) -> Option<f64> {
        self.gait.baseline()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Features;

    fn accel(timestamp: f64, magnitude: f64) -> FeatureRecord {
        FeatureRecord {
            timestamp,
            features: Features::Accelerometer {
                acc_magnitude: magnitude,
                acc_mean: magnitude,
                acc_std: 0.0,
                vertical_acceleration: 0.0,
            },
        }
    }

    #[test]
    fn test_impact_then_stillness_raises_one_critical_fall() {
        let mut detector = AnomalyDetector::new(&Config::default());
        let inactivity = Config::default().fall_detection.inactivity_time_s;

        assert!(detector.detect(Some(&accel(0.0, 3.5)), None).is_empty());
        let mut alerts = Vec::new();
        for i in 1..=3 {
            let t = i as f64 * inactivity / 3.0;
            alerts.extend(detector.detect(Some(&accel(t, 0.05)), None));
        }

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::Fall);
        assert_eq!(alerts[0].severity, Severity::Critical);
        assert_eq!(alerts[0].details["impact_magnitude"], 3.5);
        assert_eq!(detector.fall_state(), FallState::Idle);
    }

    #[test]
    fn test_records_without_acceleration_do_not_drive_falls() {
        let mut detector = AnomalyDetector::new(&Config::default());
        detector.detect(Some(&accel(0.0, 3.5)), None);

        let gyro = FeatureRecord {
            timestamp: 5.0,
            features: Features::Gyroscope {
                angular_velocity: 0.0,
                angular_velocity_mean: 0.0,
                rotation_sagittal: 0.0,
            },
        };
        assert!(detector.detect(Some(&gyro), None).is_empty());
        assert!(detector.detect(None, None).is_empty());
        assert!(detector.fall_state().is_armed());
    }

    #[test]
    fn test_fall_and_gait_alerts_in_one_call() {
        let mut detector = AnomalyDetector::new(&Config::default());
        let calibrate = GaitMetrics {
            timestamp: 0.0,
            cadence: 100.0,
            step_time_variability: 0.0,
            estimated_stride_length: 1.2,
            gait_speed: 1.0,
            steps_in_window: 5,
        };
        detector.detect(Some(&accel(0.0, 3.0)), Some(&calibrate));
        assert_eq!(detector.baseline_gait_speed(), Some(1.0));

        let slow = GaitMetrics {
            timestamp: 3.0,
            gait_speed: 0.4,
            step_time_variability: 0.5,
            ..calibrate
        };
        let alerts = detector.detect(Some(&accel(3.0, 0.0)), Some(&slow));
        let types: Vec<_> = alerts.iter().map(|a| a.alert_type).collect();
        assert_eq!(
            types,
            vec![AlertType::Fall, AlertType::SpeedDeviation, AlertType::IrregularCadence]
        );
    }
}
