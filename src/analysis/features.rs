//! Per-modality feature extraction over sliding windows

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::statistics::{self, EPSILON};
use super::window::SlidingWindow;
use crate::config::FeatureConfig;
use crate::sensors::{Axis, Modality, RawSample, SensorData};

/// Feature snapshot derived from one sample and its modality window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub timestamp: f64,
    pub features: Features,
}

/// Fixed feature set of each modality
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "modality", rename_all = "lowercase")]
pub enum Features {
    Accelerometer {
        acc_magnitude: f64,
        acc_mean: f64,
        acc_std: f64,
        vertical_acceleration: f64,
    },
    Gyroscope {
        angular_velocity: f64,
        angular_velocity_mean: f64,
        rotation_sagittal: f64,
    },
    Pressure {
        total_pressure: f64,
        max_pressure: f64,
        pressure_ratio: f64,
    },
}

impl FeatureRecord {
    pub fn modality(&self) -> Modality {
        match self.features {
            Features::Accelerometer { .. } => Modality::Accelerometer,
            Features::Gyroscope { .. } => Modality::Gyroscope,
            Features::Pressure { .. } => Modality::Pressure,
        }
    }

    pub fn acc_magnitude(&self) -> Option<f64> {
        match self.features {
            Features::Accelerometer { acc_magnitude, .. } => Some(acc_magnitude),
            _ => None,
        }
    }

    pub fn vertical_acceleration(&self) -> Option<f64> {
        match self.features {
            Features::Accelerometer { vertical_acceleration, .. } => Some(vertical_acceleration),
            _ => None,
        }
    }

    pub fn total_pressure(&self) -> Option<f64> {
        match self.features {
            Features::Pressure { total_pressure, .. } => Some(total_pressure),
            _ => None,
        }
    }
}

/// Turns raw samples into feature records.
///
/// Holds one bounded window per modality. A modality yields no features until
/// its window holds at least two samples.
pub struct FeatureExtractor {
    vertical_axis: Axis,
    sagittal_axis: Axis,
    accelerometer: SlidingWindow<Vector3<f64>>,
    gyroscope: SlidingWindow<Vector3<f64>>,
    pressure: SlidingWindow<Vec<f64>>,
}

impl FeatureExtractor {
    pub fn new(config: &FeatureConfig) -> Self {
        Self {
            vertical_axis: config.vertical_axis,
            sagittal_axis: config.sagittal_axis,
            accelerometer: SlidingWindow::new(config.window_size),
            gyroscope: SlidingWindow::new(config.window_size),
            pressure: SlidingWindow::new(config.window_size),
        }
    }

    /// Feed one sample; `None` means "no features yet" for its modality
    pub fn process(&mut self, sample: RawSample) -> Option<FeatureRecord> {
        let timestamp = sample.timestamp;
        let features = match sample.data {
            SensorData::Accelerometer(v) => {
                self.accelerometer.push(timestamp, v);
                self.accelerometer_features()
            }
            SensorData::Gyroscope(v) => {
                self.gyroscope.push(timestamp, v);
                self.gyroscope_features()
            }
            SensorData::Pressure(p) => {
                self.pressure.push(timestamp, p);
                self.pressure_features()
            }
        }?;

        trace!("features @ {:.3}: {:?}", timestamp, features);
        Some(FeatureRecord { timestamp, features })
    }

    /// Number of samples currently held for `modality`
    pub fn window_len(&self, modality: Modality) -> usize {
        match modality {
            Modality::Accelerometer => self.accelerometer.len(),
            Modality::Gyroscope => self.gyroscope.len(),
            Modality::Pressure => self.pressure.len(),
        }
    }

    fn accelerometer_features(&self) -> Option<Features> {
        if self.accelerometer.len() < 2 {
            return None;
        }
        let magnitudes: Vec<f64> = self.accelerometer.payloads().map(|v| v.norm()).collect();
        let (_, latest) = self.accelerometer.latest()?;

        Some(Features::Accelerometer {
            acc_magnitude: latest.norm(),
            acc_mean: statistics::mean(&magnitudes),
            acc_std: statistics::population_std(&magnitudes),
            vertical_acceleration: self.vertical_axis.of(latest),
        })
    }

    fn gyroscope_features(&self) -> Option<Features> {
        if self.gyroscope.len() < 2 {
            return None;
        }
        let magnitudes: Vec<f64> = self.gyroscope.payloads().map(|v| v.norm()).collect();
        let (_, latest) = self.gyroscope.latest()?;

        Some(Features::Gyroscope {
            angular_velocity: latest.norm(),
            angular_velocity_mean: statistics::mean(&magnitudes),
            rotation_sagittal: self.sagittal_axis.of(latest),
        })
    }

    // Pressure features describe the current sample only; the window just
    // gates emission like the other modalities.
    fn pressure_features(&self) -> Option<Features> {
        if self.pressure.len() < 2 {
            return None;
        }
        let (_, pressures) = self.pressure.latest()?;
        let max_pressure = statistics::max(pressures);
        let mean = statistics::mean(pressures).max(0.0) + EPSILON;

        Some(Features::Pressure {
            total_pressure: pressures.iter().sum(),
            max_pressure,
            pressure_ratio: max_pressure / mean,
        })
    }
}
