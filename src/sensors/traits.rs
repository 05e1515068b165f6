// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Sensor traits and common sample types

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use async_trait::async_trait;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Sensor modalities carried by the slipper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Accelerometer,
    Gyroscope,
    Pressure,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Accelerometer => "accelerometer",
            Modality::Gyroscope => "gyroscope",
            Modality::Pressure => "pressure",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Modality {
    type Err = PipelineError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "accelerometer" => Ok(Modality::Accelerometer),
            "gyroscope" => Ok(Modality::Gyroscope),
            "pressure" => Ok(Modality::Pressure),
            other => Err(PipelineError::UnknownModality(other.to_string())),
        }
    }
}

/// Axis of a 3-axis inertial vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn index(&self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Component of `v` along this axis
    pub fn of(&self, v: &Vector3<f64>) -> f64 {
        v[self.index()]
    }
}

/// Modality-specific payload of a decoded reading
#[derive(Debug, Clone, PartialEq)]
pub enum SensorData {
    /// Linear acceleration in g, gravity removed
    Accelerometer(Vector3<f64>),
    /// Angular velocity in rad/s
    Gyroscope(Vector3<f64>),
    /// One value per insole pressure cell
    Pressure(Vec<f64>),
}

/// One decoded, unit-correct sensor reading
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    /// Monotonic seconds
    pub timestamp: f64,
    pub data: SensorData,
}

impl RawSample {
    pub fn accelerometer(timestamp: f64, x: f64, y: f64, z: f64) -> Self {
        Self {
            timestamp,
            data: SensorData::Accelerometer(Vector3::new(x, y, z)),
        }
    }

    pub fn gyroscope(timestamp: f64, x: f64, y: f64, z: f64) -> Self {
        Self {
            timestamp,
            data: SensorData::Gyroscope(Vector3::new(x, y, z)),
        }
    }

    pub fn pressure(timestamp: f64, pressures: Vec<f64>) -> Self {
        Self {
            timestamp,
            data: SensorData::Pressure(pressures),
        }
    }

    pub fn modality(&self) -> Modality {
        match self.data {
            SensorData::Accelerometer(_) => Modality::Accelerometer,
            SensorData::Gyroscope(_) => Modality::Gyroscope,
            SensorData::Pressure(_) => Modality::Pressure,
        }
    }
}

/// Tagged form of a reading as emitted by the transport layer:
/// `{"type": "accelerometer", "timestamp": 12.5, "data": {"ax": .., "ay": .., "az": ..}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireSample {
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: Option<f64>,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl WireSample {
    fn component(&self, modality: Modality, key: &str) -> Result<f64, PipelineError> {
        self.data
            .get(key)
            .and_then(|v| v.as_f64())
            .ok_or_else(|| PipelineError::malformed(modality.as_str(), format!("missing `{}`", key)))
    }

    fn vector(&self, modality: Modality, keys: [&str; 3]) -> Result<Vector3<f64>, PipelineError> {
        Ok(Vector3::new(
            self.component(modality, keys[0])?,
            self.component(modality, keys[1])?,
            self.component(modality, keys[2])?,
        ))
    }
}

impl From<&RawSample> for WireSample {
    fn from(sample: &RawSample) -> Self {
        let data = match &sample.data {
            SensorData::Accelerometer(v) => serde_json::json!({"ax": v.x, "ay": v.y, "az": v.z}),
            SensorData::Gyroscope(v) => serde_json::json!({"gx": v.x, "gy": v.y, "gz": v.z}),
            SensorData::Pressure(p) => serde_json::json!({"pressures": p}),
        };
        Self {
            kind: sample.modality().as_str().to_string(),
            timestamp: Some(sample.timestamp),
            data,
        }
    }
}

impl TryFrom<WireSample> for RawSample {
    type Error = PipelineError;

    fn try_from(wire: WireSample) -> Result<Self, Self::Error> {
        let modality: Modality = wire.kind.parse()?;
        let timestamp = wire
            .timestamp
            .filter(|t| t.is_finite())
            .ok_or_else(|| PipelineError::malformed(modality.as_str(), "missing timestamp"))?;

        let data = match modality {
            Modality::Accelerometer => SensorData::Accelerometer(wire.vector(modality, ["ax", "ay", "az"])?),
            Modality::Gyroscope => SensorData::Gyroscope(wire.vector(modality, ["gx", "gy", "gz"])?),
            Modality::Pressure => {
                let values = wire
                    .data
                    .get("pressures")
                    .and_then(|v| v.as_array())
                    .ok_or_else(|| PipelineError::malformed("pressure", "missing `pressures`"))?;
                let pressures = values
                    .iter()
                    .map(|v| v.as_f64())
                    .collect::<Option<Vec<f64>>>()
                    .ok_or_else(|| PipelineError::malformed("pressure", "non-numeric pressure value"))?;
                if pressures.is_empty() {
                    return Err(PipelineError::malformed("pressure", "no pressure cells"));
                }
                SensorData::Pressure(pressures)
            }
        };

        Ok(RawSample { timestamp, data })
    }
}

/// Sensor operational status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorStatus {
    Disconnected,
    Connected,
    Streaming,
    Exhausted,
    Error,
}

/// Trait for every sample transport (BLE bridge, simulator, replay file)
#[async_trait]
pub trait Sensor: Send {
    /// Get sensor unique identifier
    fn id(&self) -> &str;

    /// Get current status
    fn status(&self) -> SensorStatus;

    /// Open the underlying transport
    async fn connect(&mut self) -> Result<()>;

    /// Close the underlying transport
    async fn disconnect(&mut self) -> Result<()>;

    /// Next tagged sample as delivered by the transport, or `None` once the
    /// stream has ended. Classification happens downstream in the pipeline.
    async fn read(&mut self) -> Result<Option<WireSample>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(json: &str) -> WireSample {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_decode_accelerometer() {
        let sample = RawSample::try_from(wire(
            r#"{"type":"accelerometer","timestamp":0.1,"data":{"ax":0.0,"ay":1.2,"az":0.0}}"#,
        ))
        .unwrap();

        assert_eq!(sample, RawSample::accelerometer(0.1, 0.0, 1.2, 0.0));
        assert_eq!(sample.modality(), Modality::Accelerometer);
    }

    #[test]
    fn test_decode_pressure() {
        let sample = RawSample::try_from(wire(
            r#"{"type":"pressure","timestamp":2.0,"data":{"pressures":[0.1,0.4,0.2]}}"#,
        ))
        .unwrap();

        assert_eq!(sample.data, SensorData::Pressure(vec![0.1, 0.4, 0.2]));
    }

    #[test]
    fn test_unknown_modality_is_classification_error() {
        let err = RawSample::try_from(wire(r#"{"type":"magnetometer","timestamp":1.0,"data":{}}"#))
            .unwrap_err();

        assert_eq!(err, PipelineError::UnknownModality("magnetometer".to_string()));
    }

    #[test]
    fn test_missing_fields_are_malformed() {
        let no_time = RawSample::try_from(wire(r#"{"type":"gyroscope","data":{"gx":1,"gy":2,"gz":3}}"#));
        assert!(matches!(no_time, Err(PipelineError::MalformedSample { .. })));

        let no_axis = RawSample::try_from(wire(
            r#"{"type":"gyroscope","timestamp":1.0,"data":{"gx":1,"gy":2}}"#,
        ));
        assert!(matches!(no_axis, Err(PipelineError::MalformedSample { .. })));

        let empty = RawSample::try_from(wire(
            r#"{"type":"pressure","timestamp":1.0,"data":{"pressures":[]}}"#,
        ));
        assert!(matches!(empty, Err(PipelineError::MalformedSample { .. })));
    }

    #[test]
    fn test_wire_form_matches_transport_shape() {
        let wire = WireSample::from(&RawSample::gyroscope(3.0, 0.1, 0.2, 0.3));
        let json = serde_json::to_value(&wire).unwrap();

        assert_eq!(json["type"], "gyroscope");
        assert_eq!(json["data"]["gy"], 0.2);
        assert_eq!(RawSample::try_from(wire).unwrap().modality(), Modality::Gyroscope);
    }
}
