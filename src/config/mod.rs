// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Configuration module

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::sensors::Axis;

/// Environment variable overriding `cloud.url`
pub const ENV_CLOUD_URL: &str = "STRIDEWATCH_CLOUD_URL";
/// Environment variable overriding `cloud.api_key`
pub const ENV_CLOUD_KEY: &str = "STRIDEWATCH_CLOUD_KEY";
/// Environment variable overriding `cloud.user_id`
pub const ENV_USER_ID: &str = "STRIDEWATCH_USER_ID";

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (`error`, `warn`, `info`, `debug`, `trace` or an EnvFilter directive)
    pub log_level: String,

    /// Use the gait simulator instead of a hardware transport
    pub demo_mode: bool,

    /// Sensor configuration
    pub sensor: SensorConfig,

    /// Feature extraction configuration
    pub features: FeatureConfig,

    /// Step detection configuration
    pub step_detection: StepDetectionConfig,

    /// Gait metric configuration
    pub gait: GaitConfig,

    /// Fall detection configuration
    pub fall_detection: FallDetectionConfig,

    /// Gait anomaly configuration
    pub anomaly_detection: AnomalyDetectionConfig,

    /// Cloud backend configuration
    pub cloud: CloudConfig,

    /// MQTT publishing configuration
    pub mqtt: MqttConfig,

    /// Caching and upload configuration
    pub data: DataConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            demo_mode: true,
            sensor: SensorConfig::default(),
            features: FeatureConfig::default(),
            step_detection: StepDetectionConfig::default(),
            gait: GaitConfig::default(),
            fall_detection: FallDetectionConfig::default(),
            anomaly_detection: AnomalyDetectionConfig::default(),
            cloud: CloudConfig::default(),
            mqtt: MqttConfig::default(),
            data: DataConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("stridewatch"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Apply cloud credential overrides from the environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_CLOUD_URL) {
            self.cloud.url = Some(url);
        }
        if let Some(key) = lookup(ENV_CLOUD_KEY) {
            self.cloud.api_key = key;
        }
        if let Some(user) = lookup(ENV_USER_ID) {
            self.cloud.user_id = user;
        }
    }

    /// Check every threshold the analysis pipeline depends on
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(ConfigError::NotPositive { field, value })
            }
        }

        if self.features.window_size < 2 {
            return Err(ConfigError::WindowTooSmall(self.features.window_size));
        }
        positive("sensor.sample_rate_hz", self.sensor.sample_rate_hz)?;
        positive("step_detection.acc_threshold_g", self.step_detection.acc_threshold_g)?;
        positive(
            "step_detection.min_step_interval_ms",
            self.step_detection.min_step_interval_ms as f64,
        )?;
        positive(
            "step_detection.pressure_confirm_threshold",
            self.step_detection.pressure_confirm_threshold,
        )?;
        positive("gait.window_size_s", self.gait.window_size_s)?;
        positive("fall_detection.impact_threshold_g", self.fall_detection.impact_threshold_g)?;
        positive("fall_detection.inactivity_time_s", self.fall_detection.inactivity_time_s)?;
        positive(
            "fall_detection.low_activity_threshold",
            self.fall_detection.low_activity_threshold,
        )?;
        positive(
            "anomaly_detection.speed_deviation_threshold",
            self.anomaly_detection.speed_deviation_threshold,
        )?;
        positive(
            "anomaly_detection.cadence_variation_threshold",
            self.anomaly_detection.cadence_variation_threshold,
        )?;
        positive("data.upload_interval_s", self.data.upload_interval_s as f64)?;
        if self.data.cache_capacity == 0 {
            return Err(ConfigError::NotPositive {
                field: "data.cache_capacity",
                value: 0.0,
            });
        }
        if self.cloud.url.is_some() && self.cloud.user_id.is_empty() {
            return Err(ConfigError::Empty("cloud.user_id"));
        }
        if self.mqtt.enabled && self.mqtt.broker.is_empty() {
            return Err(ConfigError::Empty("mqtt.broker"));
        }
        Ok(())
    }
}

/// Sensor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// BLE advertised name of the slipper
    pub device_name: String,

    /// Number of insole pressure cells
    pub num_pressure_sensors: usize,

    /// Sample rate in Hz
    pub sample_rate_hz: f64,

    /// Seconds to wait between connection attempts
    pub connection_retry_interval_s: u64,

    /// Capacity of the channel between transport and pipeline
    pub channel_capacity: usize,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            device_name: "StrideWatch-Slipper".to_string(),
            num_pressure_sensors: 4,
            sample_rate_hz: 50.0,
            connection_retry_interval_s: 10,
            channel_capacity: 1024,
        }
    }
}

/// Feature extraction configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Samples kept per modality window
    pub window_size: usize,

    /// Accelerometer axis aligned with gravity
    pub vertical_axis: Axis,

    /// Gyroscope axis normal to the sagittal plane
    pub sagittal_axis: Axis,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            window_size: 100,
            vertical_axis: Axis::Y,
            sagittal_axis: Axis::Y,
        }
    }
}

/// Step detection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepDetectionConfig {
    /// Minimum |vertical acceleration| for a foot-strike, in g
    pub acc_threshold_g: f64,

    /// Refractory period after an accepted step
    pub min_step_interval_ms: u64,

    /// Minimum total insole pressure confirming the foot is down
    pub pressure_confirm_threshold: f64,
}

impl Default for StepDetectionConfig {
    fn default() -> Self {
        Self {
            acc_threshold_g: 1.2,
            min_step_interval_ms: 300,
            pressure_confirm_threshold: 0.5,
        }
    }
}

impl StepDetectionConfig {
    pub fn min_step_interval_s(&self) -> f64 {
        self.min_step_interval_ms as f64 / 1000.0
    }
}

/// Gait metric configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaitConfig {
    /// Age limit of step events kept in the step buffer
    pub window_size_s: f64,
}

impl Default for GaitConfig {
    fn default() -> Self {
        Self { window_size_s: 10.0 }
    }
}

/// Fall detection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallDetectionConfig {
    /// Acceleration magnitude treated as an impact, in g
    pub impact_threshold_g: f64,

    /// Stillness required after an impact before a fall is reported
    pub inactivity_time_s: f64,

    /// Acceleration magnitude below which the wearer counts as still
    pub low_activity_threshold: f64,
}

impl Default for FallDetectionConfig {
    fn default() -> Self {
        Self {
            impact_threshold_g: 2.5,
            inactivity_time_s: 2.0,
            low_activity_threshold: 0.2,
        }
    }
}

/// Gait anomaly configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyDetectionConfig {
    /// Relative gait-speed deviation from baseline that raises a warning
    pub speed_deviation_threshold: f64,

    /// Step-time coefficient of variation that raises a warning
    pub cadence_variation_threshold: f64,
}

impl Default for AnomalyDetectionConfig {
    fn default() -> Self {
        Self {
            speed_deviation_threshold: 0.3,
            cadence_variation_threshold: 0.2,
        }
    }
}

/// Cloud backend configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    /// REST base URL; cloud delivery is disabled when unset
    pub url: Option<String>,

    /// API key sent as `apikey` and bearer token
    pub api_key: String,

    /// Identifier of the monitored wearer
    pub user_id: String,

    /// Request timeout in seconds
    pub timeout_s: u64,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: String::new(),
            user_id: String::new(),
            timeout_s: 10,
        }
    }
}

/// MQTT publishing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub enabled: bool,
    pub broker: String,
    pub port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Topic prefix; alerts go to `<prefix>/alerts`, metric batches to `<prefix>/gait`
    pub topic_prefix: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            broker: "localhost".to_string(),
            port: 1883,
            client_id: "stridewatch".to_string(),
            username: None,
            password: None,
            topic_prefix: "stridewatch".to_string(),
        }
    }
}

/// Caching and upload configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Seconds between bulk uploads of cached gait metrics
    pub upload_interval_s: u64,

    /// Maximum number of cached gait metric records
    pub cache_capacity: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            upload_interval_s: 300,
            cache_capacity: 2048,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.features.window_size, 100);
        assert_eq!(config.features.vertical_axis, Axis::Y);
        assert_eq!(config.step_detection.pressure_confirm_threshold, 0.5);
        assert_eq!(config.fall_detection.low_activity_threshold, 0.2);
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            [fall_detection]
            impact_threshold_g = 3.0

            [features]
            vertical_axis = "z"
            "#,
        )
        .unwrap();

        assert_eq!(config.fall_detection.impact_threshold_g, 3.0);
        assert_eq!(config.fall_detection.inactivity_time_s, 2.0);
        assert_eq!(config.features.vertical_axis, Axis::Z);
        assert_eq!(config.features.window_size, 100);
    }

    #[test]
    fn test_validation_rejects_bad_thresholds() {
        let mut config = Config::default();
        config.features.window_size = 1;
        assert_eq!(config.validate(), Err(ConfigError::WindowTooSmall(1)));

        let mut config = Config::default();
        config.fall_detection.inactivity_time_s = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotPositive { field: "fall_detection.inactivity_time_s", .. })
        ));

        let mut config = Config::default();
        config.cloud.url = Some("https://example.invalid".to_string());
        assert_eq!(config.validate(), Err(ConfigError::Empty("cloud.user_id")));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            ENV_CLOUD_URL => Some("https://cloud.example".to_string()),
            ENV_USER_ID => Some("wearer-7".to_string()),
            _ => None,
        });

        assert_eq!(config.cloud.url.as_deref(), Some("https://cloud.example"));
        assert_eq!(config.cloud.user_id, "wearer-7");
        assert!(config.cloud.api_key.is_empty());
    }

    #[test]
    fn test_load_or_create_writes_defaults() {
        let dir = std::env::temp_dir().join(format!("stridewatch-config-{}", std::process::id()));
        let path = dir.join("config.toml");
        let _ = std::fs::remove_file(&path);

        let created = Config::load_or_create(&path).unwrap();
        let loaded = Config::load(&path).unwrap();
        assert_eq!(created, loaded);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
