//! Network module - alert delivery and gait metric uploads

mod cache;
mod mqtt;
mod rest;

pub use cache::*;
pub use mqtt::*;
pub use rest::*;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::Config;
use crate::detection::Alert;
use crate::error::NetworkError;

/// Destination for alerts that must leave the device immediately
#[async_trait]
pub trait AlertSink: Send + Sync {
    fn name(&self) -> &str;

    async fn deliver(&self, alert: &Alert) -> Result<(), NetworkError>;
}

/// Destination for periodic batches of cached gait metrics
#[async_trait]
pub trait MetricsUploader: Send + Sync {
    async fn upload(&self, batch: &[UploadRecord]) -> Result<(), NetworkError>;
}

/// Offline fallback: alerts and batches only go to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl AlertSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn deliver(&self, alert: &Alert) -> Result<(), NetworkError> {
        warn!("[{}] {} ({})", alert.severity, alert.message, alert.alert_type);
        Ok(())
    }
}

#[async_trait]
impl MetricsUploader for LogSink {
    async fn upload(&self, batch: &[UploadRecord]) -> Result<(), NetworkError> {
        if let Some(last) = batch.last() {
            info!(
                "{} gait records pending (latest cadence {:.1} steps/min, speed {:.2} m/s)",
                batch.len(),
                last.metrics.cadence,
                last.metrics.gait_speed
            );
        }
        Ok(())
    }
}

/// Routes alerts and uploads to every configured outlet
pub struct NetworkManager {
    rest: Option<RestClient>,
    mqtt: Option<MqttPublisher>,
    log: LogSink,
}

impl NetworkManager {
    /// Must be called from within a tokio runtime when MQTT is enabled
    pub fn new(config: &Config) -> Result<Self, NetworkError> {
        let rest = match config.cloud.url.as_deref() {
            Some(url) if !url.is_empty() => Some(RestClient::new(url, &config.cloud)?),
            _ => None,
        };

        let mqtt = if config.mqtt.enabled {
            Some(MqttPublisher::connect(&config.mqtt))
        } else {
            None
        };

        if rest.is_none() && mqtt.is_none() {
            info!("No cloud URL or MQTT broker configured, alerts will only be logged");
        }

        Ok(Self {
            rest,
            mqtt,
            log: LogSink,
        })
    }

    pub fn rest(&self) -> Option<&RestClient> {
        self.rest.as_ref()
    }

    pub fn is_offline(&self) -> bool {
        self.rest.is_none() && self.mqtt.is_none()
    }

    pub async fn shutdown(&self) {
        if let Some(ref mqtt) = self.mqtt {
            if let Err(e) = mqtt.disconnect().await {
                warn!("{}", e);
            }
        }
    }
}

/// Every outlet is attempted; the first failure is reported
fn first_error(results: impl IntoIterator<Item = Result<(), NetworkError>>) -> Result<(), NetworkError> {
    let mut outcome = Ok(());
    for result in results {
        if let Err(e) = result {
            if outcome.is_ok() {
                outcome = Err(e);
            } else {
                warn!("{}", e);
            }
        }
    }
    outcome
}

#[async_trait]
impl AlertSink for NetworkManager {
    fn name(&self) -> &str {
        "network"
    }

    async fn deliver(&self, alert: &Alert) -> Result<(), NetworkError> {
        if self.is_offline() {
            return self.log.deliver(alert).await;
        }

        let mut results = Vec::with_capacity(2);
        if let Some(ref rest) = self.rest {
            results.push(rest.deliver(alert).await);
        }
        if let Some(ref mqtt) = self.mqtt {
            results.push(mqtt.deliver(alert).await);
        }
        first_error(results)
    }
}

#[async_trait]
impl MetricsUploader for NetworkManager {
    async fn upload(&self, batch: &[UploadRecord]) -> Result<(), NetworkError> {
        if self.is_offline() {
            return self.log.upload(batch).await;
        }

        let mut results = Vec::with_capacity(2);
        if let Some(ref rest) = self.rest {
            results.push(rest.upload(batch).await);
        }
        if let Some(ref mqtt) = self.mqtt {
            results.push(mqtt.upload(batch).await);
        }
        first_error(results)
    }
}
