// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! MQTT publisher for alerts and gait metric batches

use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{AlertSink, MetricsUploader, UploadRecord};
use crate::config::MqttConfig;
use crate::detection::Alert;
use crate::error::NetworkError;

const KEEP_ALIVE_SECS: u64 = 30;
const RECONNECT_DELAY_SECS: u64 = 5;

pub struct MqttPublisher {
    client: AsyncClient,
    topic_prefix: String,
    eventloop: JoinHandle<()>,
}

impl MqttPublisher {
    /// Must be called from within a tokio runtime; the event loop is spawned
    /// onto it and reconnects on its own.
    pub fn connect(config: &MqttConfig) -> Self {
        let mut options = MqttOptions::new(&config.client_id, &config.broker, config.port);
        options.set_keep_alive(Duration::from_secs(KEEP_ALIVE_SECS));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username, password);
        }

        let (client, mut eventloop) = AsyncClient::new(options, 100);

        let eventloop = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("MQTT connected");
                    }
                    Ok(Event::Incoming(Packet::PubAck(ack))) => {
                        debug!("MQTT publish {} acknowledged", ack.pkid);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("MQTT error: {:?}", e);
                        tokio::time::sleep(Duration::from_secs(RECONNECT_DELAY_SECS)).await;
                    }
                }
            }
        });

        info!("MQTT publisher initialized for {}:{}", config.broker, config.port);

        Self {
            client,
            topic_prefix: config.topic_prefix.trim_end_matches('/').to_string(),
            eventloop,
        }
    }

    pub fn topic(&self, leaf: &str) -> String {
        format!("{}/{}", self.topic_prefix, leaf)
    }

    async fn publish<T: Serialize + ?Sized>(&self, leaf: &str, payload: &T) -> Result<(), NetworkError> {
        let json = serde_json::to_vec(payload)?;
        self.client
            .publish(self.topic(leaf), QoS::AtLeastOnce, false, json)
            .await
            .map_err(|e| NetworkError::Mqtt(format!("publish failed: {}", e)))
    }

    pub async fn disconnect(&self) -> Result<(), NetworkError> {
        self.client
            .disconnect()
            .await
            .map_err(|e| NetworkError::Mqtt(format!("disconnect failed: {}", e)))
    }
}

impl Drop for MqttPublisher {
    fn drop(&mut self) {
        self.eventloop.abort();
    }
}

#[async_trait]
impl AlertSink for MqttPublisher {
    fn name(&self) -> &str {
        "mqtt"
    }

    async fn deliver(&self, alert: &Alert) -> Result<(), NetworkError> {
        self.publish("alerts", alert).await
    }
}

#[async_trait]
impl MetricsUploader for MqttPublisher {
    async fn upload(&self, batch: &[UploadRecord]) -> Result<(), NetworkError> {
        if batch.is_empty() {
            return Ok(());
        }
        self.publish("gait", batch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_topics_use_prefix() {
        let config = MqttConfig {
            topic_prefix: "home/hall/".to_string(),
            ..MqttConfig::default()
        };
        let publisher = MqttPublisher::connect(&config);

        assert_eq!(publisher.topic("alerts"), "home/hall/alerts");
        assert_eq!(publisher.topic("gait"), "home/hall/gait");
    }
}
