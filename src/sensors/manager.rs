// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Sensor feed - keeps one sensor connected and pumps its samples to the engine

use std::time::Duration;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};

use super::{Sensor, WireSample};

/// Counters reported when the feed stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStats {
    pub samples_forwarded: u64,
    pub connect_failures: u64,
    pub read_errors: u64,
}

pub struct SensorFeed {
    sensor: Box<dyn Sensor>,
    retry_interval: Duration,
    stats: FeedStats,
}

enum Outcome {
    Shutdown,
    Exhausted,
    ReceiverClosed,
    ReadFailed,
}

impl SensorFeed {
    pub fn new(sensor: Box<dyn Sensor>, retry_interval: Duration) -> Self {
        Self {
            sensor,
            retry_interval,
            stats: FeedStats::default(),
        }
    }

    /// Connect (retrying every `retry_interval`), then forward samples until
    /// the sensor runs dry, the engine hangs up or shutdown is signalled.
    /// A read error drops the connection and reconnects after `retry_interval`.
    pub async fn run(mut self, tx: mpsc::Sender<WireSample>, mut shutdown: broadcast::Receiver<()>) -> Result<FeedStats> {
        let id = self.sensor.id().to_string();
        info!("Starting sensor feed for {}", id);

        loop {
            if !self.connect(&mut shutdown).await {
                break;
            }

            match self.pump(&tx, &mut shutdown).await {
                Outcome::ReadFailed => {
                    if let Err(e) = self.sensor.disconnect().await {
                        warn!("Error disconnecting {}: {}", id, e);
                    }
                    tokio::select! {
                        _ = tokio::time::sleep(self.retry_interval) => continue,
                        _ = shutdown.recv() => info!("Sensor feed for {} shutting down...", id),
                    }
                }
                Outcome::Exhausted => info!("Sensor {} has no more samples", id),
                Outcome::ReceiverClosed => info!("Engine stopped accepting samples from {}", id),
                Outcome::Shutdown => info!("Sensor feed for {} shutting down...", id),
            }
            break;
        }

        if let Err(e) = self.sensor.disconnect().await {
            warn!("Error disconnecting {}: {}", id, e);
        }
        Ok(self.stats)
    }

    /// Returns `false` when shutdown arrived before a connection was made
    async fn connect(&mut self, shutdown: &mut broadcast::Receiver<()>) -> bool {
        loop {
            match self.sensor.connect().await {
                Ok(()) => {
                    info!("Connected sensor: {}", self.sensor.id());
                    return true;
                }
                Err(e) => {
                    self.stats.connect_failures += 1;
                    error!(
                        "Failed to connect sensor {}: {}; retrying in {:?}",
                        self.sensor.id(),
                        e,
                        self.retry_interval
                    );
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.retry_interval) => {}
                _ = shutdown.recv() => return false,
            }
        }
    }

    async fn pump(&mut self, tx: &mpsc::Sender<WireSample>, shutdown: &mut broadcast::Receiver<()>) -> Outcome {
        loop {
            let read = tokio::select! {
                _ = shutdown.recv() => return Outcome::Shutdown,
                read = self.sensor.read() => read,
            };

            match read {
                Ok(Some(sample)) => {
                    if tx.send(sample).await.is_err() {
                        return Outcome::ReceiverClosed;
                    }
                    self.stats.samples_forwarded += 1;
                }
                Ok(None) => return Outcome::Exhausted,
                Err(e) => {
                    self.stats.read_errors += 1;
                    warn!(
                        "Read error for {}: {}; reconnecting in {:?}",
                        self.sensor.id(),
                        e,
                        self.retry_interval
                    );
                    return Outcome::ReadFailed;
                }
            }
        }
    }
}
