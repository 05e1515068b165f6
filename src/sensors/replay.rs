//! Replays recorded sessions stored as JSON lines of tagged samples

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use super::{Sensor, SensorStatus, WireSample};

/// Longest pause honoured between two replayed samples
const MAX_REPLAY_GAP_S: f64 = 1.0;

pub struct ReplaySensor {
    id: String,
    path: PathBuf,
    status: SensorStatus,
    samples: VecDeque<WireSample>,
    realtime: bool,
    last_timestamp: Option<f64>,
}

impl ReplaySensor {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "replay".to_string());

        Self {
            id,
            path,
            status: SensorStatus::Disconnected,
            samples: VecDeque::new(),
            realtime: false,
            last_timestamp: None,
        }
    }

    /// Sleep for the recorded gap between consecutive samples
    pub fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    /// Blank lines and lines starting with `#` are ignored; lines that are not
    /// a tagged sample are logged and skipped.
    pub fn parse(content: &str) -> VecDeque<WireSample> {
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with('#')
            })
            .filter_map(|(n, line)| match serde_json::from_str::<WireSample>(line) {
                Ok(sample) => Some(sample),
                Err(e) => {
                    warn!("Skipping line {}: {}", n + 1, e);
                    None
                }
            })
            .collect()
    }

    pub fn remaining(&self) -> usize {
        self.samples.len()
    }
}

#[async_trait]
impl Sensor for ReplaySensor {
    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> SensorStatus {
        self.status
    }

    async fn connect(&mut self) -> Result<()> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading replay file {}", self.path.display()))?;

        self.samples = Self::parse(&content);
        self.last_timestamp = None;
        self.status = SensorStatus::Streaming;
        info!("Replaying {} samples from {}", self.samples.len(), self.path.display());
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if self.status != SensorStatus::Exhausted {
            self.status = SensorStatus::Disconnected;
        }
        Ok(())
    }

    async fn read(&mut self) -> Result<Option<WireSample>> {
        match self.status {
            SensorStatus::Streaming => {}
            SensorStatus::Exhausted => return Ok(None),
            _ => bail!("Replay {} is not connected", self.id),
        }

        let Some(sample) = self.samples.pop_front() else {
            self.status = SensorStatus::Exhausted;
            return Ok(None);
        };

        if self.realtime {
            if let (Some(prev), Some(now)) = (self.last_timestamp, sample.timestamp) {
                let gap = (now - prev).clamp(0.0, MAX_REPLAY_GAP_S);
                tokio::time::sleep(Duration::from_secs_f64(gap)).await;
            }
        }
        if sample.timestamp.is_some() {
            self.last_timestamp = sample.timestamp;
        }

        Ok(Some(sample))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SESSION: &str = r#"
# recorded on the hallway test rig
{"type":"accelerometer","timestamp":0.0,"data":{"ax":0.0,"ay":1.1,"az":0.0}}
not json at all
{"type":"barometer","timestamp":0.02,"data":{"hpa":1013.2}}

{"type":"pressure","timestamp":0.04,"data":{"pressures":[0.3,0.2,0.3,0.1]}}
"#;

    #[test]
    fn test_parse_skips_comments_and_garbage() {
        let samples = ReplaySensor::parse(SESSION);
        let kinds: Vec<&str> = samples.iter().map(|s| s.kind.as_str()).collect();
        assert_eq!(kinds, vec!["accelerometer", "barometer", "pressure"]);
    }

    #[tokio::test]
    async fn test_replay_file_until_exhausted() {
        let path = std::env::temp_dir().join(format!("stridewatch-replay-{}.jsonl", std::process::id()));
        std::fs::write(&path, SESSION).unwrap();

        let mut sensor = ReplaySensor::new(&path);
        assert!(sensor.read().await.is_err());

        sensor.connect().await.unwrap();
        assert_eq!(sensor.remaining(), 3);

        let mut timestamps = Vec::new();
        while let Some(sample) = sensor.read().await.unwrap() {
            timestamps.push(sample.timestamp.unwrap());
        }
        assert_eq!(timestamps, vec![0.0, 0.02, 0.04]);
        assert_eq!(sensor.status(), SensorStatus::Exhausted);

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_missing_file_fails_to_connect() {
        let mut sensor = ReplaySensor::new("/nonexistent/stridewatch/session.jsonl");
        assert!(sensor.connect().await.is_err());
        assert_eq!(sensor.status(), SensorStatus::Disconnected);
    }
}
