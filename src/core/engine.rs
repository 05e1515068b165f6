//! Main engine - drives the pipeline from the sample channel and routes its
//! output to the bus, the alert sink and the upload cache

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Utc;
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, info, warn};

use super::{EngineStats, EventBus, Pipeline, PipelineOutput};
use crate::config::Config;
use crate::network::{AlertSink, MetricsCache, MetricsUploader};
use crate::sensors::WireSample;

pub struct Engine {
    pub config: Arc<Config>,
    pipeline: Pipeline,
    bus: Arc<EventBus>,
    alert_sink: Arc<dyn AlertSink>,
    uploader: Arc<dyn MetricsUploader>,
    cache: MetricsCache,
    stats: Arc<RwLock<EngineStats>>,
    start_time: Option<Instant>,
}

impl Engine {
    pub fn new(
        config: Config,
        bus: Arc<EventBus>,
        alert_sink: Arc<dyn AlertSink>,
        uploader: Arc<dyn MetricsUploader>,
    ) -> Self {
        let pipeline = Pipeline::new(&config);
        let cache = MetricsCache::new(config.data.cache_capacity);

        Self {
            config: Arc::new(config),
            pipeline,
            bus,
            alert_sink,
            uploader,
            cache,
            stats: Arc::new(RwLock::new(EngineStats::default())),
            start_time: None,
        }
    }

    /// Process samples until the channel closes or shutdown is signalled,
    /// uploading cached metrics every `upload_interval_s`. Pending metrics
    /// are flushed once more before returning.
    pub async fn run(
        &mut self,
        mut samples: mpsc::Receiver<WireSample>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<EngineStats> {
        info!("Starting StrideWatch engine...");
        self.start_time = Some(Instant::now());
        self.stats.write().await.running = true;

        let period = Duration::from_secs(self.config.data.upload_interval_s.max(1));
        let mut upload_tick = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
                sample = samples.recv() => match sample {
                    Some(sample) => {
                        self.handle(sample).await;
                    }
                    None => {
                        info!("Sample stream closed");
                        break;
                    }
                },
                _ = upload_tick.tick() => {
                    self.flush().await;
                }
            }
        }

        self.flush().await;

        let mut stats = self.stats.write().await;
        stats.running = false;
        stats.uptime_seconds = self.uptime();
        info!(
            "StrideWatch engine stopped after {} samples ({} dropped), {} alerts",
            stats.samples_processed, stats.samples_dropped, stats.alerts_raised
        );
        Ok(stats.clone())
    }

    /// Run one tagged sample through the pipeline and route what it produced.
    ///
    /// Unclassifiable samples are logged and dropped; `None` is returned.
    pub async fn handle(&mut self, sample: WireSample) -> Option<PipelineOutput> {
        let output = match self.pipeline.ingest(sample) {
            Ok(output) => output,
            Err(e) => {
                warn!("Dropping sample: {}", e);
                self.bus.publish_dropped(&e.to_string());
                self.stats.write().await.samples_dropped += 1;
                return None;
            }
        };

        {
            let mut stats = self.stats.write().await;
            stats.samples_processed += 1;
            if output.features.is_some() {
                stats.features_emitted += 1;
            }
            stats.alerts_raised += output.alerts.len() as u64;
        }

        if let Some(ref metrics) = output.metrics {
            if self.cache.push(metrics.clone(), Utc::now()) {
                self.bus.publish_metrics(metrics.clone());
            }
        }

        for alert in &output.alerts {
            self.bus.publish_alert(alert.clone());

            if !alert.is_critical() {
                debug!("Gait alert: {}", alert.message);
                continue;
            }

            warn!("CRITICAL alert: {}", alert.message);
            match self.alert_sink.deliver(alert).await {
                Ok(()) => self.stats.write().await.alerts_delivered += 1,
                Err(e) => {
                    warn!("Failed to deliver {} alert via {}: {}", alert.alert_type, self.alert_sink.name(), e);
                    self.stats.write().await.delivery_failures += 1;
                }
            }
        }

        Some(output)
    }

    /// Upload everything cached; a failed batch is logged and discarded
    pub async fn flush(&mut self) {
        let batch = self.cache.drain();
        if batch.is_empty() {
            return;
        }

        let ok = match self.uploader.upload(&batch).await {
            Ok(()) => {
                debug!("Uploaded {} gait records", batch.len());
                true
            }
            Err(e) => {
                warn!("Failed to upload {} gait records: {}", batch.len(), e);
                false
            }
        };
        self.bus.publish_upload(batch.len(), ok);

        let mut stats = self.stats.write().await;
        if ok {
            stats.uploads += 1;
            stats.records_uploaded += batch.len() as u64;
        } else {
            stats.upload_failures += 1;
        }
    }

    pub async fn stats(&self) -> EngineStats {
        let mut stats = self.stats.read().await.clone();
        stats.uptime_seconds = self.uptime();
        stats.cached_records = self.cache.len();
        stats
    }

    /// Shared handle for observers running on other tasks
    pub fn stats_handle(&self) -> Arc<RwLock<EngineStats>> {
        Arc::clone(&self.stats)
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn uptime(&self) -> u64 {
        self.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{Alert, AlertType};
    use crate::error::NetworkError;
    use crate::network::UploadRecord;
    use crate::sensors::RawSample;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        alerts: Mutex<Vec<Alert>>,
        batches: Mutex<Vec<usize>>,
        fail: bool,
    }

    #[async_trait]
    impl AlertSink for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        async fn deliver(&self, alert: &Alert) -> Result<(), NetworkError> {
            if self.fail {
                return Err(NetworkError::Mqtt("unreachable".to_string()));
            }
            self.alerts.lock().push(alert.clone());
            Ok(())
        }
    }

    #[async_trait]
    impl MetricsUploader for Recorder {
        async fn upload(&self, batch: &[UploadRecord]) -> Result<(), NetworkError> {
            if self.fail {
                return Err(NetworkError::Mqtt("unreachable".to_string()));
            }
            self.batches.lock().push(batch.len());
            Ok(())
        }
    }

    fn engine(recorder: Arc<Recorder>) -> Engine {
        Engine::new(Config::default(), Arc::new(EventBus::default()), recorder.clone(), recorder)
    }

    fn wire(sample: RawSample) -> WireSample {
        WireSample::from(&sample)
    }

    /// Impact followed by stillness
    fn fall_sequence() -> Vec<WireSample> {
        let step = Config::default().fall_detection.inactivity_time_s / 3.0 + 0.01;
        let mut samples = vec![
            wire(RawSample::accelerometer(0.0, 0.0, 0.0, 0.0)),
            wire(RawSample::accelerometer(0.02, 0.5, 3.6, 0.5)),
        ];
        for i in 1..=3 {
            let t = 0.02 + i as f64 * step;
            samples.push(wire(RawSample::accelerometer(t, 0.01, 0.05, 0.01)));
        }
        samples
    }

    #[tokio::test]
    async fn test_critical_alert_is_delivered_and_published() {
        let recorder = Arc::new(Recorder::default());
        let mut engine = engine(recorder.clone());
        let mut alerts = engine.bus.subscribe_alerts();

        for sample in fall_sequence() {
            engine.handle(sample).await;
        }

        let delivered = recorder.alerts.lock().clone();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].alert_type, AlertType::Fall);
        assert_eq!(alerts.try_recv().unwrap().alert_type, AlertType::Fall);

        let stats = engine.stats().await;
        assert_eq!(stats.samples_processed, 5);
        assert_eq!(stats.alerts_raised, 1);
        assert_eq!(stats.alerts_delivered, 1);
    }

    #[tokio::test]
    async fn test_warning_alerts_are_published_but_not_delivered() {
        let recorder = Arc::new(Recorder::default());
        let mut engine = engine(recorder.clone());
        let mut alerts = engine.bus.subscribe_alerts();

        // Uneven step timing: intervals of 0.4s then 1.0s
        engine.handle(wire(RawSample::pressure(0.0, vec![0.4, 0.3, 0.2, 0.3]))).await;
        for t in [0.01, 0.41, 1.41] {
            engine.handle(wire(RawSample::accelerometer(t, 0.1, 1.6, 0.1))).await;
        }

        let mut published = Vec::new();
        while let Ok(alert) = alerts.try_recv() {
            published.push(alert);
        }
        assert!(published.iter().any(|a| a.alert_type == AlertType::IrregularCadence));
        assert!(published.iter().all(|a| !a.is_critical()));
        assert!(recorder.alerts.lock().is_empty());

        let stats = engine.stats().await;
        assert_eq!(stats.alerts_raised, published.len() as u64);
        assert_eq!(stats.alerts_delivered, 0);
    }

    #[tokio::test]
    async fn test_delivery_failure_does_not_stop_processing() {
        let recorder = Arc::new(Recorder {
            fail: true,
            ..Recorder::default()
        });
        let mut engine = engine(recorder);

        for sample in fall_sequence() {
            engine.handle(sample).await;
        }
        assert!(engine
            .handle(wire(RawSample::accelerometer(5.0, 0.0, 0.1, 0.0)))
            .await
            .is_some());

        let stats = engine.stats().await;
        assert_eq!(stats.delivery_failures, 1);
        assert_eq!(stats.samples_processed, 6);
    }

    #[tokio::test]
    async fn test_unknown_modality_is_counted_as_dropped() {
        let mut engine = engine(Arc::new(Recorder::default()));
        let mut events = engine.bus.subscribe_events();
        let bad: WireSample = serde_json::from_str(r#"{"type":"magnetometer","timestamp":1.0,"data":{}}"#).unwrap();

        assert!(engine.handle(bad).await.is_none());
        assert_eq!(engine.stats().await.samples_dropped, 1);
        assert_eq!(events.try_recv().unwrap().event_type, crate::core::EventType::SampleDropped);
    }

    #[tokio::test]
    async fn test_run_flushes_metrics_when_stream_closes() {
        let recorder = Arc::new(Recorder::default());
        let mut engine = engine(recorder.clone());
        let (tx, rx) = mpsc::channel(64);
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

        for i in 0..6 {
            let t = i as f64 * 0.5;
            tx.send(wire(RawSample::pressure(t, vec![0.4, 0.3, 0.2, 0.3]))).await.unwrap();
            tx.send(wire(RawSample::accelerometer(t + 0.01, 0.1, 1.6, 0.1))).await.unwrap();
            tx.send(wire(RawSample::accelerometer(t + 0.25, 0.0, 0.3, 0.0))).await.unwrap();
        }
        drop(tx);

        let stats = engine.run(rx, shutdown_rx).await.unwrap();

        assert_eq!(stats.samples_processed, 18);
        assert!(!stats.running);
        assert_eq!(stats.uploads, 1);
        let batches = recorder.batches.lock().clone();
        assert_eq!(batches.len(), 1);
        assert!(batches[0] > 0);
        assert_eq!(engine.stats().await.cached_records, 0);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let mut engine = engine(Arc::new(Recorder::default()));
        let (_tx, rx) = mpsc::channel::<WireSample>(4);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        shutdown_tx.send(()).unwrap();
        let stats = engine.run(rx, shutdown_rx).await.unwrap();
        assert_eq!(stats.samples_processed, 0);
    }
}
