//! Synchronous per-sample pipeline: features -> gait metrics -> alerts

use serde::Serialize;

use crate::analysis::{FeatureExtractor, FeatureRecord, GaitAnalyzer, GaitMetrics};
use crate::config::Config;
use crate::detection::{Alert, AnomalyDetector};
use crate::error::PipelineError;
use crate::sensors::{RawSample, WireSample};

/// Everything one sample produced
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineOutput {
    pub features: Option<FeatureRecord>,
    pub metrics: Option<GaitMetrics>,
    pub alerts: Vec<Alert>,
}

/// Owns all cross-call state for one sensor unit.
///
/// Not shareable between threads by design of its callers: feed every sample
/// of a unit through the same instance, in timestamp order.
pub struct Pipeline {
    extractor: FeatureExtractor,
    gait: GaitAnalyzer,
    detector: AnomalyDetector,
}

impl Pipeline {
    pub fn new(config: &Config) -> Self {
        Self {
            extractor: FeatureExtractor::new(&config.features),
            gait: GaitAnalyzer::new(config.step_detection.clone(), &config.gait),
            detector: AnomalyDetector::new(config),
        }
    }

    pub fn process(&mut self, sample: RawSample) -> PipelineOutput {
        let features = self.extractor.process(sample);
        let metrics = self.gait.analyze(features.as_ref());
        let alerts = self.detector.detect(features.as_ref(), metrics.as_ref());

        PipelineOutput {
            features,
            metrics,
            alerts,
        }
    }

    /// Classify a tagged transport sample and process it
    pub fn ingest(&mut self, wire: WireSample) -> Result<PipelineOutput, PipelineError> {
        let sample = RawSample::try_from(wire)?;
        Ok(self.process(sample))
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    pub fn gait(&self) -> &GaitAnalyzer {
        &self.gait
    }

    pub fn detector(&self) -> &AnomalyDetector {
        &self.detector
    }
}
