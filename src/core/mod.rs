//! Core engine module - per-sample pipeline and the async loop around it

mod engine;
mod event_bus;
mod pipeline;

pub use engine::Engine;
pub use event_bus::{Event, EventBus, EventPayload, EventType};
pub use pipeline::{Pipeline, PipelineOutput};

use serde::{Deserialize, Serialize};

/// Running counters of the engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    pub running: bool,
    pub samples_processed: u64,
    pub samples_dropped: u64,
    pub features_emitted: u64,
    pub alerts_raised: u64,
    pub alerts_delivered: u64,
    pub delivery_failures: u64,
    pub uploads: u64,
    pub upload_failures: u64,
    pub records_uploaded: u64,
    pub cached_records: usize,
    pub uptime_seconds: u64,
}
