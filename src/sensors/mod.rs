//! Sensor module - sample types, transports and the feed into the engine

mod manager;
mod replay;
mod simulator;
mod traits;

pub use manager::{FeedStats, SensorFeed};
pub use replay::ReplaySensor;
pub use simulator::GaitSimulator;
pub use traits::{Axis, Modality, RawSample, Sensor, SensorData, SensorStatus, WireSample};
