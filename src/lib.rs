// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! StrideWatch - edge gait analysis and fall detection
//!
//! Turns the sample stream of an instrumented slipper (accelerometer,
//! gyroscope, insole pressure cells) into:
//! - rolling window features per modality
//! - gait metrics (cadence, step-time variability, stride length, speed)
//! - safety alerts (falls, gait-speed deviation, irregular cadence)
//!
//! Memory is bounded everywhere: sample windows, the step buffer and the
//! upload cache all evict their oldest entries.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      StrideWatch Engine                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────┐   ┌──────────────────────────────┐  ┌─────────┐ │
//! │  │ Sensor  │ → │           Pipeline           │→ │ Network │ │
//! │  │  Feed   │   │ Features → Gait → Detection  │  │ Manager │ │
//! │  └─────────┘   └──────────────────────────────┘  └─────────┘ │
//! │       ↑                       ↓                       ↑      │
//! │  ┌─────────┐   ┌──────────────────────────────┐  ┌─────────┐ │
//! │  │Simulator│   │          Event Bus           │  │ Metrics │ │
//! │  │ Replay  │   │                              │  │  Cache  │ │
//! │  └─────────┘   └──────────────────────────────┘  └─────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod analysis;
pub mod config;
pub mod core;
pub mod detection;
pub mod error;
pub mod network;
pub mod sensors;

// Re-exports for convenience
pub use analysis::{FeatureExtractor, FeatureRecord, GaitAnalyzer, GaitMetrics};
pub use config::Config;
pub use core::{Engine, EngineStats, EventBus, Pipeline, PipelineOutput};
pub use detection::{Alert, AlertType, AnomalyDetector, Severity};
pub use error::{ConfigError, NetworkError, PipelineError};
pub use network::NetworkManager;
pub use sensors::{RawSample, Sensor, SensorFeed, WireSample};

/// StrideWatch version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// StrideWatch name
pub const NAME: &str = "StrideWatch";
