// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Error types shared across the pipeline and its collaborators

use thiserror::Error;

/// Recoverable faults raised while classifying an incoming sample.
///
/// None of these abort the pipeline: the offending sample is dropped and
/// processing continues with the next one.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Unknown sensor modality: {0}")]
    UnknownModality(String),

    #[error("Malformed {modality} sample: {reason}")]
    MalformedSample { modality: String, reason: String },
}

impl PipelineError {
    pub(crate) fn malformed(modality: &str, reason: impl Into<String>) -> Self {
        Self::MalformedSample {
            modality: modality.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by the alert-delivery and upload collaborators
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("MQTT error: {0}")]
    Mqtt(String),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Configuration validation failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be positive (got {value})")]
    NotPositive { field: &'static str, value: f64 },

    #[error("window_size must hold at least 2 samples (got {0})")]
    WindowTooSmall(usize),

    #[error("{0} must not be empty")]
    Empty(&'static str),
}
