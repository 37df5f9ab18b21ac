// src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Construction and configuration failures. Sensor noise never ends up here.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("smoothing factor must be in (0, 1], got {0}")]
    InvalidSmoothingFactor(f64),

    #[error("regression window must hold at least 2 samples, got {0}")]
    InvalidRegressionWindow(usize),

    #[error("{name} must be at least 1, got {value}")]
    InvalidThreshold { name: &'static str, value: u32 },

    #[error("hand region size must be positive and finite, got ({0}, {1})")]
    InvalidRegionSize(f64, f64),

    #[error("hand region center must be finite, got ({0}, {1})")]
    InvalidRegionCenter(f64, f64),

    #[error("minimum depth must be positive and finite, got {0}")]
    InvalidMinDepth(f64),

    #[error("depth frame must have non-zero dimensions, got {width}x{height}")]
    InvalidFrameSize { width: u32, height: u32 },

    #[error("failed to read config {path}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    ConfigParse(#[from] serde_json::Error),
}

/// A listener failed to handle an event. Dispatch moves on to the next listener.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("listener {listener} failed: {message}")]
pub struct ListenerError {
    pub listener: u64,
    pub message: String,
}

impl ListenerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            listener: 0,
            message: message.into(),
        }
    }

    pub(crate) fn with_listener(mut self, listener: u64) -> Self {
        self.listener = listener;
        self
    }
}
