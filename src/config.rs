// src/config.rs
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TrackerError;
use crate::skeleton::HandSide;

/// Hand box placement in shoulder-length units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandRegionConfig {
    pub relative_center: [f64; 2],
    pub relative_size: [f64; 2],
}

impl Default for HandRegionConfig {
    fn default() -> Self {
        Self {
            relative_center: [0.5, -0.5],
            relative_size: [1.0, 1.0],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum JointSmoothingConfig {
    Exponential { alpha: f64 },
    Regression { window: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub initial_side: HandSide,
    pub min_closed_states_after_open: u32,
    pub min_open_states_after_close: u32,
    pub attach_to_controls: bool,
    pub hand_region: HandRegionConfig,
    /// Depth (m) substituted for negative joint depths before projection.
    pub min_depth: f64,
    /// Off by default: the sensor feed is already smoothed upstream.
    pub joint_smoothing: Option<JointSmoothingConfig>,
    pub emit_tracking_ended: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            initial_side: HandSide::Right,
            min_closed_states_after_open: 1,
            min_open_states_after_close: 7,
            attach_to_controls: true,
            hand_region: HandRegionConfig::default(),
            min_depth: 0.1,
            joint_smoothing: None,
            emit_tracking_ended: false,
        }
    }
}

impl TrackerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, TrackerError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, TrackerError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| TrackerError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.min_closed_states_after_open < 1 {
            return Err(TrackerError::InvalidThreshold {
                name: "min_closed_states_after_open",
                value: self.min_closed_states_after_open,
            });
        }
        if self.min_open_states_after_close < 1 {
            return Err(TrackerError::InvalidThreshold {
                name: "min_open_states_after_close",
                value: self.min_open_states_after_close,
            });
        }

        let [cx, cy] = self.hand_region.relative_center;
        if !cx.is_finite() || !cy.is_finite() {
            return Err(TrackerError::InvalidRegionCenter(cx, cy));
        }
        let [w, h] = self.hand_region.relative_size;
        if !(w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0) {
            return Err(TrackerError::InvalidRegionSize(w, h));
        }

        if !(self.min_depth.is_finite() && self.min_depth > 0.0) {
            return Err(TrackerError::InvalidMinDepth(self.min_depth));
        }

        match self.joint_smoothing {
            Some(JointSmoothingConfig::Exponential { alpha })
                if !(alpha > 0.0 && alpha <= 1.0) =>
            {
                Err(TrackerError::InvalidSmoothingFactor(alpha))
            }
            Some(JointSmoothingConfig::Regression { window }) if window < 2 => {
                Err(TrackerError::InvalidRegressionWindow(window))
            }
            _ => Ok(()),
        }
    }
}
