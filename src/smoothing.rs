// src/smoothing.rs - Scalar low-pass filters and the per-joint smoothing stage
use std::collections::{HashMap, VecDeque};

use nalgebra::Point2;
use tracing::trace;

use crate::config::JointSmoothingConfig;
use crate::error::TrackerError;
use crate::skeleton::{JointType, NormalizedJoints};

/// A filter over one scalar signal. Never share an instance between signals.
pub trait SmoothingFilter {
    fn next(&mut self, raw: f64) -> f64;
    fn last(&self) -> f64;
    fn reset(&mut self);
}

/// `output = raw * alpha + last * (1 - alpha)`
///
/// Smaller alpha means more smoothing and more lag. `last` starts at 0.0
/// unless seeded with [`ExponentialSmoothingFilter::with_initial`].
#[derive(Debug, Clone)]
pub struct ExponentialSmoothingFilter {
    alpha: f64,
    initial: f64,
    last: f64,
}

impl ExponentialSmoothingFilter {
    pub fn new(alpha: f64) -> Result<Self, TrackerError> {
        Self::with_initial(alpha, 0.0)
    }

    pub fn with_initial(alpha: f64, initial: f64) -> Result<Self, TrackerError> {
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(TrackerError::InvalidSmoothingFactor(alpha));
        }
        Ok(Self {
            alpha,
            initial,
            last: initial,
        })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

impl SmoothingFilter for ExponentialSmoothingFilter {
    fn next(&mut self, raw: f64) -> f64 {
        self.last = raw * self.alpha + self.last * (1.0 - self.alpha);
        self.last
    }

    fn last(&self) -> f64 {
        self.last
    }

    fn reset(&mut self) {
        self.last = self.initial;
    }
}

/// Least-squares line through the last `window` samples, evaluated at the
/// newest one.
#[derive(Debug, Clone)]
pub struct RegressionSmoothingFilter {
    window: usize,
    history: VecDeque<f64>,
    last: f64,
}

impl RegressionSmoothingFilter {
    pub fn new(window: usize) -> Result<Self, TrackerError> {
        if window < 2 {
            return Err(TrackerError::InvalidRegressionWindow(window));
        }
        Ok(Self {
            window,
            history: VecDeque::with_capacity(window),
            last: 0.0,
        })
    }

    fn fit(&self) -> f64 {
        let n = self.history.len() as f64;
        // x = 0, 1, ... n-1 with the newest sample at n-1
        let mean_x = (n - 1.0) / 2.0;
        let mean_y = self.history.iter().sum::<f64>() / n;

        let mut cov = 0.0;
        let mut var = 0.0;
        for (i, y) in self.history.iter().enumerate() {
            let dx = i as f64 - mean_x;
            cov += dx * (y - mean_y);
            var += dx * dx;
        }

        let slope = cov / var;
        mean_y + slope * (n - 1.0 - mean_x)
    }
}

impl SmoothingFilter for RegressionSmoothingFilter {
    fn next(&mut self, raw: f64) -> f64 {
        self.history.push_back(raw);
        if self.history.len() > self.window {
            self.history.pop_front();
        }

        self.last = if self.history.len() < 2 { raw } else { self.fit() };
        self.last
    }

    fn last(&self) -> f64 {
        self.last
    }

    fn reset(&mut self) {
        self.history.clear();
        self.last = 0.0;
    }
}

/// One filter pair per joint, created on first sight and seeded with that
/// sample so the cursor does not crawl in from the origin.
pub struct JointSmoother {
    config: JointSmoothingConfig,
    filters: HashMap<JointType, [Box<dyn SmoothingFilter>; 2]>,
}

impl JointSmoother {
    pub fn new(config: JointSmoothingConfig) -> Result<Self, TrackerError> {
        // Build one throwaway filter so bad settings fail here, not mid-frame.
        Self::make_filter(&config, 0.0)?;
        Ok(Self {
            config,
            filters: HashMap::new(),
        })
    }

    fn make_filter(
        config: &JointSmoothingConfig,
        seed: f64,
    ) -> Result<Box<dyn SmoothingFilter>, TrackerError> {
        Ok(match *config {
            JointSmoothingConfig::Exponential { alpha } => {
                Box::new(ExponentialSmoothingFilter::with_initial(alpha, seed)?)
            }
            JointSmoothingConfig::Regression { window } => {
                let mut filter = RegressionSmoothingFilter::new(window)?;
                filter.next(seed);
                Box::new(filter)
            }
        })
    }

    /// Non-finite samples pass through untouched and leave the filters as
    /// they were, so one glitch frame cannot poison later ones.
    pub fn apply(&mut self, joints: &mut NormalizedJoints) {
        for (joint, point) in joints.iter_mut() {
            if !(point.x.is_finite() && point.y.is_finite()) {
                trace!(?joint, "non-finite joint sample, not smoothing");
                continue;
            }
            match self.filters.get_mut(joint) {
                Some([fx, fy]) => {
                    *point = Point2::new(fx.next(point.x), fy.next(point.y));
                }
                None => {
                    // Settings were validated in `new`, so this cannot fail.
                    if let (Ok(fx), Ok(fy)) = (
                        Self::make_filter(&self.config, point.x),
                        Self::make_filter(&self.config, point.y),
                    ) {
                        self.filters.insert(*joint, [fx, fy]);
                    }
                }
            }
        }
    }

    pub fn reset(&mut self) {
        self.filters.clear();
    }

    pub fn tracked_joints(&self) -> usize {
        self.filters.len()
    }
}
