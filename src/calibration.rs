// src/calibration.rs - Body-relative hand boxes and cursor mapping
use nalgebra::{center, distance, Point2, Vector2};

use crate::config::HandRegionConfig;
use crate::skeleton::{HandSide, JointType, NormalizedJoints};

/// Axis-aligned rectangle in normalized depth space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandRegion {
    pub origin: Point2<f64>,
    pub size: Vector2<f64>,
}

impl HandRegion {
    pub fn contains(&self, point: &Point2<f64>) -> bool {
        point.x >= self.origin.x
            && point.x <= self.origin.x + self.size.x
            && point.y >= self.origin.y
            && point.y <= self.origin.y + self.size.y
    }

    pub fn center(&self) -> Point2<f64> {
        self.origin + self.size / 2.0
    }

    /// Position relative to the box, (0,0) at origin and (1,1) at the far
    /// corner. Not clamped.
    pub fn to_local(&self, point: &Point2<f64>) -> Point2<f64> {
        Point2::new(
            (point.x - self.origin.x) / self.size.x,
            (point.y - self.origin.y) / self.size.y,
        )
    }
}

/// Derives the hand box from the shoulders so it scales with the user's
/// distance from the sensor. Every method returns `None` when a joint it
/// depends on is missing from the frame.
#[derive(Debug, Clone)]
pub struct HandRegionCalibrator {
    relative_center: Vector2<f64>,
    relative_size: Vector2<f64>,
}

impl HandRegionCalibrator {
    pub fn new(config: &HandRegionConfig) -> Self {
        Self {
            relative_center: Vector2::from(config.relative_center),
            relative_size: Vector2::from(config.relative_size),
        }
    }

    pub fn calculate_hand_region(
        &self,
        joints: &NormalizedJoints,
        side: HandSide,
    ) -> Option<HandRegion> {
        let left = joints.get(&JointType::ShoulderLeft)?;
        let right = joints.get(&JointType::ShoulderRight)?;
        let anchor = joints.get(&JointType::shoulder(side))?;

        let shoulder_scale = distance(left, right) / 2.0;
        let offset = self.relative_center * shoulder_scale * side.sign();
        let size = self.relative_size * shoulder_scale;

        Some(HandRegion {
            origin: anchor + offset - size / 2.0,
            size,
        })
    }

    /// Midpoint of wrist and hand. The hand tip is left out on purpose: it
    /// swings too much when the hand opens and closes.
    pub fn raw_hand_position(
        &self,
        joints: &NormalizedJoints,
        side: HandSide,
    ) -> Option<Point2<f64>> {
        let wrist = joints.get(&JointType::wrist(side))?;
        let hand = joints.get(&JointType::hand(side))?;
        Some(center(wrist, hand))
    }

    /// Cursor coordinate: the raw hand position in the region's local frame.
    pub fn map_hand_position(
        &self,
        joints: &NormalizedJoints,
        side: HandSide,
    ) -> Option<Point2<f64>> {
        let region = self.calculate_hand_region(joints, side)?;
        let raw = self.raw_hand_position(joints, side)?;
        Some(region.to_local(&raw))
    }

    pub fn is_hand_in_region(&self, joints: &NormalizedJoints, side: HandSide) -> bool {
        match (
            self.calculate_hand_region(joints, side),
            self.raw_hand_position(joints, side),
        ) {
            (Some(region), Some(raw)) => region.contains(&raw),
            _ => false,
        }
    }
}

impl Default for HandRegionCalibrator {
    fn default() -> Self {
        Self::new(&HandRegionConfig::default())
    }
}
