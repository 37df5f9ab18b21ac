// src/skeleton.rs - Body frames from the sensor and their projection into normalized depth space
use std::collections::HashMap;

use nalgebra::{Point2, Vector3};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::TrackerError;
use crate::hand_state::HandState;

/// Skeletal joints consumed by the hand pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JointType {
    Head,
    SpineShoulder,
    ShoulderLeft,
    ShoulderRight,
    ElbowLeft,
    ElbowRight,
    WristLeft,
    WristRight,
    HandLeft,
    HandRight,
    HandTipLeft,
    HandTipRight,
}

impl JointType {
    pub fn shoulder(side: HandSide) -> Self {
        match side {
            HandSide::Left => Self::ShoulderLeft,
            HandSide::Right => Self::ShoulderRight,
        }
    }

    pub fn wrist(side: HandSide) -> Self {
        match side {
            HandSide::Left => Self::WristLeft,
            HandSide::Right => Self::WristRight,
        }
    }

    pub fn hand(side: HandSide) -> Self {
        match side {
            HandSide::Left => Self::HandLeft,
            HandSide::Right => Self::HandRight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandSide {
    Left,
    #[default]
    Right,
}

impl HandSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// Mirrors hand-region offsets across the body.
    pub fn sign(&self) -> f64 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }
}

/// One tracked body in a sensor frame, joints in camera space (meters).
#[derive(Debug, Clone, Default)]
pub struct TrackedBody {
    /// 0 means the slot is not tracking anyone.
    pub tracking_id: u64,
    pub joints: HashMap<JointType, Vector3<f64>>,
    pub left_hand_state: HandState,
    pub right_hand_state: HandState,
}

impl TrackedBody {
    pub fn new(tracking_id: u64) -> Self {
        Self {
            tracking_id,
            ..Default::default()
        }
    }

    pub fn is_tracked(&self) -> bool {
        self.tracking_id != 0
    }

    pub fn hand_state(&self, side: HandSide) -> HandState {
        match side {
            HandSide::Left => self.left_hand_state,
            HandSide::Right => self.right_hand_state,
        }
    }

    /// Mean camera-space depth over all reported joints.
    pub fn mean_depth(&self) -> Option<f64> {
        if self.joints.is_empty() {
            return None;
        }
        Some(self.joints.values().map(|p| p.z).sum::<f64>() / self.joints.len() as f64)
    }
}

/// Everything the sensor reports for one frame.
#[derive(Debug, Clone, Default)]
pub struct BodyFrame {
    /// Seconds since the stream started.
    pub timestamp: f64,
    pub bodies: Vec<TrackedBody>,
}

impl BodyFrame {
    pub fn body(&self, tracking_id: u64) -> Option<&TrackedBody> {
        self.bodies
            .iter()
            .find(|b| b.is_tracked() && b.tracking_id == tracking_id)
    }
}

/// Joint positions in [0,1] depth-image space. Rebuilt every frame.
pub type NormalizedJoints = HashMap<JointType, Point2<f64>>;

/// Camera space to depth-image pixel projection.
pub trait CoordinateMapper {
    fn camera_to_depth(&self, point: &Vector3<f64>) -> Point2<f64>;
    /// Depth frame size in pixels (width, height).
    fn frame_size(&self) -> (u32, u32);
}

/// Pinhole projection onto the depth image.
#[derive(Debug, Clone)]
pub struct DepthCameraMapper {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    width: u32,
    height: u32,
}

impl DepthCameraMapper {
    pub fn new(
        fx: f64,
        fy: f64,
        cx: f64,
        cy: f64,
        width: u32,
        height: u32,
    ) -> Result<Self, TrackerError> {
        if width == 0 || height == 0 {
            return Err(TrackerError::InvalidFrameSize { width, height });
        }
        Ok(Self { fx, fy, cx, cy, width, height })
    }

    /// 512x424 depth camera with the usual time-of-flight intrinsics.
    pub fn kinect_v2() -> Self {
        Self {
            fx: 365.5,
            fy: 365.5,
            cx: 256.0,
            cy: 212.0,
            width: 512,
            height: 424,
        }
    }
}

impl Default for DepthCameraMapper {
    fn default() -> Self {
        Self::kinect_v2()
    }
}

impl CoordinateMapper for DepthCameraMapper {
    fn camera_to_depth(&self, point: &Vector3<f64>) -> Point2<f64> {
        // Camera y points up, image rows grow downward.
        Point2::new(
            self.cx + self.fx * point.x / point.z,
            self.cy - self.fy * point.y / point.z,
        )
    }

    fn frame_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Projects every joint of `body` and divides by the depth frame size.
///
/// Inferred joints often come back with zero or negative depth, which would
/// send the projection to infinity, so those are pushed out to `min_depth`
/// first.
pub fn normalize_joints(
    body: &TrackedBody,
    mapper: &dyn CoordinateMapper,
    min_depth: f64,
) -> NormalizedJoints {
    let (width, height) = mapper.frame_size();
    let (width, height) = (width as f64, height as f64);

    body.joints
        .iter()
        .map(|(joint, position)| {
            let mut position = *position;
            if position.z <= 0.0 {
                trace!(?joint, z = position.z, "clamping non-positive joint depth");
                position.z = min_depth;
            }
            let depth = mapper.camera_to_depth(&position);
            (*joint, Point2::new(depth.x / width, depth.y / height))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_of_view_maps_to_middle() {
        let mapper = DepthCameraMapper::kinect_v2();
        let mut body = TrackedBody::new(7);
        body.joints.insert(JointType::Head, Vector3::new(0.0, 0.0, 2.0));

        let joints = normalize_joints(&body, &mapper, 0.1);
        let head = joints[&JointType::Head];
        assert!((head.x - 0.5).abs() < 1e-9);
        assert!((head.y - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_negative_depth_is_clamped() {
        let mapper = DepthCameraMapper::kinect_v2();
        let mut body = TrackedBody::new(7);
        body.joints.insert(JointType::HandLeft, Vector3::new(0.01, 0.0, -1.0));

        let joints = normalize_joints(&body, &mapper, 0.1);
        let hand = joints[&JointType::HandLeft];
        assert!(hand.x.is_finite() && hand.y.is_finite());
        // 0.01m at 0.1m depth lands right of center
        let expected = (256.0 + 365.5 * 0.1) / 512.0;
        assert!((hand.x - expected).abs() < 1e-9);
    }

    #[test]
    fn test_zero_depth_is_clamped() {
        let mapper = DepthCameraMapper::kinect_v2();
        let mut body = TrackedBody::new(7);
        body.joints.insert(JointType::HandRight, Vector3::new(0.01, 0.02, 0.0));

        let hand = normalize_joints(&body, &mapper, 0.1)[&JointType::HandRight];
        assert!(hand.x.is_finite() && hand.y.is_finite());
    }

    #[test]
    fn test_up_in_camera_space_is_up_in_image() {
        let mapper = DepthCameraMapper::kinect_v2();
        let above = mapper.camera_to_depth(&Vector3::new(0.0, 0.5, 2.0));
        let below = mapper.camera_to_depth(&Vector3::new(0.0, -0.5, 2.0));
        assert!(above.y < below.y);
    }

    #[test]
    fn test_zero_frame_size_rejected() {
        assert!(DepthCameraMapper::new(1.0, 1.0, 0.0, 0.0, 0, 424).is_err());
    }

    #[test]
    fn test_untracked_body_ids() {
        let frame = BodyFrame {
            timestamp: 0.0,
            bodies: vec![TrackedBody::new(0), TrackedBody::new(3)],
        };
        assert!(frame.body(0).is_none());
        assert_eq!(frame.body(3).map(|b| b.tracking_id), Some(3));
    }

    #[test]
    fn test_side_helpers() {
        assert_eq!(JointType::shoulder(HandSide::Left), JointType::ShoulderLeft);
        assert_eq!(JointType::wrist(HandSide::Right), JointType::WristRight);
        assert_eq!(JointType::hand(HandSide::Right), JointType::HandRight);
        assert_eq!(HandSide::Left.sign(), -1.0);
        assert_eq!(HandSide::default(), HandSide::Right);
    }
}
