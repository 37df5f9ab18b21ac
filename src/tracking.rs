// src/tracking.rs - Hand selection, cursor mapping and open/closed debounce
use nalgebra::Point2;
use tracing::{debug, info, trace};

use crate::calibration::HandRegionCalibrator;
use crate::config::TrackerConfig;
use crate::error::{ListenerError, TrackerError};
use crate::events::{
    GestureEvent, GestureKind, HandEvent, HandListener, HandMoveEvent, ListenerId,
    ListenerRegistry,
};
use crate::hand_state::{HandState, HandStateCounter};
use crate::sensor::FrameSink;
use crate::skeleton::{
    normalize_joints, BodyFrame, CoordinateMapper, HandSide, JointType, TrackedBody,
};
use crate::smoothing::JointSmoother;

/// Debounced hand state exposed to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfirmedState {
    #[default]
    NotTracked,
    Open,
    Closed,
}

/// What one call to [`HandTrackingManager::update`] produced.
#[derive(Debug, Clone, Default)]
pub struct FrameReport {
    pub events: Vec<HandEvent>,
    /// Presented cursor, after snapping to any attach point.
    pub cursor: Option<Point2<f64>>,
    pub listener_errors: Vec<ListenerError>,
    /// Required joints were missing; nothing was processed.
    pub skipped: bool,
}

impl FrameReport {
    pub fn gestures(&self) -> impl Iterator<Item = &GestureEvent> {
        self.events.iter().filter_map(|e| match e {
            HandEvent::Gesture(g) => Some(g),
            HandEvent::Moved(_) => None,
        })
    }

    pub fn moves(&self) -> impl Iterator<Item = &HandMoveEvent> {
        self.events.iter().filter_map(|e| match e {
            HandEvent::Moved(m) => Some(m),
            HandEvent::Gesture(_) => None,
        })
    }
}

/// Picks which body in a multi-body frame drives the cursor.
#[derive(Debug, Clone, Default)]
pub struct BodySelector {
    engaged: Option<u64>,
}

impl BodySelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sticks with the engaged body while it is present, otherwise engages the
    /// tracked body nearest to the sensor.
    pub fn select<'a>(&mut self, frame: &'a BodyFrame) -> Option<&'a TrackedBody> {
        if let Some(body) = self.engaged.and_then(|id| frame.body(id)) {
            return Some(body);
        }

        let nearest = frame
            .bodies
            .iter()
            .filter(|b| b.is_tracked())
            .filter_map(|b| b.mean_depth().map(|depth| (depth, b)))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, b)| b);

        let engaged = nearest.map(|b| b.tracking_id);
        if engaged != self.engaged {
            info!(from = ?self.engaged, to = ?engaged, "engaged body changed");
            self.engaged = engaged;
        }
        nearest
    }

    pub fn engaged(&self) -> Option<u64> {
        self.engaged
    }
}

pub struct HandTrackingManager {
    config: TrackerConfig,
    calibrator: HandRegionCalibrator,
    listeners: ListenerRegistry,
    state_counter: HandStateCounter,
    smoother: Option<JointSmoother>,
    body_selector: BodySelector,
    tracked_side: HandSide,
    confirmed_state: ConfirmedState,
    hand_position: Option<Point2<f64>>,
    cursor_position: Option<Point2<f64>>,
    current_body: Option<u64>,
    frame_counter: u64,
    /// Report of the last frame delivered through [`FrameSink`].
    last_report: FrameReport,
}

impl HandTrackingManager {
    pub fn new(config: TrackerConfig) -> Result<Self, TrackerError> {
        config.validate()?;

        let smoother = config.joint_smoothing.map(JointSmoother::new).transpose()?;

        Ok(Self {
            calibrator: HandRegionCalibrator::new(&config.hand_region),
            listeners: ListenerRegistry::new(),
            state_counter: HandStateCounter::new(),
            smoother,
            body_selector: BodySelector::new(),
            tracked_side: config.initial_side,
            confirmed_state: ConfirmedState::NotTracked,
            hand_position: None,
            cursor_position: None,
            current_body: None,
            frame_counter: 0,
            last_report: FrameReport::default(),
            config,
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn confirmed_state(&self) -> ConfirmedState {
        self.confirmed_state
    }

    pub fn tracked_side(&self) -> HandSide {
        self.tracked_side
    }

    /// Overrides the side; re-selection still kicks in once that hand leaves
    /// its region.
    pub fn set_tracked_side(&mut self, side: HandSide) {
        if side != self.tracked_side {
            debug!(side = side.as_str(), "tracked side set externally");
            self.tracked_side = side;
            self.state_counter.reset();
        }
    }

    /// Last valid mapped hand position, as delivered to listeners.
    pub fn hand_position(&self) -> Option<Point2<f64>> {
        self.hand_position
    }

    /// Position the cursor should be drawn at, after attach snapping.
    pub fn cursor_position(&self) -> Option<Point2<f64>> {
        self.cursor_position
    }

    pub fn frames_processed(&self) -> u64 {
        self.frame_counter
    }

    pub fn last_report(&self) -> &FrameReport {
        &self.last_report
    }

    pub fn add_listener(&mut self, listener: Box<dyn HandListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> Option<Box<dyn HandListener>> {
        self.listeners.remove(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Runs the per-frame pipeline for the body the caller picked (or `None`
    /// if nobody is tracked).
    pub fn update(
        &mut self,
        body: Option<&TrackedBody>,
        mapper: &dyn CoordinateMapper,
        timestamp: f64,
    ) -> FrameReport {
        self.frame_counter += 1;
        let mut report = FrameReport::default();

        let Some(body) = body.filter(|b| b.is_tracked()) else {
            self.end_tracking(timestamp, &mut report);
            return report;
        };

        if self.current_body != Some(body.tracking_id) {
            debug!(tracking_id = body.tracking_id, "new body");
            self.current_body = Some(body.tracking_id);
            if let Some(smoother) = self.smoother.as_mut() {
                smoother.reset();
            }
        }

        let mut joints = normalize_joints(body, mapper, self.config.min_depth);
        if let Some(smoother) = self.smoother.as_mut() {
            smoother.apply(&mut joints);
        }

        if !joints.contains_key(&JointType::ShoulderLeft)
            || !joints.contains_key(&JointType::ShoulderRight)
        {
            trace!(frame = self.frame_counter, "shoulders missing, skipping frame");
            report.skipped = true;
            return report;
        }

        // Hand selection
        let mut newly_selected = false;
        if self.confirmed_state == ConfirmedState::NotTracked
            || !self.calibrator.is_hand_in_region(&joints, self.tracked_side)
        {
            let candidate = [HandSide::Right, HandSide::Left]
                .into_iter()
                .find(|side| self.calibrator.is_hand_in_region(&joints, *side));

            if let Some(side) = candidate {
                info!(side = side.as_str(), "began tracking hand");
                self.tracked_side = side;
                self.state_counter.reset();
                newly_selected = true;
            }
        }

        let side = self.tracked_side;
        let Some(mapped) = self.calibrator.map_hand_position(&joints, side) else {
            trace!(side = side.as_str(), "hand joints missing, skipping frame");
            report.skipped = true;
            return report;
        };
        let position = (mapped.x.is_finite() && mapped.y.is_finite()).then_some(mapped);

        if newly_selected {
            self.confirmed_state = ConfirmedState::Open;
            self.emit_gesture(GestureKind::BeganTracking, position, timestamp, &mut report);
        }

        let raw_state = body.hand_state(side);
        self.state_counter.add(raw_state);

        if let Some(kind) = self.transition(raw_state) {
            self.emit_gesture(kind, position, timestamp, &mut report);
        }

        if let Some(position) = position {
            self.hand_position = Some(position);

            let event = HandMoveEvent {
                side,
                position,
                timestamp,
            };
            report.events.push(HandEvent::Moved(event));
            report.listener_errors.extend(self.listeners.dispatch_moved(&event));

            let attached = if self.config.attach_to_controls {
                self.listeners.attach_point(&position)
            } else {
                None
            };
            self.cursor_position = Some(attached.unwrap_or(position));
            report.cursor = self.cursor_position;
        }

        report
    }

    /// Applies the debounce rule and returns the transition, if any.
    fn transition(&mut self, raw_state: HandState) -> Option<GestureKind> {
        let count = self.state_counter.count();

        let (next, kind) = match (self.confirmed_state, raw_state) {
            (ConfirmedState::Open, HandState::Closed)
                if count >= self.config.min_closed_states_after_open =>
            {
                (ConfirmedState::Closed, GestureKind::OpenToClose)
            }
            (ConfirmedState::Closed, HandState::Open)
                if count >= self.config.min_open_states_after_close =>
            {
                (ConfirmedState::Open, GestureKind::CloseToOpen)
            }
            _ => return None,
        };

        debug!(
            side = self.tracked_side.as_str(),
            from = ?self.confirmed_state,
            to = ?next,
            run = count,
            "hand state confirmed"
        );
        self.confirmed_state = next;
        Some(kind)
    }

    fn end_tracking(&mut self, timestamp: f64, report: &mut FrameReport) {
        if self.confirmed_state != ConfirmedState::NotTracked {
            info!(side = self.tracked_side.as_str(), "lost tracked body");
            if self.config.emit_tracking_ended {
                self.emit_gesture(GestureKind::TrackingEnded, None, timestamp, report);
            }
        }

        self.confirmed_state = ConfirmedState::NotTracked;
        self.state_counter.reset();
        self.current_body = None;
        self.hand_position = None;
        self.cursor_position = None;
        if let Some(smoother) = self.smoother.as_mut() {
            smoother.reset();
        }
    }

    /// Gesture events carry the current position, or the last valid one when
    /// this frame's mapping was not finite.
    fn emit_gesture(
        &mut self,
        kind: GestureKind,
        position: Option<Point2<f64>>,
        timestamp: f64,
        report: &mut FrameReport,
    ) {
        let event = GestureEvent {
            kind,
            side: self.tracked_side,
            position: position
                .or(self.hand_position)
                .unwrap_or_else(Point2::origin),
            timestamp,
        };

        report.events.push(HandEvent::Gesture(event));
        let dispatch = self.listeners.dispatch_gesture(&event);
        if let Some(id) = dispatch.consumed_by {
            trace!(listener = id, kind = kind.as_str(), "gesture consumed");
        }
        report.listener_errors.extend(dispatch.errors);
    }
}

impl FrameSink for HandTrackingManager {
    fn on_frame(&mut self, frame: &BodyFrame, mapper: &dyn CoordinateMapper) {
        let body = self.body_selector.select(frame);
        self.last_report = self.update(body, mapper, frame.timestamp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JointSmoothingConfig;
    use crate::events::tests::{Log, Probe};
    use crate::simulation::SimulatedBodyStream;
    use crate::skeleton::DepthCameraMapper;
    use nalgebra::Vector3;

    /// Camera x/y pass straight through as normalized coordinates.
    struct PlaneMapper;

    impl CoordinateMapper for PlaneMapper {
        fn camera_to_depth(&self, point: &Vector3<f64>) -> Point2<f64> {
            Point2::new(point.x * 512.0, point.y * 512.0)
        }

        fn frame_size(&self) -> (u32, u32) {
            (512, 512)
        }
    }

    // Shoulders 0.2 apart: right box centered (0.65, 0.35), left box
    // centered (0.35, 0.45), both 0.1 wide.
    const RIGHT_IN: (f64, f64) = (0.65, 0.35);
    const LEFT_IN: (f64, f64) = (0.35, 0.45);
    const AWAY: (f64, f64) = (0.5, 0.9);

    fn body(
        right: (f64, f64),
        left: (f64, f64),
        right_state: HandState,
    ) -> TrackedBody {
        let mut body = TrackedBody::new(1);
        let mut put = |joint, (x, y): (f64, f64)| {
            body.joints.insert(joint, Vector3::new(x, y, 2.0));
        };
        put(JointType::ShoulderLeft, (0.4, 0.4));
        put(JointType::ShoulderRight, (0.6, 0.4));
        put(JointType::WristRight, right);
        put(JointType::HandRight, right);
        put(JointType::WristLeft, left);
        put(JointType::HandLeft, left);
        body.right_hand_state = right_state;
        body.left_hand_state = HandState::Open;
        body
    }

    fn manager() -> HandTrackingManager {
        HandTrackingManager::new(TrackerConfig::default()).unwrap()
    }

    fn step(manager: &mut HandTrackingManager, body: &TrackedBody) -> FrameReport {
        manager.update(Some(body), &PlaneMapper, 0.0)
    }

    fn kinds(report: &FrameReport) -> Vec<GestureKind> {
        report.gestures().map(|g| g.kind).collect()
    }

    #[test]
    fn test_no_body_stays_untracked_and_silent() {
        let mut manager = manager();
        let report = manager.update(None, &PlaneMapper, 0.0);
        assert!(report.events.is_empty());
        assert_eq!(manager.confirmed_state(), ConfirmedState::NotTracked);

        // tracking id 0 counts as no body
        let mut ghost = body(RIGHT_IN, AWAY, HandState::Open);
        ghost.tracking_id = 0;
        let report = step(&mut manager, &ghost);
        assert!(report.events.is_empty());
    }

    #[test]
    fn test_first_frame_begins_tracking_open() {
        let mut manager = manager();
        let report = step(&mut manager, &body(RIGHT_IN, AWAY, HandState::Open));

        assert_eq!(kinds(&report), vec![GestureKind::BeganTracking]);
        assert_eq!(manager.confirmed_state(), ConfirmedState::Open);
        assert_eq!(manager.tracked_side(), HandSide::Right);

        let moved: Vec<_> = report.moves().collect();
        assert_eq!(moved.len(), 1);
        assert!((moved[0].position.x - 0.5).abs() < 1e-9);
        assert!((moved[0].position.y - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_right_hand_preferred_when_both_valid() {
        let mut manager = manager();
        manager.set_tracked_side(HandSide::Left);
        let report = step(&mut manager, &body(RIGHT_IN, LEFT_IN, HandState::Open));

        assert_eq!(manager.tracked_side(), HandSide::Right);
        assert_eq!(report.gestures().next().map(|g| g.side), Some(HandSide::Right));
    }

    #[test]
    fn test_left_hand_selected_when_only_valid_one() {
        let mut manager = manager();
        let report = step(&mut manager, &body(AWAY, LEFT_IN, HandState::Open));

        assert_eq!(manager.tracked_side(), HandSide::Left);
        assert_eq!(kinds(&report), vec![GestureKind::BeganTracking]);
    }

    #[test]
    fn test_no_valid_hand_keeps_prior_state() {
        let mut manager = manager();
        let report = step(&mut manager, &body(AWAY, AWAY, HandState::Closed));

        assert_eq!(manager.confirmed_state(), ConfirmedState::NotTracked);
        assert!(report.gestures().next().is_none());
        // Position still reported for the assumed side, outside [0,1]
        let moved: Vec<_> = report.moves().collect();
        assert_eq!(moved.len(), 1);
        assert!(moved[0].position.y > 1.0);
    }

    #[test]
    fn test_close_then_reopen_needs_seven_frames() {
        let mut manager = manager();
        step(&mut manager, &body(RIGHT_IN, AWAY, HandState::Open));

        let report = step(&mut manager, &body(RIGHT_IN, AWAY, HandState::Closed));
        assert_eq!(kinds(&report), vec![GestureKind::OpenToClose]);
        assert_eq!(manager.confirmed_state(), ConfirmedState::Closed);

        for _ in 0..6 {
            let report = step(&mut manager, &body(RIGHT_IN, AWAY, HandState::Open));
            assert!(kinds(&report).is_empty());
        }
        assert_eq!(manager.confirmed_state(), ConfirmedState::Closed);

        let report = step(&mut manager, &body(RIGHT_IN, AWAY, HandState::Open));
        assert_eq!(kinds(&report), vec![GestureKind::CloseToOpen]);

        for _ in 0..5 {
            let report = step(&mut manager, &body(RIGHT_IN, AWAY, HandState::Open));
            assert!(kinds(&report).is_empty());
        }
    }

    #[test]
    fn test_flicker_does_not_reopen() {
        let mut manager = manager();
        step(&mut manager, &body(RIGHT_IN, AWAY, HandState::Open));
        step(&mut manager, &body(RIGHT_IN, AWAY, HandState::Closed));

        for state in [HandState::Open, HandState::Open, HandState::Unknown, HandState::Open] {
            let report = step(&mut manager, &body(RIGHT_IN, AWAY, state));
            assert!(kinds(&report).is_empty());
        }
        assert_eq!(manager.confirmed_state(), ConfirmedState::Closed);
    }

    #[test]
    fn test_custom_close_threshold() {
        let config = TrackerConfig {
            min_closed_states_after_open: 3,
            ..TrackerConfig::default()
        };
        let mut manager = HandTrackingManager::new(config).unwrap();
        step(&mut manager, &body(RIGHT_IN, AWAY, HandState::Open));

        assert!(kinds(&step(&mut manager, &body(RIGHT_IN, AWAY, HandState::Closed))).is_empty());
        assert!(kinds(&step(&mut manager, &body(RIGHT_IN, AWAY, HandState::Closed))).is_empty());
        assert_eq!(
            kinds(&step(&mut manager, &body(RIGHT_IN, AWAY, HandState::Closed))),
            vec![GestureKind::OpenToClose]
        );
    }

    #[test]
    fn test_nan_position_suppressed_but_debounce_continues() {
        let mut manager = manager();
        step(&mut manager, &body(RIGHT_IN, AWAY, HandState::Open));
        let last = manager.hand_position().unwrap();

        // Shoulders collapse onto one point: zero-sized region, NaN mapping.
        let mut degenerate = body((0.5, 0.4), AWAY, HandState::Closed);
        for joint in [JointType::ShoulderLeft, JointType::ShoulderRight] {
            degenerate.joints.insert(joint, Vector3::new(0.5, 0.4, 2.0));
        }

        let report = step(&mut manager, &degenerate);
        assert_eq!(report.moves().count(), 0);
        assert_eq!(report.cursor, None);
        assert_eq!(kinds(&report), vec![GestureKind::OpenToClose]);
        assert_eq!(report.gestures().next().map(|g| g.position), Some(last));
        assert_eq!(manager.confirmed_state(), ConfirmedState::Closed);
    }

    #[test]
    fn test_missing_shoulder_skips_frame() {
        let mut manager = manager();
        step(&mut manager, &body(RIGHT_IN, AWAY, HandState::Open));

        let mut partial = body(RIGHT_IN, AWAY, HandState::Closed);
        partial.joints.remove(&JointType::ShoulderLeft);
        let report = step(&mut manager, &partial);

        assert!(report.skipped);
        assert!(report.events.is_empty());
        assert_eq!(manager.confirmed_state(), ConfirmedState::Open);
    }

    #[test]
    fn test_missing_hand_joint_skips_frame() {
        let mut manager = manager();
        step(&mut manager, &body(RIGHT_IN, AWAY, HandState::Open));
        let last = manager.hand_position();

        for joint in [JointType::WristRight, JointType::HandRight] {
            let mut partial = body(RIGHT_IN, AWAY, HandState::Closed);
            partial.joints.remove(&joint);
            let report = step(&mut manager, &partial);

            assert!(report.skipped, "{joint:?}");
            assert!(report.events.is_empty());
            assert_eq!(report.cursor, None);
            assert_eq!(manager.confirmed_state(), ConfirmedState::Open);
            assert_eq!(manager.hand_position(), last);
        }

        // The skipped frames did not count toward the close.
        let report = step(&mut manager, &body(RIGHT_IN, AWAY, HandState::Closed));
        assert_eq!(kinds(&report), vec![GestureKind::OpenToClose]);
    }

    #[test]
    fn test_hand_leaving_region_switches_sides() {
        let mut manager = manager();
        step(&mut manager, &body(RIGHT_IN, AWAY, HandState::Open));
        step(&mut manager, &body(RIGHT_IN, AWAY, HandState::Closed));
        assert_eq!(manager.confirmed_state(), ConfirmedState::Closed);

        let report = step(&mut manager, &body(AWAY, LEFT_IN, HandState::Closed));
        assert_eq!(manager.tracked_side(), HandSide::Left);
        assert_eq!(kinds(&report), vec![GestureKind::BeganTracking]);
        assert_eq!(manager.confirmed_state(), ConfirmedState::Open);
    }

    #[test]
    fn test_losing_body_resets_and_retracks() {
        let mut manager = manager();
        step(&mut manager, &body(RIGHT_IN, AWAY, HandState::Open));

        let report = manager.update(None, &PlaneMapper, 0.0);
        assert!(report.events.is_empty());
        assert_eq!(manager.confirmed_state(), ConfirmedState::NotTracked);
        assert_eq!(manager.cursor_position(), None);
        assert_eq!(manager.hand_position(), None);

        let report = step(&mut manager, &body(RIGHT_IN, AWAY, HandState::Open));
        assert_eq!(kinds(&report), vec![GestureKind::BeganTracking]);
    }

    #[test]
    fn test_tracking_ended_when_enabled() {
        let config = TrackerConfig {
            emit_tracking_ended: true,
            ..TrackerConfig::default()
        };
        let mut manager = HandTrackingManager::new(config).unwrap();
        step(&mut manager, &body(RIGHT_IN, AWAY, HandState::Open));

        let report = manager.update(None, &PlaneMapper, 1.0);
        assert_eq!(kinds(&report), vec![GestureKind::TrackingEnded]);

        // Only once
        let report = manager.update(None, &PlaneMapper, 2.0);
        assert!(report.events.is_empty());
    }

    #[test]
    fn test_listeners_get_events_and_attach_cursor() {
        let log = Log::default();
        let mut manager = manager();
        manager.add_listener(Box::new(Probe {
            consume: true,
            ..Probe::new(1, &log)
        }));
        manager.add_listener(Box::new(Probe {
            snap_to: Some(Point2::new(0.2, 0.8)),
            ..Probe::new(2, &log)
        }));

        let report = step(&mut manager, &body(RIGHT_IN, AWAY, HandState::Open));

        // Gesture stops at listener 1, the move reaches both.
        let seen: Vec<u32> = log.borrow().iter().map(|(tag, _)| *tag).collect();
        assert_eq!(seen, vec![1, 1, 2]);

        assert_eq!(report.cursor, Some(Point2::new(0.2, 0.8)));
        let moved = report.moves().next().unwrap();
        assert!((moved.position.x - 0.5).abs() < 1e-9);
        assert_eq!(manager.cursor_position(), Some(Point2::new(0.2, 0.8)));
    }

    #[test]
    fn test_attach_disabled_presents_raw_cursor() {
        let log = Log::default();
        let config = TrackerConfig {
            attach_to_controls: false,
            ..TrackerConfig::default()
        };
        let mut manager = HandTrackingManager::new(config).unwrap();
        manager.add_listener(Box::new(Probe {
            snap_to: Some(Point2::new(0.2, 0.8)),
            ..Probe::new(1, &log)
        }));

        let report = step(&mut manager, &body(RIGHT_IN, AWAY, HandState::Open));
        assert_eq!(report.cursor, manager.hand_position());
    }

    #[test]
    fn test_listener_errors_reported() {
        let log = Log::default();
        let mut manager = manager();
        let bad = manager.add_listener(Box::new(Probe {
            fail: true,
            ..Probe::new(1, &log)
        }));
        manager.add_listener(Box::new(Probe::new(2, &log)));

        let report = step(&mut manager, &body(RIGHT_IN, AWAY, HandState::Open));
        assert_eq!(report.listener_errors.len(), 2);
        assert!(report.listener_errors.iter().all(|e| e.listener == bad));
        assert_eq!(log.borrow().len(), 4);

        assert!(manager.remove_listener(bad).is_some());
        assert_eq!(manager.listener_count(), 1);
    }

    #[test]
    fn test_joint_smoothing_applied() {
        let config = TrackerConfig {
            joint_smoothing: Some(JointSmoothingConfig::Exponential { alpha: 0.5 }),
            ..TrackerConfig::default()
        };
        let mut manager = HandTrackingManager::new(config).unwrap();
        step(&mut manager, &body(RIGHT_IN, AWAY, HandState::Open));

        // Hand jumps 0.04 right; smoothed cursor moves only half as far.
        let report = step(&mut manager, &body((0.69, 0.35), AWAY, HandState::Open));
        let moved = report.moves().next().unwrap();
        assert!((moved.position.x - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_smoothing_survives_zero_depth_glitch() {
        let config = TrackerConfig {
            joint_smoothing: Some(JointSmoothingConfig::Exponential { alpha: 0.5 }),
            ..TrackerConfig::default()
        };
        let mut manager = HandTrackingManager::new(config).unwrap();
        let mapper = DepthCameraMapper::kinect_v2();
        let mut stream = SimulatedBodyStream::default();

        for _ in 0..5 {
            let frame = stream.next_frame();
            manager.update(frame.bodies.first(), &mapper, frame.timestamp);
        }

        let mut glitch = stream.next_frame();
        let hand = glitch.bodies[0].joints.get_mut(&JointType::HandRight).unwrap();
        hand.z = 0.0;
        manager.update(glitch.bodies.first(), &mapper, glitch.timestamp);

        for _ in 0..54 {
            let frame = stream.next_frame();
            let report = manager.update(frame.bodies.first(), &mapper, frame.timestamp);
            let moved: Vec<_> = report.moves().collect();
            assert_eq!(moved.len(), 1);
            assert!(moved[0].position.x.is_finite() && moved[0].position.y.is_finite());
        }
    }

    #[test]
    fn test_smoothing_survives_non_finite_joint() {
        let config = TrackerConfig {
            joint_smoothing: Some(JointSmoothingConfig::Exponential { alpha: 1.0 }),
            ..TrackerConfig::default()
        };
        let mut manager = HandTrackingManager::new(config).unwrap();
        step(&mut manager, &body(RIGHT_IN, AWAY, HandState::Open));

        let mut glitch = body(RIGHT_IN, AWAY, HandState::Open);
        glitch
            .joints
            .insert(JointType::HandRight, Vector3::new(f64::INFINITY, 0.35, 2.0));
        let report = step(&mut manager, &glitch);
        assert_eq!(report.moves().count(), 0);

        for _ in 0..3 {
            let report = step(&mut manager, &body(RIGHT_IN, AWAY, HandState::Open));
            let moved = report.moves().next().unwrap();
            assert!((moved.position.x - 0.5).abs() < 1e-9);
            assert!((moved.position.y - 0.5).abs() < 1e-9);
        }
        assert_eq!(manager.tracked_side(), HandSide::Right);
    }

    #[test]
    fn test_frame_sink_keeps_last_report() {
        let log = Log::default();
        let mut manager = manager();
        manager.add_listener(Box::new(Probe {
            fail: true,
            ..Probe::new(1, &log)
        }));

        let frame = BodyFrame {
            timestamp: 0.5,
            bodies: vec![body(RIGHT_IN, AWAY, HandState::Open)],
        };
        manager.on_frame(&frame, &PlaneMapper);

        let report = manager.last_report();
        assert_eq!(kinds(report), vec![GestureKind::BeganTracking]);
        assert_eq!(report.listener_errors.len(), 2);

        manager.on_frame(&BodyFrame::default(), &PlaneMapper);
        assert!(manager.last_report().events.is_empty());
        assert!(manager.last_report().listener_errors.is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = TrackerConfig {
            min_open_states_after_close: 0,
            ..TrackerConfig::default()
        };
        assert!(HandTrackingManager::new(config).is_err());
    }

    #[test]
    fn test_body_selector_prefers_engaged_then_nearest() {
        let mut near = TrackedBody::new(5);
        near.joints.insert(JointType::Head, Vector3::new(0.0, 0.0, 1.5));
        let mut far = TrackedBody::new(9);
        far.joints.insert(JointType::Head, Vector3::new(0.0, 0.0, 3.0));

        let mut selector = BodySelector::new();
        let frame = BodyFrame {
            timestamp: 0.0,
            bodies: vec![far.clone(), near.clone()],
        };
        assert_eq!(selector.select(&frame).map(|b| b.tracking_id), Some(5));

        // Someone steps in front; the engaged body keeps control.
        let mut closer = TrackedBody::new(11);
        closer.joints.insert(JointType::Head, Vector3::new(0.0, 0.0, 1.0));
        let frame = BodyFrame {
            timestamp: 0.1,
            bodies: vec![closer, far.clone(), near],
        };
        assert_eq!(selector.select(&frame).map(|b| b.tracking_id), Some(5));

        let frame = BodyFrame {
            timestamp: 0.2,
            bodies: vec![far],
        };
        assert_eq!(selector.select(&frame).map(|b| b.tracking_id), Some(9));
        assert_eq!(selector.engaged(), Some(9));

        assert!(selector.select(&BodyFrame::default()).is_none());
        assert_eq!(selector.engaged(), None);
    }
}
