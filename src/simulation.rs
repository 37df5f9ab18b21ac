// src/simulation.rs - Synthetic sensor feed for the demo and tests
use std::ops::Range;

use nalgebra::Vector3;

use crate::hand_state::HandState;
use crate::skeleton::{BodyFrame, JointType, TrackedBody};

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub frame_interval: f64,
    pub tracking_id: u64,
    /// Frames of each grab cycle: open, then closed, then open again.
    pub grab_cycle: u64,
    /// Frame inside the closed phase where the sensor briefly reports Open.
    pub flicker_offset: u64,
    /// Frames during which nobody is in view.
    pub dropout: Range<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            frame_interval: 0.033,
            tracking_id: 42,
            grab_cycle: 90,
            flicker_offset: 50,
            dropout: 200..230,
        }
    }
}

/// One user standing 2m away, waving the right hand in a small circle in
/// front of the shoulder and grabbing periodically.
pub struct SimulatedBodyStream {
    config: SimulationConfig,
    sim_time: f64,
    frame_counter: u64,
}

impl SimulatedBodyStream {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            sim_time: 0.0,
            frame_counter: 0,
        }
    }

    pub fn frames_generated(&self) -> u64 {
        self.frame_counter
    }

    fn right_hand_state(&self, frame: u64) -> HandState {
        let phase = frame % self.config.grab_cycle;
        let closed_from = self.config.grab_cycle * 4 / 9;
        let closed_until = self.config.grab_cycle * 7 / 9;

        if phase == self.config.flicker_offset {
            HandState::Open
        } else if phase == closed_until {
            HandState::Unknown
        } else if (closed_from..closed_until).contains(&phase) {
            HandState::Closed
        } else {
            HandState::Open
        }
    }

    fn generate_body(&self, frame: u64) -> TrackedBody {
        let t = self.sim_time;
        let mut body = TrackedBody::new(self.config.tracking_id);

        let mut put = |joint, x: f64, y: f64, z: f64| {
            body.joints.insert(joint, Vector3::new(x, y, z));
        };
        put(JointType::Head, 0.0, 0.6, 2.0);
        put(JointType::SpineShoulder, 0.0, 0.38, 2.0);
        put(JointType::ShoulderLeft, -0.18, 0.35, 2.0);
        put(JointType::ShoulderRight, 0.18, 0.35, 2.0);
        put(JointType::ElbowLeft, -0.22, 0.1, 2.0);
        put(JointType::ElbowRight, 0.24, 0.2, 1.9);

        // Left arm hangs at the side, well outside its hand box.
        put(JointType::WristLeft, -0.25, -0.08, 2.0);
        put(JointType::HandLeft, -0.25, -0.12, 2.0);
        put(JointType::HandTipLeft, -0.25, -0.18, 2.0);

        // Right hand circles the center of its hand box.
        let cx = 0.27 + 0.03 * t.cos();
        let cy = 0.425 + 0.03 * t.sin();
        put(JointType::WristRight, cx, cy - 0.02, 2.0);
        put(JointType::HandRight, cx, cy + 0.02, 2.0);
        put(JointType::HandTipRight, cx, cy + 0.07, 2.0);

        body.right_hand_state = self.right_hand_state(frame);
        body.left_hand_state = HandState::Open;
        body
    }

    pub fn next_frame(&mut self) -> BodyFrame {
        let frame = self.frame_counter;
        let bodies = if self.config.dropout.contains(&frame) {
            Vec::new()
        } else {
            vec![self.generate_body(frame)]
        };

        let out = BodyFrame {
            timestamp: self.sim_time,
            bodies,
        };
        self.sim_time += self.config.frame_interval;
        self.frame_counter += 1;
        out
    }
}

impl Default for SimulatedBodyStream {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

impl Iterator for SimulatedBodyStream {
    type Item = BodyFrame;

    fn next(&mut self) -> Option<BodyFrame> {
        Some(self.next_frame())
    }
}
