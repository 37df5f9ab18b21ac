// src/lib.rs
//! Hand cursor pipeline for depth-sensor skeleton feeds.
//!
//! Body frames come in through a [`sensor::FrameSource`], the
//! [`tracking::HandTrackingManager`] picks a hand, maps it into a
//! shoulder-calibrated box and debounces the sensor's open/closed guesses, and
//! registered [`events::HandListener`]s get cursor moves and grab gestures.

pub mod calibration;
pub mod config;
pub mod data;
pub mod error;
pub mod events;
pub mod hand_state;
pub mod sensor;
pub mod simulation;
pub mod skeleton;
pub mod smoothing;
pub mod tracking;

pub use config::TrackerConfig;
pub use error::{ListenerError, TrackerError};
pub use events::{GestureEvent, GestureKind, HandEvent, HandListener, HandMoveEvent};
pub use tracking::{ConfirmedState, FrameReport, HandTrackingManager};
