// src/events.rs - Hand events and the ordered listener registry
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ListenerError;
use crate::skeleton::HandSide;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GestureKind {
    BeganTracking,
    TrackingEnded,
    OpenToClose,
    CloseToOpen,
}

impl GestureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BeganTracking => "began_tracking",
            Self::TrackingEnded => "tracking_ended",
            Self::OpenToClose => "open_to_close",
            Self::CloseToOpen => "close_to_open",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureEvent {
    pub kind: GestureKind,
    pub side: HandSide,
    /// Cursor position at the moment of the transition.
    pub position: Point2<f64>,
    pub timestamp: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandMoveEvent {
    pub side: HandSide,
    /// Normalized cursor position, never NaN.
    pub position: Point2<f64>,
    pub timestamp: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HandEvent {
    Moved(HandMoveEvent),
    Gesture(GestureEvent),
}

/// Something that reacts to the hand cursor: a button, a game board, a recorder.
///
/// Called synchronously from the frame callback, so implementations must not
/// block.
pub trait HandListener {
    /// Return `Ok(true)` to consume the event; later listeners won't see it.
    fn on_gesture(&mut self, _event: &GestureEvent) -> Result<bool, ListenerError> {
        Ok(false)
    }

    fn on_hand_moved(&mut self, _event: &HandMoveEvent) -> Result<(), ListenerError> {
        Ok(())
    }

    /// A point the presented cursor should snap to instead of `position`.
    fn attach_point(&self, _position: &Point2<f64>) -> Option<Point2<f64>> {
        None
    }
}

pub type ListenerId = u64;

/// Outcome of a first-responder gesture dispatch.
#[derive(Debug, Default)]
pub struct GestureDispatch {
    pub consumed_by: Option<ListenerId>,
    pub errors: Vec<ListenerError>,
}

/// Listeners in registration order, keyed by the handle returned from `add`.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: ListenerId,
    listeners: Vec<(ListenerId, Box<dyn HandListener>)>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, listener: Box<dyn HandListener>) -> ListenerId {
        self.next_id += 1;
        self.listeners.push((self.next_id, listener));
        self.next_id
    }

    /// Hands the listener back to the caller.
    pub fn remove(&mut self, id: ListenerId) -> Option<Box<dyn HandListener>> {
        let index = self.listeners.iter().position(|(lid, _)| *lid == id)?;
        Some(self.listeners.remove(index).1)
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Stops at the first listener that consumes the event. A listener that
    /// fails is logged and treated as not having consumed it.
    pub fn dispatch_gesture(&mut self, event: &GestureEvent) -> GestureDispatch {
        let mut dispatch = GestureDispatch::default();

        for (id, listener) in self.listeners.iter_mut() {
            match listener.on_gesture(event) {
                Ok(true) => {
                    dispatch.consumed_by = Some(*id);
                    break;
                }
                Ok(false) => {}
                Err(e) => {
                    let e = e.with_listener(*id);
                    warn!(kind = event.kind.as_str(), "{}", e);
                    dispatch.errors.push(e);
                }
            }
        }

        dispatch
    }

    /// Every listener sees every move.
    pub fn dispatch_moved(&mut self, event: &HandMoveEvent) -> Vec<ListenerError> {
        let mut errors = Vec::new();

        for (id, listener) in self.listeners.iter_mut() {
            if let Err(e) = listener.on_hand_moved(event) {
                let e = e.with_listener(*id);
                warn!("{}", e);
                errors.push(e);
            }
        }

        errors
    }

    /// First attachment point offered, in registration order.
    pub fn attach_point(&self, position: &Point2<f64>) -> Option<Point2<f64>> {
        self.listeners
            .iter()
            .find_map(|(_, listener)| listener.attach_point(position))
    }
}
