// src/sensor.rs - Frame fan-out with explicit subscribe/unsubscribe
use tracing::debug;

use crate::skeleton::{BodyFrame, CoordinateMapper};

/// Anything that wants every body frame, e.g. the hand tracking manager.
pub trait FrameSink {
    fn on_frame(&mut self, frame: &BodyFrame, mapper: &dyn CoordinateMapper);
}

pub type SubscriptionId = u64;

/// Owns the projection and the subscribed sinks. Unsubscribing hands the
/// sink back, so nothing is ever notified after its owner took it down.
pub struct FrameSource {
    mapper: Box<dyn CoordinateMapper>,
    next_id: SubscriptionId,
    sinks: Vec<(SubscriptionId, Box<dyn FrameSink>)>,
    frames_published: u64,
}

impl FrameSource {
    pub fn new(mapper: Box<dyn CoordinateMapper>) -> Self {
        Self {
            mapper,
            next_id: 0,
            sinks: Vec::new(),
            frames_published: 0,
        }
    }

    pub fn subscribe(&mut self, sink: Box<dyn FrameSink>) -> SubscriptionId {
        self.next_id += 1;
        self.sinks.push((self.next_id, sink));
        debug!(id = self.next_id, "frame sink subscribed");
        self.next_id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> Option<Box<dyn FrameSink>> {
        let index = self.sinks.iter().position(|(sid, _)| *sid == id)?;
        debug!(id, "frame sink unsubscribed");
        Some(self.sinks.remove(index).1)
    }

    /// Delivers synchronously, in subscription order.
    pub fn publish(&mut self, frame: &BodyFrame) {
        self.frames_published += 1;
        for (_, sink) in self.sinks.iter_mut() {
            sink.on_frame(frame, self.mapper.as_ref());
        }
    }

    pub fn mapper(&self) -> &dyn CoordinateMapper {
        self.mapper.as_ref()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sinks.len()
    }

    pub fn frames_published(&self) -> u64 {
        self.frames_published
    }
}
