// src/hand_state.rs
use serde::{Deserialize, Serialize};

/// Discrete hand classification as reported by the sensor for one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HandState {
    #[default]
    NotTracked,
    Unknown,
    Open,
    Closed,
}

/// Run-length tracker over raw per-frame hand states.
#[derive(Debug, Clone, Default)]
pub struct HandStateCounter {
    current: HandState,
    count: u32,
}

impl HandStateCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, state: HandState) {
        if state == self.current {
            self.count = self.count.saturating_add(1);
        } else {
            self.current = state;
            self.count = 1;
        }
    }

    pub fn reset(&mut self) {
        self.current = HandState::NotTracked;
        self.count = 0;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn current_state(&self) -> HandState {
        self.current
    }
}
