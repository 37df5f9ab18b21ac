// src/data.rs - Session recording and export
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result};
use chrono::Local;
use csv::Writer;
use serde::Serialize;
use tracing::info;

use crate::error::ListenerError;
use crate::events::{GestureEvent, HandEvent, HandListener, HandMoveEvent};

#[derive(Debug, Serialize)]
struct EventRecord {
    index: usize,
    timestamp: f64,
    event: &'static str,
    side: &'static str,
    x: f64,
    y: f64,
}

#[derive(Debug, Serialize)]
struct SessionSummary {
    session: String,
    exported_at: String,
    total_events: usize,
    moves: usize,
    gestures: BTreeMap<&'static str, usize>,
    first_timestamp: Option<f64>,
    last_timestamp: Option<f64>,
}

pub struct SessionRecorder {
    output_dir: PathBuf,
    session_name: String,
    events: Vec<HandEvent>,
}

impl SessionRecorder {
    pub fn new(output_dir: impl AsRef<Path>, session_name: Option<String>) -> Self {
        let session_name = session_name.unwrap_or_else(|| {
            format!("session_{}", Local::now().format("%Y%m%d_%H%M%S"))
        });

        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            session_name,
            events: Vec::new(),
        }
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    pub fn session_dir(&self) -> PathBuf {
        self.output_dir.join(&self.session_name)
    }

    pub fn record(&mut self, event: HandEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[HandEvent] {
        &self.events
    }

    pub fn export_csv(&self) -> Result<PathBuf> {
        let csv_path = self.session_dir().join("hand_events.csv");
        std::fs::create_dir_all(self.session_dir())
            .with_context(|| format!("creating {}", self.session_dir().display()))?;

        let file = File::create(&csv_path)
            .with_context(|| format!("creating {}", csv_path.display()))?;
        let mut writer = Writer::from_writer(file);

        for (i, event) in self.events.iter().enumerate() {
            writer.serialize(Self::create_record(i, event))?;
        }

        writer.flush()?;
        info!(path = %csv_path.display(), events = self.events.len(), "exported hand events");
        Ok(csv_path)
    }

    fn create_record(index: usize, event: &HandEvent) -> EventRecord {
        match event {
            HandEvent::Moved(m) => EventRecord {
                index,
                timestamp: m.timestamp,
                event: "moved",
                side: m.side.as_str(),
                x: m.position.x,
                y: m.position.y,
            },
            HandEvent::Gesture(g) => EventRecord {
                index,
                timestamp: g.timestamp,
                event: g.kind.as_str(),
                side: g.side.as_str(),
                x: g.position.x,
                y: g.position.y,
            },
        }
    }

    pub fn export_summary(&self) -> Result<PathBuf> {
        let summary_path = self.session_dir().join("summary.json");
        std::fs::create_dir_all(self.session_dir())
            .with_context(|| format!("creating {}", self.session_dir().display()))?;

        let json = serde_json::to_string_pretty(&self.summary())?;
        std::fs::write(&summary_path, json)
            .with_context(|| format!("writing {}", summary_path.display()))?;

        info!(path = %summary_path.display(), "exported session summary");
        Ok(summary_path)
    }

    fn summary(&self) -> SessionSummary {
        let mut gestures = BTreeMap::new();
        let mut moves = 0;

        for event in &self.events {
            match event {
                HandEvent::Moved(_) => moves += 1,
                HandEvent::Gesture(g) => *gestures.entry(g.kind.as_str()).or_insert(0) += 1,
            }
        }

        let timestamp = |e: &HandEvent| match e {
            HandEvent::Moved(m) => m.timestamp,
            HandEvent::Gesture(g) => g.timestamp,
        };

        SessionSummary {
            session: self.session_name.clone(),
            exported_at: Local::now().to_rfc3339(),
            total_events: self.events.len(),
            moves,
            gestures,
            first_timestamp: self.events.first().map(timestamp),
            last_timestamp: self.events.last().map(timestamp),
        }
    }
}

/// Feeds a shared recorder from the manager's listener chain. Never consumes.
pub struct RecordingListener {
    recorder: Rc<RefCell<SessionRecorder>>,
}

impl RecordingListener {
    pub fn new(recorder: Rc<RefCell<SessionRecorder>>) -> Self {
        Self { recorder }
    }

    fn push(&self, event: HandEvent) -> Result<(), ListenerError> {
        self.recorder
            .try_borrow_mut()
            .map_err(|_| ListenerError::new("session recorder is busy"))?
            .record(event);
        Ok(())
    }
}

impl HandListener for RecordingListener {
    fn on_gesture(&mut self, event: &GestureEvent) -> Result<bool, ListenerError> {
        self.push(HandEvent::Gesture(*event))?;
        Ok(false)
    }

    fn on_hand_moved(&mut self, event: &HandMoveEvent) -> Result<(), ListenerError> {
        self.push(HandEvent::Moved(*event))
    }
}
