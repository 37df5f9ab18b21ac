// src/main.rs
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hand_cursor::data::{RecordingListener, SessionRecorder};
use hand_cursor::sensor::FrameSource;
use hand_cursor::simulation::SimulatedBodyStream;
use hand_cursor::skeleton::DepthCameraMapper;
use hand_cursor::{HandTrackingManager, TrackerConfig};

const DEFAULT_FRAMES: usize = 600;

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => TrackerConfig::load(&path)
            .with_context(|| format!("loading tracker config from {}", path))?,
        None => TrackerConfig::default(),
    };
    let frames = match args.next() {
        Some(n) => n.parse().context("frame count must be a positive integer")?,
        None => DEFAULT_FRAMES,
    };

    let output_dir = directories::UserDirs::new()
        .and_then(|dirs| dirs.document_dir().map(|p| p.join("HandCursor")))
        .unwrap_or_else(|| PathBuf::from("./output"));

    let recorder = Rc::new(RefCell::new(SessionRecorder::new(&output_dir, None)));

    let mut manager = HandTrackingManager::new(config).context("invalid tracker config")?;
    manager.add_listener(Box::new(RecordingListener::new(Rc::clone(&recorder))));

    let mut source = FrameSource::new(Box::new(DepthCameraMapper::kinect_v2()));
    let subscription = source.subscribe(Box::new(manager));

    info!(frames, "running simulated session");
    for frame in SimulatedBodyStream::default().take(frames) {
        source.publish(&frame);
    }

    // Teardown before export so nothing records into a half-written session.
    if source.unsubscribe(subscription).is_none() {
        warn!("tracking manager was already unsubscribed");
    }

    let recorder = recorder.borrow();
    let csv_path = recorder.export_csv()?;
    let summary_path = recorder.export_summary()?;

    println!("Recorded {} hand events", recorder.events().len());
    println!("  events:  {}", csv_path.display());
    println!("  summary: {}", summary_path.display());

    Ok(())
}
