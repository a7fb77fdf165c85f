//! Runs a tracker session, recorded or simulated, through the bridge and a
//! simulated fusion engine, logging every location it produces.

use clap::Parser;
use viobridge::{
    args::{BridgeArgs, CommandTask, ReplayCommand, SimulateCommand},
    config::{self, BridgeConfig},
    dummy_engine::{DummyEngine, EngineSettings},
    dummy_tracker::DummyTracker,
    session::{feed, run_session, FramePacer},
    tracker_message_decoder::{decode_session, TrackerEvent},
    udp_streamer::UdpLocationStreamer,
    FusionEngine, LocationFanout, LogObserver, MatrixLayout, PoseIngestionShim,
};

use log::{info, warn};
use std::{
    error::Error,
    fs,
    sync::{mpsc::channel, Arc, Mutex, PoisonError},
};

// Example:
// RUST_LOG=info cargo run --bin viobridge --
//                            --config  bridge.ron
//                            --udp     127.0.0.1:9750 simulate
//                            --frames  900
//                            --record  walk.log

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = BridgeArgs::parse();

    let mut config = match &args.config {
        Some(path) => BridgeConfig::from_path(path)?,
        None => BridgeConfig::default(),
    };
    if let Some(target) = args.udp_target {
        config.udp_target = Some(target);
    }
    if args.no_vio {
        config.use_vio = false;
    }
    config.validate()?;
    info!("localizing in realm {}", config.realm_identifier);

    let (events, pacer) = match args.command {
        CommandTask::Replay(replay) => replay_events(&replay, config.matrix_layout)?,
        CommandTask::Simulate(simulate) => simulate_events(&simulate)?,
    };
    let settings = EngineSettings::try_from(&config)?;

    let fanout = LocationFanout::new();
    fanout.subscribe(Box::new(LogObserver));
    if let Some(target) = &config.udp_target {
        let streamer = UdpLocationStreamer::connect(config::resolve_target(target)?)?;
        info!("streaming locations to {}", streamer.target());
        fanout.subscribe(Box::new(streamer));
    }

    let mut shim: PoseIngestionShim<DummyEngine> =
        PoseIngestionShim::new(None, fanout).with_vio(config.use_vio);
    let engine = Arc::new(Mutex::new(DummyEngine::new(settings, shim.location_sink())));
    shim.attach_engine(engine.clone());

    engine
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .start_updating_location();

    let (tx, rx) = channel::<TrackerEvent>();
    let session = run_session(shim, rx);

    // Pace delivery the way a live tracker would, so the engine's clock
    // sees the session play out.
    let total = events.len();
    if feed(&tx, events, pacer) < total {
        warn!("session ended early");
    }
    drop(tx);

    if session.join().is_err() {
        warn!("session thread panicked");
    }

    let mut engine = engine.lock().unwrap_or_else(PoisonError::into_inner);
    engine.stop_updating_location();
    engine.shutdown();

    Ok(())
}

/// Reads a recorded session, to be played back at `--speed`.
fn replay_events(
    replay: &ReplayCommand,
    layout: MatrixLayout,
) -> Result<(Vec<TrackerEvent>, FramePacer), Box<dyn Error>> {
    if !(replay.speed.is_finite() && replay.speed > 0.0) {
        return Err(format!("speed must be positive, got {}", replay.speed).into());
    }
    let text = fs::read_to_string(&replay.infile)?;
    let (events, failures) = decode_session(&text, layout);
    for (line, e) in &failures {
        warn!(
            "{}:{} : was unable to parse tracker message: {:?}",
            replay.infile.display(),
            line,
            e
        );
    }
    info!("replaying {} events from {}", events.len(), replay.infile.display());

    Ok((events, FramePacer::new(replay.speed)))
}

/// Generates a simulated walk, optionally recording it. Plays in real time.
fn simulate_events(
    simulate: &SimulateCommand,
) -> Result<(Vec<TrackerEvent>, FramePacer), Box<dyn Error>> {
    if !(simulate.frame_rate.is_finite() && simulate.frame_rate > 0.0) {
        return Err(format!("frame rate must be positive, got {}", simulate.frame_rate).into());
    }
    if !(simulate.noise.is_finite() && simulate.noise >= 0.0) {
        return Err(format!("noise must not be negative, got {}", simulate.noise).into());
    }

    let tracker = DummyTracker {
        frame_rate: simulate.frame_rate,
        radius: simulate.radius,
        noise: simulate.noise,
        ..Default::default()
    };
    let events = tracker.generate(simulate.frames);

    if let Some(path) = &simulate.record {
        let text: String = events.iter().map(|e| format!("{}\n", e)).collect();
        fs::write(path, text)?;
        info!("recorded {} events to {}", events.len(), path.display());
    }

    Ok((events, FramePacer::new(1.0)))
}
