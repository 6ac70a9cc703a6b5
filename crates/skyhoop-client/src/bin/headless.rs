//! Headless session runner.
//!
//! Flies a scripted session against the demo scene on a virtual clock and
//! writes one CSV telemetry row per frame. Script messages go through the
//! same relay handler a networked receiver uses.
//!
//! Usage:
//!   skyhoop-headless [--script flight.jsonl] [--duration 20] [--output run.csv]

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use skyhoop_client::launch_params::{self, LaunchParams};
use skyhoop_client::protocol::{MessageHandler, PING_INTERVAL};
use skyhoop_client::{Error, Result, script};
use skyhoop_sim::{
    ColliderSet, CsvTelemetry, FrameScheduler, PhysicsParams, RaceEvent, Track, geometry,
};
use web_time::Instant;

fn main() -> ExitCode {
    #[cfg(not(target_family = "wasm"))]
    {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    let launch = launch_params::parse();
    match run(&launch) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("# ERROR: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Totals gathered over a session.
#[derive(Default)]
struct SessionStats {
    frames: u64,
    max_altitude: f32,
    max_speed: f32,
    stale_frames: u64,
    blocked_frames: u64,
    checkpoints_passed: usize,
    laps: Vec<f64>,
    pings: usize,
    pongs: usize,
}

fn io_error(path: &str) -> impl FnOnce(io::Error) -> Error + '_ {
    move |source| Error::Io {
        path: path.to_string(),
        source,
    }
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn run(launch: &LaunchParams) -> Result<()> {
    let params = match &launch.params {
        Some(path) => PhysicsParams::load(path)?,
        None => PhysicsParams::default(),
    };
    let track = match &launch.track {
        Some(path) => Track::load(path)?,
        None => Track::default(),
    };
    let script = match &launch.script {
        Some(path) => script::load(path)?,
        None => script::default_script(),
    };

    let colliders = Arc::new(ColliderSet::build(geometry::demo_scene()));
    eprintln!("# Scene: {} colliders", colliders.len());
    eprintln!(
        "# Track: {} hoops in {} sections",
        track.hoop_count(),
        track.sections.len()
    );
    eprintln!("# Script: {} messages", script.len());

    let mut scheduler = FrameScheduler::new(params, colliders, track.checkpoints());
    let handler = MessageHandler::new(
        launch.room.clone(),
        scheduler.control_writer(),
        scheduler.reset_handle(),
    );

    let (out, out_name): (Box<dyn Write>, String) = match &launch.telemetry {
        Some(path) => {
            let name = path.display().to_string();
            let file = File::create(path).map_err(io_error(&name))?;
            (Box::new(BufWriter::new(file)), name)
        }
        None => (Box::new(io::stdout().lock()), "stdout".to_string()),
    };
    let mut csv = CsvTelemetry::new(out).map_err(io_error(&out_name))?;

    let start = Instant::now();
    let frame_dt = launch.frame_dt();
    let mut pending = script.iter().peekable();
    let mut stats = SessionStats::default();
    let mut next_ping = PING_INTERVAL.as_secs_f64();

    for frame in 1..=launch.frame_count() {
        let t = frame as f64 * frame_dt;

        while let Some(entry) = pending.next_if(|entry| entry.t <= t) {
            let received = start + Duration::from_secs_f64(entry.t);
            if let Some(reply) = handler.handle_at(&entry.message, received) {
                tracing::debug!("Reply: {}", reply.encode());
                stats.pongs += 1;
            }
        }

        if t >= next_ping {
            let ping = handler.ping_at(start + Duration::from_secs_f64(t));
            tracing::debug!("Ping: {}", ping.encode());
            stats.pings += 1;
            next_ping += PING_INTERVAL.as_secs_f64();
        }

        let snapshot = scheduler.tick(start + Duration::from_secs_f64(t), frame_dt as f32);
        csv.record(&snapshot).map_err(io_error(&out_name))?;

        stats.frames += 1;
        stats.max_altitude = stats.max_altitude.max(snapshot.drone.position.y);
        stats.max_speed = stats.max_speed.max(snapshot.drone.speed());
        stats.stale_frames += u64::from(snapshot.stale);
        stats.blocked_frames += u64::from(snapshot.collision.blocked_by.is_some());
        for event in &snapshot.events {
            match event {
                RaceEvent::CheckpointPassed { .. } => stats.checkpoints_passed += 1,
                RaceEvent::Completed { time, .. } => stats.laps.push(*time),
                RaceEvent::Started | RaceEvent::Reset => {}
            }
        }
    }
    csv.finish()
        .and_then(|mut out| out.flush())
        .map_err(io_error(&out_name))?;

    let race = scheduler.race();
    eprintln!("# Session complete:");
    eprintln!("#   Frames: {} ({:.1} s)", stats.frames, scheduler.time());
    eprintln!("#   Max altitude: {:.2} m", stats.max_altitude);
    eprintln!("#   Max speed: {:.2} m/s", stats.max_speed);
    eprintln!("#   Stale frames: {}", stats.stale_frames);
    eprintln!("#   Blocked frames: {}", stats.blocked_frames);
    eprintln!("#   Pings sent: {}", stats.pings);
    eprintln!("#   Pongs sent: {}", stats.pongs);
    if let Some(rtt) = handler.latency() {
        eprintln!("#   Round trip: {} ms", rtt.as_millis());
    }
    eprintln!(
        "#   Checkpoints: {} passed, next {}/{}",
        stats.checkpoints_passed,
        race.current_index + 1,
        race.checkpoints.len()
    );
    for (i, lap) in stats.laps.iter().enumerate() {
        eprintln!("#   Lap {}: {lap:.2} s", i + 1);
    }
    match race.best_time {
        Some(best) => eprintln!("#   Best lap: {best:.2} s"),
        None => eprintln!("#   Best lap: (none)"),
    }
    eprintln!("#   Telemetry: {out_name}");
    Ok(())
}
