//! Launch parameter parsing for the headless runner.
//!
//! On native, parameters are parsed from command-line arguments using clap.
//! On WASM, defaults are used (CLI argument parsing is not available).

use std::path::PathBuf;

/// Default length of a scripted session in seconds.
const DEFAULT_DURATION: f64 = 20.0;
/// Default simulated frame rate.
const DEFAULT_FPS: u32 = 60;

/// Launch parameters for a session.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchParams {
    /// Physics parameter JSON. Built-in defaults when absent.
    pub params: Option<PathBuf>,
    /// Course JSON. The default course when absent.
    pub track: Option<PathBuf>,
    /// Flight script (JSON lines). A built-in script when absent.
    pub script: Option<PathBuf>,
    /// Session length in simulated seconds.
    pub duration: f64,
    /// Simulated frames per second.
    pub fps: u32,
    /// CSV telemetry output. Standard output when absent.
    pub telemetry: Option<PathBuf>,
    /// Relay room to accept control for. Any room when absent.
    pub room: Option<String>,
}

impl Default for LaunchParams {
    fn default() -> Self {
        Self {
            params: None,
            track: None,
            script: None,
            duration: DEFAULT_DURATION,
            fps: DEFAULT_FPS,
            telemetry: None,
            room: None,
        }
    }
}

impl LaunchParams {
    /// Length of one simulated frame in seconds.
    pub fn frame_dt(&self) -> f64 {
        1.0 / f64::from(self.fps.max(1))
    }

    /// Number of frames in the session.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn frame_count(&self) -> u64 {
        (self.duration.max(0.0) * f64::from(self.fps.max(1))).round() as u64
    }
}

#[cfg(not(target_family = "wasm"))]
mod native {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    #[command(about = "Fly a scripted drone session and write CSV telemetry")]
    struct CliArgs {
        /// Physics parameter JSON file.
        #[arg(long)]
        params: Option<PathBuf>,

        /// Course JSON file.
        #[arg(long)]
        track: Option<PathBuf>,

        /// Flight script, one timed control message per line.
        #[arg(long)]
        script: Option<PathBuf>,

        /// Session length in seconds.
        #[arg(long, default_value_t = DEFAULT_DURATION)]
        duration: f64,

        /// Simulated frames per second.
        #[arg(long, default_value_t = DEFAULT_FPS)]
        fps: u32,

        /// Write CSV telemetry here instead of standard output.
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Only accept control messages for this room.
        #[arg(long)]
        room: Option<String>,
    }

    pub fn parse() -> LaunchParams {
        let args = CliArgs::parse();
        LaunchParams {
            params: args.params,
            track: args.track,
            script: args.script,
            duration: args.duration,
            fps: args.fps,
            telemetry: args.output,
            room: args.room,
        }
    }
}

/// Parse launch parameters from CLI args (native) or use defaults (WASM).
pub fn parse() -> LaunchParams {
    #[cfg(not(target_family = "wasm"))]
    {
        native::parse()
    }
    #[cfg(target_family = "wasm")]
    {
        LaunchParams::default()
    }
}
