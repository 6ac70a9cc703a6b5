//! Timed flight scripts for the headless runner.
//!
//! A script is a JSON-lines file. Each line is a relay message plus a `t`
//! field giving the session time in seconds at which it arrives:
//!
//! ```text
//! {"t":0.0,"type":"control","axes":{"throttle":0.8,"yaw":0,"pitch":0,"roll":0}}
//! {"t":4.0,"type":"reset"}
//! ```
//!
//! Blank lines and lines starting with `#` are ignored.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::protocol::{Axes, ControlMessage};

/// One message and its arrival time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScriptEntry {
    /// Seconds since session start.
    pub t: f64,
    #[serde(flatten)]
    pub message: ControlMessage,
}

/// Parse a script, ordering entries by arrival time.
pub fn parse(text: &str) -> Result<Vec<ScriptEntry>> {
    let mut entries = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let entry: ScriptEntry = serde_json::from_str(line).map_err(|e| Error::Script {
            line: i + 1,
            message: e.to_string(),
        })?;
        if !entry.t.is_finite() || entry.t < 0.0 {
            return Err(Error::Script {
                line: i + 1,
                message: format!("time must be finite and non-negative, got {}", entry.t),
            });
        }
        entries.push(entry);
    }
    entries.sort_by(|a, b| a.t.total_cmp(&b.t));
    Ok(entries)
}

/// Load and parse a script file.
pub fn load(path: impl AsRef<Path>) -> Result<Vec<ScriptEntry>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse(&text)
}

/// Controller update rate used by the built-in script.
const CONTROL_RATE: f64 = 30.0;

fn control_burst(from: f64, to: f64, axes: Axes) -> impl Iterator<Item = ScriptEntry> {
    let period = 1.0 / CONTROL_RATE;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let count = ((to - from) / period).floor().max(0.0) as u32;
    (0..count).map(move |k| {
        let t = from + f64::from(k) * period;
        ScriptEntry {
            t,
            message: ControlMessage::Control {
                room: None,
                axes,
                power: true,
                timestamp: Some(t * 1000.0),
            },
        }
    })
}

/// A short demonstration flight.
///
/// Climbs, pitches forward while yawing, goes quiet long enough for the link
/// to be declared stale, then asks for a reset.
pub fn default_script() -> Vec<ScriptEntry> {
    let climb = Axes {
        throttle: 0.8,
        ..Default::default()
    };
    let cruise = Axes {
        throttle: 0.55,
        pitch: 0.6,
        yaw: 0.3,
        roll: 0.0,
    };
    let bank = Axes {
        throttle: 0.55,
        roll: -0.5,
        pitch: 0.3,
        yaw: 0.0,
    };

    let mut entries: Vec<ScriptEntry> = control_burst(0.0, 3.0, climb)
        .chain(control_burst(3.0, 8.0, cruise))
        .chain(control_burst(8.0, 12.0, bank))
        .collect();
    entries.push(ScriptEntry {
        t: 12.0,
        message: ControlMessage::Ping { timestamp: 12_000.0 },
    });
    // Silence from 12 s until the reset at 15 s.
    entries.push(ScriptEntry {
        t: 15.0,
        message: ControlMessage::Reset,
    });
    entries.extend(control_burst(15.5, 20.0, climb));
    entries
}
