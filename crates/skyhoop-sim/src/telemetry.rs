//! Flight telemetry.
//!
//! Read-only views derived from a [`SimSnapshot`] for HUDs, plus CSV output
//! for offline analysis of recorded flights.

use std::io::{self, Write};

use serde::Serialize;

use crate::checkpoint::RaceSummary;
use crate::scheduler::SimSnapshot;

/// Attitude in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AttitudeDegrees {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

/// Velocity components and derived speeds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct VelocityView {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Magnitude of the full velocity.
    pub total: f32,
    /// Magnitude ignoring the vertical component.
    pub horizontal: f32,
}

/// HUD view of one tick.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Telemetry {
    pub attitude: AttitudeDegrees,
    pub velocity: VelocityView,
    /// Altitude above the world origin.
    pub altitude: f32,
    /// Rotor speed as a fraction of the maximum.
    pub normalized_rpm: f32,
    pub armed: bool,
    pub power_on: bool,
    pub race: RaceSummary,
}

impl From<&SimSnapshot> for Telemetry {
    fn from(snapshot: &SimSnapshot) -> Self {
        let drone = &snapshot.drone;
        Self {
            attitude: AttitudeDegrees {
                yaw: drone.yaw.to_degrees(),
                pitch: drone.pitch.to_degrees(),
                roll: drone.roll.to_degrees(),
            },
            velocity: VelocityView {
                x: drone.velocity.x,
                y: drone.velocity.y,
                z: drone.velocity.z,
                total: drone.speed(),
                horizontal: drone.horizontal_speed(),
            },
            altitude: drone.position.y,
            normalized_rpm: snapshot.normalized_rpm,
            armed: snapshot.propulsion.armed,
            power_on: snapshot.propulsion.power_on,
            race: snapshot.race,
        }
    }
}

/// Destination for CSV telemetry.
pub struct CsvTelemetry<W> {
    out: W,
}

impl<W: Write> CsvTelemetry<W> {
    /// Write the header to `out` and return a writer ready for rows.
    pub fn new(mut out: W) -> io::Result<Self> {
        writeln!(out, "{}", CSV_HEADER.trim_end_matches(','))?;
        Ok(Self { out })
    }

    /// Append one tick.
    pub fn record(&mut self, snapshot: &SimSnapshot) -> io::Result<()> {
        writeln!(self.out, "{}", csv_row(snapshot))
    }

    /// Flush and return the underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

/// Define the CSV header and row formatter from one column list, keeping
/// names and formats in sync.
macro_rules! define_telemetry {
    (
        columns: { $( $name:ident : $fmt:literal ),* $(,)? },
        prelude: |$snapshot:ident| { $( $prelude:stmt );* $(;)? },
        row_values: { $( $val:expr ),* $(,)? }
    ) => {
        /// CSV header, with a trailing comma.
        const CSV_HEADER: &str = concat!( $( stringify!($name), "," ),* );

        /// Format one CSV row without a trailing newline.
        fn csv_row($snapshot: &SimSnapshot) -> String {
            $( $prelude )*

            let line = format!( concat!( $( $fmt, "," ),* ), $( $val ),* );
            line.trim_end_matches(',').to_string()
        }
    };
}

define_telemetry! {
    columns: {
        t: "{:.4}",
        dt: "{:.5}",
        throttle: "{:.3}",
        yaw_in: "{:.3}",
        pitch_in: "{:.3}",
        roll_in: "{:.3}",
        power: "{}",
        stale: "{}",
        pos_x: "{:.3}",
        pos_y: "{:.3}",
        pos_z: "{:.3}",
        vel_x: "{:.2}",
        vel_y: "{:.2}",
        vel_z: "{:.2}",
        speed: "{:.2}",
        h_speed: "{:.2}",
        yaw_deg: "{:.2}",
        pitch_deg: "{:.2}",
        roll_deg: "{:.2}",
        rpm: "{:.0}",
        armed: "{}",
        floor: "{:.3}",
        blocked: "{}",
        embedded: "{}",
        checkpoint: "{}",
        race_time: "{:.2}",
    },
    prelude: |s| {
        let view = Telemetry::from(s);
        let drone = &s.drone;
    },
    row_values: {
        s.time,
        s.dt,
        s.control.throttle,
        s.control.yaw,
        s.control.pitch,
        s.control.roll,
        s.control.power,
        s.stale,
        drone.position.x,
        drone.position.y,
        drone.position.z,
        view.velocity.x,
        view.velocity.y,
        view.velocity.z,
        view.velocity.total,
        view.velocity.horizontal,
        view.attitude.yaw,
        view.attitude.pitch,
        view.attitude.roll,
        s.propulsion.current_rpm,
        view.armed,
        s.collision.floor,
        s.collision.blocked_by.is_some(),
        s.collision.embedded,
        view.race.current_checkpoint,
        view.race.elapsed,
    }
}
