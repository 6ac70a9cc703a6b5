//! Relay wire protocol.
//!
//! Controllers and receivers exchange JSON messages through a room-based
//! relay. Only the receiver side is implemented here: control messages are
//! written into the simulation's mailbox, reset requests are forwarded to the
//! scheduler, and the receiver pings the controller to measure round-trip
//! latency.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use skyhoop_sim::{ControlSample, ControlWriter, ResetHandle};
use web_time::Instant;

use crate::error::{Error, Result};

/// Which end of a room a client is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Controller,
    Receiver,
}

/// Stick positions as sent by a controller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Axes {
    pub throttle: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

fn power_on() -> bool {
    true
}

/// A message on the relay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    /// First message from a client, joining a room.
    Hello { role: Role, room: String },
    /// Relay acknowledgement of [`ControlMessage::Hello`].
    HelloAck { role: Role, room: String },
    /// Stick update, sent at roughly 30 Hz.
    Control {
        #[serde(default)]
        room: Option<String>,
        axes: Axes,
        /// Controllers without a power switch always fly powered.
        #[serde(default = "power_on")]
        power: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<f64>,
    },
    /// Latency check. `timestamp` is in milliseconds on the sender's clock.
    Ping { timestamp: f64 },
    /// Reply to [`ControlMessage::Ping`], echoing its timestamp.
    Pong { timestamp: f64 },
    /// Return the drone to spawn.
    Reset,
}

impl ControlMessage {
    /// Decode a message from JSON text.
    pub fn decode(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Protocol {
            message: e.to_string(),
        })
    }

    /// Encode the message as JSON text.
    pub fn encode(&self) -> String {
        // Every variant is plain data, so serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// A control message for `sample`.
    pub fn control(room: impl Into<String>, sample: &ControlSample) -> Self {
        ControlMessage::Control {
            room: Some(room.into()),
            axes: Axes {
                throttle: sample.throttle,
                yaw: sample.yaw,
                pitch: sample.pitch,
                roll: sample.roll,
            },
            power: sample.power,
            timestamp: Some(sample.timestamp),
        }
    }
}

/// How often a receiver pings its controller.
pub const PING_INTERVAL: Duration = Duration::from_secs(2);

/// Receiver-side message handling for one room.
#[derive(Clone, Debug)]
pub struct MessageHandler {
    room: Option<String>,
    writer: ControlWriter,
    reset: ResetHandle,
    /// Origin of ping timestamps.
    epoch: Instant,
    /// Most recent round-trip time.
    latency: Arc<Mutex<Option<Duration>>>,
}

impl MessageHandler {
    /// Handle messages for `room`, or for any room when `None`.
    pub fn new(room: Option<String>, writer: ControlWriter, reset: ResetHandle) -> Self {
        Self {
            room,
            writer,
            reset,
            epoch: Instant::now(),
            latency: Arc::default(),
        }
    }

    /// A ping to send to the controller at `now`.
    pub fn ping_at(&self, now: Instant) -> ControlMessage {
        ControlMessage::Ping {
            timestamp: now.saturating_duration_since(self.epoch).as_secs_f64() * 1000.0,
        }
    }

    /// Round-trip time measured from the most recent pong.
    pub fn latency(&self) -> Option<Duration> {
        self.latency.lock().ok().and_then(|latency| *latency)
    }

    fn record_pong(&self, timestamp: f64, now: Instant) {
        let sent = Duration::try_from_secs_f64(timestamp / 1000.0).ok();
        let elapsed = now.saturating_duration_since(self.epoch);
        let Some(rtt) = sent.and_then(|sent| elapsed.checked_sub(sent)) else {
            tracing::debug!("Ignoring pong with timestamp {timestamp}");
            return;
        };
        if let Ok(mut latency) = self.latency.lock() {
            *latency = Some(rtt);
        }
        tracing::debug!("Round-trip latency {} ms", rtt.as_millis());
    }

    /// Handle a message received now.
    pub fn handle(&self, message: &ControlMessage) -> Option<ControlMessage> {
        self.handle_at(message, Instant::now())
    }

    /// Handle a message received at `now`, returning any reply to send.
    pub fn handle_at(&self, message: &ControlMessage, now: Instant) -> Option<ControlMessage> {
        match message {
            ControlMessage::Control {
                room,
                axes,
                power,
                timestamp,
            } => {
                if self.accepts(room.as_deref()) {
                    self.writer.write_at(
                        ControlSample {
                            throttle: axes.throttle,
                            yaw: axes.yaw,
                            pitch: axes.pitch,
                            roll: axes.roll,
                            power: *power,
                            timestamp: timestamp.unwrap_or_default(),
                        },
                        now,
                    );
                } else {
                    tracing::debug!("Ignoring control for room {room:?}");
                }
                None
            }
            ControlMessage::Ping { timestamp } => Some(ControlMessage::Pong {
                timestamp: *timestamp,
            }),
            ControlMessage::Reset => {
                tracing::info!("Reset requested by peer");
                self.reset.request();
                None
            }
            ControlMessage::HelloAck { role, room } => {
                tracing::info!("Joined room {room} as {role:?}");
                None
            }
            ControlMessage::Pong { timestamp } => {
                self.record_pong(*timestamp, now);
                None
            }
            ControlMessage::Hello { .. } => None,
        }
    }

    fn accepts(&self, room: Option<&str>) -> bool {
        match (&self.room, room) {
            (None, _) => true,
            (Some(ours), Some(theirs)) => ours == theirs,
            (Some(_), None) => false,
        }
    }
}
