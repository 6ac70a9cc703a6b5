//! Single-slot control mailbox.
//!
//! The network side overwrites the slot whenever a control message arrives;
//! the scheduler reads whatever is there once per tick. There is no queue:
//! a burst of messages between two ticks collapses to the newest one.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use web_time::Instant;

use crate::input::ControlSample;

/// A sample together with the moment it was written.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Delivery {
    /// The sample as received.
    pub sample: ControlSample,
    /// Local receive time, used for staleness.
    pub received_at: Instant,
}

/// What the scheduler should fly with this tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EffectiveControl {
    /// The sample to shape.
    pub sample: ControlSample,
    /// Whether the stored sample was too old (or missing) and was zeroed.
    pub stale: bool,
}

/// Write end of the mailbox. Cheap to clone and safe to share across threads.
#[derive(Clone, Debug)]
pub struct ControlWriter {
    tx: Arc<watch::Sender<Option<Delivery>>>,
}

impl ControlWriter {
    /// Store `sample`, replacing whatever was there.
    pub fn write(&self, sample: ControlSample) {
        self.write_at(sample, Instant::now());
    }

    /// Store `sample` as if it arrived at `received_at`.
    pub fn write_at(&self, sample: ControlSample, received_at: Instant) {
        self.tx.send_replace(Some(Delivery {
            sample: sample.normalized(),
            received_at,
        }));
    }
}

/// Read end of the mailbox, owned by the scheduler.
#[derive(Debug)]
pub struct ControlMailbox {
    tx: Arc<watch::Sender<Option<Delivery>>>,
    rx: watch::Receiver<Option<Delivery>>,
}

impl Default for ControlMailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlMailbox {
    /// An empty mailbox.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(None);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// A writer feeding this mailbox.
    pub fn writer(&self) -> ControlWriter {
        ControlWriter {
            tx: Arc::clone(&self.tx),
        }
    }

    /// The newest delivery, if anything has ever been written.
    pub fn latest(&mut self) -> Option<Delivery> {
        *self.rx.borrow_and_update()
    }

    /// Whether a write happened since the last [`latest`](Self::latest).
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Replace the slot with a zeroed, powered-off sample stamped `now`.
    pub fn reset(&mut self, now: Instant) {
        self.tx.send_replace(Some(Delivery {
            sample: ControlSample::zeroed(false),
            received_at: now,
        }));
    }

    /// The sample to use at `now`.
    ///
    /// A delivery older than `stale_after` is replaced by centred sticks and
    /// closed throttle. The power flag survives: a dropped link zeroes the
    /// sticks but does not cut power. With nothing ever written, power is off.
    pub fn effective(&mut self, now: Instant, stale_after: Duration) -> EffectiveControl {
        match self.latest() {
            None => EffectiveControl {
                sample: ControlSample::zeroed(false),
                stale: true,
            },
            Some(delivery) if now.saturating_duration_since(delivery.received_at) > stale_after => {
                EffectiveControl {
                    sample: ControlSample::zeroed(delivery.sample.power),
                    stale: true,
                }
            }
            Some(delivery) => EffectiveControl {
                sample: delivery.sample,
                stale: false,
            },
        }
    }
}
