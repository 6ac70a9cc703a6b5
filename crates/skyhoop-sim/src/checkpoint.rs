//! Sequential checkpoint gating and race timing.

use glam::Vec3;
use serde::Serialize;

use crate::track::HoopKind;

/// Speed that starts the race timer.
pub const START_SPEED: f32 = 0.5;

/// Delay between finishing and the course resetting (seconds).
pub const RESET_DELAY: f64 = 3.0;

/// One hoop on the course.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Checkpoint {
    /// Position in the flying order, starting at zero.
    pub index: usize,
    /// Hoop shape.
    pub kind: HoopKind,
    /// Bounding sphere centre.
    pub center: Vec3,
    /// Bounding sphere radius.
    pub radius: f32,
    /// Whether the hoop has been flown through this lap.
    pub passed: bool,
}

impl Checkpoint {
    /// A hoop of `kind` at `center`, sized by the hoop's bounding sphere.
    pub fn new(index: usize, kind: HoopKind, center: Vec3) -> Self {
        Self {
            index,
            kind,
            center,
            radius: kind.bounding_radius(),
            passed: false,
        }
    }

    /// Whether `position` is inside the bounding sphere.
    pub fn contains(&self, position: Vec3) -> bool {
        position.distance(self.center) < self.radius
    }
}

/// Something that happened on the course this tick.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RaceEvent {
    /// The timer started.
    Started,
    /// A hoop was passed.
    CheckpointPassed {
        /// Index of the hoop.
        index: usize,
        /// Its shape.
        kind: HoopKind,
    },
    /// The last hoop was passed.
    Completed {
        /// Lap time in seconds.
        time: f64,
        /// Whether this beat the previous best.
        new_best: bool,
    },
    /// The course was cleared for another lap.
    Reset,
}

/// Race progress.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RaceState {
    /// The course, in flying order.
    pub checkpoints: Vec<Checkpoint>,
    /// Index of the next hoop to fly through.
    pub current_index: usize,
    /// Whether the timer is running.
    pub started: bool,
    /// Sim time at which the timer started.
    pub start_time: f64,
    /// Fastest completed lap.
    pub best_time: Option<f64>,
    /// Most recent completed lap.
    pub last_time: Option<f64>,
    /// Sim time at which a finished course resets.
    pub reset_at: Option<f64>,
}

impl RaceState {
    /// Whether every hoop has been passed.
    pub fn completed(&self) -> bool {
        !self.checkpoints.is_empty() && self.current_index >= self.checkpoints.len()
    }

    /// The hoop to fly through next.
    pub fn current(&self) -> Option<&Checkpoint> {
        self.checkpoints.get(self.current_index)
    }
}

/// What a race HUD shows.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RaceSummary {
    /// Next hoop, counting from one.
    pub current_checkpoint: usize,
    /// Number of hoops.
    pub total_checkpoints: usize,
    /// Lap time so far, or the finishing time once completed.
    pub elapsed: f64,
    /// Fastest lap.
    pub best_time: Option<f64>,
    /// Whether the timer is running.
    pub started: bool,
    /// Whether every hoop has been passed.
    pub completed: bool,
}

/// Tracks progress through the course.
#[derive(Clone, Debug, Default)]
pub struct CheckpointTracker {
    race: RaceState,
}

impl CheckpointTracker {
    /// Track a course of `checkpoints`. An empty course never starts.
    pub fn new(checkpoints: Vec<Checkpoint>) -> Self {
        Self {
            race: RaceState {
                checkpoints,
                ..Default::default()
            },
        }
    }

    /// Current race state.
    pub fn race(&self) -> &RaceState {
        &self.race
    }

    /// Advance the race for a drone at `position` moving at `speed`.
    ///
    /// `now` is sim time in seconds.
    pub fn update(&mut self, position: Vec3, speed: f32, now: f64) -> Vec<RaceEvent> {
        let mut events = Vec::new();
        if self.race.checkpoints.is_empty() {
            return events;
        }

        if self.race.reset_at.is_some_and(|at| now >= at) {
            self.reset();
            events.push(RaceEvent::Reset);
        }

        if !self.race.started && !self.race.completed() && speed > START_SPEED {
            self.race.started = true;
            self.race.start_time = now;
            tracing::info!("Race started");
            events.push(RaceEvent::Started);
        }

        let Some(current) = self.race.current().copied() else {
            return events;
        };
        if current.passed || !current.contains(position) {
            return events;
        }

        let total = self.race.checkpoints.len();
        let index = self.race.current_index;
        self.race.checkpoints[index].passed = true;
        self.race.current_index += 1;
        tracing::info!(
            "Passed through hoop {}/{total} ({})",
            index + 1,
            current.kind.name()
        );
        events.push(RaceEvent::CheckpointPassed {
            index,
            kind: current.kind,
        });

        if self.race.completed() {
            events.push(self.complete(now));
        }

        events
    }

    /// Clear progress for a new lap, keeping the best time.
    pub fn reset(&mut self) {
        for checkpoint in &mut self.race.checkpoints {
            checkpoint.passed = false;
        }
        self.race.current_index = 0;
        self.race.started = false;
        self.race.reset_at = None;
        tracing::info!("Race reset, ready for next attempt");
    }

    /// HUD view at sim time `now`.
    pub fn summary(&self, now: f64) -> RaceSummary {
        let race = &self.race;
        let completed = race.completed();
        let elapsed = match (race.started, completed, race.last_time) {
            (true, true, Some(time)) => time,
            (true, _, _) => (now - race.start_time).max(0.0),
            (false, _, _) => 0.0,
        };
        RaceSummary {
            current_checkpoint: race.current_index + 1,
            total_checkpoints: race.checkpoints.len(),
            elapsed,
            best_time: race.best_time,
            started: race.started,
            completed,
        }
    }

    fn complete(&mut self, now: f64) -> RaceEvent {
        let time = now - self.race.start_time;
        let new_best = self.race.best_time.is_none_or(|best| time < best);
        if new_best {
            self.race.best_time = Some(time);
        }
        self.race.last_time = Some(time);
        self.race.reset_at = Some(now + RESET_DELAY);
        tracing::info!("Race completed in {time:.2}s{}", if new_best { " (new best)" } else { "" });
        RaceEvent::Completed { time, new_best }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(clippy::cast_precision_loss)]
    fn line_course(n: usize) -> Vec<Checkpoint> {
        (0..n)
            .map(|i| Checkpoint::new(i, HoopKind::Torus, Vec3::new(i as f32 * 20.0, 10.0, 0.0)))
            .collect()
    }

    #[allow(clippy::cast_precision_loss)]
    fn at(i: usize) -> Vec3 {
        Vec3::new(i as f32 * 20.0, 10.0, 0.0)
    }

    #[test]
    fn test_empty_course_stays_idle() {
        let mut tracker = CheckpointTracker::new(Vec::new());
        assert!(tracker.update(Vec3::ZERO, 10.0, 1.0).is_empty());
        let summary = tracker.summary(5.0);
        assert!(!summary.started);
        assert!(!summary.completed);
        assert_eq!(summary.total_checkpoints, 0);
    }

    #[test]
    fn test_timer_starts_on_movement() {
        let mut tracker = CheckpointTracker::new(line_course(3));
        assert!(tracker.update(Vec3::ZERO, 0.4, 1.0).is_empty());
        assert_eq!(tracker.update(Vec3::ZERO, 0.6, 2.0), vec![RaceEvent::Started]);
        assert!(tracker.race().started);
        assert!((tracker.summary(3.5).elapsed - 1.5).abs() < 1e-9);
        // Only once.
        assert!(tracker.update(Vec3::ZERO, 5.0, 3.0).is_empty());
    }

    #[test]
    fn test_passing_advances_by_one() {
        let mut tracker = CheckpointTracker::new(line_course(3));
        let events = tracker.update(at(0), 1.0, 0.0);
        assert!(events.contains(&RaceEvent::CheckpointPassed {
            index: 0,
            kind: HoopKind::Torus
        }));
        assert_eq!(tracker.race().current_index, 1);
        assert!(tracker.race().checkpoints[0].passed);
        assert_eq!(tracker.summary(0.0).current_checkpoint, 2);
    }

    #[test]
    fn test_skipping_ahead_is_ignored() {
        let mut tracker = CheckpointTracker::new(line_course(3));
        tracker.update(at(2), 1.0, 0.0);
        assert_eq!(tracker.race().current_index, 0);
        assert!(!tracker.race().checkpoints[2].passed);
    }

    #[test]
    fn test_staying_inside_passes_once() {
        let mut tracker = CheckpointTracker::new(line_course(3));
        tracker.update(at(0), 1.0, 0.0);
        tracker.update(at(0), 1.0, 0.1);
        assert_eq!(tracker.race().current_index, 1);
    }

    #[test]
    fn test_pass_requires_being_inside() {
        let mut tracker = CheckpointTracker::new(line_course(1));
        let edge = at(0) + Vec3::X * (HoopKind::Torus.bounding_radius() + 1e-3);
        tracker.update(edge, 1.0, 0.0);
        assert_eq!(tracker.race().current_index, 0);
    }

    #[test]
    fn test_completion_records_best_and_resets_later() {
        let mut tracker = CheckpointTracker::new(line_course(2));
        tracker.update(Vec3::ZERO, 1.0, 10.0);
        tracker.update(at(0), 1.0, 12.0);
        let events = tracker.update(at(1), 1.0, 15.0);
        assert_eq!(
            events.last(),
            Some(&RaceEvent::Completed {
                time: 5.0,
                new_best: true
            })
        );

        let summary = tracker.summary(16.0);
        assert!(summary.completed);
        assert!((summary.elapsed - 5.0).abs() < 1e-9);
        assert_eq!(summary.best_time, Some(5.0));

        // Nothing happens before the delay elapses.
        assert!(tracker.update(at(1), 0.0, 17.9).is_empty());
        let events = tracker.update(Vec3::ZERO, 0.0, 18.0);
        assert_eq!(events, vec![RaceEvent::Reset]);
        assert_eq!(tracker.race().current_index, 0);
        assert!(!tracker.race().started);
        assert!(tracker.race().checkpoints.iter().all(|c| !c.passed));
        assert_eq!(tracker.race().best_time, Some(5.0));
    }

    #[test]
    fn test_slower_lap_keeps_best() {
        let mut tracker = CheckpointTracker::new(line_course(1));
        tracker.update(Vec3::ZERO, 1.0, 0.0);
        tracker.update(at(0), 1.0, 4.0);
        tracker.update(Vec3::ZERO, 1.0, 7.0);
        let events = tracker.update(at(0), 1.0, 13.0);
        assert_eq!(
            events.last(),
            Some(&RaceEvent::Completed {
                time: 6.0,
                new_best: false
            })
        );
        assert_eq!(tracker.race().best_time, Some(4.0));
        assert_eq!(tracker.race().last_time, Some(6.0));
    }
}
