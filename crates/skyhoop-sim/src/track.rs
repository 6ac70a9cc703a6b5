//! Race course layout.
//!
//! A course is a list of circular sections. Each section places its hoops
//! evenly around a circle, bobbing up and down three times per lap, and the
//! hoop shape cycles so that neighbouring hoops rarely look alike.

use std::f32::consts::TAU;
use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::checkpoint::Checkpoint;
use crate::error::{self, Error, Result};

/// Vertical amplitude of the hoop height pattern.
const HEIGHT_VARIATION: f32 = 4.0;

/// Hoop shapes, in the order they are cycled through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoopKind {
    Torus,
    Square,
    Hexagon,
    Triangle,
    Double,
    Oval,
}

impl HoopKind {
    /// Every kind, in cycle order.
    pub const ALL: [HoopKind; 6] = [
        HoopKind::Torus,
        HoopKind::Square,
        HoopKind::Hexagon,
        HoopKind::Triangle,
        HoopKind::Double,
        HoopKind::Oval,
    ];

    /// Kind used for the hoop at `global_index` within section `section_index`.
    pub fn cycle(section_index: usize, global_index: usize) -> Self {
        Self::ALL[(section_index + global_index) % Self::ALL.len()]
    }

    /// Radius of the ring's centre line.
    pub fn ring_radius(self) -> f32 {
        match self {
            HoopKind::Torus => 3.0,
            HoopKind::Square => 4.0,
            HoopKind::Hexagon => 3.5,
            HoopKind::Triangle => 4.5,
            HoopKind::Double => 2.5,
            HoopKind::Oval => 3.2,
        }
    }

    /// Thickness of the ring's tube.
    pub fn tube_radius(self) -> f32 {
        match self {
            HoopKind::Torus | HoopKind::Oval => 0.2,
            HoopKind::Square => 0.3,
            HoopKind::Hexagon => 0.25,
            HoopKind::Triangle => 0.35,
            HoopKind::Double => 0.15,
        }
    }

    /// Radius of the sphere enclosing the hoop. Passing means entering it.
    pub fn bounding_radius(self) -> f32 {
        self.ring_radius() + self.tube_radius()
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            HoopKind::Torus => "Standard Torus",
            HoopKind::Square => "Square Ring",
            HoopKind::Hexagon => "Hexagon Ring",
            HoopKind::Triangle => "Triangle Ring",
            HoopKind::Double => "Double Ring",
            HoopKind::Oval => "Oval Ring",
        }
    }
}

/// One circular section of the course.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackSection {
    /// Radius of the circle the hoops sit on.
    pub radius: f32,
    /// Mean hoop height.
    pub height: f32,
    /// Circle centre, X.
    pub center_x: f32,
    /// Circle centre, Z.
    pub center_z: f32,
    /// Number of hoops in the section.
    pub hoops: usize,
}

impl TrackSection {
    const fn new(radius: f32, height: f32, center_x: f32, center_z: f32, hoops: usize) -> Self {
        Self {
            radius,
            height,
            center_x,
            center_z,
            hoops,
        }
    }

    /// Position of hoop `i` in this section.
    pub fn hoop_position(&self, i: usize) -> Vec3 {
        #[allow(clippy::cast_precision_loss)]
        let angle = i as f32 / self.hoops as f32 * TAU;
        let (sin, cos) = angle.sin_cos();
        Vec3::new(
            self.center_x + cos * self.radius,
            self.height + (angle * 3.0).sin() * HEIGHT_VARIATION,
            self.center_z + sin * self.radius,
        )
    }
}

/// The default course: four sections around the spawn and a copy of them
/// shifted west.
pub const DEFAULT_SECTIONS: [TrackSection; 8] = [
    TrackSection::new(25.0, 13.0, 0.0, 0.0, 4),
    TrackSection::new(45.0, 18.0, 30.0, 40.0, 6),
    TrackSection::new(35.0, 22.0, -40.0, 30.0, 5),
    TrackSection::new(28.0, 8.0, 0.0, -50.0, 3),
    TrackSection::new(25.0, 13.0, -140.0, 0.0, 4),
    TrackSection::new(45.0, 18.0, -110.0, 40.0, 6),
    TrackSection::new(35.0, 22.0, -180.0, 30.0, 5),
    TrackSection::new(28.0, 8.0, -140.0, -50.0, 3),
];

/// A race course definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Sections, flown in order.
    pub sections: Vec<TrackSection>,
}

impl Default for Track {
    fn default() -> Self {
        Self {
            sections: DEFAULT_SECTIONS.to_vec(),
        }
    }
}

impl Track {
    /// Parse a course from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let track: Self = error::from_json("track", json)?;
        track.validate()?;
        Ok(track)
    }

    /// Load a course from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&error::read_to_string(path.as_ref())?)
    }

    /// Check every section can place its hoops.
    pub fn validate(&self) -> Result<()> {
        for (i, section) in self.sections.iter().enumerate() {
            let values = [
                section.radius,
                section.height,
                section.center_x,
                section.center_z,
            ];
            if values.iter().any(|v| !v.is_finite()) {
                return Err(Error::InvalidTrack {
                    detail: format!("section {i} has a non-finite value"),
                });
            }
            if section.radius < 0.0 {
                return Err(Error::InvalidTrack {
                    detail: format!("section {i} has negative radius {}", section.radius),
                });
            }
            if section.hoops == 0 {
                return Err(Error::InvalidTrack {
                    detail: format!("section {i} has no hoops"),
                });
            }
        }
        Ok(())
    }

    /// Total number of hoops.
    pub fn hoop_count(&self) -> usize {
        self.sections.iter().map(|s| s.hoops).sum()
    }

    /// Lay out the course as an ordered checkpoint list.
    pub fn checkpoints(&self) -> Vec<Checkpoint> {
        let mut checkpoints = Vec::with_capacity(self.hoop_count());
        for (section_index, section) in self.sections.iter().enumerate() {
            for i in 0..section.hoops {
                let index = checkpoints.len();
                let kind = HoopKind::cycle(section_index, index);
                checkpoints.push(Checkpoint::new(index, kind, section.hoop_position(i)));
            }
        }
        tracing::info!(
            "Race track created with {} hoops across {} sections",
            checkpoints.len(),
            self.sections.len()
        );
        checkpoints
    }
}
