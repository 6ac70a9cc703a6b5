//! Static collision geometry supplied by the scene loader.
//!
//! Geometry arrives once at load time as world-space triangle lists tagged
//! ground or obstacle. The builders here cover the primitive shapes used by the
//! demo course; real scenes convert their meshes into [`TriangleMesh`] directly.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// How a piece of geometry participates in collision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColliderKind {
    /// Surfaces the drone lands on. Queried with downward rays.
    Ground,
    /// Movement-blocking geometry such as buildings and trees.
    Obstacle,
}

/// A world-space triangle list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TriangleMesh {
    /// Vertex positions in world space.
    pub vertices: Vec<Vec3>,
    /// Triangle vertex indices.
    pub indices: Vec<[u32; 3]>,
}

impl TriangleMesh {
    /// Create a mesh from raw vertices and triangles.
    pub fn new(vertices: Vec<Vec3>, indices: Vec<[u32; 3]>) -> Self {
        Self { vertices, indices }
    }

    /// An axis-aligned box centred on `center`.
    pub fn cuboid(center: Vec3, half_extents: Vec3) -> Self {
        let h = half_extents;
        let vertices = vec![
            center + Vec3::new(-h.x, -h.y, -h.z),
            center + Vec3::new(h.x, -h.y, -h.z),
            center + Vec3::new(h.x, h.y, -h.z),
            center + Vec3::new(-h.x, h.y, -h.z),
            center + Vec3::new(-h.x, -h.y, h.z),
            center + Vec3::new(h.x, -h.y, h.z),
            center + Vec3::new(h.x, h.y, h.z),
            center + Vec3::new(-h.x, h.y, h.z),
        ];
        // Outward-facing, counter-clockwise winding.
        let indices = vec![
            [0, 3, 2],
            [0, 2, 1], // -Z
            [4, 5, 6],
            [4, 6, 7], // +Z
            [0, 4, 7],
            [0, 7, 3], // -X
            [1, 2, 6],
            [1, 6, 5], // +X
            [3, 7, 6],
            [3, 6, 2], // +Y
            [0, 1, 5],
            [0, 5, 4], // -Y
        ];
        Self { vertices, indices }
    }

    /// A horizontal square at height `y`, facing up.
    pub fn plane(center: Vec3, half_size: f32) -> Self {
        let vertices = vec![
            center + Vec3::new(-half_size, 0.0, -half_size),
            center + Vec3::new(half_size, 0.0, -half_size),
            center + Vec3::new(half_size, 0.0, half_size),
            center + Vec3::new(-half_size, 0.0, half_size),
        ];
        Self {
            vertices,
            indices: vec![[0, 3, 2], [0, 2, 1]],
        }
    }

    /// Axis-aligned bounds, or `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.vertices.first()?;
        Some(
            self.vertices
                .iter()
                .fold((first, first), |(min, max), v| (min.min(*v), max.max(*v))),
        )
    }

    /// Horizontal (XZ) size of the bounds.
    pub fn footprint(&self) -> Vec2 {
        self.bounds()
            .map_or(Vec2::ZERO, |(min, max)| Vec2::new(max.x - min.x, max.z - min.z))
    }

    /// Check the mesh can be turned into a collider.
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.indices.is_empty() {
            return Err("mesh has no triangles".to_string());
        }
        if let Some(v) = self.vertices.iter().find(|v| !v.is_finite()) {
            return Err(format!("non-finite vertex {v}"));
        }
        let len = self.vertices.len();
        if let Some(tri) = self
            .indices
            .iter()
            .find(|tri| tri.iter().any(|&i| i as usize >= len))
        {
            return Err(format!("triangle {tri:?} out of bounds for {len} vertices"));
        }
        Ok(())
    }
}

/// Geometry tagged with its collision role.
#[derive(Clone, Debug, PartialEq)]
pub struct GeometrySource {
    /// Name used in logs.
    pub name: String,
    /// Ground or obstacle.
    pub kind: ColliderKind,
    /// World-space triangles.
    pub mesh: TriangleMesh,
}

impl GeometrySource {
    /// Tag `mesh` as ground.
    pub fn ground(name: impl Into<String>, mesh: TriangleMesh) -> Self {
        Self {
            name: name.into(),
            kind: ColliderKind::Ground,
            mesh,
        }
    }

    /// Tag `mesh` as an obstacle.
    pub fn obstacle(name: impl Into<String>, mesh: TriangleMesh) -> Self {
        Self {
            name: name.into(),
            kind: ColliderKind::Obstacle,
            mesh,
        }
    }
}

/// Height of the demo ground surface.
pub const DEMO_GROUND_HEIGHT: f32 = 0.3;

/// Demo buildings: (x, z, width, height, depth).
const DEMO_BUILDINGS: [(f32, f32, f32, f32, f32); 6] = [
    (100.0, -20.0, 8.0, 15.0, 8.0),
    (90.0, -10.0, 6.0, 20.0, 6.0),
    (110.0, -15.0, 10.0, 12.0, 10.0),
    (85.0, 5.0, 7.0, 18.0, 7.0),
    (105.0, 10.0, 9.0, 14.0, 9.0),
    (120.0, 0.0, 8.0, 16.0, 8.0),
];

/// A flat ground slab plus a small block of buildings east of the spawn.
///
/// Used when no scene geometry is available, e.g. in the headless runner.
pub fn demo_scene() -> Vec<GeometrySource> {
    let mut sources = vec![GeometrySource::ground(
        "ground",
        TriangleMesh::cuboid(
            Vec3::new(0.0, DEMO_GROUND_HEIGHT - 0.1, 0.0),
            Vec3::new(250.0, 0.1, 250.0),
        ),
    )];

    sources.extend(
        DEMO_BUILDINGS
            .iter()
            .enumerate()
            .map(|(i, &(x, z, width, height, depth))| {
                GeometrySource::obstacle(
                    format!("building-{i}"),
                    TriangleMesh::cuboid(
                        Vec3::new(x, height / 2.0 + DEMO_GROUND_HEIGHT, z),
                        Vec3::new(width / 2.0, height / 2.0, depth / 2.0),
                    ),
                )
            }),
    );

    sources
}
