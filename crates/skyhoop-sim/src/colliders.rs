//! Immutable, BVH-indexed collider set.
//!
//! Each geometry source becomes one trimesh collider; the trimesh carries its
//! own bounding volume hierarchy, so a ray query against a mesh is logarithmic
//! in its triangle count. Colliders are additionally pruned by their world
//! bounds before any per-mesh query is issued.

use avian3d::prelude::{Collider, Position, Rotation};
use glam::Vec3;

use crate::geometry::{ColliderKind, GeometrySource};

/// Obstacles smaller than this in both horizontal axes are ignored.
///
/// Matches the cutoff for decorative props such as lamp posts and signs.
pub const MIN_OBSTACLE_FOOTPRINT: f32 = 0.5;

/// A ray intersection with static geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    /// World-space hit point.
    pub point: Vec3,
    /// Surface normal at the hit, facing back along the ray.
    pub normal: Vec3,
    /// Distance from the ray origin.
    pub distance: f32,
}

/// Anything that can answer ray queries against tagged static geometry.
pub trait RayCaster {
    /// Nearest hit along `direction` (unit length) within `max_distance`,
    /// considering only colliders of `kind`.
    fn cast_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        kind: ColliderKind,
    ) -> Option<RayHit>;
}

/// One static collider.
pub struct StaticCollider {
    name: String,
    kind: ColliderKind,
    shape: Collider,
    min: Vec3,
    max: Vec3,
}

impl StaticCollider {
    /// Name of the source geometry.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ground or obstacle.
    pub fn kind(&self) -> ColliderKind {
        self.kind
    }

    /// World-space bounds.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        (self.min, self.max)
    }

    /// Whether a segment of `max_distance` from `origin` could reach the bounds.
    fn may_intersect(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> bool {
        // Cheap reject: the whole box is out of range.
        let closest = origin.clamp(self.min, self.max);
        if closest.distance_squared(origin) > max_distance * max_distance {
            return false;
        }
        ray_hits_box(origin, direction, max_distance, self.min, self.max)
    }
}

impl std::fmt::Debug for StaticCollider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCollider")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("min", &self.min)
            .field("max", &self.max)
            .finish_non_exhaustive()
    }
}

/// Slab test of a bounded ray against an axis-aligned box.
fn ray_hits_box(origin: Vec3, direction: Vec3, max_distance: f32, min: Vec3, max: Vec3) -> bool {
    let mut t_min = 0.0_f32;
    let mut t_max = max_distance;
    for axis in 0..3 {
        let o = origin[axis];
        let d = direction[axis];
        if d.abs() < 1e-8 {
            if o < min[axis] || o > max[axis] {
                return false;
            }
            continue;
        }
        let inv = 1.0 / d;
        let (t0, t1) = {
            let a = (min[axis] - o) * inv;
            let b = (max[axis] - o) * inv;
            if a < b { (a, b) } else { (b, a) }
        };
        t_min = t_min.max(t0);
        t_max = t_max.min(t1);
        if t_min > t_max {
            return false;
        }
    }
    true
}

/// The static collision world, built once at scene load.
#[derive(Debug, Default)]
pub struct ColliderSet {
    colliders: Vec<StaticCollider>,
}

impl ColliderSet {
    /// A set with no geometry. Every query misses.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build colliders from tagged geometry.
    ///
    /// Invalid meshes are skipped with a warning, and obstacles with a tiny
    /// horizontal footprint are skipped silently.
    pub fn build(sources: impl IntoIterator<Item = GeometrySource>) -> Self {
        let mut colliders = Vec::new();

        for source in sources {
            if let Err(detail) = source.mesh.validate() {
                tracing::warn!("Skipping collider {}: {detail}", source.name);
                continue;
            }

            let footprint = source.mesh.footprint();
            if source.kind == ColliderKind::Obstacle
                && footprint.x < MIN_OBSTACLE_FOOTPRINT
                && footprint.y < MIN_OBSTACLE_FOOTPRINT
            {
                tracing::debug!(
                    "Skipping small obstacle {} ({:.2} x {:.2})",
                    source.name,
                    footprint.x,
                    footprint.y
                );
                continue;
            }

            let Some((min, max)) = source.mesh.bounds() else {
                continue;
            };

            // Use try_trimesh to avoid panicking on invalid input.
            let shape = match Collider::try_trimesh(source.mesh.vertices, source.mesh.indices) {
                Ok(shape) => shape,
                Err(e) => {
                    tracing::warn!("Skipping collider {}: {e:?}", source.name);
                    continue;
                }
            };

            colliders.push(StaticCollider {
                name: source.name,
                kind: source.kind,
                shape,
                min,
                max,
            });
        }

        tracing::info!(
            "Collider set built: {} ground, {} obstacle",
            colliders
                .iter()
                .filter(|c| c.kind == ColliderKind::Ground)
                .count(),
            colliders
                .iter()
                .filter(|c| c.kind == ColliderKind::Obstacle)
                .count()
        );

        Self { colliders }
    }

    /// All colliders.
    pub fn colliders(&self) -> &[StaticCollider] {
        &self.colliders
    }

    /// Number of colliders of `kind`.
    pub fn count(&self, kind: ColliderKind) -> usize {
        self.colliders.iter().filter(|c| c.kind == kind).count()
    }

    /// Total number of colliders.
    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    /// Whether the set has no colliders.
    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }
}

impl RayCaster for ColliderSet {
    fn cast_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        kind: ColliderKind,
    ) -> Option<RayHit> {
        if max_distance <= 0.0 || !origin.is_finite() {
            return None;
        }
        let direction = direction.try_normalize()?;

        self.colliders
            .iter()
            .filter(|c| c.kind == kind && c.may_intersect(origin, direction, max_distance))
            .filter_map(|c| {
                // Vertices are baked in world space, so the collider sits at the
                // origin with identity rotation.
                c.shape
                    .cast_ray(
                        Position(Vec3::ZERO),
                        Rotation::default(),
                        origin,
                        direction,
                        max_distance,
                        false,
                    )
                    .map(|(distance, normal)| RayHit {
                        point: origin + direction * distance,
                        normal: normal.normalize_or_zero(),
                        distance,
                    })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}
