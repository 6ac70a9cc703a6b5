//! Collision response against static geometry.
//!
//! Three passes run every tick, in order:
//!
//! 1. **Ground**: a downward ray finds the surface below the drone and keeps
//!    the drone at least one ground radius above it. A second ray from the
//!    projected next position pre-empts tunnelling at high descent rates.
//! 2. **Obstacles**: a ray along the velocity blocks movement that would carry
//!    the drone into a wall within this frame.
//! 3. **De-penetration**: six short axis rays detect a drone that ended up
//!    inside geometry anyway (e.g. after a teleport) and lift it out.
//!
//! Finally the altitude is raised back to this tick's ground floor, so the
//! later passes can never leave the drone below it.

use std::sync::Arc;

use glam::Vec3;

use crate::attitude::DroneState;
use crate::colliders::{ColliderSet, RayCaster, RayHit};
use crate::geometry::ColliderKind;
use crate::params::PhysicsParams;

/// Ground height assumed when no ground collider is below the drone.
pub const FALLBACK_GROUND_HEIGHT: f32 = 0.3;

/// Maximum length of the downward ground ray.
pub const GROUND_RAY_DISTANCE: f32 = 1000.0;

/// Extra height added on top of the required clearance after a ground hit.
const GROUND_BUFFER: f32 = 0.2;

/// Upward velocity added after a ground hit.
const GROUND_BOUNCE: f32 = 3.0;

/// Upward velocity added when pushed up to the fallback floor.
const FALLBACK_BOUNCE: f32 = 1.0;

/// Delay before the post-impact climb check fires (seconds).
const GROUND_HOLD_SECS: f32 = 0.1;

/// Minimum climb rate enforced when the post-impact check fires.
const GROUND_HOLD_MIN_VELOCITY: f32 = 1.0;

/// Minimum climb rate forced when the next position would be underground.
const PREDICTIVE_MIN_CLIMB: f32 = 2.0;

/// Altitude margin above the fallback floor that arms the hard-landing guard.
const HARD_LANDING_MARGIN: f32 = 2.0;

/// Descent rate beyond which the hard-landing guard triggers.
const HARD_LANDING_SPEED: f32 = -5.0;

/// Climb rate set by the hard-landing guard.
const HARD_LANDING_RECOVERY: f32 = 3.0;

/// Distance kept from an obstacle surface after a blocked move.
pub const SAFE_DISTANCE: f32 = 1.2;

/// Velocity added along the hit normal after a blocked move.
const OBSTACLE_BOUNCE: f32 = 2.0;

/// Ray length for embedded-drone detection.
pub const EMBED_RAY_DISTANCE: f32 = 0.5;

/// Height added when lifting an embedded drone out.
const EMBED_LIFT: f32 = 3.0;

/// Climb rate given to an embedded drone.
const EMBED_VELOCITY: f32 = 5.0;

const EMBED_RAY_AXES: [Vec3; 6] = [
    Vec3::X,
    Vec3::NEG_X,
    Vec3::Y,
    Vec3::NEG_Y,
    Vec3::Z,
    Vec3::NEG_Z,
];

/// What the ground pass did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GroundContact {
    /// The drone was pushed above a ground collider at `surface`.
    Surface {
        /// Height of the surface hit.
        surface: f32,
    },
    /// No collider below; the drone was pushed up to the fallback floor.
    Fallback,
}

/// Everything that fired during one collision pass.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CollisionReport {
    /// Lowest altitude the drone may occupy this tick.
    pub floor: f32,
    /// Ground correction, if any.
    pub ground: Option<GroundContact>,
    /// The projected position would have been underground.
    pub predictive: bool,
    /// The hard-landing guard fired.
    pub hard_landing: bool,
    /// The obstacle that blocked movement, if any.
    pub blocked_by: Option<RayHit>,
    /// The drone was found embedded and lifted out.
    pub embedded: bool,
}

impl CollisionReport {
    /// Whether any correction was applied.
    pub fn any(&self) -> bool {
        self.ground.is_some()
            || self.predictive
            || self.hard_landing
            || self.blocked_by.is_some()
            || self.embedded
    }
}

/// Floor under `position`: the surface height plus clearance.
///
/// Returns the floor and the surface height, or `None` for the surface when
/// the fallback applies.
pub fn ground_floor<C: RayCaster + ?Sized>(
    caster: &C,
    position: Vec3,
    params: &PhysicsParams,
) -> (f32, Option<f32>) {
    match caster.cast_ray(
        position,
        Vec3::NEG_Y,
        GROUND_RAY_DISTANCE,
        ColliderKind::Ground,
    ) {
        Some(hit) => (hit.point.y + params.ground_radius, Some(hit.point.y)),
        None => (FALLBACK_GROUND_HEIGHT + params.ground_radius, None),
    }
}

/// Find the obstacle, if any, that this frame's movement would run into.
///
/// The ray is cast along the velocity; a hit closer than the drone radius plus
/// this frame's travel distance blocks.
pub fn sweep_obstacles<C: RayCaster + ?Sized>(
    caster: &C,
    state: &DroneState,
    dt: f32,
    radius: f32,
) -> Option<RayHit> {
    let speed = state.velocity.length();
    if dt <= 0.0 || speed <= f32::EPSILON {
        return None;
    }
    let direction = state.velocity / speed;
    let reach = radius + speed * dt;
    caster
        .cast_ray(state.position, direction, reach, ColliderKind::Obstacle)
        .filter(|hit| hit.distance < reach)
}

/// Push the drone out to a safe distance from `hit` and cancel motion into it.
pub fn block_against(state: &mut DroneState, hit: &RayHit) {
    let normal = hit.normal;
    state.position = hit.point + normal * SAFE_DISTANCE;

    let into_surface = state.velocity.dot(-normal);
    if into_surface > 0.0 {
        state.velocity += normal * into_surface;
    }
    state.velocity += normal * OBSTACLE_BOUNCE;
}

/// Whether any short axis-aligned ray finds obstacle geometry closer than the ray
/// length.
pub fn is_embedded<C: RayCaster + ?Sized>(caster: &C, position: Vec3) -> bool {
    EMBED_RAY_AXES.iter().any(|&axis| {
        caster
            .cast_ray(
                position,
                axis,
                EMBED_RAY_DISTANCE,
                ColliderKind::Obstacle,
            )
            .is_some_and(|hit| hit.distance < EMBED_RAY_DISTANCE)
    })
}

/// Runs the collision passes against a shared, read-only collider set.
#[derive(Debug)]
pub struct CollisionSystem {
    colliders: Arc<ColliderSet>,
    /// Time left until the post-impact climb check fires.
    ground_hold: Option<f32>,
}

impl CollisionSystem {
    /// Create a collision system over `colliders`.
    pub fn new(colliders: Arc<ColliderSet>) -> Self {
        Self {
            colliders,
            ground_hold: None,
        }
    }

    /// The collider set queried by this system.
    pub fn colliders(&self) -> &Arc<ColliderSet> {
        &self.colliders
    }

    /// Forget any pending post-impact check.
    pub fn reset(&mut self) {
        self.ground_hold = None;
    }

    /// Run all passes for one tick.
    pub fn resolve(
        &mut self,
        state: &mut DroneState,
        dt: f32,
        params: &PhysicsParams,
    ) -> CollisionReport {
        let caster = Arc::clone(&self.colliders);
        let mut report = CollisionReport::default();

        self.tick_ground_hold(state, dt);
        self.resolve_ground(caster.as_ref(), state, dt, params, &mut report);

        if let Some(hit) = sweep_obstacles(caster.as_ref(), state, dt, params.obstacle_radius) {
            tracing::debug!(
                "Blocking collision at {} (distance {:.2})",
                hit.point,
                hit.distance
            );
            block_against(state, &hit);
            report.blocked_by = Some(hit);
        }

        if is_embedded(caster.as_ref(), state.position) {
            tracing::warn!(
                "Drone embedded in geometry at {}, lifting out",
                state.position
            );
            state.position.y += EMBED_LIFT;
            state.velocity = Vec3::new(0.0, EMBED_VELOCITY, 0.0);
            report.embedded = true;
        }

        if state.position.y < report.floor {
            state.position.y = report.floor;
            if state.velocity.y < 0.0 {
                state.velocity.y = 0.0;
            }
        }

        report
    }

    fn tick_ground_hold(&mut self, state: &mut DroneState, dt: f32) {
        let Some(remaining) = self.ground_hold.as_mut() else {
            return;
        };
        *remaining -= dt;
        if *remaining <= 0.0 {
            self.ground_hold = None;
            state.velocity.y = state.velocity.y.max(GROUND_HOLD_MIN_VELOCITY);
        }
    }

    fn resolve_ground(
        &mut self,
        caster: &ColliderSet,
        state: &mut DroneState,
        dt: f32,
        params: &PhysicsParams,
        report: &mut CollisionReport,
    ) {
        let current = state.position;
        let next = current + state.velocity * dt;

        let (floor, surface) = ground_floor(caster, current, params);
        report.floor = floor;

        if current.y < floor {
            match surface {
                Some(surface) => {
                    tracing::debug!(
                        "Ground collision: surface {surface:.2}, drone {:.2}, required {floor:.2}",
                        current.y
                    );
                    state.position.y = floor + GROUND_BUFFER;
                    state.velocity.y = state.velocity.y.max(0.0) + GROUND_BOUNCE;
                    self.ground_hold = Some(GROUND_HOLD_SECS);
                    report.ground = Some(GroundContact::Surface { surface });
                }
                None => {
                    tracing::debug!("Using fallback ground floor {floor:.2}");
                    state.position.y = floor;
                    state.velocity.y = state.velocity.y.max(0.0) + FALLBACK_BOUNCE;
                    report.ground = Some(GroundContact::Fallback);
                }
            }
        }

        // Predictive check from where the drone will be next frame.
        if next.y < current.y {
            let (next_floor, next_surface) = ground_floor(caster, next, params);
            if next_surface.is_some() && next.y < next_floor {
                tracing::debug!(
                    "Preventing ground collision: next {:.2}, required {next_floor:.2}",
                    next.y
                );
                state.velocity.y = state.velocity.y.max(PREDICTIVE_MIN_CLIMB);
                report.predictive = true;
            }
        }

        let fallback_floor = FALLBACK_GROUND_HEIGHT + params.ground_radius;
        if current.y - HARD_LANDING_MARGIN < fallback_floor && state.velocity.y < HARD_LANDING_SPEED
        {
            tracing::debug!("Hard landing guard engaged at {:.2}", current.y);
            state.velocity.y = HARD_LANDING_RECOVERY;
            state.position.y = state.position.y.max(fallback_floor + 1.0);
            report.hard_landing = true;
        }
    }
}
