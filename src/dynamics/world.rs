//! The simulation world: bodies, detector, solvers, and configuration in
//! one explicitly constructed context.

use rand::RngCore;
use tracing::debug;

use crate::collision::gjk::GjkDetector;
use crate::error::TumbleError;
use crate::math::{Ray, Real, Vec3};
use crate::shape::RayHit;

use super::assistant::{BodyOdeAssistant, ScanTolerances};
use super::body::Body;
use super::body_set::{BodyId, BodySet};
use super::ode::{OdeAssistant, OdeSolver, RungeKuttaSolver};
use super::solver::{ContactSolver, SolverConfig};

/// Configuration for the physics simulation.
#[derive(Debug, Clone)]
pub struct PhysicsConfig {
    /// Gravity vector. Default: (0, 0, -9.8).
    pub gravity: Vec3,
    /// Separations below this count as interpenetration. Default: 1e-4.
    pub intersecting_tolerance: Real,
    /// Separations below this count as contact. Default: 1e-2.
    pub contacting_tolerance: Real,
    /// Contact solver tunables.
    pub solver: SolverConfig,
    /// Smallest sub-step the discontinuity search may take. Default: 1e-6.
    pub min_step: Real,
    /// Bound on bisection iterations per step. Default: 32.
    pub max_bisections: usize,
    /// Bound on zero-advance (impulse-only) interruptions within one
    /// `advance` call. Default: 16.
    pub max_interruptions: usize,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, 0.0, -9.8),
            intersecting_tolerance: 1.0e-4,
            contacting_tolerance: 1.0e-2,
            solver: SolverConfig::default(),
            min_step: 1.0e-6,
            max_bisections: 32,
            max_interruptions: 16,
        }
    }
}

/// The simulation world owning every registry the engine needs.
///
/// There is exactly one writer at a time: `advance` runs the whole
/// pipeline (pair scan, force solve, integration, impulse resolution)
/// synchronously to completion.
pub struct PhysicsWorld {
    config: PhysicsConfig,
    bodies: BodySet,
    detector: GjkDetector,
    solver: ContactSolver,
    integrator: RungeKuttaSolver,
    state: Vec<Real>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(PhysicsConfig::default())
    }
}

impl PhysicsWorld {
    pub fn new(config: PhysicsConfig) -> Self {
        let solver = ContactSolver::new(config.solver.clone());
        let integrator = RungeKuttaSolver::new(config.min_step, config.max_bisections);
        Self {
            config,
            bodies: BodySet::new(),
            detector: GjkDetector::new(),
            solver,
            integrator,
            state: Vec::new(),
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn bodies(&self) -> &BodySet {
        &self.bodies
    }

    pub fn bodies_mut(&mut self) -> &mut BodySet {
        &mut self.bodies
    }

    pub fn add_body(&mut self, body: Body) -> BodyId {
        self.bodies.add(body)
    }

    pub fn remove_body(&mut self, id: BodyId) -> Option<Body> {
        self.bodies.remove(id)
    }

    /// Advance the simulation from `time` by `delta`.
    ///
    /// The tick is consumed across possibly several partial integrations:
    /// collisions interrupt a step, get resolved by impulses, and the
    /// remainder of the tick continues from there.
    pub fn advance(&mut self, time: Real, delta: Real) -> Result<(), TumbleError> {
        if !delta.is_finite() || delta < 0.0 {
            return Err(TumbleError::Configuration(format!(
                "cannot advance by {delta}"
            )));
        }
        let end = time + delta;
        let mut t = time;
        let mut interruptions = 0;

        while t < end {
            let tolerances = ScanTolerances {
                intersecting: self.config.intersecting_tolerance,
                contacting: self.config.contacting_tolerance,
                velocity: self.config.solver.velocity_tolerance,
            };
            let mut assistant = BodyOdeAssistant::new(
                &mut self.bodies,
                &self.detector,
                &self.solver,
                self.config.gravity,
                tolerances,
            );

            self.state.clear();
            assistant.marshall(&mut self.state);
            if self.state.is_empty() {
                // nothing movable
                return Ok(());
            }

            let advanced = self
                .integrator
                .solve(&mut self.state, t, end - t, &mut assistant)?;
            if advanced <= 0.0 {
                interruptions += 1;
                if interruptions > self.config.max_interruptions {
                    return Err(TumbleError::Divergence(format!(
                        "tick at t = {t} interrupted more than {} times",
                        self.config.max_interruptions
                    )));
                }
            } else {
                interruptions = 0;
                t += advanced;
            }
        }
        debug!(time, delta, "tick complete");
        Ok(())
    }

    /// Whether `point` is inside any body's shape.
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.bodies.iter().any(|(_, body)| body.contains(point))
    }

    /// Nearest intersection of `ray` with any body.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(BodyId, RayHit)> {
        self.bodies
            .iter()
            .filter_map(|(id, body)| body.intersect_ray(ray).map(|hit| (id, hit)))
            .min_by(|(_, p), (_, q)| {
                p.t.partial_cmp(&q.t).unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    /// A world-space point inside the given body.
    pub fn random_point(&self, id: BodyId, rng: &mut dyn RngCore) -> Option<Vec3> {
        self.bodies.get(id).map(|body| body.random_point(rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Cuboid;

    #[test]
    fn test_world_free_fall() {
        let mut world = PhysicsWorld::default();
        let mut body = Body::new(Box::new(Cuboid::new(0.5, 0.5, 0.5)), 1.0 / 1000.0);
        body.set_position(Vec3::new(0.0, 0.0, 10.0));
        let id = world.add_body(body);

        let dt = 1.0 / 60.0;
        for step in 0..60 {
            world.advance(step as Real * dt, dt).unwrap();
        }

        let z = world.bodies()[id].position().z;
        // closed form after 1 s: 10 - 4.9
        assert!((z - 5.1).abs() < 1e-6, "free fall diverged: z = {z}");
    }

    #[test]
    fn test_world_queries() {
        let mut world = PhysicsWorld::default();
        let mut body = Body::new(Box::new(Cuboid::new(1.0, 1.0, 1.0)), 0.0);
        body.set_position(Vec3::new(0.0, 0.0, 5.0));
        let id = world.add_body(body);

        assert!(world.contains_point(Vec3::new(0.5, 0.5, 5.5)));
        assert!(!world.contains_point(Vec3::ZERO));

        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::new(0.0, 0.0, -1.0));
        let (hit_id, hit) = world.intersect_ray(&ray).expect("ray aimed at the body");
        assert_eq!(hit_id, id);
        assert!((hit.t - 4.0).abs() < 1e-9);

        let mut rng = rand::rng();
        let p = world.random_point(id, &mut rng).unwrap();
        assert!(world.bodies()[id].contains(p));
    }

    #[test]
    fn test_world_advance_without_movable_bodies() {
        let mut world = PhysicsWorld::default();
        world.add_body(Body::new(Box::new(Cuboid::new(1.0, 1.0, 1.0)), 0.0));
        world.advance(0.0, 0.1).unwrap();
    }
}
