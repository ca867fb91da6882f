//! Bridge between the body registry and the generic ODE solver.

use tracing::warn;

use crate::collision::contact::ContactPoint;
use crate::collision::gjk::{GjkDetector, Proximity};
use crate::collision::intersect::intersect_surfaces;
use crate::error::TumbleError;
use crate::math::{Real, Vec3};

use super::body_set::{BodyId, BodySet};
use super::ode::{DriveMode, Motion, OdeAssistant};
use super::solver::ContactSolver;

/// Collision-related tolerances the assistant scans with.
#[derive(Debug, Clone, Copy)]
pub struct ScanTolerances {
    /// Separations below this count as interpenetration.
    pub intersecting: Real,
    /// Separations below this count as contact.
    pub contacting: Real,
    /// Normal velocities below the negative of this mark a collision.
    pub velocity: Real,
}

/// Drives a [`BodySet`] through the ODE solver: marshalls the movable
/// bodies, scans all body pairs for contacts on every derivative
/// evaluation, classifies the motion, and feeds the contact solver.
pub struct BodyOdeAssistant<'a> {
    bodies: &'a mut BodySet,
    detector: &'a GjkDetector,
    solver: &'a ContactSolver,
    gravity: Vec3,
    tolerances: ScanTolerances,
    contacts: Vec<ContactPoint>,
}

impl<'a> BodyOdeAssistant<'a> {
    pub fn new(
        bodies: &'a mut BodySet,
        detector: &'a GjkDetector,
        solver: &'a ContactSolver,
        gravity: Vec3,
        tolerances: ScanTolerances,
    ) -> Self {
        Self {
            bodies,
            detector,
            solver,
            gravity,
            tolerances,
            contacts: Vec::new(),
        }
    }

    /// The contact set from the most recent drive.
    pub fn contacts(&self) -> &[ContactPoint] {
        &self.contacts
    }

    /// Scan all body pairs, rebuilding the contact set. Returns
    /// `Motion::Discontinuous` as soon as any pair interpenetrates.
    fn scan_contacts(&mut self) -> Motion {
        self.contacts.clear();
        let ids: Vec<BodyId> = self.bodies.ids().collect();
        for (index, &ia) in ids.iter().enumerate() {
            for &ib in &ids[index + 1..] {
                let result = self.detector.compare_surfaces(
                    self.tolerances.intersecting,
                    self.tolerances.contacting,
                    &self.bodies[ia],
                    &self.bodies[ib],
                );
                match result {
                    Ok((Proximity::Intersecting, _)) => return Motion::Discontinuous,
                    Ok((Proximity::Contacting, Some(pair))) => {
                        intersect_surfaces(
                            &mut self.contacts,
                            ia,
                            ib,
                            &pair.a_surface,
                            &pair.b_surface,
                        );
                    }
                    Ok(_) => {}
                    Err(error) => {
                        // skip the pair for this tick rather than abort
                        // the whole scan
                        warn!(?ia, ?ib, %error, "skipping degenerate contact pair");
                    }
                }
            }
        }

        if self
            .contacts
            .iter()
            .any(|c| c.normal_velocity(self.bodies) < -self.tolerances.velocity)
        {
            Motion::Discontinuity
        } else {
            Motion::Smooth
        }
    }
}

impl OdeAssistant for BodyOdeAssistant<'_> {
    /// Marshall the movable bodies; immovable bodies have no integrable
    /// state.
    fn marshall(&self, y: &mut Vec<Real>) {
        for (_, body) in self.bodies.iter() {
            if !body.is_immovable() {
                body.marshall(y);
            }
        }
    }

    fn unmarshall(&mut self, y: &[Real]) {
        let mut offset = 0;
        for (_, body) in self.bodies.iter_mut() {
            if !body.is_immovable() {
                offset = body.unmarshall(y, offset);
            }
        }
        debug_assert_eq!(offset, y.len());
    }

    fn marshall_derivative(&self, ydot: &mut Vec<Real>) {
        for (_, body) in self.bodies.iter() {
            if !body.is_immovable() {
                body.marshall_derivative(ydot);
            }
        }
    }

    fn drive(&mut self, _t: Real, mode: DriveMode) -> Motion {
        let motion = self.scan_contacts();
        if motion == Motion::Discontinuous {
            return motion;
        }

        if mode == DriveMode::Apply {
            for (_, body) in self.bodies.iter_mut() {
                body.set_external_forces(self.gravity);
            }
            if let Err(error) = self.solver.apply_force(self.bodies, &self.contacts) {
                // leave the external forces in place and keep integrating;
                // the contacts will be rescanned next evaluation
                warn!(%error, "contact force solve failed");
            }
        }
        motion
    }

    fn apply_discontinuity(&mut self, _t: Real) -> Result<(), TumbleError> {
        // re-fetch the contacts at the current state before resolving
        let motion = self.scan_contacts();
        if motion == Motion::Discontinuous {
            return Err(TumbleError::Geometry(
                "cannot apply impulses to an interpenetrating state".into(),
            ));
        }
        self.solver.apply_impulse(self.bodies, &self.contacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::{Body, SolverConfig};
    use crate::shape::Cuboid;

    fn tolerances() -> ScanTolerances {
        ScanTolerances {
            intersecting: 1.0e-4,
            contacting: 1.0e-2,
            velocity: 1.0e-4,
        }
    }

    fn scene(cube_z: Real, cube_vz: Real) -> BodySet {
        let mut bodies = BodySet::new();
        let mut cube = Body::new(Box::new(Cuboid::new(0.5, 0.5, 0.5)), 1.0 / 1000.0);
        cube.set_position(Vec3::new(0.0, 0.0, cube_z));
        cube.set_velocity(Vec3::new(0.0, 0.0, cube_vz));
        bodies.add(cube);
        let mut slab = Body::new(Box::new(Cuboid::new(5.0, 5.0, 0.5)), 0.0);
        slab.set_position(Vec3::new(0.0, 0.0, -0.5));
        bodies.add(slab);
        bodies
    }

    #[test]
    fn test_assistant_marshall_skips_immovable() {
        let mut bodies = scene(2.0, 0.0);
        let detector = GjkDetector::new();
        let solver = ContactSolver::new(SolverConfig::default());
        let assistant = BodyOdeAssistant::new(
            &mut bodies,
            &detector,
            &solver,
            Vec3::new(0.0, 0.0, -9.8),
            tolerances(),
        );
        let mut y = Vec::new();
        assistant.marshall(&mut y);
        // one movable body: 13 scalars
        assert_eq!(y.len(), 13);
    }

    #[test]
    fn test_assistant_classifies_separated_scene_smooth() {
        let mut bodies = scene(2.0, 0.0);
        let detector = GjkDetector::new();
        let solver = ContactSolver::new(SolverConfig::default());
        let mut assistant = BodyOdeAssistant::new(
            &mut bodies,
            &detector,
            &solver,
            Vec3::new(0.0, 0.0, -9.8),
            tolerances(),
        );
        assert_eq!(assistant.drive(0.0, DriveMode::Classify), Motion::Smooth);
        assert!(assistant.contacts().is_empty());
    }

    #[test]
    fn test_assistant_classifies_approach_as_discontinuity() {
        // resting gap within the contact band, closing fast
        let mut bodies = scene(0.505, -1.0);
        let detector = GjkDetector::new();
        let solver = ContactSolver::new(SolverConfig::default());
        let mut assistant = BodyOdeAssistant::new(
            &mut bodies,
            &detector,
            &solver,
            Vec3::new(0.0, 0.0, -9.8),
            tolerances(),
        );
        assert_eq!(
            assistant.drive(0.0, DriveMode::Classify),
            Motion::Discontinuity
        );
        assert!(!assistant.contacts().is_empty());
    }

    #[test]
    fn test_assistant_classifies_overlap_as_discontinuous() {
        let mut bodies = scene(0.4, 0.0);
        let detector = GjkDetector::new();
        let solver = ContactSolver::new(SolverConfig::default());
        let mut assistant = BodyOdeAssistant::new(
            &mut bodies,
            &detector,
            &solver,
            Vec3::new(0.0, 0.0, -9.8),
            tolerances(),
        );
        assert_eq!(
            assistant.drive(0.0, DriveMode::Classify),
            Motion::Discontinuous
        );
    }

    #[test]
    fn test_assistant_impulse_resolves_collision() {
        let mut bodies = scene(0.505, -1.0);
        let detector = GjkDetector::new();
        let solver = ContactSolver::new(SolverConfig::default());
        let mut assistant = BodyOdeAssistant::new(
            &mut bodies,
            &detector,
            &solver,
            Vec3::new(0.0, 0.0, -9.8),
            tolerances(),
        );
        assistant.apply_discontinuity(0.0).unwrap();
        assert_eq!(
            assistant.drive(0.0, DriveMode::Classify),
            Motion::Smooth,
            "impulses leave no approaching contact"
        );
    }
}
