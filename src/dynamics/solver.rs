//! Frictionless contact solver after Baraff (SIGGRAPH '94).
//!
//! Two entry points: [`ContactSolver::apply_impulse`] resolves colliding
//! (approaching) contacts with instantaneous impulses, and
//! [`ContactSolver::apply_force`] solves for steady-state contact forces
//! that keep resting contacts from accelerating into each other. The force
//! solve is a linear complementarity problem (force >= 0, normal
//! acceleration >= 0, complementary slackness) handled with Baraff's
//! pivoting method over clamped/unclamped index sets.

use tracing::{debug, trace, warn};

use crate::collision::contact::ContactPoint;
use crate::error::TumbleError;
use crate::math::{Real, Vec3};

use super::body_set::BodySet;
use super::linalg::solve_dense;

/// Tunables of the contact solver.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Coefficient of restitution applied to collision impulses.
    pub restitution: Real,
    /// Normal velocities within this of zero count as resting contact.
    pub velocity_tolerance: Real,
    /// Bound on full scans of the contact set during impulse resolution.
    pub max_impulse_passes: usize,
    /// Bound on pivot steps while driving one contact's acceleration to
    /// zero.
    pub max_pivot_steps: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            restitution: 0.5,
            velocity_tolerance: 1.0e-4,
            max_impulse_passes: 128,
            max_pivot_steps: 256,
        }
    }
}

/// Pivot classification of a contact during the force solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pivot {
    /// Not processed yet.
    Unknown,
    /// Clamped: acceleration is zero, force may be positive.
    Clamped,
    /// Not clamped: force is zero, acceleration may be positive.
    NotClamped,
}

/// Frictionless impulse and contact-force solver.
#[derive(Debug, Clone, Default)]
pub struct ContactSolver {
    config: SolverConfig,
}

impl ContactSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Apply impulses until no contact is still approaching.
    ///
    /// Each pass scans every contact; one whose normal velocity is below
    /// half the velocity tolerance receives an impulse sized from both
    /// bodies' response to a unit impulse along the normal and the
    /// restitution coefficient. A contact set with nothing approaching is
    /// left untouched.
    pub fn apply_impulse(
        &self,
        bodies: &mut BodySet,
        contacts: &[ContactPoint],
    ) -> Result<(), TumbleError> {
        let tolerance = self.config.velocity_tolerance;
        let mut passes = 0;
        loop {
            let mut collided = false;
            for contact in contacts {
                let vn = contact.normal_velocity(bodies);
                if vn >= 0.5 * tolerance {
                    continue;
                }
                collided = true;

                let da = bodies[contact.a].effective_direction(
                    contact.normal,
                    contact.point,
                    contact.point,
                );
                let db = bodies[contact.b].effective_direction(
                    contact.normal,
                    contact.point,
                    contact.point,
                );
                let numerator = -(1.0 + self.config.restitution) * vn + tolerance;
                let j = numerator / (contact.normal.dot(da) + contact.normal.dot(db));

                if j > 0.0 {
                    let (body_a, body_b) = bodies.pair_mut(contact.a, contact.b);
                    body_a.apply_impulse(j, contact.normal, contact.point);
                    body_b.apply_impulse(-j, contact.normal, contact.point);
                }
            }
            if !collided {
                return Ok(());
            }
            passes += 1;
            trace!(passes, "impulse resolution pass");
            if passes >= self.config.max_impulse_passes {
                return Err(TumbleError::Divergence(format!(
                    "impulse resolution still colliding after {passes} passes"
                )));
            }
        }
    }

    /// Solve for and apply steady-state contact forces.
    pub fn apply_force(
        &self,
        bodies: &mut BodySet,
        contacts: &[ContactPoint],
    ) -> Result<(), TumbleError> {
        let n = contacts.len();
        if n == 0 {
            return Ok(());
        }

        let a_matrix = self.compute_a_matrix(bodies, contacts);
        let b_vector = self.compute_b_vector(bodies, contacts);

        let forces = self.solve_lcp(&a_matrix, &b_vector)?;
        debug!(contacts = n, "contact force solve complete");

        for (contact, &force) in contacts.iter().zip(&forces) {
            let (body_a, body_b) = bodies.pair_mut(contact.a, contact.b);
            body_a.apply_force(force, contact.normal, contact.point);
            body_b.apply_force(-force, contact.normal, contact.point);
        }
        Ok(())
    }

    /// The force-dependent coupling matrix: entry `(i, j)` is how a unit
    /// force at contact `j` accelerates contact `i` along its normal.
    /// Symmetric for frictionless systems; zero when the contacts share no
    /// body.
    fn compute_a_matrix(&self, bodies: &BodySet, contacts: &[ContactPoint]) -> Vec<Real> {
        let n = contacts.len();
        let mut a = vec![0.0; n * n];
        for (i, ci) in contacts.iter().enumerate() {
            for (j, cj) in contacts.iter().enumerate().skip(i) {
                if ci.a != cj.a && ci.a != cj.b && ci.b != cj.a && ci.b != cj.b {
                    continue;
                }

                let mut a_acc = Vec3::ZERO;
                let mut b_acc = Vec3::ZERO;
                if ci.a == cj.a {
                    a_acc = bodies[ci.a].effective_direction(cj.normal, cj.point, ci.point);
                } else if ci.a == cj.b {
                    a_acc = -bodies[ci.a].effective_direction(cj.normal, cj.point, ci.point);
                }
                if ci.b == cj.a {
                    b_acc = bodies[ci.b].effective_direction(cj.normal, cj.point, ci.point);
                } else if ci.b == cj.b {
                    b_acc = -bodies[ci.b].effective_direction(cj.normal, cj.point, ci.point);
                }

                let term = ci.normal.dot(a_acc - b_acc);
                a[n * i + j] = term;
                a[n * j + i] = term;
            }
        }
        a
    }

    /// The force-independent normal accelerations: external forces plus
    /// the velocity-dependent term from the rotating contact normal.
    fn compute_b_vector(&self, bodies: &BodySet, contacts: &[ContactPoint]) -> Vec<Real> {
        contacts
            .iter()
            .map(|contact| {
                let a_acc = bodies[contact.a].point_acceleration(contact.point);
                let b_acc = bodies[contact.b].point_acceleration(contact.point);
                let a_vel = bodies[contact.a].point_velocity(contact.point);
                let b_vel = bodies[contact.b].point_velocity(contact.point);
                let normal_dot = contact.normal_derivative(bodies);
                contact.normal.dot(a_acc - b_acc) + 2.0 * normal_dot.dot(a_vel - b_vel)
            })
            .collect()
    }

    /// Baraff's pivoting solve of `a f + b >= 0`, `f >= 0`, `f (a f + b)
    /// = 0`.
    fn solve_lcp(&self, a_matrix: &[Real], b_vector: &[Real]) -> Result<Vec<Real>, TumbleError> {
        let n = b_vector.len();
        let mut state = LcpState {
            a_matrix,
            n,
            f: vec![0.0; n],
            acc: b_vector.to_vec(),
            f_delta: vec![0.0; n],
            acc_delta: vec![0.0; n],
            pivot: vec![Pivot::Unknown; n],
            max_pivot_steps: self.config.max_pivot_steps,
        };

        // each round resolves one contact; the bound only trips when
        // numerical error keeps re-opening resolved contacts
        for _ in 0..(2 * n + 8) {
            let Some(i) = state.acc.iter().position(|&acc| acc < 0.0) else {
                return Ok(state.f);
            };
            state.drive_to_zero(i)?;
        }
        if state.acc.iter().all(|&acc| acc >= 0.0) {
            Ok(state.f)
        } else {
            Err(TumbleError::Divergence(
                "contact force solve kept re-opening resolved contacts".into(),
            ))
        }
    }
}

/// Working state of one LCP solve.
struct LcpState<'a> {
    a_matrix: &'a [Real],
    n: usize,
    f: Vec<Real>,
    acc: Vec<Real>,
    f_delta: Vec<Real>,
    acc_delta: Vec<Real>,
    pivot: Vec<Pivot>,
    max_pivot_steps: usize,
}

impl LcpState<'_> {
    /// Increase `f[i]` (rebalancing the clamped set) until contact `i`
    /// stops accelerating inward.
    fn drive_to_zero(&mut self, i: usize) -> Result<(), TumbleError> {
        let n = self.n;
        for _ in 0..self.max_pivot_steps {
            self.f_direction(i);

            // response of the accelerations to the force direction
            for j in 0..n {
                let mut sum = 0.0;
                for k in 0..n {
                    sum += self.a_matrix[j * n + k] * self.f_delta[k];
                }
                self.acc_delta[j] = sum;
            }

            let (limiter, step) = self.max_step(i);
            let Some(limiter) = limiter else {
                // no constraint bounds the step: the force direction
                // cannot drive this acceleration to zero
                warn!(contact = i, "no pivot limits the force step");
                self.f[i] = 0.0;
                self.pivot[i] = Pivot::NotClamped;
                continue;
            };
            debug_assert!(step >= 0.0);

            for j in 0..n {
                match self.pivot[j] {
                    Pivot::Unknown => {
                        self.f[j] += step * self.f_delta[j];
                        self.acc[j] += step * self.acc_delta[j];
                    }
                    Pivot::Clamped => {
                        self.f[j] += step * self.f_delta[j];
                        if j == limiter || self.f[j] <= 0.0 {
                            // force dropped to zero: the contact leaves
                            // the clamped set
                            self.f[j] = 0.0;
                            self.pivot[j] = Pivot::NotClamped;
                        }
                    }
                    Pivot::NotClamped => {
                        self.acc[j] += step * self.acc_delta[j];
                        if j == limiter || self.acc[j] <= 0.0 {
                            // acceleration reached zero: the contact
                            // joins the clamped set
                            self.acc[j] = 0.0;
                            self.pivot[j] = Pivot::Clamped;
                        }
                    }
                }
            }

            if self.pivot[limiter] == Pivot::Unknown {
                // the driven contact itself hit zero acceleration
                debug_assert_eq!(limiter, i);
                self.acc[i] = 0.0;
                self.pivot[i] = Pivot::Clamped;
                return Ok(());
            }
        }
        Err(TumbleError::Divergence(format!(
            "contact {i} not driven to zero within {} pivot steps",
            self.max_pivot_steps
        )))
    }

    /// Direction of force change: unit force at `i`, with the clamped
    /// contacts' forces adjusted to keep their accelerations at zero.
    fn f_direction(&mut self, i: usize) {
        let n = self.n;
        let clamped: Vec<usize> = (0..n)
            .filter(|&j| self.pivot[j] == Pivot::Clamped)
            .collect();

        self.f_delta.iter_mut().for_each(|f| *f = 0.0);
        self.f_delta[i] = 1.0;
        if clamped.is_empty() {
            return;
        }

        // submatrix of the coupling matrix restricted to the clamped set
        let m = clamped.len();
        let mut sub = vec![0.0; m * m];
        for (j, &cj) in clamped.iter().enumerate() {
            for (k, &ck) in clamped.iter().enumerate() {
                sub[j * m + k] = self.a_matrix[cj * n + ck];
            }
        }
        let rhs: Vec<Real> = clamped
            .iter()
            .map(|&cj| -self.a_matrix[cj * n + i])
            .collect();

        match solve_dense(m, &sub, &rhs) {
            Some(solution) => {
                for (&cj, &value) in clamped.iter().zip(&solution) {
                    self.f_delta[cj] = value;
                }
            }
            None => {
                // singular clamped subsystem: fall back to pushing at i
                // alone and let the step search re-pivot
                warn!(contact = i, "clamped subsystem is singular");
            }
        }
    }

    /// Largest step along the force direction before some contact's force
    /// or acceleration crosses zero. Returns the limiting contact, or
    /// `None` when nothing bounds the step.
    fn max_step(&mut self, i: usize) -> (Option<usize>, Real) {
        let mut limiter = None;
        let mut step = 0.0;

        if self.acc_delta[i] > 0.0 {
            limiter = Some(i);
            step = -self.acc[i] / self.acc_delta[i];
        }

        for k in 0..self.n {
            let candidate = match self.pivot[k] {
                Pivot::Clamped if self.f_delta[k] < 0.0 => Some(-self.f[k] / self.f_delta[k]),
                Pivot::NotClamped if self.acc_delta[k] < 0.0 => {
                    Some(-self.acc[k] / self.acc_delta[k])
                }
                _ => None,
            };
            let Some(new_step) = candidate else { continue };
            if limiter.is_none() || new_step < step {
                if new_step == 0.0 {
                    // the contact sits exactly on its bound: it is in the
                    // wrong set, migrate it and ignore the step
                    self.pivot[k] = match self.pivot[k] {
                        Pivot::Clamped => Pivot::NotClamped,
                        _ => Pivot::Clamped,
                    };
                } else {
                    limiter = Some(k);
                    step = new_step;
                }
            }
        }

        (limiter, step)
    }
}
