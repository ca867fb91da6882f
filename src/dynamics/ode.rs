//! Generic ODE integration over a marshalled state vector, with
//! discontinuity (collision) handling.
//!
//! The assistant owns the mapping between simulation objects and the flat
//! state vector, and classifies the motion at any state as smooth, at a
//! discontinuity (a collision needing an instantaneous impulse), or past
//! one (interpenetration). The solver integrates smooth stretches and
//! hands discontinuities back to the assistant.

use tracing::{debug, trace};

use crate::error::TumbleError;
use crate::math::Real;

/// Classification of the motion at a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    /// The derivative is smooth; integration may proceed.
    Smooth,
    /// A collision is in progress at this state: the derivative is about
    /// to jump and an impulse must be applied before integrating on.
    Discontinuity,
    /// The state is past a discontinuity (bodies interpenetrate); any step
    /// reaching it must be discarded.
    Discontinuous,
}

/// What a `drive` call should do besides classifying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveMode {
    /// Only classify the current state.
    Classify,
    /// Also set external forces and solve for contact forces, so a
    /// following derivative marshall sees them.
    Apply,
}

/// Bridge between the integrator and the simulation state.
pub trait OdeAssistant {
    /// Append the integrable state to `y`.
    fn marshall(&self, y: &mut Vec<Real>);

    /// Restore the integrable state from `y`.
    fn unmarshall(&mut self, y: &[Real]);

    /// Append the time derivative of the state. Only meaningful after a
    /// [`DriveMode::Apply`] drive at the same state.
    fn marshall_derivative(&self, ydot: &mut Vec<Real>);

    /// Classify the current state and, in [`DriveMode::Apply`], feed
    /// forces into the bodies.
    fn drive(&mut self, t: Real, mode: DriveMode) -> Motion;

    /// Resolve the discontinuity at the current state (apply collision
    /// impulses).
    fn apply_discontinuity(&mut self, t: Real) -> Result<(), TumbleError>;
}

/// An explicit integrator over a marshalled state vector.
///
/// Implementations provide [`OdeSolver::integrate`], a single attempted
/// step; the provided [`OdeSolver::solve`] wraps it in the discontinuity
/// state machine.
pub trait OdeSolver {
    /// Attempt one integration step over `[t, t + dt]`, updating `y` in
    /// place on success.
    ///
    /// Returns [`Motion::Smooth`] when the step went through,
    /// [`Motion::Discontinuity`] when the starting state itself needs an
    /// impulse (the step is not taken), and [`Motion::Discontinuous`] when
    /// a derivative evaluation inside the step hit an interpenetrating
    /// state (the step is abandoned and `y` is unchanged).
    fn integrate(
        &mut self,
        y: &mut Vec<Real>,
        t: Real,
        dt: Real,
        assistant: &mut dyn OdeAssistant,
    ) -> Motion;

    /// Smallest sub-step the discontinuity search may take.
    fn min_step(&self) -> Real;

    /// Bound on bisection iterations while locating a discontinuity.
    fn max_bisections(&self) -> usize;

    /// Advance the state by up to `dt`, handling discontinuities.
    ///
    /// Returns the time actually advanced:
    /// - the full `dt` for a smooth step;
    /// - a partial advance when a discontinuity was located mid-step: the
    ///   state is integrated to just before it and the impulse applied;
    /// - zero when the starting state itself was a discontinuity and the
    ///   impulse was applied (velocities changed, positions did not).
    ///
    /// A step that stays discontinuous below [`OdeSolver::min_step`] with
    /// no collision to resolve is a [`TumbleError::Divergence`].
    fn solve(
        &mut self,
        y: &mut Vec<Real>,
        t: Real,
        dt: Real,
        assistant: &mut dyn OdeAssistant,
    ) -> Result<Real, TumbleError> {
        let start = y.clone();
        match self.integrate(y, t, dt, assistant) {
            Motion::Smooth => {
                assistant.unmarshall(y);
                return Ok(dt);
            }
            Motion::Discontinuity => {
                // collision at the very start of the step: resolve it in
                // place and report no advance
                *y = start;
                assistant.unmarshall(y);
                assistant.apply_discontinuity(t)?;
                y.clear();
                assistant.marshall(y);
                debug!(t, "impulse applied at step start");
                return Ok(0.0);
            }
            Motion::Discontinuous => {}
        }

        // the step ran into an interpenetrating state: bisect for the
        // longest prefix that still integrates
        let mut good: Real = 0.0;
        let mut bad = dt;
        let mut good_state: Option<Vec<Real>> = None;
        for _ in 0..self.max_bisections() {
            if bad - good <= self.min_step() {
                break;
            }
            let mid = 0.5 * (good + bad);
            let mut trial = start.clone();
            match self.integrate(&mut trial, t, mid, assistant) {
                Motion::Discontinuous => bad = mid,
                _ => {
                    good = mid;
                    good_state = Some(trial);
                }
            }
            trace!(good, bad, "bisecting toward the discontinuity");
        }

        let Some(state) = good_state else {
            // even the smallest prefix is discontinuous. Unless the start
            // itself interpenetrates, run the impulse resolution: it is a
            // no-op on contact sets with nothing approaching, and it
            // unsticks contacts closing more slowly than the
            // classification tolerance.
            *y = start;
            assistant.unmarshall(y);
            if assistant.drive(t, DriveMode::Classify) == Motion::Discontinuous {
                return Err(TumbleError::Divergence(format!(
                    "step at t = {t} stays discontinuous below the minimum step"
                )));
            }
            assistant.apply_discontinuity(t)?;
            y.clear();
            assistant.marshall(y);
            return Ok(0.0);
        };

        // integrate exactly to the last good time, then resolve the
        // collision there
        *y = state;
        assistant.unmarshall(y);
        if assistant.drive(t + good, DriveMode::Classify) == Motion::Discontinuity {
            assistant.apply_discontinuity(t + good)?;
            y.clear();
            assistant.marshall(y);
        }
        debug!(t, advanced = good, "step interrupted by a discontinuity");
        Ok(good)
    }
}

/// Classic fourth-order Runge-Kutta.
pub struct RungeKuttaSolver {
    min_step: Real,
    max_bisections: usize,
    // scratch buffers reused across steps
    k1: Vec<Real>,
    k2: Vec<Real>,
    k3: Vec<Real>,
    k4: Vec<Real>,
    stage: Vec<Real>,
}

impl Default for RungeKuttaSolver {
    fn default() -> Self {
        Self::new(1.0e-6, 32)
    }
}

impl RungeKuttaSolver {
    pub fn new(min_step: Real, max_bisections: usize) -> Self {
        Self {
            min_step,
            max_bisections,
            k1: Vec::new(),
            k2: Vec::new(),
            k3: Vec::new(),
            k4: Vec::new(),
            stage: Vec::new(),
        }
    }

    /// Evaluate the derivative at (`t`, `state`), or report the motion
    /// that stops the step.
    fn derivative(
        t: Real,
        state: &[Real],
        first_stage: bool,
        assistant: &mut dyn OdeAssistant,
        ydot: &mut Vec<Real>,
    ) -> Motion {
        assistant.unmarshall(state);
        match assistant.drive(t, DriveMode::Apply) {
            Motion::Discontinuous => return Motion::Discontinuous,
            // a collision at the step's start must be resolved before
            // integrating; deeper stages integrate through it and let the
            // end-of-step scan catch it
            Motion::Discontinuity if first_stage => return Motion::Discontinuity,
            _ => {}
        }
        ydot.clear();
        assistant.marshall_derivative(ydot);
        Motion::Smooth
    }
}

impl OdeSolver for RungeKuttaSolver {
    fn min_step(&self) -> Real {
        self.min_step
    }

    fn max_bisections(&self) -> usize {
        self.max_bisections
    }

    fn integrate(
        &mut self,
        y: &mut Vec<Real>,
        t: Real,
        dt: Real,
        assistant: &mut dyn OdeAssistant,
    ) -> Motion {
        let n = y.len();
        let half = 0.5 * dt;

        let motion = Self::derivative(t, y, true, assistant, &mut self.k1);
        if motion != Motion::Smooth {
            return motion;
        }

        self.stage.clear();
        self.stage
            .extend((0..n).map(|i| y[i] + half * self.k1[i]));
        if Self::derivative(t + half, &self.stage, false, assistant, &mut self.k2)
            == Motion::Discontinuous
        {
            return Motion::Discontinuous;
        }

        self.stage.clear();
        self.stage
            .extend((0..n).map(|i| y[i] + half * self.k2[i]));
        if Self::derivative(t + half, &self.stage, false, assistant, &mut self.k3)
            == Motion::Discontinuous
        {
            return Motion::Discontinuous;
        }

        self.stage.clear();
        self.stage.extend((0..n).map(|i| y[i] + dt * self.k3[i]));
        if Self::derivative(t + dt, &self.stage, false, assistant, &mut self.k4)
            == Motion::Discontinuous
        {
            return Motion::Discontinuous;
        }

        let sixth = dt / 6.0;
        for i in 0..n {
            y[i] += sixth * (self.k1[i] + 2.0 * self.k2[i] + 2.0 * self.k3[i] + self.k4[i]);
        }
        Motion::Smooth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Free fall: y = (height, velocity), no discontinuities.
    struct FreeFall {
        height: Real,
        velocity: Real,
    }

    impl OdeAssistant for FreeFall {
        fn marshall(&self, y: &mut Vec<Real>) {
            y.push(self.height);
            y.push(self.velocity);
        }

        fn unmarshall(&mut self, y: &[Real]) {
            self.height = y[0];
            self.velocity = y[1];
        }

        fn marshall_derivative(&self, ydot: &mut Vec<Real>) {
            ydot.push(self.velocity);
            ydot.push(-9.8);
        }

        fn drive(&mut self, _t: Real, _mode: DriveMode) -> Motion {
            Motion::Smooth
        }

        fn apply_discontinuity(&mut self, _t: Real) -> Result<(), TumbleError> {
            Ok(())
        }
    }

    /// Free fall that bounces off the floor at height zero.
    struct Bouncer(FreeFall);

    impl OdeAssistant for Bouncer {
        fn marshall(&self, y: &mut Vec<Real>) {
            self.0.marshall(y)
        }

        fn unmarshall(&mut self, y: &[Real]) {
            self.0.unmarshall(y)
        }

        fn marshall_derivative(&self, ydot: &mut Vec<Real>) {
            self.0.marshall_derivative(ydot)
        }

        fn drive(&mut self, _t: Real, _mode: DriveMode) -> Motion {
            if self.0.height < 0.0 {
                Motion::Discontinuous
            } else if self.0.height < 1.0e-3 && self.0.velocity < 0.0 {
                Motion::Discontinuity
            } else {
                Motion::Smooth
            }
        }

        fn apply_discontinuity(&mut self, _t: Real) -> Result<(), TumbleError> {
            self.0.velocity = -self.0.velocity;
            Ok(())
        }
    }

    #[test]
    fn test_rk4_parabola() {
        let mut assistant = FreeFall {
            height: 100.0,
            velocity: 0.0,
        };
        let mut solver = RungeKuttaSolver::default();
        let mut y = Vec::new();
        assistant.marshall(&mut y);

        let dt = 0.01;
        for step in 0..100 {
            let advanced = solver
                .solve(&mut y, step as Real * dt, dt, &mut assistant)
                .unwrap();
            assert_relative_eq!(advanced, dt);
        }
        // closed form: 100 - 4.9 t^2 at t = 1
        assert_relative_eq!(assistant.height, 100.0 - 4.9, epsilon = 1e-9);
        assert_relative_eq!(assistant.velocity, -9.8, epsilon = 1e-9);
    }

    #[test]
    fn test_solver_bisects_to_discontinuity() {
        let mut assistant = Bouncer(FreeFall {
            height: 0.05,
            velocity: -1.0,
        });
        let mut solver = RungeKuttaSolver::default();
        let mut y = Vec::new();
        assistant.marshall(&mut y);

        // a full step would punch through the floor; the solver must stop
        // short of it
        let advanced = solver.solve(&mut y, 0.0, 0.1, &mut assistant).unwrap();
        assert!(advanced > 0.0, "must make progress");
        assert!(advanced < 0.1, "must stop before the floor");
        assert!(
            assistant.0.height >= 0.0,
            "never integrates into the floor: h = {}",
            assistant.0.height
        );
    }

    #[test]
    fn test_solver_applies_impulse_at_contact() {
        let mut assistant = Bouncer(FreeFall {
            height: 5.0e-4,
            velocity: -1.0,
        });
        let mut solver = RungeKuttaSolver::default();
        let mut y = Vec::new();
        assistant.marshall(&mut y);

        let advanced = solver.solve(&mut y, 0.0, 0.01, &mut assistant).unwrap();
        assert_relative_eq!(advanced, 0.0);
        assert!(
            assistant.0.velocity > 0.0,
            "the bounce impulse flips the velocity"
        );
        // the marshalled state reflects the impulse
        assert_relative_eq!(y[1], assistant.0.velocity);
    }

    #[test]
    fn test_solver_full_bounce_sequence() {
        let mut assistant = Bouncer(FreeFall {
            height: 0.5,
            velocity: 0.0,
        });
        let mut solver = RungeKuttaSolver::default();
        let mut y = Vec::new();
        assistant.marshall(&mut y);

        let dt = 0.005;
        let mut t: Real = 0.0;
        for _ in 0..2000 {
            let advanced = solver.solve(&mut y, t, dt, &mut assistant).unwrap();
            t += advanced;
            assert!(
                assistant.0.height >= -1.0e-6,
                "fell through the floor at t = {t}"
            );
        }
        assert!(t > 1.0, "simulation advanced through bounces");
    }
}
