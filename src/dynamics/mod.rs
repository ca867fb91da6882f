//! Rigid body dynamics: bodies, contact solving, and integration.
//!
//! A tick of the simulation runs:
//!
//! 1. Marshall every movable body's state into a flat vector.
//! 2. Integrate with Runge-Kutta; every derivative evaluation rescans all
//!    body pairs, solves for steady-state contact forces, and feeds them
//!    into the derivatives.
//! 3. When a pair starts colliding mid-step, bisect to just before the
//!    collision, apply impulses, and continue with the rest of the tick.

pub mod assistant;
pub mod body;
pub mod body_set;
pub mod linalg;
pub mod ode;
pub mod solver;
pub mod world;

pub use assistant::{BodyOdeAssistant, ScanTolerances};
pub use body::Body;
pub use body_set::{BodyId, BodySet};
pub use ode::{DriveMode, Motion, OdeAssistant, OdeSolver, RungeKuttaSolver};
pub use solver::{ContactSolver, SolverConfig};
pub use world::{PhysicsConfig, PhysicsWorld};
