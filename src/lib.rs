//! Tumble
//!
//! A rigid body collision detection and contact resolution engine.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! 1. **math** - value types: vectors, transforms, planes, rays, bounds
//! 2. **shape** - local-space solids (box, pyramid, point) and their
//!    world-space placement
//! 3. **collision** - GJK proximity queries, contact surfaces, and
//!    contact-region computation
//! 4. **dynamics** - rigid bodies, the frictionless contact solver, and
//!    Runge-Kutta integration with collision handling
//!
//! A minimal simulation: build shapes, wrap them in bodies, add the bodies
//! to a [`PhysicsWorld`], and call [`PhysicsWorld::advance`] once per tick.

pub mod collision;
pub mod dynamics;
pub mod error;
pub mod math;
pub mod shape;

// Re-export commonly used types
pub use error::TumbleError;

pub use math::{Aabb, Mat3, Mat4, Plane, Quat, Ray, Real, Vec3};

pub use shape::{
    Cuboid, PointShape, Pyramid, RayHit, Shape, TransformableShape, TransformedShape,
};

pub use collision::{
    intersect_surfaces, ClosestPoints, ContactPoint, ContactSimplex, ContactSurface, GjkDetector,
    Proximity, SupportPoint, SurfaceKind, SurfacePair,
};

pub use dynamics::{
    Body, BodyId, BodyOdeAssistant, BodySet, ContactSolver, DriveMode, Motion, OdeAssistant,
    OdeSolver, PhysicsConfig, PhysicsWorld, RungeKuttaSolver, SolverConfig,
};

// Re-export glam for convenience
pub use glam;
