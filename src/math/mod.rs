//! Geometric primitives shared by every layer of the engine.
//!
//! All math runs in `f64`: the contact solver and the GJK closest-point
//! search work with tolerances around `1e-7`, which `f32` cannot hold
//! through a chain of cross products. The vector/matrix/quaternion types
//! are re-exported from [`glam`] under crate-local aliases so the rest of
//! the crate never names a width-specific type.

mod bounds;
mod plane;
mod ray;

pub use bounds::Aabb;
pub use plane::Plane;
pub use ray::Ray;

/// Scalar type used throughout the engine.
pub type Real = f64;

/// Three-component vector.
pub type Vec3 = glam::DVec3;

/// 3x3 matrix, used for rotations and inertia tensors.
pub type Mat3 = glam::DMat3;

/// 4x4 homogeneous transform.
pub type Mat4 = glam::DMat4;

/// Rotation quaternion.
pub type Quat = glam::DQuat;
