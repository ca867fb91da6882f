//! Local-space solid shapes and their world-space decorator.
//!
//! A [`Shape`] lives in its own coordinate frame and answers the queries
//! the rest of the engine needs: mass properties, containment, ray
//! intersection, interior sampling, GJK support mapping, and contact
//! surface extraction. [`TransformedShape`] wraps any shape with a rigid
//! placement and forwards every query across the transform.

mod cuboid;
mod point;
mod pyramid;
mod transformed;

pub use cuboid::Cuboid;
pub use point::PointShape;
pub use pyramid::Pyramid;
pub use transformed::TransformedShape;

use rand::RngCore;

use crate::collision::simplex::{ContactSimplex, SupportPoint};
use crate::collision::surface::ContactSurface;
use crate::error::TumbleError;
use crate::math::{Aabb, Mat3, Mat4, Plane, Ray, Real, Vec3};

/// First intersection of a ray with a shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Ray parameter of the hit.
    pub t: Real,
    /// Unit surface normal at the hit, in the shape's frame.
    pub normal: Vec3,
}

/// A convex solid in its local coordinate frame.
///
/// Shapes are immutable; placement is the wrapper's concern. Support
/// features returned by [`Shape::support_point`] are only meaningful to the
/// shape that issued them.
pub trait Shape {
    /// Enclosed volume.
    fn volume(&self) -> Real;

    /// Inertia tensor at unit density, about the origin in local axes.
    fn inertia(&self) -> Mat3;

    /// Whether `point` lies inside (or on) the shape.
    fn contains(&self, point: Vec3) -> bool;

    /// First intersection with `ray`, if any. A ray starting inside
    /// reports the exit point.
    fn intersect_ray(&self, ray: &Ray) -> Option<RayHit>;

    /// Whether `ray` hits the shape at all.
    fn hits_ray(&self, ray: &Ray) -> bool {
        self.intersect_ray(ray).is_some()
    }

    /// A point inside the shape. The distribution need not be exactly
    /// uniform but must be confined to the shape.
    fn random_point(&self, rng: &mut dyn RngCore) -> Vec3;

    /// The vertex maximizing the dot product with `direction`.
    fn support_point(&self, direction: Vec3) -> SupportPoint;

    /// Decide which feature (vertex, edge, or face) of the shape is in
    /// contact, given the simplex the closest-point search converged to and
    /// the separating plane, and return it as a surface.
    fn collision_surface(
        &self,
        simplex: &ContactSimplex,
        separating_plane: &Plane,
        epsilon: Real,
    ) -> Result<ContactSurface, TumbleError>;

    /// The shape's characteristic vertices, for diagnostics and bounds.
    fn dump_points(&self) -> Vec<Vec3>;

    /// Axis-aligned bounds in the local frame.
    fn local_bounds(&self) -> Aabb {
        Aabb::from_points(&self.dump_points())
    }
}

/// A shape with a placement in world space: the collision-facing surface
/// shared by [`TransformedShape`] and [`crate::dynamics::Body`].
pub trait TransformableShape {
    /// Local-to-world transform.
    fn transform(&self) -> &Mat4;

    /// World-space position of the shape's local origin.
    fn center(&self) -> Vec3 {
        self.transform().transform_point3(Vec3::ZERO)
    }

    /// World-space support point for a world-space direction.
    fn support_point(&self, direction: Vec3) -> SupportPoint;

    /// World-space contact surface for a world-space simplex and
    /// separating plane.
    fn collision_surface(
        &self,
        simplex: &ContactSimplex,
        separating_plane: &Plane,
        epsilon: Real,
    ) -> Result<ContactSurface, TumbleError>;
}

/// Cosine bound for treating an edge as parallel to a plane: the angle
/// between the edge and the plane normal must stay within 1 degree of a
/// right angle.
pub(crate) const EDGE_ALIGN_MAX_COSINE: Real = 0.017_452_406_44;

/// Cosine bound for treating two face normals as parallel: within 1 degree.
pub(crate) const FACE_ALIGN_MIN_COSINE: Real = 0.999_847_695_2;

/// Pick the face from `faces` (indices into `normals`, `usize::MAX` marking
/// an absent slot) whose normal is most parallel to the plane normal, if
/// any is within [`FACE_ALIGN_MIN_COSINE`]. Anti-parallel does not count.
pub(crate) fn most_parallel_face(
    plane: &Plane,
    faces: &[usize],
    normals: &[Vec3],
) -> Option<usize> {
    let mut best = None;
    let mut best_cosine = Real::NEG_INFINITY;
    for &face in faces {
        if face == usize::MAX {
            continue;
        }
        let cosine = normals[face].dot(plane.normal());
        if cosine > best_cosine {
            best = Some(face);
            best_cosine = cosine;
        }
    }
    if best_cosine > FACE_ALIGN_MIN_COSINE {
        best
    } else {
        None
    }
}

/// Pick the edge from `edges` (vertex index pairs, `usize::MAX` marking an
/// absent slot) most parallel to the plane, if any is within
/// [`EDGE_ALIGN_MAX_COSINE`] of lying in it.
pub(crate) fn most_parallel_edge(
    plane: &Plane,
    edges: &[(usize, usize)],
    vertices: &[Vec3],
) -> Option<(usize, usize)> {
    let mut best = None;
    let mut best_cosine = Real::INFINITY;
    for &(v1, v2) in edges {
        if v1 == usize::MAX {
            continue;
        }
        let edge = vertices[v1] - vertices[v2];
        let cosine = edge.dot(plane.normal()).abs() / edge.length();
        if cosine < best_cosine {
            best = Some((v1, v2));
            best_cosine = cosine;
        }
    }
    if best_cosine < EDGE_ALIGN_MAX_COSINE {
        best
    } else {
        None
    }
}
