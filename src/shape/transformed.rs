//! World-space placement of a local-space shape.

use rand::RngCore;

use crate::collision::simplex::{ContactSimplex, SupportPoint};
use crate::collision::surface::ContactSurface;
use crate::error::TumbleError;
use crate::math::{Aabb, Mat4, Plane, Ray, Real, Vec3};

use super::{RayHit, Shape, TransformableShape};

/// A shape with a rigid placement in world space.
///
/// Owns the wrapped shape exclusively; the wrapper changes placement, never
/// identity. Four matrices are kept: the transform, its inverse, and both
/// transposes. Points map by the transform, normals by the inverse
/// transpose, and support directions by the transpose (a world-to-local
/// direction is covariant, and the inverse of the inverse transpose is the
/// transpose).
pub struct TransformedShape {
    shape: Box<dyn Shape>,
    transform: Mat4,
    inverse: Mat4,
    transpose: Mat4,
    inverse_transpose: Mat4,
}

impl TransformedShape {
    /// Wrap `shape` at the identity placement.
    pub fn new(shape: Box<dyn Shape>) -> Self {
        let mut this = Self {
            shape,
            transform: Mat4::IDENTITY,
            inverse: Mat4::IDENTITY,
            transpose: Mat4::IDENTITY,
            inverse_transpose: Mat4::IDENTITY,
        };
        this.set_transform(Mat4::IDENTITY);
        this
    }

    /// Replace the placement, computing the inverse.
    pub fn set_transform(&mut self, transform: Mat4) {
        self.set_transform_with_inverse(transform, transform.inverse());
    }

    /// Replace the placement with a caller-supplied inverse (callers that
    /// build the transform from a rotation and translation already have
    /// it).
    pub fn set_transform_with_inverse(&mut self, transform: Mat4, inverse: Mat4) {
        self.transform = transform;
        self.inverse = inverse;
        self.transpose = transform.transpose();
        self.inverse_transpose = inverse.transpose();
    }

    pub fn inner(&self) -> &dyn Shape {
        &*self.shape
    }

    pub fn inverse(&self) -> &Mat4 {
        &self.inverse
    }

    pub fn transpose(&self) -> &Mat4 {
        &self.transpose
    }

    pub fn inverse_transpose(&self) -> &Mat4 {
        &self.inverse_transpose
    }

    /// Enclosed volume (placement is rigid, so the local volume).
    pub fn volume(&self) -> Real {
        self.shape.volume()
    }

    /// Whether the world-space `point` is inside the shape.
    pub fn contains(&self, point: Vec3) -> bool {
        self.shape.contains(self.inverse.transform_point3(point))
    }

    /// First intersection with a world-space ray; the hit normal is
    /// returned in world space.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<RayHit> {
        let local = Ray::new(
            self.inverse.transform_point3(ray.origin()),
            self.inverse.transform_vector3(ray.direction()),
        );
        self.shape.intersect_ray(&local).map(|hit| RayHit {
            t: hit.t,
            normal: self
                .inverse_transpose
                .transform_vector3(hit.normal)
                .normalize(),
        })
    }

    /// A world-space point inside the shape.
    pub fn random_point(&self, rng: &mut dyn RngCore) -> Vec3 {
        self.transform
            .transform_point3(self.shape.random_point(rng))
    }

    /// World-space bounds of the placed shape.
    pub fn bounds(&self) -> Aabb {
        self.shape.local_bounds().transformed(&self.transform)
    }
}

impl TransformableShape for TransformedShape {
    fn transform(&self) -> &Mat4 {
        &self.transform
    }

    fn support_point(&self, direction: Vec3) -> SupportPoint {
        let local = self.transpose.transform_vector3(direction);
        let mut support = self.shape.support_point(local);
        support.point = self.transform.transform_point3(support.point);
        support
    }

    fn collision_surface(
        &self,
        simplex: &ContactSimplex,
        separating_plane: &Plane,
        epsilon: Real,
    ) -> Result<ContactSurface, TumbleError> {
        let local_plane = Plane::new(
            self.transpose
                .transform_vector3(separating_plane.normal()),
            separating_plane.distance(self.center()),
        );
        let local_simplex: ContactSimplex = simplex
            .iter()
            .map(|p| SupportPoint::new(p.feature, self.inverse.transform_point3(p.point)))
            .collect();

        let mut surface = self
            .shape
            .collision_surface(&local_simplex, &local_plane, epsilon)?;
        surface.transform(&self.transform, &self.inverse_transpose);
        Ok(surface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Quat;
    use crate::shape::Cuboid;
    use approx::assert_relative_eq;

    fn placed_box() -> TransformedShape {
        let mut shape = TransformedShape::new(Box::new(Cuboid::new(1.0, 1.0, 1.0)));
        shape.set_transform(Mat4::from_rotation_translation(
            Quat::from_axis_angle(Vec3::Z, std::f64::consts::FRAC_PI_2),
            Vec3::new(10.0, 0.0, 0.0),
        ));
        shape
    }

    #[test]
    fn test_transformed_contains() {
        let shape = placed_box();
        assert!(shape.contains(Vec3::new(10.0, 0.0, 0.0)));
        assert!(shape.contains(Vec3::new(10.9, 0.9, 0.9)));
        assert!(!shape.contains(Vec3::new(12.0, 0.0, 0.0)));
    }

    #[test]
    fn test_transformed_support_point_world_space() {
        let shape = placed_box();
        let support = shape.support_point(Vec3::X);
        assert_relative_eq!(support.point.x, 11.0, epsilon = 1e-9);
    }

    #[test]
    fn test_transformed_ray_normal_world_space() {
        let shape = placed_box();
        let ray = Ray::new(Vec3::new(0.0, 0.0, 0.0), Vec3::X);
        let hit = shape.intersect_ray(&ray).expect("ray aimed at the box");
        assert_relative_eq!(hit.t, 9.0, epsilon = 1e-9);
        assert_relative_eq!(hit.normal.x, -1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_transformed_center() {
        let shape = placed_box();
        assert_relative_eq!(shape.center().x, 10.0, epsilon = 1e-12);
    }
}
