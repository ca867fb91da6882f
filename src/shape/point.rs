//! Degenerate point shape.

use rand::RngCore;

use crate::collision::simplex::{ContactSimplex, SupportPoint};
use crate::collision::surface::ContactSurface;
use crate::error::TumbleError;
use crate::math::{Aabb, Mat3, Plane, Ray, Real, Vec3};

use super::{RayHit, Shape};

/// A single point at the local origin.
///
/// Useful as a probe body for queries and as the degenerate end of the
/// shape hierarchy. It has no volume, so a body built around it is always
/// immovable.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointShape;

impl PointShape {
    pub fn new() -> Self {
        Self
    }
}

impl Shape for PointShape {
    fn volume(&self) -> Real {
        0.0
    }

    fn inertia(&self) -> Mat3 {
        Mat3::ZERO
    }

    fn contains(&self, point: Vec3) -> bool {
        point == Vec3::ZERO
    }

    fn intersect_ray(&self, _ray: &Ray) -> Option<RayHit> {
        // a point has measure zero; rays never hit it
        None
    }

    fn random_point(&self, _rng: &mut dyn RngCore) -> Vec3 {
        Vec3::ZERO
    }

    fn support_point(&self, _direction: Vec3) -> SupportPoint {
        SupportPoint::new(0, Vec3::ZERO)
    }

    fn collision_surface(
        &self,
        simplex: &ContactSimplex,
        separating_plane: &Plane,
        _epsilon: Real,
    ) -> Result<ContactSurface, TumbleError> {
        if simplex.is_empty() || simplex.len() > 3 {
            return Err(TumbleError::Geometry(format!(
                "point contact simplex has {} vertices",
                simplex.len()
            )));
        }
        Ok(ContactSurface::point(
            Vec3::ZERO,
            separating_plane.normal(),
        ))
    }

    fn dump_points(&self) -> Vec<Vec3> {
        vec![Vec3::ZERO]
    }

    fn local_bounds(&self) -> Aabb {
        Aabb::new(Vec3::ZERO, Vec3::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::surface::SurfaceKind;

    #[test]
    fn test_point_shape_queries() {
        let shape = PointShape::new();
        assert_eq!(shape.volume(), 0.0);
        assert!(shape.contains(Vec3::ZERO));
        assert!(!shape.contains(Vec3::X));

        let simplex: ContactSimplex =
            std::iter::once(SupportPoint::new(0, Vec3::ZERO)).collect();
        let surface = shape
            .collision_surface(&simplex, &Plane::default(), 1e-3)
            .unwrap();
        assert_eq!(surface.kind(), SurfaceKind::Point);
    }
}
