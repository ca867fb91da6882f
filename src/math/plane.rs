//! Oriented plane in 3D space.

use super::{Real, Vec3};

/// A plane given by a unit normal and an offset: points `p` with
/// `normal · p + offset == 0` lie on the plane, positive distances are on
/// the side the normal points into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    normal: Vec3,
    offset: Real,
}

impl Plane {
    /// Plane from a unit normal and offset.
    pub fn new(normal: Vec3, offset: Real) -> Self {
        Self { normal, offset }
    }

    /// Plane with the given unit normal passing through `point`.
    pub fn from_point(normal: Vec3, point: Vec3) -> Self {
        Self {
            normal,
            offset: -normal.dot(point),
        }
    }

    /// Plane through three points. The normal points out of the side from
    /// which `v0, v1, v2` wind counter-clockwise.
    pub fn from_points(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        let normal = (v1 - v0).cross(v2 - v0).normalize();
        Self::from_point(normal, v0)
    }

    /// The same plane bounding the opposite half-space.
    pub fn negated(&self) -> Self {
        Self {
            normal: -self.normal,
            offset: -self.offset,
        }
    }

    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    pub fn offset(&self) -> Real {
        self.offset
    }

    /// Signed distance from the plane to `point`.
    pub fn distance(&self, point: Vec3) -> Real {
        self.normal.dot(point) + self.offset
    }

    /// Orthogonal projection of `point` onto the plane.
    pub fn project_point(&self, point: Vec3) -> Vec3 {
        point - self.distance(point) * self.normal
    }

    /// Component of `vector` parallel to the plane.
    pub fn project_vector(&self, vector: Vec3) -> Vec3 {
        vector - self.normal.dot(vector) * self.normal
    }
}

impl Default for Plane {
    /// The `+z` half-space boundary.
    fn default() -> Self {
        Self::new(Vec3::Z, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_plane_from_points_winding() {
        // CCW in the xy plane seen from +z
        let plane = Plane::from_points(
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
        );
        assert_relative_eq!(plane.normal().z, 1.0, epsilon = 1e-12);
        assert_relative_eq!(plane.distance(Vec3::new(5.0, -3.0, 1.0)), 0.0, epsilon = 1e-12);
        assert_relative_eq!(plane.distance(Vec3::new(0.0, 0.0, 3.0)), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_plane_negated_flips_distance() {
        let plane = Plane::from_point(Vec3::X, Vec3::new(2.0, 0.0, 0.0));
        let p = Vec3::new(5.0, 1.0, -1.0);
        assert_relative_eq!(plane.distance(p), -plane.negated().distance(p), epsilon = 1e-12);
    }

    #[test]
    fn test_plane_projections() {
        let plane = Plane::from_point(Vec3::Z, Vec3::new(0.0, 0.0, 2.0));
        let projected = plane.project_point(Vec3::new(1.0, 2.0, 7.0));
        assert_relative_eq!(projected.z, 2.0, epsilon = 1e-12);
        assert_relative_eq!(projected.x, 1.0, epsilon = 1e-12);

        let v = plane.project_vector(Vec3::new(3.0, 0.0, 4.0));
        assert_relative_eq!(v.z, 0.0, epsilon = 1e-12);
        assert_relative_eq!(v.x, 3.0, epsilon = 1e-12);
    }
}
