//! Axis-aligned bounding box.

use super::{Mat4, Vec3};

/// An axis-aligned box given by its minimum and maximum corners.
///
/// The empty box has `min > max` on every axis and is the identity for
/// [`Aabb::union`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// The empty box.
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f64::INFINITY),
        max: Vec3::splat(f64::NEG_INFINITY),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box containing all `points`.
    pub fn from_points(points: &[Vec3]) -> Self {
        let mut bounds = Self::EMPTY;
        for &p in points {
            bounds.expand_by_point(p);
        }
        bounds
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    pub fn expand_by_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// The overlap of both boxes, or `None` when they are disjoint.
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let result = Self {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        };
        (!result.is_empty()).then_some(result)
    }

    /// Axis-aligned bounds of this box after transforming its corners.
    pub fn transformed(&self, transform: &Mat4) -> Self {
        if self.is_empty() {
            return *self;
        }
        let mut bounds = Self::EMPTY;
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 != 0 { self.max.x } else { self.min.x },
                if i & 2 != 0 { self.max.y } else { self.min.y },
                if i & 4 != 0 { self.max.z } else { self.min.z },
            );
            bounds.expand_by_point(transform.transform_point3(corner));
        }
        bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_aabb_union_and_contains() {
        let a = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let b = Aabb::new(Vec3::new(0.5, 0.5, 0.5), Vec3::new(2.0, 2.0, 2.0));
        let u = a.union(&b);
        assert!(u.contains(Vec3::splat(-1.0)));
        assert!(u.contains(Vec3::splat(2.0)));
        assert!(!u.contains(Vec3::new(0.0, 0.0, 2.5)));
    }

    #[test]
    fn test_aabb_intersection() {
        let a = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let b = Aabb::new(Vec3::new(0.5, -1.0, -1.0), Vec3::new(2.0, 1.0, 1.0));
        let i = a.intersection(&b).unwrap();
        assert_relative_eq!(i.min.x, 0.5);
        assert_relative_eq!(i.max.x, 1.0);

        let far = Aabb::new(Vec3::splat(5.0), Vec3::splat(6.0));
        assert!(a.intersection(&far).is_none());
    }

    #[test]
    fn test_aabb_empty_union_identity() {
        let a = Aabb::new(Vec3::splat(-2.0), Vec3::splat(3.0));
        assert_eq!(Aabb::EMPTY.union(&a), a);
    }

    #[test]
    fn test_aabb_transformed_rotation() {
        use crate::math::Quat;

        let a = Aabb::new(Vec3::new(-1.0, -2.0, -3.0), Vec3::new(1.0, 2.0, 3.0));
        // quarter turn about z swaps x/y extents
        let m = Mat4::from_quat(Quat::from_axis_angle(Vec3::Z, std::f64::consts::FRAC_PI_2));
        let t = a.transformed(&m);
        assert_relative_eq!(t.max.x, 2.0, epsilon = 1e-9);
        assert_relative_eq!(t.max.y, 1.0, epsilon = 1e-9);
        assert_relative_eq!(t.max.z, 3.0, epsilon = 1e-9);
    }
}
