//! Ray for intersection queries.

use super::{Real, Vec3};

/// A half-line from an origin along a direction. The direction is stored
/// as given; intersection parameters scale with its length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    origin: Vec3,
    direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Point at parameter `t` along the ray.
    pub fn point_at(&self, t: Real) -> Vec3 {
        self.origin + t * self.direction
    }
}
