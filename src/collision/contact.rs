//! World-space contact points.

use crate::dynamics::{BodyId, BodySet};
use crate::math::{Real, Vec3};

/// A single point of contact between two bodies.
///
/// The normal is a unit vector pointing from body `b` toward body `a` (it
/// is the outward normal of the feature on `b`'s side). Contact points are
/// rebuilt from live geometry on every derivative evaluation and never
/// outlive the step that produced them.
#[derive(Debug, Clone, Copy)]
pub struct ContactPoint {
    pub a: BodyId,
    pub b: BodyId,
    /// Contact location in world space.
    pub point: Vec3,
    /// Unit contact normal, pointing from `b` toward `a`.
    pub normal: Vec3,
    /// Whether this is an edge/edge contact; the edge directions below are
    /// only meaningful when set.
    pub is_edge_edge: bool,
    /// World direction of the participating edge on `a`.
    pub edge_a: Vec3,
    /// World direction of the participating edge on `b`.
    pub edge_b: Vec3,
    /// Separation distance along the normal.
    pub distance: Real,
}

impl ContactPoint {
    /// A vertex/face contact: a vertex of `a` against a face of `b` whose
    /// outward normal is `normal`.
    pub fn vertex_face(
        a: BodyId,
        b: BodyId,
        point: Vec3,
        normal: Vec3,
        distance: Real,
    ) -> Self {
        Self {
            a,
            b,
            point,
            normal,
            is_edge_edge: false,
            edge_a: Vec3::ZERO,
            edge_b: Vec3::ZERO,
            distance,
        }
    }

    /// An edge/edge contact. The normal is the cross product of the edge
    /// directions, oriented along `reference` (the outward normal of `b`'s
    /// surface); a degenerate cross product falls back to `reference`
    /// itself.
    pub fn edge_edge(
        a: BodyId,
        b: BodyId,
        point: Vec3,
        edge_a: Vec3,
        edge_b: Vec3,
        reference: Vec3,
        distance: Real,
    ) -> Self {
        let cross = edge_a.cross(edge_b);
        let length = cross.length();
        let mut normal = if length > 1e-12 {
            cross / length
        } else {
            reference
        };
        if normal.dot(reference) < 0.0 {
            normal = -normal;
        }
        Self {
            a,
            b,
            point,
            normal,
            is_edge_edge: true,
            edge_a,
            edge_b,
            distance,
        }
    }

    /// Relative velocity of the two bodies at the contact point along the
    /// normal. Negative values mean the bodies are approaching.
    pub fn normal_velocity(&self, bodies: &BodySet) -> Real {
        let va = bodies[self.a].point_velocity(self.point);
        let vb = bodies[self.b].point_velocity(self.point);
        self.normal.dot(va - vb)
    }

    /// Time derivative of the contact normal.
    ///
    /// A vertex/face normal is fixed in `b`'s frame and rotates with it.
    /// An edge/edge normal is the unit cross product of two edges, each
    /// fixed in its body's frame.
    pub fn normal_derivative(&self, bodies: &BodySet) -> Vec3 {
        if !self.is_edge_edge {
            return bodies[self.b].angular_velocity().cross(self.normal);
        }

        let cross = self.edge_a.cross(self.edge_b);
        let length = cross.length();
        if length <= 1e-12 {
            return Vec3::ZERO;
        }
        // d/dt (ea x eb) with each edge rotating with its body
        let cross_dot = bodies[self.a]
            .angular_velocity()
            .cross(self.edge_a)
            .cross(self.edge_b)
            + self
                .edge_a
                .cross(bodies[self.b].angular_velocity().cross(self.edge_b));
        // keep only the component perpendicular to the (unit) normal
        let sign = if cross.dot(self.normal) < 0.0 { -1.0 } else { 1.0 };
        (cross_dot - self.normal * self.normal.dot(cross_dot)) * (sign / length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_edge_edge_normal_aligned_with_reference() {
        let a = BodyId::from_raw(0);
        let b = BodyId::from_raw(1);
        let contact =
            ContactPoint::edge_edge(a, b, Vec3::ZERO, Vec3::X, Vec3::Y, -Vec3::Z, 0.0);
        // x cross y is +z; the reference flips it
        assert_relative_eq!(contact.normal.z, -1.0, epsilon = 1e-12);
        assert!(contact.is_edge_edge);
    }

    #[test]
    fn test_degenerate_edge_cross_falls_back_to_reference() {
        let a = BodyId::from_raw(0);
        let b = BodyId::from_raw(1);
        let contact = ContactPoint::edge_edge(a, b, Vec3::ZERO, Vec3::X, Vec3::X, Vec3::Z, 0.0);
        assert_relative_eq!(contact.normal.z, 1.0, epsilon = 1e-12);
    }
}
