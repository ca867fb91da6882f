//! Rigid body state and dynamics queries.

use rand::RngCore;
use tracing::debug;

use crate::collision::simplex::{ContactSimplex, SupportPoint};
use crate::collision::surface::ContactSurface;
use crate::error::TumbleError;
use crate::math::{Aabb, Mat3, Mat4, Plane, Quat, Ray, Real, Vec3};
use crate::shape::{RayHit, Shape, TransformableShape, TransformedShape};

/// A rigid body: one exclusively owned shape plus the state that moves it.
///
/// The integrable state is position `x`, orientation `q`, linear momentum
/// `p`, and angular momentum `l`; everything else (rotation matrices, world
/// inertia, velocities, the shape's placement) is derived and recomputed
/// eagerly whenever the intrinsic state changes. The orientation is
/// renormalized on every mutation.
///
/// An inverse mass of zero marks an immovable body: velocity setters are
/// no-ops and external forces are not accumulated.
pub struct Body {
    shape: TransformedShape,
    inv_mass: Real,
    inv_inertia: Mat3,

    // intrinsic state
    x: Vec3,
    q: Quat,
    p: Vec3,
    l: Vec3,

    // derived state
    r: Mat3,
    rt: Mat3,
    inv_inertia_world: Mat3,
    v: Vec3,
    omega: Vec3,
    force: Vec3,
    torque: Vec3,
}

impl Body {
    /// Build a body around `shape` with the given inverse density.
    ///
    /// An inverse density of zero, or a shape with no volume, yields an
    /// immovable body.
    pub fn new(shape: Box<dyn Shape>, inverse_density: Real) -> Self {
        let volume = shape.volume();
        let inertia = shape.inertia();
        let (inv_mass, inv_inertia) =
            if inverse_density == 0.0 || volume <= 0.0 || inertia.determinant().abs() < 1e-30 {
                (0.0, Mat3::ZERO)
            } else {
                (inverse_density / volume, inertia.inverse() * inverse_density)
            };

        let mut body = Self {
            shape: TransformedShape::new(shape),
            inv_mass,
            inv_inertia,
            x: Vec3::ZERO,
            q: Quat::IDENTITY,
            p: Vec3::ZERO,
            l: Vec3::ZERO,
            r: Mat3::IDENTITY,
            rt: Mat3::IDENTITY,
            inv_inertia_world: Mat3::ZERO,
            v: Vec3::ZERO,
            omega: Vec3::ZERO,
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
        };
        body.compute_derived_state();
        body
    }

    pub fn set_position(&mut self, x: Vec3) {
        self.x = x;
        self.compute_derived_state();
    }

    pub fn set_orientation(&mut self, q: Quat) {
        self.q = q;
        self.compute_derived_state();
    }

    /// Set the linear velocity. A no-op on immovable bodies.
    pub fn set_velocity(&mut self, v: Vec3) {
        if self.inv_mass != 0.0 {
            self.p = v / self.inv_mass;
            self.compute_derived_state();
        }
    }

    /// Set the angular velocity, given in body coordinates. A no-op on
    /// immovable bodies.
    pub fn set_angular_velocity(&mut self, omega: Vec3) {
        if self.inv_inertia.determinant().abs() > 1e-30 {
            self.l = self.inv_inertia.inverse() * omega;
            self.compute_derived_state();
        }
    }

    pub fn shape(&self) -> &dyn Shape {
        self.shape.inner()
    }

    pub fn position(&self) -> Vec3 {
        self.x
    }

    pub fn orientation(&self) -> Quat {
        self.q
    }

    pub fn momentum(&self) -> Vec3 {
        self.p
    }

    pub fn angular_momentum(&self) -> Vec3 {
        self.l
    }

    pub fn velocity(&self) -> Vec3 {
        self.v
    }

    /// Angular velocity in world coordinates.
    pub fn angular_velocity(&self) -> Vec3 {
        self.omega
    }

    pub fn inverse_mass(&self) -> Real {
        self.inv_mass
    }

    pub fn inverse_world_inertia(&self) -> &Mat3 {
        &self.inv_inertia_world
    }

    pub fn is_immovable(&self) -> bool {
        self.inv_mass == 0.0
    }

    pub fn volume(&self) -> Real {
        self.shape.volume()
    }

    /// Velocity of the world-space point `point` carried with the body.
    pub fn point_velocity(&self, point: Vec3) -> Vec3 {
        self.v + self.omega.cross(point - self.x)
    }

    /// Acceleration of the world-space point `point` carried with the
    /// body: linear, centripetal, and angular-acceleration terms.
    pub fn point_acceleration(&self, point: Vec3) -> Vec3 {
        let d = point - self.x;
        // omega changes through applied torque and through the angular
        // momentum being fixed while the world inertia rotates
        let omega_dot = self.inv_inertia_world * (self.l.cross(self.omega) + self.torque);
        self.inv_mass * self.force + self.omega.cross(self.omega.cross(d)) + omega_dot.cross(d)
    }

    /// Acceleration response at `p2` to a unit impulse along `n` applied
    /// at `p1`.
    pub fn effective_direction(&self, n: Vec3, p1: Vec3, p2: Vec3) -> Vec3 {
        self.inv_mass * n + (self.inv_inertia_world * (p1 - self.x).cross(n)).cross(p2 - self.x)
    }

    /// Reset the force accumulators; movable bodies pick up gravity.
    pub fn set_external_forces(&mut self, gravity: Vec3) {
        self.force = Vec3::ZERO;
        self.torque = Vec3::ZERO;
        if self.inv_mass != 0.0 {
            self.force = gravity / self.inv_mass;
        }
    }

    /// Apply an instantaneous impulse of `magnitude` along `direction` at
    /// the world point `position`.
    pub fn apply_impulse(&mut self, magnitude: Real, direction: Vec3, position: Vec3) {
        self.p += magnitude * direction;
        self.l += magnitude * (position - self.x).cross(direction);
        self.v = self.inv_mass * self.p;
        self.omega = self.inv_inertia_world * self.l;
    }

    /// Accumulate a force of `magnitude` along `direction` at the world
    /// point `position`.
    pub fn apply_force(&mut self, magnitude: Real, direction: Vec3, position: Vec3) {
        self.force += magnitude * direction;
        self.torque += magnitude * (position - self.x).cross(direction);
    }

    /// Append the 13 intrinsic scalars (x, q, p, l) to the state vector.
    pub fn marshall(&self, y: &mut Vec<Real>) {
        y.extend_from_slice(&[
            self.x.x, self.x.y, self.x.z, //
            self.q.w, self.q.x, self.q.y, self.q.z, //
            self.p.x, self.p.y, self.p.z, //
            self.l.x, self.l.y, self.l.z,
        ]);
    }

    /// Append the time derivative of the marshalled state.
    pub fn marshall_derivative(&self, ydot: &mut Vec<Real>) {
        // q' = (1/2) omega q, with omega promoted to a pure quaternion
        let qdot =
            (Quat::from_xyzw(self.omega.x, self.omega.y, self.omega.z, 0.0) * self.q) * 0.5;
        ydot.extend_from_slice(&[
            self.v.x, self.v.y, self.v.z, //
            qdot.w, qdot.x, qdot.y, qdot.z, //
            self.force.x, self.force.y, self.force.z, //
            self.torque.x, self.torque.y, self.torque.z,
        ]);
    }

    /// Restore the intrinsic state from 13 scalars at `offset`, returning
    /// the next offset.
    pub fn unmarshall(&mut self, y: &[Real], offset: usize) -> usize {
        let s = &y[offset..offset + 13];
        self.x = Vec3::new(s[0], s[1], s[2]);
        self.q = Quat::from_xyzw(s[4], s[5], s[6], s[3]);
        self.p = Vec3::new(s[7], s[8], s[9]);
        self.l = Vec3::new(s[10], s[11], s[12]);
        self.compute_derived_state();
        offset + 13
    }

    /// Whether the world-space `point` is inside the body's shape.
    pub fn contains(&self, point: Vec3) -> bool {
        self.shape.contains(point)
    }

    /// First intersection of a world-space ray with the body's shape.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<RayHit> {
        self.shape.intersect_ray(ray)
    }

    /// A world-space point inside the body's shape.
    pub fn random_point(&self, rng: &mut dyn RngCore) -> Vec3 {
        self.shape.random_point(rng)
    }

    /// World-space bounds of the body's shape.
    pub fn bounds(&self) -> Aabb {
        self.shape.bounds()
    }

    fn compute_derived_state(&mut self) {
        self.q = self.q.normalize();
        self.r = Mat3::from_quat(self.q);
        self.rt = self.r.transpose();

        self.inv_inertia_world = self.r * self.inv_inertia * self.rt;

        self.v = self.inv_mass * self.p;
        self.omega = self.inv_inertia_world * self.l;

        let transform = Mat4::from_rotation_translation(self.q, self.x);
        let inverse = Mat4::from_mat3(self.rt) * Mat4::from_translation(-self.x);
        self.shape.set_transform_with_inverse(transform, inverse);
    }

    /// Log the body state at debug level.
    pub fn dump(&self) {
        debug!(
            x = ?self.x,
            v = ?self.v,
            q = ?self.q,
            omega = ?self.omega,
            momentum = ?self.p,
            angular_momentum = ?self.l,
            force = ?self.force,
            torque = ?self.torque,
            "body state"
        );
    }
}

impl TransformableShape for Body {
    fn transform(&self) -> &Mat4 {
        self.shape.transform()
    }

    fn center(&self) -> Vec3 {
        self.x
    }

    fn support_point(&self, direction: Vec3) -> SupportPoint {
        // the direction transforms as a normal: world-to-local needs the
        // inverse transpose of the inverse rotation, which is just the
        // transpose
        let mut support = self.shape.inner().support_point(self.rt * direction);
        support.point = self.r * support.point + self.x;
        support
    }

    fn collision_surface(
        &self,
        simplex: &ContactSimplex,
        separating_plane: &Plane,
        epsilon: Real,
    ) -> Result<ContactSurface, TumbleError> {
        // pull the plane and simplex into local space, extract, push back
        let local_plane = Plane::new(
            self.rt * separating_plane.normal(),
            separating_plane.distance(self.x),
        );
        let local_simplex: ContactSimplex = simplex
            .iter()
            .map(|p| SupportPoint::new(p.feature, self.shape.inverse().transform_point3(p.point)))
            .collect();

        let mut surface =
            self.shape
                .inner()
                .collision_surface(&local_simplex, &local_plane, epsilon)?;
        surface.transform(self.shape.transform(), self.shape.inverse_transpose());
        Ok(surface)
    }
}
