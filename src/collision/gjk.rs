//! Closest-point and proximity classification between convex shapes.
//!
//! The detector runs the Gilbert–Johnson–Keerthi simplex search over the
//! Minkowski difference of the two shapes. The closest point of the
//! current simplex to the origin is found in closed form from signed
//! subdeterminants over all fifteen non-empty subsets of the four simplex
//! slots, memoized per call.

use tracing::trace;

use crate::error::TumbleError;
use crate::math::{Plane, Real, Vec3};
use crate::shape::TransformableShape;

use super::simplex::{ContactSimplex, SupportPoint};
use super::surface::ContactSurface;

/// Proximity classification of a shape pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Proximity {
    Separate,
    Contacting,
    Intersecting,
}

/// Separating plane and contact surfaces of a contacting pair.
#[derive(Debug, Clone)]
pub struct SurfacePair {
    /// Plane through the closest point on A, normal pointing toward B.
    pub plane: Plane,
    pub a_surface: ContactSurface,
    pub b_surface: ContactSurface,
}

/// Closest-point query result.
#[derive(Debug, Clone)]
pub enum ClosestPoints {
    Intersecting,
    Separate {
        a_point: Vec3,
        b_point: Vec3,
        a_simplex: ContactSimplex,
        b_simplex: ContactSimplex,
    },
}

/// Stop once the separation estimate is this small (the shapes touch).
const MAX_ABSOLUTE_ERROR: Real = 5e-6;

/// Stop once the upper distance bound improves by less than this fraction.
const MAX_RELATIVE_ERROR: Real = 1e-7;

/// Slack when rejecting a subset because an excluded point still improves it.
const SUBSET_TOLERANCE: f64 = 1.0e-5;

/// First zero bit for each 4-bit mask.
const FIRST_EMPTY_SLOT: [usize; 16] = [0, 1, 0, 2, 0, 1, 0, 3, 0, 1, 0, 2, 0, 1, 0, 4];

/// GJK-based collision detector.
#[derive(Debug, Clone)]
pub struct GjkDetector {
    max_iterations: usize,
}

impl Default for GjkDetector {
    fn default() -> Self {
        Self { max_iterations: 64 }
    }
}

impl GjkDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify the pair as separate, contacting, or intersecting.
    pub fn compare(
        &self,
        intersecting_tolerance: Real,
        contacting_tolerance: Real,
        a: &dyn TransformableShape,
        b: &dyn TransformableShape,
    ) -> Proximity {
        match self.closest_points(a, b) {
            ClosestPoints::Intersecting => Proximity::Intersecting,
            ClosestPoints::Separate {
                a_point, b_point, ..
            } => {
                let distance = (b_point - a_point).length();
                if distance < intersecting_tolerance {
                    Proximity::Intersecting
                } else if distance < contacting_tolerance {
                    Proximity::Contacting
                } else {
                    Proximity::Separate
                }
            }
        }
    }

    /// Classify the pair and, when it is contacting, also produce the
    /// separating plane and both contact surfaces.
    pub fn compare_surfaces(
        &self,
        intersecting_tolerance: Real,
        contacting_tolerance: Real,
        a: &dyn TransformableShape,
        b: &dyn TransformableShape,
    ) -> Result<(Proximity, Option<SurfacePair>), TumbleError> {
        let (a_point, b_point, a_simplex, b_simplex) = match self.closest_points(a, b) {
            ClosestPoints::Intersecting => return Ok((Proximity::Intersecting, None)),
            ClosestPoints::Separate {
                a_point,
                b_point,
                a_simplex,
                b_simplex,
            } => (a_point, b_point, a_simplex, b_simplex),
        };

        let gap = b_point - a_point;
        let distance = gap.length();
        if distance < intersecting_tolerance {
            return Ok((Proximity::Intersecting, None));
        }

        // separating plane through the closest point on A, oriented from
        // A toward B
        let plane = Plane::from_point(gap / distance, a_point);
        if distance >= contacting_tolerance {
            return Ok((Proximity::Separate, None));
        }

        // let each body recover the face or edge embedded in the plane.
        // B sees the negated plane so the normal points out of it, with the
        // tolerance widened by the known separation.
        let a_surface = a.collision_surface(&a_simplex, &plane, contacting_tolerance)?;
        let b_surface = b.collision_surface(
            &b_simplex,
            &plane.negated(),
            distance + contacting_tolerance,
        )?;

        Ok((
            Proximity::Contacting,
            Some(SurfacePair {
                plane,
                a_surface,
                b_surface,
            }),
        ))
    }

    /// Closest points between the two shapes, with the support simplexes
    /// that produced them.
    pub fn closest_points(
        &self,
        a: &dyn TransformableShape,
        b: &dyn TransformableShape,
    ) -> ClosestPoints {
        let mut a_slots = [SupportPoint::new(0, Vec3::ZERO); 4];
        let mut b_slots = [SupportPoint::new(0, Vec3::ZERO); 4];
        let mut lambda = [0.0; 4];

        let mut state = GjkState::default();
        // seed the search from the difference of the shape centers
        let initial = a.center() - b.center();
        if !self.search(
            &mut state,
            &mut a_slots,
            &mut b_slots,
            &mut lambda,
            a,
            b,
            initial,
        ) {
            return ClosestPoints::Intersecting;
        }

        // merge duplicate support points per side, accumulating weights
        let mut a_simplex = ContactSimplex::new();
        let mut b_simplex = ContactSimplex::new();
        let mut a_lambda: Vec<Real> = Vec::with_capacity(4);
        let mut b_lambda: Vec<Real> = Vec::with_capacity(4);
        for i in 0..4 {
            if state.bitmask & (1 << i) == 0 {
                continue;
            }
            match a_simplex.iter().position(|p| p.point == a_slots[i].point) {
                Some(k) => a_lambda[k] += lambda[i],
                None => {
                    a_simplex.push(a_slots[i]);
                    a_lambda.push(lambda[i]);
                }
            }
            match b_simplex.iter().position(|p| p.point == b_slots[i].point) {
                Some(k) => b_lambda[k] += lambda[i],
                None => {
                    b_simplex.push(b_slots[i]);
                    b_lambda.push(lambda[i]);
                }
            }
        }

        let a_point: Vec3 = a_simplex
            .iter()
            .zip(&a_lambda)
            .map(|(p, &l)| l * p.point)
            .sum();
        let b_point: Vec3 = b_simplex
            .iter()
            .zip(&b_lambda)
            .map(|(p, &l)| l * p.point)
            .sum();

        ClosestPoints::Separate {
            a_point,
            b_point,
            a_simplex,
            b_simplex,
        }
    }

    /// Core simplex search. Returns `false` when the shapes intersect.
    #[allow(clippy::too_many_arguments)]
    fn search(
        &self,
        state: &mut GjkState,
        a_slots: &mut [SupportPoint; 4],
        b_slots: &mut [SupportPoint; 4],
        lambda: &mut [Real; 4],
        a: &dyn TransformableShape,
        b: &dyn TransformableShape,
        initial: Vec3,
    ) -> bool {
        let mut v = initial;
        let mut distance = v.length();
        let mut mu: Real = 0.0;

        let mut iterations = 0;
        while state.bitmask < 15 && distance > MAX_ABSOLUTE_ERROR {
            iterations += 1;
            if iterations > self.max_iterations {
                trace!(distance, "closest-point search hit its iteration bound");
                break;
            }

            // take an unused simplex slot and sample the support mapping
            // of A - B at the current search direction
            let n = FIRST_EMPTY_SLOT[state.bitmask];
            let n_bit = 1 << n;
            state.n = n;
            state.n_bit = n_bit;
            a_slots[n] = a.support_point(-v);
            b_slots[n] = b.support_point(v);
            let w = a_slots[n].point - b_slots[n].point;

            // the support distance along v is a lower bound on separation;
            // stop once the upper bound stops improving
            mu = mu.max(v.dot(w) / distance);
            if distance - mu <= distance * MAX_RELATIVE_ERROR {
                if state.bitmask == 0 {
                    state.w[n] = w;
                    state.bitmask = n_bit;
                    lambda[n] = 1.0;
                }
                break;
            }

            // a repeated support point means floating point error has
            // stalled the search; accept the current answer
            if state.is_degenerate(w) {
                break;
            }

            state.w[n] = w;
            state.new_bitmask = state.bitmask | n_bit;

            if !state.find_closest(&mut v, lambda) {
                break;
            }

            let new_distance = v.length();
            if state.new_bitmask != 1 && new_distance > distance {
                // the distance must not increase after the first sample;
                // if it does, numerical error has taken over and the
                // shapes are treated as intersecting
                return false;
            }
            distance = new_distance;
        }

        state.bitmask < 15 && distance > MAX_ABSOLUTE_ERROR
    }
}

/// Per-call scratch state: the simplex in Minkowski-difference space and
/// the memoized dot products and subset determinants.
struct GjkState {
    w: [Vec3; 4],
    dot: [[f64; 4]; 4],
    det: [[f64; 4]; 16],
    bitmask: usize,
    new_bitmask: usize,
    n: usize,
    n_bit: usize,
}

impl Default for GjkState {
    fn default() -> Self {
        Self {
            w: [Vec3::ZERO; 4],
            dot: [[0.0; 4]; 4],
            det: [[0.0; 4]; 16],
            bitmask: 0,
            new_bitmask: 0,
            n: 0,
            n_bit: 0,
        }
    }
}

impl GjkState {
    fn is_degenerate(&self, w: Vec3) -> bool {
        (0..4).any(|i| self.new_bitmask & (1 << i) != 0 && self.w[i] == w)
    }

    /// A subset is the answer when every included point carries positive
    /// weight and no excluded point would improve it.
    fn is_valid(&self, s: usize) -> bool {
        for i in 0..4 {
            let bit = 1 << i;
            if self.new_bitmask & bit != 0 {
                if s & bit != 0 {
                    if self.det[s][i] <= 0.0 {
                        return false;
                    }
                } else if self.det[s | bit][i] > SUBSET_TOLERANCE {
                    return false;
                }
            }
        }
        true
    }

    /// Find the subset of the simplex whose convex hull holds the point
    /// closest to the origin, and that point. Returns `false` when no
    /// subset is acceptable (numerical breakdown).
    fn find_closest(&mut self, v: &mut Vec3, lambda: &mut [Real; 4]) -> bool {
        self.compute_determinants();

        for s in 1..=self.bitmask {
            if s & self.bitmask == s && self.is_valid(s | self.n_bit) {
                self.bitmask = s | self.n_bit;
                self.compute_v(v, lambda, self.bitmask);
                return true;
            }
        }
        if self.is_valid(self.n_bit) {
            self.bitmask = self.n_bit;
            lambda[self.n] = self.det[self.n_bit][self.n];
            *v = self.w[self.n];
            return true;
        }
        false
    }

    /// Barycentric combination of the subset `bits`, with normalized
    /// weights written into `lambda`.
    fn compute_v(&self, v: &mut Vec3, lambda: &mut [Real; 4], bits: usize) {
        let mut sum = 0.0;
        let mut vt = Vec3::ZERO;
        for i in 0..4 {
            if bits & (1 << i) != 0 {
                sum += self.det[bits][i];
                lambda[i] = self.det[bits][i];
                vt += self.det[bits][i] * self.w[i];
            }
        }
        let inv = 1.0 / sum;
        for (i, l) in lambda.iter_mut().enumerate() {
            if bits & (1 << i) != 0 {
                *l *= inv;
            }
        }
        *v = inv * vt;
    }

    /// Update the signed subdeterminants for every subset that includes
    /// the newly added point.
    fn compute_determinants(&mut self) {
        let n = self.n;
        let n_bit = self.n_bit;
        for i in 0..4 {
            if self.new_bitmask & (1 << i) != 0 {
                let d = self.w[i].dot(self.w[n]);
                self.dot[i][n] = d;
                self.dot[n][i] = d;
            }
        }
        let dot = &self.dot;
        let det = &mut self.det;

        if self.new_bitmask & 1 != 0 {
            det[1][0] = 1.0;
        }

        if self.new_bitmask & 2 != 0 {
            det[2][1] = 1.0;
        }

        if self.new_bitmask & 3 == (n_bit | 3) {
            det[3][0] = dot[1][1] - dot[1][0];
            det[3][1] = dot[0][0] - dot[0][1];
        }

        if self.new_bitmask & 4 != 0 {
            det[4][2] = 1.0;
        }

        if self.new_bitmask & 5 == (n_bit | 5) {
            det[5][0] = dot[2][2] - dot[2][0];
            det[5][2] = dot[0][0] - dot[0][2];
        }

        if self.new_bitmask & 6 == (n_bit | 6) {
            det[6][1] = dot[2][2] - dot[2][1];
            det[6][2] = dot[1][1] - dot[1][2];
        }

        if self.new_bitmask & 7 == (n_bit | 7) {
            det[7][0] = det[6][1] * (dot[1][1] - dot[1][0]) + det[6][2] * (dot[2][1] - dot[2][0]);
            det[7][1] = det[5][0] * (dot[0][0] - dot[0][1]) + det[5][2] * (dot[2][0] - dot[2][1]);
            det[7][2] = det[3][0] * (dot[0][0] - dot[0][2]) + det[3][1] * (dot[1][0] - dot[1][2]);
        }

        if self.new_bitmask & 8 != 0 {
            det[8][3] = 1.0;
        }

        if self.new_bitmask & 9 == (n_bit | 9) {
            det[9][0] = dot[3][3] - dot[3][0];
            det[9][3] = dot[0][0] - dot[0][3];
        }

        if self.new_bitmask & 10 == (n_bit | 10) {
            det[10][1] = dot[3][3] - dot[3][1];
            det[10][3] = dot[1][1] - dot[1][3];
        }

        if self.new_bitmask & 11 == (n_bit | 11) {
            det[11][0] =
                det[10][1] * (dot[1][1] - dot[1][0]) + det[10][3] * (dot[3][1] - dot[3][0]);
            det[11][1] = det[9][0] * (dot[0][0] - dot[0][1]) + det[9][3] * (dot[3][0] - dot[3][1]);
            det[11][3] = det[3][0] * (dot[0][0] - dot[0][3]) + det[3][1] * (dot[1][0] - dot[1][3]);
        }

        if self.new_bitmask & 12 == (n_bit | 12) {
            det[12][2] = dot[3][3] - dot[3][2];
            det[12][3] = dot[2][2] - dot[2][3];
        }

        if self.new_bitmask & 13 == (n_bit | 13) {
            det[13][0] =
                det[12][2] * (dot[2][2] - dot[2][0]) + det[12][3] * (dot[3][2] - dot[3][0]);
            det[13][2] = det[9][0] * (dot[0][0] - dot[0][2]) + det[9][3] * (dot[3][0] - dot[3][2]);
            det[13][3] = det[5][0] * (dot[0][0] - dot[0][3]) + det[5][2] * (dot[2][0] - dot[2][3]);
        }

        if self.new_bitmask & 14 == (n_bit | 14) {
            det[14][1] =
                det[12][2] * (dot[2][2] - dot[2][1]) + det[12][3] * (dot[3][2] - dot[3][1]);
            det[14][2] =
                det[10][1] * (dot[1][1] - dot[1][2]) + det[10][3] * (dot[3][1] - dot[3][2]);
            det[14][3] = det[6][1] * (dot[1][1] - dot[1][3]) + det[6][2] * (dot[2][1] - dot[2][3]);
        }

        if self.new_bitmask & 15 == 15 {
            det[15][0] = det[14][1] * (dot[1][1] - dot[1][0])
                + det[14][2] * (dot[2][1] - dot[2][0])
                + det[14][3] * (dot[3][1] - dot[3][0]);
            det[15][1] = det[13][0] * (dot[0][0] - dot[0][1])
                + det[13][2] * (dot[2][0] - dot[2][1])
                + det[13][3] * (dot[3][0] - dot[3][1]);
            det[15][2] = det[11][0] * (dot[0][0] - dot[0][2])
                + det[11][1] * (dot[1][0] - dot[1][2])
                + det[11][3] * (dot[3][0] - dot[3][2]);
            det[15][3] = det[7][0] * (dot[0][0] - dot[0][3])
                + det[7][1] * (dot[1][0] - dot[1][3])
                + det[7][2] * (dot[2][0] - dot[2][3]);
        }
    }
}
