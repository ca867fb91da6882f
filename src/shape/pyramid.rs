//! Rectangular pyramid centered on the origin.

use rand::{Rng, RngCore};

use crate::collision::simplex::{ContactSimplex, SupportPoint};
use crate::collision::surface::ContactSurface;
use crate::error::TumbleError;
use crate::math::{Mat3, Plane, Ray, Real, Vec3};

use super::{most_parallel_edge, most_parallel_face, RayHit, Shape};

/// Sentinel for "no face" in the adjacency tables below.
const NO_FACE: usize = 5;

const APEX: usize = 4;

/// Vertices of each face in CCW order seen from the outside, for positive
/// height. Faces are ordered -x, +x, -y, +y, base.
const FACE_VERTICES_POS: [&[usize]; 5] = [
    &[0, 4, 2],
    &[1, 3, 4],
    &[0, 1, 4],
    &[3, 2, 4],
    &[0, 2, 3, 1],
];

/// Face vertex lists for negative height (the winding flips).
const FACE_VERTICES_NEG: [&[usize]; 5] = [
    &[0, 2, 4],
    &[3, 1, 4],
    &[1, 0, 4],
    &[2, 3, 4],
    &[0, 1, 3, 2],
];

/// Faces adjacent to each vertex.
const VERTEX_FACES: [[usize; 4]; 5] = [
    [0, 2, 4, NO_FACE],
    [1, 2, 4, NO_FACE],
    [0, 3, 4, NO_FACE],
    [1, 3, 4, NO_FACE],
    [0, 1, 2, 3],
];

/// Faces adjacent to the edge between two vertices. Base diagonals share
/// only the base face.
const EDGE_FACES: [[[usize; 2]; 5]; 5] = [
    [[5, 5], [2, 4], [0, 4], [4, 5], [0, 2]],
    [[2, 4], [5, 5], [4, 5], [1, 4], [1, 2]],
    [[0, 4], [4, 5], [5, 5], [3, 4], [0, 3]],
    [[4, 5], [1, 4], [3, 4], [5, 5], [1, 3]],
    [[0, 2], [1, 2], [0, 3], [1, 3], [5, 5]],
];

const NO_EDGE: (usize, usize) = (usize::MAX, usize::MAX);

/// Edges (vertex index pairs) adjacent to each vertex.
const VERTEX_EDGES: [[(usize, usize); 4]; 5] = [
    [(0, 1), (0, 2), (0, 4), NO_EDGE],
    [(1, 0), (1, 3), (1, 4), NO_EDGE],
    [(2, 0), (2, 3), (2, 4), NO_EDGE],
    [(3, 1), (3, 2), (3, 4), NO_EDGE],
    [(4, 0), (4, 1), (4, 2), (4, 3)],
];

/// Side face spanned by the apex and two base vertices, keyed by the base
/// vertex pair. Diagonal pairs map to the sentinel.
const BASE_PAIR_TO_SIDE_FACE: [[usize; 4]; 4] = [
    [5, 2, 0, 5],
    [2, 5, 5, 1],
    [0, 5, 5, 3],
    [5, 1, 3, 5],
];

/// A rectangular pyramid: base half-extents `x`, `y` and signed height `z`.
///
/// The base sits at `-z/4` and the apex at `+3z/4`, putting the centroid at
/// the origin. A negative `z` flips the pyramid upside down. Base vertices
/// are indexed by an xy sign bitmask (the support feature id); the apex is
/// feature 4.
#[derive(Debug, Clone)]
pub struct Pyramid {
    x: Real,
    y: Real,
    z: Real,
    vertices: [Vec3; 5],
    planes: [Plane; 5],
}

impl Pyramid {
    pub fn new(x: Real, y: Real, z: Real) -> Self {
        let mut vertices = [Vec3::ZERO; 5];
        for (i, vertex) in vertices.iter_mut().enumerate().take(4) {
            *vertex = Vec3::new(
                if i & 1 != 0 { x } else { -x },
                if i & 2 != 0 { y } else { -y },
                -0.25 * z,
            );
        }
        vertices[APEX] = Vec3::new(0.0, 0.0, 0.75 * z);

        let face_lists = if z >= 0.0 {
            &FACE_VERTICES_POS
        } else {
            &FACE_VERTICES_NEG
        };
        let planes = std::array::from_fn(|i| {
            let list = face_lists[i];
            Plane::from_points(vertices[list[0]], vertices[list[1]], vertices[list[2]])
        });

        Self {
            x,
            y,
            z,
            vertices,
            planes,
        }
    }

    fn face_lists(&self) -> &'static [&'static [usize]; 5] {
        if self.z >= 0.0 {
            &FACE_VERTICES_POS
        } else {
            &FACE_VERTICES_NEG
        }
    }

    fn face_polygon(&self, face: usize) -> ContactSurface {
        ContactSurface::polygon(
            self.face_lists()[face]
                .iter()
                .map(|&v| self.vertices[v])
                .collect(),
        )
    }

    fn face_normals(&self) -> [Vec3; 5] {
        std::array::from_fn(|i| self.planes[i].normal())
    }

    /// Average of the normals of the faces adjacent to the edge `(v1, v2)`.
    fn edge_normal(&self, v1: usize, v2: usize) -> Result<Vec3, TumbleError> {
        let faces = EDGE_FACES[v1][v2];
        if faces[0] == NO_FACE {
            return Err(TumbleError::Geometry(format!(
                "pyramid vertices {v1} and {v2} do not share an edge or face"
            )));
        }
        let mut normal = self.planes[faces[0]].normal();
        if faces[1] != NO_FACE {
            normal = 0.5 * (normal + self.planes[faces[1]].normal());
        }
        Ok(normal)
    }

    fn feature_index(point: &SupportPoint) -> Result<usize, TumbleError> {
        let index = point.feature as usize;
        if index < 5 {
            Ok(index)
        } else {
            Err(TumbleError::Geometry(format!(
                "support feature {index} is not a pyramid vertex"
            )))
        }
    }
}

impl Shape for Pyramid {
    fn volume(&self) -> Real {
        4.0 / 3.0 * self.x * self.y * self.z
    }

    fn inertia(&self) -> Mat3 {
        let s = self.volume();
        Mat3::from_diagonal(Vec3::new(
            s * (self.y * self.y + 7.0 * self.z * self.z),
            s * (self.x * self.x + 7.0 * self.z * self.z),
            s * (self.x * self.x + self.y * self.y),
        ))
    }

    fn contains(&self, point: Vec3) -> bool {
        // height fraction from the base (0) to the apex (1)
        let u = (point.z + 0.25 * self.z) / self.z;
        if !(0.0..=1.0).contains(&u) {
            return false;
        }
        let f = 1.0 - u;
        point.x >= -self.x * f
            && point.x <= self.x * f
            && point.y >= -self.y * f
            && point.y <= self.y * f
    }

    fn intersect_ray(&self, ray: &Ray) -> Option<RayHit> {
        let mut t0 = Real::NEG_INFINITY;
        let mut t1 = Real::INFINITY;
        let mut f0 = 0;
        let mut f1 = 0;
        for (face, plane) in self.planes.iter().enumerate() {
            let vn = plane.distance(ray.origin());
            let vd = plane.normal().dot(ray.direction());
            if vd == 0.0 {
                if vn > 0.0 {
                    return None;
                }
            } else {
                let t = -vn / vd;
                if vd > 0.0 {
                    if t >= 0.0 && t < t1 {
                        t1 = t;
                        f1 = face;
                    }
                } else if t > t0 {
                    t0 = t;
                    f0 = face;
                }
            }
            if t1 < t0 {
                return None;
            }
        }

        if t0 < 0.0 {
            // origin inside; the entry point is behind the ray
            t1.is_finite().then(|| RayHit {
                t: t1,
                normal: self.planes[f1].normal(),
            })
        } else {
            Some(RayHit {
                t: t0,
                normal: self.planes[f0].normal(),
            })
        }
    }

    fn random_point(&self, rng: &mut dyn RngCore) -> Vec3 {
        // sample the height fraction with density matching the shrinking
        // cross-section, then the cross-section uniformly
        let mut f: Real;
        loop {
            f = rng.random();
            if rng.random::<Real>() <= f * f {
                break;
            }
        }
        Vec3::new(
            self.x * f * (2.0 * rng.random::<Real>() - 1.0),
            self.y * f * (2.0 * rng.random::<Real>() - 1.0),
            self.z * (0.75 - f),
        )
    }

    fn support_point(&self, direction: Vec3) -> SupportPoint {
        // best base vertex, then the apex if it is better
        let mut feature = 0u32;
        if direction.x >= 0.0 {
            feature |= 1;
        }
        if direction.y >= 0.0 {
            feature |= 2;
        }
        if self.vertices[feature as usize].dot(direction) < self.vertices[APEX].dot(direction) {
            feature = APEX as u32;
        }
        SupportPoint::new(feature, self.vertices[feature as usize])
    }

    fn collision_surface(
        &self,
        simplex: &ContactSimplex,
        separating_plane: &Plane,
        _epsilon: Real,
    ) -> Result<ContactSurface, TumbleError> {
        let normals = self.face_normals();
        match simplex.len() {
            1 => {
                let vertex = Self::feature_index(&simplex[0])?;
                let faces: Vec<usize> = VERTEX_FACES[vertex]
                    .iter()
                    .map(|&f| if f == NO_FACE { usize::MAX } else { f })
                    .collect();
                if let Some(face) = most_parallel_face(separating_plane, &faces, &normals) {
                    return Ok(self.face_polygon(face));
                }

                if let Some((v1, v2)) =
                    most_parallel_edge(separating_plane, &VERTEX_EDGES[vertex], &self.vertices)
                {
                    let normal = self.edge_normal(v1, v2)?;
                    return Ok(ContactSurface::edge(
                        self.vertices[v1],
                        self.vertices[v2],
                        normal,
                    ));
                }

                Ok(ContactSurface::point(
                    self.vertices[vertex],
                    separating_plane.normal(),
                ))
            }

            2 => {
                let v1 = Self::feature_index(&simplex[0])?;
                let v2 = Self::feature_index(&simplex[1])?;
                let faces = EDGE_FACES[v1][v2];
                if faces[0] == NO_FACE {
                    return Err(TumbleError::Geometry(format!(
                        "pyramid simplex edge {v1}-{v2} has no adjacent face"
                    )));
                }
                let candidates = [
                    faces[0],
                    if faces[1] == NO_FACE { usize::MAX } else { faces[1] },
                ];
                if let Some(face) = most_parallel_face(separating_plane, &candidates, &normals) {
                    return Ok(self.face_polygon(face));
                }

                let normal = self.edge_normal(v1, v2)?;
                Ok(ContactSurface::edge(
                    self.vertices[v1],
                    self.vertices[v2],
                    normal,
                ))
            }

            3 => {
                let t0 = Self::feature_index(&simplex[0])?;
                let t1 = Self::feature_index(&simplex[1])?;
                let t2 = Self::feature_index(&simplex[2])?;
                let face = if t0 == APEX {
                    BASE_PAIR_TO_SIDE_FACE[t1][t2]
                } else if t1 == APEX {
                    BASE_PAIR_TO_SIDE_FACE[t0][t2]
                } else if t2 == APEX {
                    BASE_PAIR_TO_SIDE_FACE[t0][t1]
                } else {
                    // all three on the base
                    4
                };
                if face == NO_FACE {
                    return Err(TumbleError::Geometry(format!(
                        "pyramid simplex {t0},{t1},{t2} does not span a face"
                    )));
                }
                Ok(self.face_polygon(face))
            }

            n => Err(TumbleError::Geometry(format!(
                "pyramid contact simplex has {n} vertices"
            ))),
        }
    }

    fn dump_points(&self) -> Vec<Vec3> {
        self.vertices.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::surface::SurfaceKind;
    use approx::assert_relative_eq;

    #[test]
    fn test_pyramid_volume() {
        let pyramid = Pyramid::new(1.0, 1.0, 3.0);
        assert_relative_eq!(pyramid.volume(), 4.0);
    }

    #[test]
    fn test_pyramid_contains() {
        let pyramid = Pyramid::new(1.0, 1.0, 1.0);
        assert!(pyramid.contains(Vec3::ZERO));
        assert!(pyramid.contains(Vec3::new(0.9, 0.9, -0.24)));
        // wide near the apex: the cross-section has shrunk
        assert!(!pyramid.contains(Vec3::new(0.9, 0.9, 0.5)));
        assert!(!pyramid.contains(Vec3::new(0.0, 0.0, 0.76)));
        assert!(!pyramid.contains(Vec3::new(0.0, 0.0, -0.26)));
    }

    #[test]
    fn test_pyramid_contains_negative_height() {
        let pyramid = Pyramid::new(1.0, 1.0, -1.0);
        assert!(pyramid.contains(Vec3::ZERO));
        assert!(pyramid.contains(Vec3::new(0.0, 0.0, -0.74)));
        assert!(!pyramid.contains(Vec3::new(0.0, 0.0, 0.26)));
    }

    #[test]
    fn test_pyramid_support_apex() {
        let pyramid = Pyramid::new(1.0, 1.0, 1.0);
        let support = pyramid.support_point(Vec3::Z);
        assert_eq!(support.feature, 4);
        assert_relative_eq!(support.point.z, 0.75);
    }

    #[test]
    fn test_pyramid_support_base_vertex() {
        let pyramid = Pyramid::new(1.0, 1.0, 1.0);
        let support = pyramid.support_point(Vec3::new(1.0, 1.0, -0.5));
        assert_eq!(support.feature, 3);
        assert_eq!(support.point, Vec3::new(1.0, 1.0, -0.25));
    }

    #[test]
    fn test_pyramid_base_planes_point_outward() {
        for z in [2.0, -2.0] {
            let pyramid = Pyramid::new(1.0, 1.0, z);
            for plane in &pyramid.planes {
                // the centroid is inside every face plane
                assert!(
                    plane.distance(Vec3::ZERO) < 0.0,
                    "face plane of pyramid with z={z} faces inward"
                );
            }
        }
    }

    #[test]
    fn test_pyramid_ray_hits_base() {
        let pyramid = Pyramid::new(1.0, 1.0, 1.0);
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        let hit = pyramid.intersect_ray(&ray).expect("ray aimed at the base");
        assert_relative_eq!(hit.t, 4.75);
        assert_relative_eq!(hit.normal.z, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pyramid_random_point_confined() {
        let pyramid = Pyramid::new(1.0, 2.0, 1.5);
        let mut rng = rand::rng();
        for _ in 0..100 {
            let p = pyramid.random_point(&mut rng);
            assert!(
                pyramid.contains(p),
                "sampled point {p} escaped the pyramid"
            );
        }
    }

    #[test]
    fn test_pyramid_base_surface_from_triangle_simplex() {
        let pyramid = Pyramid::new(1.0, 1.0, 1.0);
        let simplex: ContactSimplex = [0u32, 1, 2]
            .iter()
            .map(|&f| SupportPoint::new(f, pyramid.vertices[f as usize]))
            .collect();
        let plane = Plane::from_point(-Vec3::Z, Vec3::new(0.0, 0.0, -0.25));
        let surface = pyramid.collision_surface(&simplex, &plane, 1e-3).unwrap();
        let ContactSurface::Polygon(polygon) = surface else {
            panic!("base simplex must give a polygon");
        };
        assert_eq!(polygon.vertices.len(), 4);
        assert_relative_eq!(polygon.normal().z, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pyramid_side_surface_from_apex_simplex() {
        let pyramid = Pyramid::new(1.0, 1.0, 1.0);
        // apex plus the two +x base vertices span the +x side face
        let simplex: ContactSimplex = [4u32, 1, 3]
            .iter()
            .map(|&f| SupportPoint::new(f, pyramid.vertices[f as usize]))
            .collect();
        let plane = Plane::from_point(Vec3::X, Vec3::new(1.0, 0.0, 0.0));
        let surface = pyramid.collision_surface(&simplex, &plane, 1e-3).unwrap();
        let ContactSurface::Polygon(polygon) = surface else {
            panic!("apex simplex must give a side polygon");
        };
        assert_eq!(polygon.vertices.len(), 3);
        assert!(polygon.normal().x > 0.0);
    }

    #[test]
    fn test_pyramid_apex_simplex_gives_point() {
        let pyramid = Pyramid::new(1.0, 1.0, 1.0);
        let simplex: ContactSimplex =
            std::iter::once(SupportPoint::new(4, pyramid.vertices[APEX])).collect();
        let plane = Plane::from_point(Vec3::Z, Vec3::new(0.0, 0.0, 0.75));
        let surface = pyramid.collision_surface(&simplex, &plane, 1e-3).unwrap();
        assert_eq!(surface.kind(), SurfaceKind::Point);
    }
}
