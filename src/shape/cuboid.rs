//! Axis-aligned box centered on the origin.

use rand::{Rng, RngCore};

use crate::collision::simplex::{ContactSimplex, SupportPoint};
use crate::collision::surface::ContactSurface;
use crate::error::TumbleError;
use crate::math::{Mat3, Plane, Ray, Real, Vec3};

use super::{most_parallel_edge, most_parallel_face, RayHit, Shape};

/// Sentinel for "no face" in the adjacency tables below.
const NO_FACE: usize = 6;

/// Vertices of each face in CCW order seen from the outside. Faces are
/// ordered -x, +x, -y, +y, -z, +z.
const FACE_VERTICES: [[usize; 4]; 6] = [
    [0, 4, 6, 2],
    [1, 3, 7, 5],
    [0, 1, 5, 4],
    [2, 6, 7, 3],
    [0, 2, 3, 1],
    [4, 5, 7, 6],
];

/// Face index keyed by the sum of two opposing vertex indices of that face.
const CORNER_SUM_TO_FACE: [usize; 14] = [6, 6, 6, 4, 6, 2, 0, 6, 1, 3, 6, 5, 6, 6];

/// Faces adjacent to each vertex.
const VERTEX_FACES: [[usize; 3]; 8] = [
    [0, 2, 4],
    [1, 2, 4],
    [0, 3, 4],
    [1, 3, 4],
    [0, 2, 5],
    [1, 2, 5],
    [0, 3, 5],
    [1, 3, 5],
];

/// Faces adjacent to the edge between two vertices, keyed by
/// `[v1 ^ v2][v1 & v2]`. Pairs that do not form an edge map to one or two
/// `NO_FACE` slots (vertex pairs across a face diagonal share one face,
/// opposite corners none).
const EDGE_FACES: [[[usize; 2]; 8]; 8] = [
    // impossible (v1 == v2)
    [[6, 6]; 8],
    // edge aligned with the x axis
    [
        [2, 4],
        [6, 6],
        [3, 4],
        [6, 6],
        [2, 5],
        [6, 6],
        [3, 5],
        [6, 6],
    ],
    // edge aligned with the y axis
    [
        [0, 4],
        [1, 4],
        [6, 6],
        [6, 6],
        [0, 5],
        [1, 5],
        [6, 6],
        [6, 6],
    ],
    // diagonal across a -z/+z face
    [
        [4, 6],
        [6, 6],
        [6, 6],
        [6, 6],
        [5, 6],
        [6, 6],
        [6, 6],
        [6, 6],
    ],
    // edge aligned with the z axis
    [
        [0, 2],
        [1, 2],
        [0, 3],
        [1, 3],
        [6, 6],
        [6, 6],
        [6, 6],
        [6, 6],
    ],
    // diagonal across a -y/+y face
    [
        [2, 6],
        [6, 6],
        [3, 6],
        [6, 6],
        [6, 6],
        [6, 6],
        [6, 6],
        [6, 6],
    ],
    // diagonal across a -x/+x face
    [
        [0, 6],
        [1, 6],
        [6, 6],
        [6, 6],
        [6, 6],
        [6, 6],
        [6, 6],
        [6, 6],
    ],
    // impossible (opposite corners)
    [[6, 6]; 8],
];

/// Edges (vertex index pairs) adjacent to each vertex.
const VERTEX_EDGES: [[(usize, usize); 3]; 8] = [
    [(0, 1), (0, 2), (0, 4)],
    [(1, 0), (1, 3), (1, 5)],
    [(2, 0), (2, 3), (2, 6)],
    [(3, 1), (3, 2), (3, 7)],
    [(4, 0), (4, 5), (4, 6)],
    [(5, 1), (5, 4), (5, 7)],
    [(6, 2), (6, 4), (6, 7)],
    [(7, 3), (7, 5), (7, 6)],
];

/// A box with the given half-extents, centered on the origin and aligned
/// with the local axes.
///
/// Vertex `i` sits at `(±x, ±y, ±z)` where bit 0 of `i` selects the sign of
/// x, bit 1 of y, and bit 2 of z; that index doubles as the support
/// feature id.
#[derive(Debug, Clone)]
pub struct Cuboid {
    x: Real,
    y: Real,
    z: Real,
    vertices: [Vec3; 8],
    normals: [Vec3; 6],
}

impl Cuboid {
    pub fn new(x: Real, y: Real, z: Real) -> Self {
        let mut vertices = [Vec3::ZERO; 8];
        for (i, vertex) in vertices.iter_mut().enumerate() {
            *vertex = Vec3::new(
                if i & 1 != 0 { x } else { -x },
                if i & 2 != 0 { y } else { -y },
                if i & 4 != 0 { z } else { -z },
            );
        }
        let normals = [
            -Vec3::X,
            Vec3::X,
            -Vec3::Y,
            Vec3::Y,
            -Vec3::Z,
            Vec3::Z,
        ];
        Self {
            x,
            y,
            z,
            vertices,
            normals,
        }
    }

    pub fn half_extents(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    fn face_polygon(&self, face: usize) -> ContactSurface {
        ContactSurface::polygon(
            FACE_VERTICES[face]
                .iter()
                .map(|&v| self.vertices[v])
                .collect(),
        )
    }

    /// Average of the normals of the faces adjacent to the edge `(v1, v2)`.
    fn edge_normal(&self, v1: usize, v2: usize) -> Result<Vec3, TumbleError> {
        let faces = EDGE_FACES[v1 ^ v2][v1 & v2];
        if faces[0] == NO_FACE {
            return Err(TumbleError::Geometry(format!(
                "box vertices {v1} and {v2} do not share an edge or face"
            )));
        }
        let mut normal = self.normals[faces[0]];
        if faces[1] != NO_FACE {
            normal = 0.5 * (normal + self.normals[faces[1]]);
        }
        Ok(normal)
    }

    fn feature_index(point: &SupportPoint) -> Result<usize, TumbleError> {
        let index = point.feature as usize;
        if index < 8 {
            Ok(index)
        } else {
            Err(TumbleError::Geometry(format!(
                "support feature {index} is not a box vertex"
            )))
        }
    }
}

impl Shape for Cuboid {
    fn volume(&self) -> Real {
        8.0 * self.x * self.y * self.z
    }

    fn inertia(&self) -> Mat3 {
        let s = self.volume() / 3.0;
        Mat3::from_diagonal(Vec3::new(
            s * (self.y * self.y + self.z * self.z),
            s * (self.x * self.x + self.z * self.z),
            s * (self.x * self.x + self.y * self.y),
        ))
    }

    fn contains(&self, point: Vec3) -> bool {
        point.x >= -self.x
            && point.x <= self.x
            && point.y >= -self.y
            && point.y <= self.y
            && point.z >= -self.z
            && point.z <= self.z
    }

    fn intersect_ray(&self, ray: &Ray) -> Option<RayHit> {
        // clip the ray against each face plane; front hits raise the entry
        // parameter, back hits lower the exit parameter
        let half = [self.x, self.x, self.y, self.y, self.z, self.z];
        let mut t0 = Real::NEG_INFINITY;
        let mut t1 = Real::INFINITY;
        let mut f0 = 0;
        let mut f1 = 0;
        for face in 0..6 {
            let vn = self.normals[face].dot(ray.origin()) - half[face];
            let vd = self.normals[face].dot(ray.direction());
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
            // origin inside the box; the entry point is behind the ray
            t1.is_finite().then(|| RayHit {
                t: t1,
                normal: self.normals[f1],
            })
        } else {
            Some(RayHit {
                t: t0,
                normal: self.normals[f0],
            })
        }
    }

    fn random_point(&self, rng: &mut dyn RngCore) -> Vec3 {
        Vec3::new(
            self.x * (2.0 * rng.random::<Real>() - 1.0),
            self.y * (2.0 * rng.random::<Real>() - 1.0),
            self.z * (2.0 * rng.random::<Real>() - 1.0),
        )
    }

    fn support_point(&self, direction: Vec3) -> SupportPoint {
        let mut feature = 0;
        if direction.x >= 0.0 {
            feature |= 1;
        }
        if direction.y >= 0.0 {
            feature |= 2;
        }
        if direction.z >= 0.0 {
            feature |= 4;
        }
        SupportPoint::new(feature, self.vertices[feature as usize])
    }

    fn collision_surface(
        &self,
        simplex: &ContactSimplex,
        separating_plane: &Plane,
        _epsilon: Real,
    ) -> Result<ContactSurface, TumbleError> {
        match simplex.len() {
            1 => {
                // vertex: prefer an adjacent face (almost) parallel to the
                // separating plane, then an adjacent edge, then the vertex
                let vertex = Self::feature_index(&simplex[0])?;
                if let Some(face) =
                    most_parallel_face(separating_plane, &VERTEX_FACES[vertex], &self.normals)
                {
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
                // edge: use the more parallel adjacent face if one is close
                // enough to the separating plane, else the edge itself
                let v1 = Self::feature_index(&simplex[0])?;
                let v2 = Self::feature_index(&simplex[1])?;
                let faces = EDGE_FACES[v1 ^ v2][v1 & v2];
                if faces[0] == NO_FACE {
                    return Err(TumbleError::Geometry(format!(
                        "box simplex edge {v1}-{v2} has no adjacent face"
                    )));
                }
                let candidates = [faces[0], if faces[1] == NO_FACE { usize::MAX } else { faces[1] }];
                if let Some(face) = most_parallel_face(separating_plane, &candidates, &self.normals)
                {
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
                // face: find the two vertices across the face diagonal;
                // their index sum identifies the face
                let t0 = Self::feature_index(&simplex[0])?;
                let t1 = Self::feature_index(&simplex[1])?;
                let t2 = Self::feature_index(&simplex[2])?;
                let diagonal = |a: usize, b: usize| matches!(a ^ b, 3 | 5 | 6);
                let sum = if diagonal(t0, t1) {
                    t0 + t1
                } else if diagonal(t0, t2) {
                    t0 + t2
                } else if diagonal(t1, t2) {
                    t1 + t2
                } else {
                    return Err(TumbleError::Geometry(format!(
                        "box simplex {t0},{t1},{t2} does not span a face"
                    )));
                };
                let face = CORNER_SUM_TO_FACE[sum];
                if face == NO_FACE {
                    return Err(TumbleError::Geometry(format!(
                        "box simplex {t0},{t1},{t2} does not span a face"
                    )));
                }
                Ok(self.face_polygon(face))
            }

            n => Err(TumbleError::Geometry(format!(
                "box contact simplex has {n} vertices"
            ))),
        }
    }

    fn dump_points(&self) -> Vec<Vec3> {
        self.vertices.to_vec()
    }
}
