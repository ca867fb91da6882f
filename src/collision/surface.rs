//! Contact surfaces: the vertex, edge, or face of a shape implicated in a
//! contact.
//!
//! Surfaces are extracted by shapes in local space and transformed to world
//! space before intersection. The surface kind drives the intersector
//! dispatch; there is no out-of-band type identity.

use crate::math::{Mat4, Plane, Vec3};

/// A single vertex together with the separating-plane normal it was found
/// against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointSurface {
    pub vertex: Vec3,
    pub normal: Vec3,
}

/// An edge together with the average of its adjacent face normals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeSurface {
    pub vertex1: Vec3,
    pub vertex2: Vec3,
    pub normal: Vec3,
}

/// A planar convex face with counter-clockwise vertices (seen from the
/// outside).
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonSurface {
    pub vertices: Vec<Vec3>,
    pub plane: Plane,
}

impl PolygonSurface {
    /// Build a polygon from at least three CCW vertices; the face plane is
    /// derived from the first three.
    pub fn new(vertices: Vec<Vec3>) -> Self {
        debug_assert!(vertices.len() >= 3);
        let plane = Plane::from_points(vertices[0], vertices[1], vertices[2]);
        Self { vertices, plane }
    }

    pub fn normal(&self) -> Vec3 {
        self.plane.normal()
    }
}

/// The kind of geometric feature a contact surface describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    Point,
    Edge,
    Polygon,
}

/// A piece of one body's surface involved in a contact.
#[derive(Debug, Clone, PartialEq)]
pub enum ContactSurface {
    Point(PointSurface),
    Edge(EdgeSurface),
    Polygon(PolygonSurface),
}

impl ContactSurface {
    pub fn point(vertex: Vec3, normal: Vec3) -> Self {
        Self::Point(PointSurface { vertex, normal })
    }

    pub fn edge(vertex1: Vec3, vertex2: Vec3, normal: Vec3) -> Self {
        Self::Edge(EdgeSurface {
            vertex1,
            vertex2,
            normal,
        })
    }

    pub fn polygon(vertices: Vec<Vec3>) -> Self {
        Self::Polygon(PolygonSurface::new(vertices))
    }

    pub fn kind(&self) -> SurfaceKind {
        match self {
            Self::Point(_) => SurfaceKind::Point,
            Self::Edge(_) => SurfaceKind::Edge,
            Self::Polygon(_) => SurfaceKind::Polygon,
        }
    }

    /// Transform the surface, mapping points by `points` and normals by
    /// `normals` (the inverse transpose of `points` for non-rigid maps).
    pub fn transform(&mut self, points: &Mat4, normals: &Mat4) {
        match self {
            Self::Point(surface) => {
                surface.vertex = points.transform_point3(surface.vertex);
                surface.normal = normals.transform_vector3(surface.normal).normalize();
            }
            Self::Edge(surface) => {
                surface.vertex1 = points.transform_point3(surface.vertex1);
                surface.vertex2 = points.transform_point3(surface.vertex2);
                surface.normal = normals.transform_vector3(surface.normal).normalize();
            }
            Self::Polygon(surface) => {
                for vertex in &mut surface.vertices {
                    *vertex = points.transform_point3(*vertex);
                }
                let normal = normals.transform_vector3(surface.plane.normal()).normalize();
                surface.plane = Plane::from_point(normal, surface.vertices[0]);
            }
        }
    }
}
