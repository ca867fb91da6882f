//! Contact-region computation between pairs of contact surfaces.
//!
//! Each pairing of surface kinds has one intersector; the dispatch below
//! covers unordered pairs by calling the canonical intersector with the
//! bodies and surfaces swapped. That is sound because a [`ContactPoint`]
//! carries its own body handles and its normal convention (out of the
//! contact's own `b` body) is preserved under the swap.
//!
//! All intersectors are stateless pure functions from two world-space
//! surfaces to appended world-space contact points.

use crate::dynamics::BodyId;
use crate::math::{Real, Vec3};

use super::contact::ContactPoint;
use super::surface::{ContactSurface, EdgeSurface, PointSurface, PolygonSurface};

/// Relative tolerance deciding whether two edges are parallel.
const PARALLEL_EDGE_TOLERANCE: Real = 1.0e-10;

/// Append the contact points between two bodies' contact surfaces.
pub fn intersect_surfaces(
    contacts: &mut Vec<ContactPoint>,
    a: BodyId,
    b: BodyId,
    a_surface: &ContactSurface,
    b_surface: &ContactSurface,
) {
    use ContactSurface::*;
    match (a_surface, b_surface) {
        (Point(pa), Point(pb)) => point_point(contacts, a, b, pa, pb),
        (Point(pa), Edge(eb)) => point_edge(contacts, a, b, pa, eb),
        (Point(pa), Polygon(gb)) => point_polygon(contacts, a, b, pa, gb),
        (Edge(ea), Edge(eb)) => edge_edge(contacts, a, b, ea, eb),
        (Edge(ea), Polygon(gb)) => edge_polygon(contacts, a, b, ea, gb),
        (Polygon(ga), Polygon(gb)) => polygon_polygon(contacts, a, b, ga, gb),
        // mirrored pairings
        (Edge(ea), Point(pb)) => point_edge(contacts, b, a, pb, ea),
        (Polygon(ga), Point(pb)) => point_polygon(contacts, b, a, pb, ga),
        (Polygon(ga), Edge(eb)) => edge_polygon(contacts, b, a, eb, ga),
    }
}

fn point_point(
    contacts: &mut Vec<ContactPoint>,
    a: BodyId,
    b: BodyId,
    a_surface: &PointSurface,
    b_surface: &PointSurface,
) {
    let distance = (a_surface.vertex - b_surface.vertex).length();
    contacts.push(ContactPoint::vertex_face(
        a,
        b,
        a_surface.vertex,
        b_surface.normal,
        distance,
    ));
}

fn point_edge(
    contacts: &mut Vec<ContactPoint>,
    a: BodyId,
    b: BodyId,
    a_surface: &PointSurface,
    _b_surface: &EdgeSurface,
) {
    // the vertex's own separating normal points toward b; flip it into the
    // contact convention. The separation is conservatively zero.
    contacts.push(ContactPoint::vertex_face(
        a,
        b,
        a_surface.vertex,
        -a_surface.normal,
        0.0,
    ));
}

fn point_polygon(
    contacts: &mut Vec<ContactPoint>,
    a: BodyId,
    b: BodyId,
    a_surface: &PointSurface,
    b_surface: &PolygonSurface,
) {
    contacts.push(ContactPoint::vertex_face(
        a,
        b,
        a_surface.vertex,
        b_surface.normal(),
        b_surface.plane.distance(a_surface.vertex),
    ));
}

fn edge_edge(
    contacts: &mut Vec<ContactPoint>,
    a: BodyId,
    b: BodyId,
    a_surface: &EdgeSurface,
    b_surface: &EdgeSurface,
) {
    let a_vec = a_surface.vertex2 - a_surface.vertex1;
    let b_vec = b_surface.vertex2 - b_surface.vertex1;

    let cross = a_vec.cross(b_vec);
    let l2 = cross.length_squared();
    if l2 > PARALLEL_EDGE_TOLERANCE * a_vec.length_squared() * b_vec.length_squared() {
        // skew edges: the contact point is the point on a's edge closest
        // to b's edge
        let diff = (b_surface.vertex1 - a_surface.vertex1).cross(b_vec);
        let t = cross.dot(diff).clamp(0.0, l2) / l2;
        let point = a_surface.vertex1 + t * a_vec;

        let diff = (b_surface.vertex1 - a_surface.vertex1).cross(a_vec);
        let s = cross.dot(diff) / l2;
        let distance = (b_surface.vertex1 + s * b_vec - point).length();

        contacts.push(ContactPoint::edge_edge(
            a,
            b,
            point,
            a_vec,
            b_vec,
            b_surface.normal,
            distance,
        ));
        return;
    }

    // parallel edges: project b onto a and keep the endpoints of the
    // overlap. The normal is arbitrary for this degenerate case; use b's
    // averaged surface normal.
    let m = a_surface.vertex1.dot(a_vec);
    let inv_l2 = 1.0 / a_vec.length_squared();
    let mut t1 = inv_l2 * (b_surface.vertex1.dot(a_vec) - m);
    let mut t2 = inv_l2 * (b_surface.vertex2.dot(a_vec) - m);
    if t1 < t2 {
        std::mem::swap(&mut t1, &mut t2);
    }

    let normal = b_surface.normal;
    let s = (b_surface.vertex1.dot(b_vec) - a_surface.vertex1.dot(b_vec)) / b_vec.length_squared();
    let distance = (b_surface.vertex1 + s * b_vec - a_surface.vertex1).length();

    // t1 is the upper end after the swap; intersect [t2, t1] with [0, 1]
    let hi = t1.min(1.0);
    let lo = t2.max(0.0);
    if lo > hi {
        // projections miss a's span entirely; fall back to the nearer
        // endpoint of a
        let point = if t2 > 1.0 {
            a_surface.vertex1 + a_vec
        } else {
            a_surface.vertex1
        };
        contacts.push(ContactPoint::vertex_face(a, b, point, normal, distance));
    } else {
        contacts.push(ContactPoint::vertex_face(
            a,
            b,
            a_surface.vertex1 + hi * a_vec,
            normal,
            distance,
        ));
        contacts.push(ContactPoint::vertex_face(
            a,
            b,
            a_surface.vertex1 + lo * a_vec,
            normal,
            distance,
        ));
    }
}

/// Pick the coordinate plane most perpendicular to `normal` to reduce the
/// intersection to 2D: returns the two coordinate indices to keep and
/// whether the projected winding is flipped.
fn projection_axes(normal: Vec3) -> (usize, usize, bool) {
    if normal.x.abs() > normal.y.abs() {
        if normal.x.abs() > normal.z.abs() {
            (1, 2, normal.x < 0.0)
        } else {
            (0, 1, normal.z < 0.0)
        }
    } else if normal.y.abs() > normal.z.abs() {
        (2, 0, normal.y < 0.0)
    } else {
        (0, 1, normal.z < 0.0)
    }
}

/// 2D line through the projected edge `from -> to`: `[a, b, c]` with
/// `a*px + b*py + c == 0` and the polygon interior on the positive side
/// (negative when the projection flips the winding).
fn edge_line(from: Vec3, to: Vec3, x: usize, y: usize) -> [Real; 3] {
    let a = from[y] - to[y];
    let b = to[x] - from[x];
    let c = -(from[x] * a + from[y] * b);
    [a, b, c]
}

fn edge_polygon(
    contacts: &mut Vec<ContactPoint>,
    a: BodyId,
    b: BodyId,
    a_surface: &EdgeSurface,
    b_surface: &PolygonSurface,
) {
    let (x, y, flip) = projection_axes(b_surface.normal());

    let vertex1 = a_surface.vertex1;
    let a_vec = a_surface.vertex2 - vertex1;

    // clip the edge parameter interval against every polygon edge,
    // incrementally intersecting the per-edge intervals
    let vertices = &b_surface.vertices;
    let n = vertices.len();
    let mut t0: Real = 0.0;
    let mut t1: Real = 1.0;
    let mut i0 = 0;
    let mut i1 = 0;
    let mut j = n - 1;
    for i in 0..n {
        let edge = edge_line(vertices[j], vertices[i], x, y);
        let vn = -(edge[0] * vertex1[x] + edge[1] * vertex1[y] + edge[2]);
        let vd = edge[0] * a_vec[x] + edge[1] * a_vec[y];

        let inward = if flip { vd > 0.0 } else { vd < 0.0 };
        let outward = if flip { vd < 0.0 } else { vd > 0.0 };
        if inward {
            let t = vn / vd;
            if t > 0.0 && t < t1 {
                t1 = t;
                i1 = i;
            }
        } else if outward {
            let t = vn / vd;
            if t > t0 {
                t0 = t;
                i0 = i;
            }
        } else {
            // edge parallel to this polygon edge
            j = i;
            continue;
        }

        if t0 > t1 {
            // the interval vanished: the edge grazes past the polygon
            // boundary. Fall back to the far endpoint against this edge.
            contacts.push(ContactPoint::edge_edge(
                a,
                b,
                a_surface.vertex2,
                a_vec,
                vertices[j] - vertices[i],
                b_surface.normal(),
                b_surface.plane.distance(a_surface.vertex2),
            ));
            return;
        }
        j = i;
    }

    // up to two surviving points; an endpoint strictly inside (0, 1) means
    // the edge was cut by a polygon edge
    let point = vertex1 + t0 * a_vec;
    let distance = b_surface.plane.distance(point);
    if t0 != 0.0 {
        let b_vec = vertices[i0] - vertices[(i0 + n - 1) % n];
        contacts.push(ContactPoint::edge_edge(
            a,
            b,
            point,
            a_vec,
            b_vec,
            b_surface.normal(),
            distance,
        ));
    } else {
        contacts.push(ContactPoint::vertex_face(
            a,
            b,
            point,
            b_surface.normal(),
            distance,
        ));
    }

    if t1 != t0 {
        let point = vertex1 + t1 * a_vec;
        let distance = b_surface.plane.distance(point);
        if t1 != 1.0 {
            let b_vec = vertices[i1] - vertices[(i1 + n - 1) % n];
            contacts.push(ContactPoint::edge_edge(
                a,
                b,
                point,
                a_vec,
                b_vec,
                b_surface.normal(),
                distance,
            ));
        } else {
            contacts.push(ContactPoint::vertex_face(
                a,
                b,
                point,
                b_surface.normal(),
                distance,
            ));
        }
    }
}

/// A vertex of the working polygon during clipping, remembering where it
/// came from: an original vertex of A, an original vertex of B (clipping
/// can only introduce those on B edges), or a computed crossing.
#[derive(Debug, Clone, Copy)]
struct ClippedVertex {
    /// The edge leaving this vertex belongs to A (true) or B (false).
    a_edge: bool,
    /// Index of that edge in its source polygon.
    edge_index: usize,
    vertex: Vec3,
}

fn polygon_polygon(
    contacts: &mut Vec<ContactPoint>,
    a: BodyId,
    b: BodyId,
    a_surface: &PolygonSurface,
    b_surface: &PolygonSurface,
) {
    let (x, y, flip) = projection_axes(b_surface.normal());

    let a_vertices = &a_surface.vertices;
    let b_vertices = &b_surface.vertices;
    let an = a_vertices.len();
    let bn = b_vertices.len();

    // Sutherland-Hodgman: clip A against each edge of B in turn. A's
    // vertices enter the working list reversed; the provenance bookkeeping
    // below is written against that order.
    let mut clipped: Vec<ClippedVertex> = (0..an)
        .rev()
        .map(|i| ClippedVertex {
            a_edge: true,
            edge_index: i,
            vertex: a_vertices[i],
        })
        .collect();

    let mut j = bn - 1;
    for i in 0..bn {
        if clipped.len() <= 1 {
            break;
        }
        let edge = edge_line(b_vertices[j], b_vertices[i], x, y);

        let previous = std::mem::take(&mut clipped);

        let mut k = previous.len() - 1;
        let mut vn = edge[0] * previous[k].vertex[x] + edge[1] * previous[k].vertex[y] + edge[2];
        let mut plus = (vn >= 0.0) != flip;

        for h in 0..previous.len() {
            if plus {
                clipped.push(previous[k]);
            }

            let vn_next =
                edge[0] * previous[h].vertex[x] + edge[1] * previous[h].vertex[y] + edge[2];
            let plus_next = (vn_next >= 0.0) != flip;

            if plus != plus_next {
                // the segment crosses the clip edge
                let d = previous[h].vertex - previous[k].vertex;
                let vd = edge[0] * d[x] + edge[1] * d[y];
                let t = -vn / vd;

                // skip crossings that would duplicate an endpoint already
                // kept (or about to be kept)
                if (t > 0.0 && t < 1.0) || (t == 0.0 && !plus) || (t == 1.0 && plus) {
                    let vertex = previous[k].vertex + t * d;
                    if plus_next {
                        // entering: the cut happens on the segment's own
                        // edge, so provenance carries over
                        clipped.push(ClippedVertex {
                            a_edge: previous[k].a_edge,
                            edge_index: previous[k].edge_index,
                            vertex,
                        });
                    } else {
                        // leaving: the new vertex rides on B's clip edge
                        clipped.push(ClippedVertex {
                            a_edge: false,
                            edge_index: j,
                            vertex,
                        });
                    }
                }

                plus = plus_next;
            }

            vn = vn_next;
            k = h;
        }
        j = i;
    }

    // each surviving vertex becomes a contact point; a provenance change
    // between neighbors marks an edge/edge crossing
    let n = clipped.len();
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let point = clipped[i].vertex;
        let distance = b_surface.plane.distance(point);
        if clipped[i].a_edge != clipped[j].a_edge {
            let (edge_1, edge_2) = if clipped[i].a_edge {
                (
                    b_vertices[(clipped[j].edge_index + 1) % bn] - b_vertices[clipped[j].edge_index],
                    a_vertices[(clipped[i].edge_index + an - 1) % an]
                        - a_vertices[clipped[i].edge_index],
                )
            } else {
                (
                    a_vertices[(clipped[j].edge_index + an - 1) % an]
                        - a_vertices[clipped[j].edge_index],
                    b_vertices[(clipped[i].edge_index + 1) % bn] - b_vertices[clipped[i].edge_index],
                )
            };
            contacts.push(ContactPoint::edge_edge(
                a,
                b,
                point,
                edge_1,
                edge_2,
                b_surface.normal(),
                distance,
            ));
        } else if clipped[i].a_edge {
            // an original vertex of A against B's face
            contacts.push(ContactPoint::vertex_face(
                a,
                b,
                point,
                b_surface.normal(),
                distance,
            ));
        } else {
            // an original vertex of B against A's face: swap the bodies so
            // the normal still belongs to the contact's own b side
            contacts.push(ContactPoint::vertex_face(
                b,
                a,
                point,
                a_surface.normal(),
                distance,
            ));
        }
        j = i;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::surface::ContactSurface;
    use approx::assert_relative_eq;

    fn body_pair() -> (BodyId, BodyId) {
        (BodyId::from_raw(0), BodyId::from_raw(1))
    }

    fn unit_square_at(cx: Real, cy: Real, z: Real) -> ContactSurface {
        ContactSurface::polygon(vec![
            Vec3::new(cx - 0.5, cy - 0.5, z),
            Vec3::new(cx + 0.5, cy - 0.5, z),
            Vec3::new(cx + 0.5, cy + 0.5, z),
            Vec3::new(cx - 0.5, cy + 0.5, z),
        ])
    }

    #[test]
    fn test_point_point() {
        let (a, b) = body_pair();
        let pa = ContactSurface::point(Vec3::new(0.0, 0.0, 1.0), Vec3::Z);
        let pb = ContactSurface::point(Vec3::new(0.0, 0.0, 0.9), -Vec3::Z);
        let mut contacts = Vec::new();
        intersect_surfaces(&mut contacts, a, b, &pa, &pb);
        assert_eq!(contacts.len(), 1);
        assert_relative_eq!(contacts[0].normal.z, -1.0, epsilon = 1e-12);
        assert_relative_eq!(contacts[0].distance, 0.1, epsilon = 1e-9);
    }

    #[test]
    fn test_point_polygon() {
        let (a, b) = body_pair();
        let pa = ContactSurface::point(Vec3::new(0.1, 0.2, 0.05), -Vec3::Z);
        let gb = unit_square_at(0.0, 0.0, 0.0);
        let mut contacts = Vec::new();
        intersect_surfaces(&mut contacts, a, b, &pa, &gb);
        assert_eq!(contacts.len(), 1);
        assert!(!contacts[0].is_edge_edge);
        assert_relative_eq!(contacts[0].normal.z, 1.0, epsilon = 1e-12);
        assert_relative_eq!(contacts[0].distance, 0.05, epsilon = 1e-12);
        assert_eq!(contacts[0].a, a);
    }

    #[test]
    fn test_polygon_point_mirrors_bodies() {
        let (a, b) = body_pair();
        let ga = unit_square_at(0.0, 0.0, 0.0);
        let pb = ContactSurface::point(Vec3::new(0.1, 0.2, 0.05), -Vec3::Z);
        let mut contacts = Vec::new();
        intersect_surfaces(&mut contacts, a, b, &ga, &pb);
        assert_eq!(contacts.len(), 1);
        // the point's body takes the contact's a slot
        assert_eq!(contacts[0].a, b);
        assert_eq!(contacts[0].b, a);
    }

    #[test]
    fn test_skew_edges_single_contact() {
        let (a, b) = body_pair();
        let ea = ContactSurface::edge(
            Vec3::new(-1.0, 0.0, 0.1),
            Vec3::new(1.0, 0.0, 0.1),
            Vec3::Z,
        );
        let eb = ContactSurface::edge(
            Vec3::new(0.25, -1.0, 0.0),
            Vec3::new(0.25, 1.0, 0.0),
            Vec3::Z,
        );
        let mut contacts = Vec::new();
        intersect_surfaces(&mut contacts, a, b, &ea, &eb);
        assert_eq!(contacts.len(), 1);
        assert!(contacts[0].is_edge_edge);
        assert_relative_eq!(contacts[0].point.x, 0.25, epsilon = 1e-9);
        assert_relative_eq!(contacts[0].point.z, 0.1, epsilon = 1e-9);
        assert_relative_eq!(contacts[0].distance, 0.1, epsilon = 1e-9);
    }

    #[test]
    fn test_parallel_edges_overlap_endpoints() {
        let (a, b) = body_pair();
        let ea = ContactSurface::edge(
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::Z,
        );
        let eb = ContactSurface::edge(
            Vec3::new(0.0, 0.0, 0.1),
            Vec3::new(2.0, 0.0, 0.1),
            -Vec3::Z,
        );
        let mut contacts = Vec::new();
        intersect_surfaces(&mut contacts, a, b, &ea, &eb);
        assert_eq!(contacts.len(), 2);
        let mut xs: Vec<Real> = contacts.iter().map(|c| c.point.x).collect();
        xs.sort_by(|p, q| p.partial_cmp(q).unwrap());
        assert_relative_eq!(xs[0], 0.0, epsilon = 1e-9);
        assert_relative_eq!(xs[1], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_parallel_edges_disjoint_fallback() {
        let (a, b) = body_pair();
        let ea = ContactSurface::edge(
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::Z,
        );
        let eb = ContactSurface::edge(
            Vec3::new(5.0, 0.0, 0.1),
            Vec3::new(7.0, 0.0, 0.1),
            -Vec3::Z,
        );
        let mut contacts = Vec::new();
        intersect_surfaces(&mut contacts, a, b, &ea, &eb);
        assert_eq!(contacts.len(), 1);
        assert!(!contacts[0].is_edge_edge);
    }

    #[test]
    fn test_edge_polygon_cut_both_ends() {
        let (a, b) = body_pair();
        // edge crosses the whole square: both survivors are its boundary
        let ea = ContactSurface::edge(
            Vec3::new(-2.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::Z,
        );
        let gb = unit_square_at(0.0, 0.0, 0.0);
        let mut contacts = Vec::new();
        intersect_surfaces(&mut contacts, a, b, &ea, &gb);
        assert_eq!(contacts.len(), 2);
        assert!(contacts.iter().all(|c| c.is_edge_edge));
        let mut xs: Vec<Real> = contacts.iter().map(|c| c.point.x).collect();
        xs.sort_by(|p, q| p.partial_cmp(q).unwrap());
        assert_relative_eq!(xs[0], -0.5, epsilon = 1e-9);
        assert_relative_eq!(xs[1], 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_edge_polygon_contained_edge() {
        let (a, b) = body_pair();
        // edge fully inside the square: endpoints survive as vertex/face
        let ea = ContactSurface::edge(
            Vec3::new(-0.25, 0.0, 0.0),
            Vec3::new(0.25, 0.0, 0.0),
            Vec3::Z,
        );
        let gb = unit_square_at(0.0, 0.0, 0.0);
        let mut contacts = Vec::new();
        intersect_surfaces(&mut contacts, a, b, &ea, &gb);
        assert_eq!(contacts.len(), 2);
        assert!(contacts.iter().all(|c| !c.is_edge_edge));
    }

    #[test]
    fn test_polygon_polygon_offset_squares() {
        let (a, b) = body_pair();
        let ga = unit_square_at(0.0, 0.0, 0.0);
        let gb = unit_square_at(0.5, 0.0, 0.0);
        let mut contacts = Vec::new();
        intersect_surfaces(&mut contacts, a, b, &ga, &gb);

        // the overlap is the rectangle x in [0, 0.5], y in [-0.5, 0.5].
        // B's left edge cuts A, so the two left corners are edge/edge
        // crossings; A's two right corners survive as vertex/face.
        assert_eq!(contacts.len(), 4, "overlap region has four corners");
        for contact in &contacts {
            assert!(
                (-1e-9..=0.5 + 1e-9).contains(&contact.point.x),
                "contact {:?} outside the overlap",
                contact.point
            );
            assert!(contact.point.y.abs() <= 0.5 + 1e-9);
        }
        let crossings = contacts.iter().filter(|c| c.is_edge_edge).count();
        assert_eq!(crossings, 2, "B's left edge cuts A twice");
        for contact in contacts.iter().filter(|c| c.is_edge_edge) {
            assert_relative_eq!(contact.point.x, 0.0, epsilon = 1e-9);
        }
        for contact in contacts.iter().filter(|c| !c.is_edge_edge) {
            assert_relative_eq!(contact.point.x, 0.5, epsilon = 1e-9);
            assert_eq!(contact.a, a, "A's corners keep A in the a slot");
        }
    }

    #[test]
    fn test_polygon_polygon_diagonal_offset_has_edge_crossings() {
        let (a, b) = body_pair();
        let ga = unit_square_at(0.0, 0.0, 0.0);
        let gb = unit_square_at(0.5, 0.5, 0.0);
        let mut contacts = Vec::new();
        intersect_surfaces(&mut contacts, a, b, &ga, &gb);
        // diagonally offset squares overlap in a smaller square whose
        // boundary alternates between A and B edges
        assert!(!contacts.is_empty());
        assert!(
            contacts.iter().any(|c| c.is_edge_edge),
            "diagonal overlap must produce edge/edge crossings"
        );
        for contact in &contacts {
            assert!((-1e-9..=0.5 + 1e-9).contains(&contact.point.x));
            assert!((-1e-9..=0.5 + 1e-9).contains(&contact.point.y));
        }
    }
}
