// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Constrained polygon triangulation
//!
//! Polygons are projected to 2D, described as a vertex list with closed
//! segment chains (boundary first, then one chain per hole) and one marker
//! point inside every hole, and handed to a planar solver. The resulting
//! triangles are lifted back onto the polygon plane and re-oriented to match
//! the polygon normal.

use rustc_hash::FxHashSet;

use crate::projection::{FittedPlane, PlanarProjector};
use crate::ring::Ring;
use crate::{Error, Point2, Point3, Result, Vector3};

/// Per-axis tolerance when comparing a triangle normal with the polygon normal
pub const NORMAL_MATCH_TOLERANCE: f64 = 0.1;

/// Triangle in 3D
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub v0: Point3<f64>,
    pub v1: Point3<f64>,
    pub v2: Point3<f64>,
}

impl Triangle {
    /// Create a new triangle
    pub fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        Self { v0, v1, v2 }
    }

    /// Unit normal, `None` for collinear or coincident vertices
    pub fn normal(&self) -> Option<Vector3<f64>> {
        let n = (self.v1 - self.v0).cross(&(self.v2 - self.v0));
        let len = n.norm();
        if len > 0.0 {
            Some(n / len)
        } else {
            None
        }
    }

    /// Calculate triangle area
    pub fn area(&self) -> f64 {
        (self.v1 - self.v0).cross(&(self.v2 - self.v0)).norm() * 0.5
    }

    pub fn centroid(&self) -> Point3<f64> {
        Point3::from((self.v0.coords + self.v1.coords + self.v2.coords) / 3.0)
    }

    /// Same triangle with the opposite winding
    pub fn reversed(&self) -> Self {
        Self::new(self.v2, self.v1, self.v0)
    }

    #[inline]
    pub fn vertices(&self) -> [Point3<f64>; 3] {
        [self.v0, self.v1, self.v2]
    }
}

/// Coordinate-wise normal comparison
#[inline]
pub fn normals_match(a: &Vector3<f64>, b: &Vector3<f64>) -> bool {
    (a.x - b.x).abs() <= NORMAL_MATCH_TOLERANCE
        && (a.y - b.y).abs() <= NORMAL_MATCH_TOLERANCE
        && (a.z - b.z).abs() <= NORMAL_MATCH_TOLERANCE
}

/// 2D input of a constrained triangulation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangulationInput {
    pub vertices: Vec<Point2<f64>>,
    /// Required edges, as indices into `vertices`
    pub segments: Vec<[usize; 2]>,
    /// One point strictly inside every hole
    pub holes: Vec<Point2<f64>>,
}

impl TriangulationInput {
    /// Build the segment chains for a boundary and its holes.
    ///
    /// Rings are given open (without the closing duplicate). Holes for which
    /// no interior point exists (fewer than 3 points or zero area) are left
    /// out.
    pub fn from_rings(boundary: &[Point2<f64>], holes: &[Vec<Point2<f64>>]) -> Self {
        let total = boundary.len() + holes.iter().map(Vec::len).sum::<usize>();
        let mut input = Self {
            vertices: Vec::with_capacity(total),
            segments: Vec::with_capacity(total),
            holes: Vec::with_capacity(holes.len()),
        };

        input.push_chain(boundary);
        for hole in holes {
            match interior_point(hole) {
                Some(marker) => {
                    input.push_chain(hole);
                    input.holes.push(marker);
                }
                None => tracing::debug!(points = hole.len(), "Skipping degenerate hole"),
            }
        }

        input
    }

    fn push_chain(&mut self, points: &[Point2<f64>]) {
        let start = self.vertices.len();
        let n = points.len();
        self.vertices.extend_from_slice(points);
        for i in 0..n {
            self.segments.push([start + i, start + (i + 1) % n]);
        }
    }

    /// Vertex index ranges of the closed segment chains, boundary first
    pub fn chains(&self) -> Result<Vec<std::ops::Range<usize>>> {
        let mut chains = Vec::new();
        let mut start = 0;
        for &[from, to] in &self.segments {
            if to == from + 1 {
                continue;
            }
            if to != start || from < start {
                return Err(Error::triangulation(format!(
                    "segment {}-{} does not close a chain",
                    from, to
                )));
            }
            chains.push(start..from + 1);
            start = from + 1;
        }
        if start != self.vertices.len() {
            return Err(Error::triangulation("unterminated segment chain"));
        }
        Ok(chains)
    }

    /// Number of vertices that exactly repeat an earlier one
    pub fn duplicate_count(&self) -> usize {
        let mut seen = FxHashSet::default();
        self.vertices
            .iter()
            .filter(|p| !seen.insert((p.x.to_bits(), p.y.to_bits())))
            .count()
    }
}

/// Options passed to the planar solver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverFlags {
    /// Refuse input with coincident vertices instead of letting the solver
    /// merge them.
    pub strict: bool,
}

impl SolverFlags {
    pub const STRICT: Self = Self { strict: true };
    pub const RELAXED: Self = Self { strict: false };
}

/// Planar constrained triangulation backend
pub trait PlanarTriangulator: Send + Sync {
    /// Triangulate the region bounded by the first chain minus the hole
    /// chains. Returned triples index into `input.vertices`.
    fn triangulate(&self, input: &TriangulationInput, flags: SolverFlags) -> Result<Vec<[usize; 3]>>;
}

/// Ear-clipping solver backed by earcutr
#[derive(Debug, Clone, Copy, Default)]
pub struct EarcutTriangulator;

impl PlanarTriangulator for EarcutTriangulator {
    fn triangulate(&self, input: &TriangulationInput, flags: SolverFlags) -> Result<Vec<[usize; 3]>> {
        let chains = input.chains()?;
        let Some((boundary, hole_chains)) = chains.split_first() else {
            return Err(Error::triangulation("no boundary chain"));
        };
        if boundary.len() < 3 {
            return Err(Error::triangulation(
                "Need at least 3 points in outer boundary",
            ));
        }
        if hole_chains.len() != input.holes.len() {
            return Err(Error::triangulation(format!(
                "{} hole chains but {} hole markers",
                hole_chains.len(),
                input.holes.len()
            )));
        }
        for (chain, marker) in hole_chains.iter().zip(&input.holes) {
            if !point_in_polygon(marker, &input.vertices[chain.clone()]) {
                return Err(Error::triangulation("hole marker lies outside its hole"));
            }
        }

        if flags.strict {
            let duplicates = input.duplicate_count();
            if duplicates > 0 {
                return Err(Error::DuplicateVertices(duplicates));
            }
        }

        let outer = &input.vertices[boundary.clone()];

        // FAST PATH: Convex polygon without holes - use fan triangulation
        if hole_chains.is_empty() && is_convex(outer) {
            return Ok(fan_triangulate(outer.len()));
        }

        // Flatten vertices for earcutr, remembering where each one came from
        let mut index_map: Vec<usize> = boundary.clone().collect();
        let mut hole_indices = Vec::with_capacity(hole_chains.len());
        for chain in hole_chains.iter().filter(|c| c.len() >= 3) {
            hole_indices.push(index_map.len());
            index_map.extend(chain.clone());
        }

        let mut vertices = Vec::with_capacity(index_map.len() * 2);
        for &i in &index_map {
            vertices.push(input.vertices[i].x);
            vertices.push(input.vertices[i].y);
        }

        let indices = earcutr::earcut(&vertices, &hole_indices, 2)
            .map_err(|e| Error::triangulation(format!("{:?}", e)))?;

        Ok(indices
            .chunks_exact(3)
            .map(|t| [index_map[t[0]], index_map[t[1]], index_map[t[2]]])
            .collect())
    }
}

/// Check if a polygon is strictly convex (all cross products non-zero with the same sign)
#[inline]
fn is_convex(points: &[Point2<f64>]) -> bool {
    if points.len() < 3 {
        return false;
    }

    let n = points.len();
    let mut sign = 0i8;

    for i in 0..n {
        let p0 = &points[i];
        let p1 = &points[(i + 1) % n];
        let p2 = &points[(i + 2) % n];

        // Cross product of edges
        let cross = (p1.x - p0.x) * (p2.y - p1.y) - (p1.y - p0.y) * (p2.x - p1.x);

        if cross.abs() <= 1e-12 {
            return false;
        }
        let current_sign = if cross > 0.0 { 1i8 } else { -1i8 };
        if sign == 0 {
            sign = current_sign;
        } else if sign != current_sign {
            return false;
        }
    }

    true
}

/// Simple fan triangulation for convex polygons
#[inline]
fn fan_triangulate(n: usize) -> Vec<[usize; 3]> {
    (1..n - 1).map(|i| [0, i, i + 1]).collect()
}

/// Even-odd point-in-polygon test on an open ring
pub fn point_in_polygon(p: &Point2<f64>, ring: &[Point2<f64>]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (&ring[i], &ring[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Area-weighted centroid of an open ring, `None` for zero area
pub fn area_centroid(ring: &[Point2<f64>]) -> Option<Point2<f64>> {
    let n = ring.len();
    if n < 3 {
        return None;
    }
    let mut area2 = 0.0;
    let (mut cx, mut cy) = (0.0, 0.0);
    for i in 0..n {
        let a = &ring[i];
        let b = &ring[(i + 1) % n];
        let cross = a.x * b.y - b.x * a.y;
        area2 += cross;
        cx += (a.x + b.x) * cross;
        cy += (a.y + b.y) * cross;
    }
    if area2 == 0.0 {
        return None;
    }
    Some(Point2::new(cx / (3.0 * area2), cy / (3.0 * area2)))
}

fn distance_to_boundary(p: &Point2<f64>, ring: &[Point2<f64>]) -> f64 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let a = ring[i];
            let b = ring[(i + 1) % n];
            let ab = b - a;
            let len2 = ab.norm_squared();
            let t = if len2 > 0.0 {
                ((p - a).dot(&ab) / len2).clamp(0.0, 1.0)
            } else {
                0.0
            };
            (p - (a + ab * t)).norm()
        })
        .fold(f64::INFINITY, f64::min)
}

/// A point strictly inside a simple open ring.
///
/// The area-weighted centroid is used when it falls inside; otherwise a
/// horizontal scan line between two vertex heights is intersected with the
/// ring and the middle of the widest inside span is taken.
pub fn interior_point(ring: &[Point2<f64>]) -> Option<Point2<f64>> {
    let centroid = area_centroid(ring)?;

    let (min, max) = ring.iter().fold(
        (Point2::new(f64::MAX, f64::MAX), Point2::new(f64::MIN, f64::MIN)),
        |(lo, hi), p| {
            (
                Point2::new(lo.x.min(p.x), lo.y.min(p.y)),
                Point2::new(hi.x.max(p.x), hi.y.max(p.y)),
            )
        },
    );
    let eps = (max - min).norm() * 1e-9;

    if point_in_polygon(&centroid, ring) && distance_to_boundary(&centroid, ring) > eps {
        return Some(centroid);
    }

    let mut heights: Vec<f64> = ring.iter().map(|p| p.y).collect();
    heights.sort_by(f64::total_cmp);
    heights.dedup();
    let (lo, hi) = heights
        .windows(2)
        .map(|w| (w[0], w[1]))
        .max_by(|a, b| (a.1 - a.0).total_cmp(&(b.1 - b.0)))?;
    let y = (lo + hi) * 0.5;

    let n = ring.len();
    let mut crossings: Vec<f64> = (0..n)
        .filter_map(|i| {
            let a = &ring[i];
            let b = &ring[(i + 1) % n];
            ((a.y > y) != (b.y > y)).then(|| a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y))
        })
        .collect();
    crossings.sort_by(f64::total_cmp);

    crossings
        .chunks_exact(2)
        .max_by(|a, b| (a[1] - a[0]).total_cmp(&(b[1] - b[0])))
        .map(|span| Point2::new((span[0] + span[1]) * 0.5, y))
}

/// Triangulate a polygon with the default solver
pub fn triangulate_polygon(exterior: &Ring, holes: &[Ring]) -> Result<Vec<Triangle>> {
    triangulate_polygon_with(&EarcutTriangulator, exterior, holes)
}

/// Triangulate a closed exterior ring with closed hole rings.
///
/// Triangles are returned in 3D, lifted onto the plane fitted to the
/// exterior, with the winding of the exterior ring. Degenerate triangles
/// are dropped.
pub fn triangulate_polygon_with<T: PlanarTriangulator + ?Sized>(
    solver: &T,
    exterior: &Ring,
    holes: &[Ring],
) -> Result<Vec<Triangle>> {
    let outer = exterior.open_points();
    if outer.len() < 3 {
        return Err(Error::triangulation(
            "Need at least 3 points to triangulate",
        ));
    }

    let plane = FittedPlane::fit(outer)?;

    let mut all_points: Vec<Point3<f64>> = outer.to_vec();
    for hole in holes {
        all_points.extend_from_slice(hole.open_points());
    }
    let projector = PlanarProjector::new(plane, &all_points);

    let outer_2d = projector.project_all(outer);
    let holes_2d: Vec<Vec<Point2<f64>>> = holes
        .iter()
        .map(|hole| projector.project_all(hole.open_points()))
        .collect();
    let input = TriangulationInput::from_rings(&outer_2d, &holes_2d);

    let indices = match solver.triangulate(&input, SolverFlags::STRICT) {
        Err(Error::DuplicateVertices(count)) => {
            tracing::debug!(duplicates = count, "Retrying triangulation with relaxed solver flags");
            solver.triangulate(&input, SolverFlags::RELAXED)?
        }
        result => result?,
    };

    let mut triangles = Vec::with_capacity(indices.len());
    for [a, b, c] in indices {
        let triangle = Triangle::new(
            projector.lift(&input.vertices[a]),
            projector.lift(&input.vertices[b]),
            projector.lift(&input.vertices[c]),
        );
        let Some(normal) = triangle.normal() else {
            continue;
        };
        if normals_match(&plane.normal, &normal) {
            triangles.push(triangle);
        } else {
            triangles.push(triangle.reversed());
        }
    }

    Ok(triangles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square_2d(min: f64, max: f64) -> Vec<Point2<f64>> {
        vec![
            Point2::new(min, min),
            Point2::new(max, min),
            Point2::new(max, max),
            Point2::new(min, max),
        ]
    }

    #[test]
    fn test_input_segments_and_markers() {
        let input = TriangulationInput::from_rings(&square_2d(0.0, 4.0), &[square_2d(1.0, 3.0)]);

        assert_eq!(input.vertices.len(), 8);
        assert_eq!(
            input.segments,
            vec![
                [0, 1],
                [1, 2],
                [2, 3],
                [3, 0],
                [4, 5],
                [5, 6],
                [6, 7],
                [7, 4]
            ]
        );
        assert_eq!(input.holes.len(), 1);
        assert_relative_eq!(input.holes[0], Point2::new(2.0, 2.0), epsilon = 1e-12);
        assert_eq!(input.chains().unwrap(), vec![0..4, 4..8]);
    }

    #[test]
    fn test_triangulate_square() {
        let input = TriangulationInput::from_rings(&square_2d(0.0, 1.0), &[]);
        let triangles = EarcutTriangulator
            .triangulate(&input, SolverFlags::STRICT)
            .unwrap();

        // Square should be split into 2 triangles
        assert_eq!(triangles.len(), 2);
    }

    #[test]
    fn test_triangulate_insufficient_points() {
        let input = TriangulationInput::from_rings(&[Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)], &[]);
        let result = EarcutTriangulator.triangulate(&input, SolverFlags::STRICT);
        assert!(result.is_err());
    }

    #[test]
    fn test_strict_flags_reject_duplicates() {
        let mut boundary = square_2d(0.0, 4.0);
        boundary.insert(2, Point2::new(4.0, 0.0));
        let input = TriangulationInput::from_rings(&boundary, &[]);

        assert_eq!(input.duplicate_count(), 1);
        assert!(matches!(
            EarcutTriangulator.triangulate(&input, SolverFlags::STRICT),
            Err(Error::DuplicateVertices(1))
        ));
        let relaxed = EarcutTriangulator
            .triangulate(&input, SolverFlags::RELAXED)
            .unwrap();
        assert!(!relaxed.is_empty());
    }

    #[test]
    fn test_marker_outside_hole_is_rejected() {
        let mut input = TriangulationInput::from_rings(&square_2d(0.0, 4.0), &[square_2d(1.0, 2.0)]);
        input.holes[0] = Point2::new(3.5, 3.5);
        let result = EarcutTriangulator.triangulate(&input, SolverFlags::STRICT);
        assert!(matches!(result, Err(Error::TriangulationFailure(_))));
    }

    #[test]
    fn test_interior_point_concave_hole() {
        // U shape: the centroid falls into the notch, outside the ring
        let ring = vec![
            Point2::new(0.0, 0.0),
            Point2::new(3.0, 0.0),
            Point2::new(3.0, 3.0),
            Point2::new(2.0, 3.0),
            Point2::new(2.0, 1.0),
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 3.0),
            Point2::new(0.0, 3.0),
        ];
        let centroid = area_centroid(&ring).unwrap();
        assert!(!point_in_polygon(&centroid, &ring) || distance_to_boundary(&centroid, &ring) < 0.5);

        let marker = interior_point(&ring).unwrap();
        assert!(point_in_polygon(&marker, &ring));
        assert!(distance_to_boundary(&marker, &ring) > 1e-6);
    }

    #[test]
    fn test_interior_point_degenerate() {
        let ring = vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(2.0, 0.0)];
        assert!(interior_point(&ring).is_none());
    }

    #[test]
    fn test_triangulate_sloped_quad_orientation() {
        let exterior = Ring::from_coords(&[
            [0.0, 0.0, 0.0],
            [4.0, 0.0, 0.0],
            [4.0, 4.0, 2.0],
            [0.0, 4.0, 2.0],
            [0.0, 0.0, 0.0],
        ]);
        let triangles = triangulate_polygon(&exterior, &[]).unwrap();
        assert_eq!(triangles.len(), 2);

        let expected = exterior.unit_normal().unwrap();
        for t in &triangles {
            assert!(normals_match(&t.normal().unwrap(), &expected));
        }
        let area: f64 = triangles.iter().map(Triangle::area).sum();
        assert_relative_eq!(area, exterior.area(), epsilon = 1e-9);
    }

    #[test]
    fn test_triangulate_clockwise_wall() {
        // Wall in the y = 2 plane, wound so its normal points to +y
        let exterior = Ring::from_coords(&[
            [0.0, 2.0, 0.0],
            [0.0, 2.0, 3.0],
            [5.0, 2.0, 3.0],
            [5.0, 2.0, 0.0],
            [0.0, 2.0, 0.0],
        ]);
        let expected = exterior.unit_normal().unwrap();
        let triangles = triangulate_polygon(&exterior, &[]).unwrap();
        assert_eq!(triangles.len(), 2);
        for t in &triangles {
            assert!(normals_match(&t.normal().unwrap(), &expected));
            for v in t.vertices() {
                assert_relative_eq!(v.y, 2.0, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_triangulate_collinear_exterior_fails() {
        let exterior = Ring::from_coords(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [2.0, 0.0, 0.0],
            [0.0, 0.0, 0.0],
        ]);
        assert!(matches!(
            triangulate_polygon(&exterior, &[]),
            Err(Error::DegenerateNormal(_))
        ));
    }
}
