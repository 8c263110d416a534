// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Plane fitting and axis-dropping projection
//!
//! A ring is flattened to 2D by dropping one coordinate axis. The dropped
//! coordinate is recovered afterwards from the fitted plane equation, except
//! for rings lying in a plane of constant x where the coordinate is simply
//! restored.

use nalgebra::{Matrix3, SymmetricEigen};

use crate::{Error, Point2, Point3, Result, Vector3};

/// Below this `|normal.z|` a plane is treated as vertical and z is kept.
pub const VERTICAL_NORMAL_THRESHOLD: f64 = 0.1;

/// Relative size of the middle PCA eigenvalue under which the points are
/// considered collinear.
const COLLINEAR_EPSILON: f64 = 1e-12;

const EIGEN_MAX_ITERATIONS: usize = 200;

/// Plane `a*x + b*y + c*z + d = 0` fitted to a point set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FittedPlane {
    /// Unit normal `(a, b, c)`, oriented along the ring's winding
    pub normal: Vector3<f64>,
    pub d: f64,
    pub centroid: Point3<f64>,
}

impl FittedPlane {
    /// Fit a plane through `points` with principal component analysis.
    ///
    /// The normal is the eigenvector of the smallest covariance eigenvalue,
    /// flipped to agree with the Newell normal of the points taken as a
    /// ring. Both a collinear point set and a zero Newell normal fail with
    /// [`Error::DegenerateNormal`].
    pub fn fit(points: &[Point3<f64>]) -> Result<Self> {
        if points.len() < 3 {
            return Err(Error::degenerate(format!(
                "at least 3 points are required to fit a plane, got {}",
                points.len()
            )));
        }

        if points.iter().any(|p| !p.coords.iter().all(|c| c.is_finite())) {
            return Err(Error::degenerate("non-finite coordinates"));
        }

        let n = points.len() as f64;
        let sum = points
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords);
        let centroid = Point3::from(sum / n);

        let mut covariance = Matrix3::<f64>::zeros();
        for p in points {
            let v = p - centroid;
            covariance += v * v.transpose();
        }
        covariance /= n;

        let eigen = SymmetricEigen::try_new(covariance, f64::EPSILON, EIGEN_MAX_ITERATIONS)
            .ok_or_else(|| Error::degenerate("plane fit did not converge"))?;
        let mut order = [0usize, 1, 2];
        order.sort_by(|&i, &j| eigen.eigenvalues[i].total_cmp(&eigen.eigenvalues[j]));

        let largest = eigen.eigenvalues[order[2]];
        let middle = eigen.eigenvalues[order[1]];
        if largest <= 0.0 || middle <= largest * COLLINEAR_EPSILON {
            return Err(Error::degenerate("points are coincident or collinear"));
        }

        let mut normal: Vector3<f64> = eigen.eigenvectors.column(order[0]).into_owned();
        normal.normalize_mut();

        let winding = newell_normal(points)?;
        if normal.dot(&winding) < 0.0 {
            normal = -normal;
        }

        let d = -normal.dot(&centroid.coords);
        Ok(Self { normal, d, centroid })
    }

    /// Coefficients `(a, b, c, d)`
    #[inline]
    pub fn coefficients(&self) -> (f64, f64, f64, f64) {
        (self.normal.x, self.normal.y, self.normal.z, self.d)
    }

    /// Signed distance of a point from the plane
    #[inline]
    pub fn distance(&self, p: &Point3<f64>) -> f64 {
        self.normal.dot(&p.coords) + self.d
    }

    /// z on the plane at (x, y)
    #[inline]
    pub fn z_at(&self, x: f64, y: f64) -> f64 {
        (-self.normal.x * x - self.normal.y * y - self.d) / self.normal.z
    }

    /// y on the plane at (x, z)
    #[inline]
    pub fn y_at(&self, x: f64, z: f64) -> f64 {
        (-self.normal.x * x - self.normal.z * z - self.d) / self.normal.y
    }

    /// x on the plane at (y, z)
    #[inline]
    pub fn x_at(&self, y: f64, z: f64) -> f64 {
        (-self.normal.y * y - self.normal.z * z - self.d) / self.normal.x
    }
}

/// Newell normal of a point loop, normalized.
///
/// Unlike the three-point cross product this does not depend on the first
/// points being well spread.
pub fn newell_normal(points: &[Point3<f64>]) -> Result<Vector3<f64>> {
    let n = points.len();
    let mut normal = Vector3::<f64>::zeros();

    for i in 0..n {
        let current = &points[i];
        let next = &points[(i + 1) % n];

        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }

    let len = normal.norm();
    if len > 0.0 {
        Ok(normal / len)
    } else {
        Err(Error::degenerate("polygon normal has no magnitude"))
    }
}

/// Coordinate dropped when projecting a vertical plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DroppedAxis {
    X,
    Y,
}

/// How a ring set is flattened to 2D
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectionKind {
    /// Every point shares the same x: project to (y, z), restore x.
    YzPlane { x: f64 },
    /// `|normal.z|` below [`VERTICAL_NORMAL_THRESHOLD`]: keep z, drop a
    /// horizontal axis and recover it from the plane.
    Vertical { dropped: DroppedAxis },
    /// Drop z and recover it from the plane.
    General,
}

/// Projects a planar ring set to 2D and lifts 2D points back onto its plane
#[derive(Debug, Clone, Copy)]
pub struct PlanarProjector {
    plane: FittedPlane,
    kind: ProjectionKind,
}

impl PlanarProjector {
    /// Classify the projection for `points` lying on `plane`
    pub fn new(plane: FittedPlane, points: &[Point3<f64>]) -> Self {
        let kind = match points.split_first() {
            Some((first, rest)) if rest.iter().all(|p| p.x == first.x) => {
                ProjectionKind::YzPlane { x: first.x }
            }
            _ if plane.normal.z.abs() < VERTICAL_NORMAL_THRESHOLD => {
                let dropped = if plane.normal.x.abs() > plane.normal.y.abs() {
                    DroppedAxis::X
                } else {
                    DroppedAxis::Y
                };
                ProjectionKind::Vertical { dropped }
            }
            _ => ProjectionKind::General,
        };

        Self { plane, kind }
    }

    #[inline]
    pub fn kind(&self) -> ProjectionKind {
        self.kind
    }

    #[inline]
    pub fn plane(&self) -> &FittedPlane {
        &self.plane
    }

    #[inline]
    pub fn project(&self, p: &Point3<f64>) -> Point2<f64> {
        match self.kind {
            ProjectionKind::YzPlane { .. } => Point2::new(p.y, p.z),
            ProjectionKind::Vertical {
                dropped: DroppedAxis::Y,
            } => Point2::new(p.x, p.z),
            ProjectionKind::Vertical {
                dropped: DroppedAxis::X,
            } => Point2::new(p.y, p.z),
            ProjectionKind::General => Point2::new(p.x, p.y),
        }
    }

    pub fn project_all(&self, points: &[Point3<f64>]) -> Vec<Point2<f64>> {
        points.iter().map(|p| self.project(p)).collect()
    }

    /// Inverse of [`project`](Self::project) onto the fitted plane
    #[inline]
    pub fn lift(&self, q: &Point2<f64>) -> Point3<f64> {
        match self.kind {
            ProjectionKind::YzPlane { x } => Point3::new(x, q.x, q.y),
            ProjectionKind::Vertical {
                dropped: DroppedAxis::Y,
            } => Point3::new(q.x, self.plane.y_at(q.x, q.y), q.y),
            ProjectionKind::Vertical {
                dropped: DroppedAxis::X,
            } => Point3::new(self.plane.x_at(q.x, q.y), q.x, q.y),
            ProjectionKind::General => Point3::new(q.x, q.y, self.plane.z_at(q.x, q.y)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pts(coords: &[[f64; 3]]) -> Vec<Point3<f64>> {
        coords.iter().map(|c| Point3::new(c[0], c[1], c[2])).collect()
    }

    #[test]
    fn test_fit_horizontal_plane() {
        let points = pts(&[[0.0, 0.0, 5.0], [4.0, 0.0, 5.0], [4.0, 4.0, 5.0], [0.0, 4.0, 5.0]]);
        let plane = FittedPlane::fit(&points).unwrap();
        assert_relative_eq!(plane.normal, Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-9);
        assert_relative_eq!(plane.d, -5.0, epsilon = 1e-9);
        assert_relative_eq!(plane.z_at(10.0, -3.0), 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_fit_follows_winding() {
        let mut points = pts(&[[0.0, 0.0, 0.0], [4.0, 0.0, 0.0], [4.0, 4.0, 0.0], [0.0, 4.0, 0.0]]);
        points.reverse();
        let plane = FittedPlane::fit(&points).unwrap();
        assert_relative_eq!(plane.normal.z, -1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_fit_ignores_collinear_leading_points() {
        // First three points are collinear; a three-point normal would fail
        let points = pts(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [2.0, 0.0, 0.0],
            [2.0, 2.0, 0.0],
            [0.0, 2.0, 0.0],
        ]);
        let plane = FittedPlane::fit(&points).unwrap();
        assert_relative_eq!(plane.normal.z, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_fit_collinear_fails() {
        let points = pts(&[[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [2.0, 2.0, 2.0]]);
        assert!(matches!(
            FittedPlane::fit(&points),
            Err(Error::DegenerateNormal(_))
        ));
    }

    #[test]
    fn test_yz_plane_projection() {
        let points = pts(&[[2.0, 0.0, 0.0], [2.0, 3.0, 0.0], [2.0, 3.0, 3.0], [2.0, 0.0, 3.0]]);
        let plane = FittedPlane::fit(&points).unwrap();
        let projector = PlanarProjector::new(plane, &points);
        assert_eq!(projector.kind(), ProjectionKind::YzPlane { x: 2.0 });

        let q = projector.project(&points[2]);
        assert_eq!(q, Point2::new(3.0, 3.0));
        assert_eq!(projector.lift(&q), points[2]);
    }

    #[test]
    fn test_vertical_projection_recovers_y() {
        // Wall along the x axis, offset in y
        let points = pts(&[[0.0, 7.0, 0.0], [5.0, 7.0, 0.0], [5.0, 7.0, 3.0], [0.0, 7.0, 3.0]]);
        let plane = FittedPlane::fit(&points).unwrap();
        let projector = PlanarProjector::new(plane, &points);
        assert_eq!(
            projector.kind(),
            ProjectionKind::Vertical {
                dropped: DroppedAxis::Y
            }
        );

        let lifted = projector.lift(&Point2::new(2.5, 1.5));
        assert_relative_eq!(lifted, Point3::new(2.5, 7.0, 1.5), epsilon = 1e-9);
    }

    #[test]
    fn test_vertical_projection_nearly_constant_x() {
        // Wall almost parallel to YZ, x drifts slightly so it is not the YZ case
        let points = pts(&[
            [1.0, 0.0, 0.0],
            [1.000001, 5.0, 0.0],
            [1.000001, 5.0, 3.0],
            [1.0, 0.0, 3.0],
        ]);
        let plane = FittedPlane::fit(&points).unwrap();
        let projector = PlanarProjector::new(plane, &points);
        assert_eq!(
            projector.kind(),
            ProjectionKind::Vertical {
                dropped: DroppedAxis::X
            }
        );
        for p in &points {
            let round_trip = projector.lift(&projector.project(p));
            assert_relative_eq!(round_trip, *p, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_general_projection_sloped_roof() {
        let points = pts(&[[0.0, 0.0, 0.0], [4.0, 0.0, 0.0], [4.0, 4.0, 2.0], [0.0, 4.0, 2.0]]);
        let plane = FittedPlane::fit(&points).unwrap();
        let projector = PlanarProjector::new(plane, &points);
        assert_eq!(projector.kind(), ProjectionKind::General);

        let lifted = projector.lift(&Point2::new(1.0, 2.0));
        assert_relative_eq!(lifted.z, 1.0, epsilon = 1e-9);
        assert_relative_eq!(plane.distance(&lifted), 0.0, epsilon = 1e-9);
    }
}
