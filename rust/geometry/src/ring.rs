// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Closed point rings
//!
//! A ring is the boundary of a polygon or of one of its holes: an ordered
//! sequence of 3D points whose last point repeats the first one.

use std::fmt;

use smallvec::SmallVec;

use crate::{Error, Point3, Result, Vector3};

/// Maximum distance (in coordinate units) a point may sit off the plane
/// spanned by the first three points of its ring.
pub const PLANARITY_TOLERANCE: f64 = 0.01;

/// Minimum point count of a valid ring: three distinct points plus the
/// closing duplicate.
pub const MIN_RING_POINTS: usize = 4;

/// Reason a ring failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingDefect {
    NotClosed,
    TooFewPoints(usize),
    NonPlanar,
    RepeatedPoints,
}

impl fmt::Display for RingDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RingDefect::NotClosed => write!(f, "first and last points do not match"),
            RingDefect::TooFewPoints(n) => {
                write!(f, "{} points, at least {} required", n, MIN_RING_POINTS)
            }
            RingDefect::NonPlanar => write!(f, "points are not planar"),
            RingDefect::RepeatedPoints => write!(f, "consecutive points are identical"),
        }
    }
}

/// Closed sequence of 3D points
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ring {
    points: Vec<Point3<f64>>,
}

impl Ring {
    pub fn new(points: Vec<Point3<f64>>) -> Self {
        Self { points }
    }

    /// Build a ring from raw coordinate triples
    pub fn from_coords(coords: &[[f64; 3]]) -> Self {
        Self {
            points: coords.iter().map(|c| Point3::new(c[0], c[1], c[2])).collect(),
        }
    }

    #[inline]
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// True when the last point repeats the first one
    #[inline]
    pub fn is_closed(&self) -> bool {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => self.points.len() > 1 && first == last,
            _ => false,
        }
    }

    /// Points without the closing duplicate
    #[inline]
    pub fn open_points(&self) -> &[Point3<f64>] {
        match self.points.split_last() {
            Some((_, body)) => body,
            None => &[],
        }
    }

    /// Remove consecutive duplicate points.
    ///
    /// The original last point is always re-appended, even when it equals the
    /// last point that survives the cleanup.
    pub fn cleaned(&self) -> Ring {
        let Some((last, body)) = self.points.split_last() else {
            return self.clone();
        };

        let mut points: Vec<Point3<f64>> = Vec::with_capacity(self.points.len());
        for p in body {
            if points.last() != Some(p) {
                points.push(*p);
            }
        }
        points.push(*last);

        Ring { points }
    }

    /// Collect every validation failure of this ring
    pub fn defects(&self) -> SmallVec<[RingDefect; 4]> {
        let mut defects = SmallVec::new();

        if !self.is_closed() {
            defects.push(RingDefect::NotClosed);
        }
        if self.points.len() < MIN_RING_POINTS {
            defects.push(RingDefect::TooFewPoints(self.points.len()));
        }
        if !self.is_planar() {
            defects.push(RingDefect::NonPlanar);
        }
        if self.points.windows(2).any(|w| w[0] == w[1]) {
            defects.push(RingDefect::RepeatedPoints);
        }

        defects
    }

    /// Check closure, point count, planarity and repeated points.
    ///
    /// With `report_errors` every defect is logged as a warning.
    pub fn is_valid(&self, report_errors: bool) -> bool {
        let defects = self.defects();
        if report_errors {
            for defect in &defects {
                tracing::warn!(%defect, "Degenerate ring");
            }
        }
        defects.is_empty()
    }

    /// Every point lies within [`PLANARITY_TOLERANCE`] of the plane through
    /// the first three points.
    pub fn is_planar(&self) -> bool {
        let Ok(normal) = self.unit_normal() else {
            return false;
        };
        let origin = self.points[0];
        self.points
            .iter()
            .skip(3)
            .all(|p| (p - origin).dot(&normal).abs() <= PLANARITY_TOLERANCE)
    }

    /// Unit normal of the plane through the first three points
    pub fn unit_normal(&self) -> Result<Vector3<f64>> {
        if self.points.len() < 3 {
            return Err(Error::degenerate(format!(
                "ring has {} points, 3 needed for a normal",
                self.points.len()
            )));
        }
        unit_normal(&self.points[0], &self.points[1], &self.points[2])
    }

    /// Area of the (planar) ring in 3D
    pub fn area(&self) -> f64 {
        let Ok(normal) = self.unit_normal() else {
            return 0.0;
        };
        let n = self.points.len();
        let mut total = Vector3::zeros();
        for i in 0..n {
            let a = self.points[i].coords;
            let b = self.points[(i + 1) % n].coords;
            total += a.cross(&b);
        }
        (total.dot(&normal) * 0.5).abs()
    }

    /// Area of the ring's footprint on the XY plane
    pub fn projected_area(&self) -> f64 {
        let flat = Ring {
            points: self.points.iter().map(|p| Point3::new(p.x, p.y, 0.0)).collect(),
        };
        flat.area()
    }
}

impl From<Vec<Point3<f64>>> for Ring {
    fn from(points: Vec<Point3<f64>>) -> Self {
        Ring::new(points)
    }
}

/// Unit normal of the plane through three points.
///
/// Fails when the points are collinear or two of them coincide.
pub fn unit_normal(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Result<Vector3<f64>> {
    let normal = (b - a).cross(&(c - a));
    let magnitude = normal.norm();
    if magnitude == 0.0 {
        return Err(Error::degenerate(
            "normal has no magnitude, points are identical or collinear",
        ));
    }
    Ok(normal / magnitude)
}

/// Azimuth and tilt (degrees) of a surface with the given normal.
///
/// Azimuth runs clockwise from north (+y) in `[0, 360)`; tilt is 0 for a flat
/// roof and 90 for a wall.
pub fn surface_angles(normal: &Vector3<f64>) -> (f64, f64) {
    let mut azimuth = 90.0 - normal.y.atan2(normal.x).to_degrees();
    if azimuth >= 360.0 {
        azimuth -= 360.0;
    } else if azimuth < 0.0 {
        azimuth += 360.0;
    }

    let t = (normal.x * normal.x + normal.y * normal.y).sqrt();
    let tilt = if t == 0.0 {
        0.0
    } else {
        90.0 - (normal.z / t).atan().to_degrees()
    };

    (azimuth, (tilt * 1000.0).round() / 1000.0)
}
