// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Deduplicated vertex storage with stable 1-based indices
//!
//! Points are matched on a quantized key rather than on exact bit patterns,
//! so coordinates that differ only by float noise below the tolerance share
//! one index.

use std::cmp::Ordering;

use citymesh_geometry::{Point3, Vector3};
use rustc_hash::FxHashMap;

/// Default quantization step for vertex identity, in coordinate units
pub const DEFAULT_VERTEX_TOLERANCE: f64 = 1e-9;

/// One key component: a grid cell, or the exact value when the cell number
/// does not fit an `i64`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum KeyPart {
    Cell(i64),
    Exact(u64),
}

impl KeyPart {
    fn exact(v: f64) -> Self {
        // +0.0 and -0.0 share a key
        KeyPart::Exact((v + 0.0).to_bits())
    }

    fn quantized(v: f64, tolerance: f64) -> Self {
        let cell = (v / tolerance).round();
        if cell.is_finite() && cell.abs() < i64::MAX as f64 {
            KeyPart::Cell(cell as i64)
        } else {
            Self::exact(v)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct VertexKey([KeyPart; 3]);

impl VertexKey {
    fn new(p: &Point3<f64>, tolerance: f64) -> Self {
        if tolerance > 0.0 && tolerance.is_finite() {
            let q = |v: f64| KeyPart::quantized(v, tolerance);
            VertexKey([q(p.x), q(p.y), q(p.z)])
        } else {
            VertexKey([
                KeyPart::exact(p.x),
                KeyPart::exact(p.y),
                KeyPart::exact(p.z),
            ])
        }
    }
}

/// Ordered, deduplicated vertex list of one output class.
///
/// Insertion order is the on-disk vertex order.
#[derive(Debug, Clone)]
pub struct VertexBucket {
    points: Vec<Point3<f64>>,
    lookup: FxHashMap<VertexKey, u32>,
    tolerance: f64,
}

impl VertexBucket {
    pub fn new() -> Self {
        Self::with_tolerance(DEFAULT_VERTEX_TOLERANCE)
    }

    /// A non-positive tolerance switches to exact value matching
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self {
            points: Vec::new(),
            lookup: FxHashMap::default(),
            tolerance,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    #[inline]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Return the 1-based index of `point` plus `shift`, appending the point
    /// first if no matching vertex is stored yet.
    pub fn index_point(&mut self, point: &Point3<f64>, shift: u32) -> u32 {
        let key = VertexKey::new(point, self.tolerance);
        let position = match self.lookup.get(&key) {
            Some(&position) => position,
            None => {
                let position = self.points.len() as u32;
                self.points.push(*point);
                self.lookup.insert(key, position);
                position
            }
        };
        position + 1 + shift
    }

    /// 1-based index of a stored point, without inserting
    pub fn get_index(&self, point: &Point3<f64>) -> Option<u32> {
        self.lookup
            .get(&VertexKey::new(point, self.tolerance))
            .map(|&position| position + 1)
    }

    /// Append every point of `other` in order, without deduplicating against
    /// the points already stored.
    ///
    /// This is how a building-local bucket joins the global numbering: faces
    /// indexed into `other` with `shift = self.len()` stay valid.
    pub fn append(&mut self, other: VertexBucket) {
        self.points.reserve(other.points.len());
        for point in other.points {
            let position = self.points.len() as u32;
            self.lookup
                .entry(VertexKey::new(&point, self.tolerance))
                .or_insert(position);
            self.points.push(point);
        }
    }

    /// Lexicographically smallest point (x, then y, then z)
    pub fn min_point(&self) -> Option<Point3<f64>> {
        self.points.iter().copied().min_by(lexicographic)
    }

    /// Move every point by `-offset` and rebuild the lookup keys
    pub fn translate(&mut self, offset: &Vector3<f64>) {
        self.lookup.clear();
        for (position, point) in self.points.iter_mut().enumerate() {
            *point -= offset;
            self.lookup
                .entry(VertexKey::new(point, self.tolerance))
                .or_insert(position as u32);
        }
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.lookup.clear();
    }
}

impl Default for VertexBucket {
    fn default() -> Self {
        Self::new()
    }
}

/// Order points by x, then y, then z
pub fn lexicographic(a: &Point3<f64>, b: &Point3<f64>) -> Ordering {
    a.x.total_cmp(&b.x)
        .then(a.y.total_cmp(&b.y))
        .then(a.z.total_cmp(&b.z))
}
