// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygon meshing pipeline
//!
//! One polygon at a time: clean every ring, optionally validate, then either
//! triangulate or pass the exterior through as a single polygonal face.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ring::{Ring, RingDefect, MIN_RING_POINTS};
use crate::triangulation::{triangulate_polygon_with, EarcutTriangulator, PlanarTriangulator, Triangle};
use crate::{Error, Point3, Result};

/// Planar polygon: one exterior ring and any number of holes
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polygon {
    /// Identifier declared by the source dataset, used in diagnostics
    pub id: Option<String>,
    pub exterior: Ring,
    pub interiors: Vec<Ring>,
}

impl Polygon {
    pub fn new(exterior: Ring, interiors: Vec<Ring>) -> Self {
        Self {
            id: None,
            exterior,
            interiors,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Identifier for log messages
    pub fn label(&self) -> String {
        self.id.clone().unwrap_or_else(|| "<unnamed>".to_string())
    }

    /// Exterior area minus hole areas. Rings failing validation count as zero.
    ///
    /// With `projected` the footprint area on the XY plane is returned.
    pub fn area(&self, projected: bool) -> f64 {
        let ring_area = |ring: &Ring| {
            if !ring.is_valid(false) {
                0.0
            } else if projected {
                ring.projected_area()
            } else {
                ring.area()
            }
        };
        let holes: f64 = self.interiors.iter().map(ring_area).sum();
        ring_area(&self.exterior) - holes
    }
}

/// Flags controlling the per-polygon pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshingOptions {
    /// Reject polygons whose rings fail validation
    pub validate: bool,
    /// Write the exterior ring as one face instead of triangulating
    pub skip_triangulation: bool,
}

/// Faces produced for one polygon
#[derive(Debug, Clone, PartialEq)]
pub enum MeshedPolygon {
    Triangles(Vec<Triangle>),
    /// Untriangulated exterior ring, closing point dropped
    Polygon(Vec<Point3<f64>>),
}

impl MeshedPolygon {
    pub fn face_count(&self) -> usize {
        match self {
            MeshedPolygon::Triangles(triangles) => triangles.len(),
            MeshedPolygon::Polygon(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.face_count() == 0
    }

    /// Visit the vertex loop of every face in order
    pub fn for_each_face(&self, mut f: impl FnMut(&[Point3<f64>])) {
        match self {
            MeshedPolygon::Triangles(triangles) => {
                for triangle in triangles {
                    f(&triangle.vertices());
                }
            }
            MeshedPolygon::Polygon(points) => f(points),
        }
    }
}

/// Runs the cleanup / validation / triangulation pipeline on single polygons
#[derive(Clone)]
pub struct PolygonMesher {
    options: MeshingOptions,
    solver: Arc<dyn PlanarTriangulator>,
}

impl PolygonMesher {
    /// Create a mesher with the default ear-clipping solver
    pub fn new(options: MeshingOptions) -> Self {
        Self::with_solver(options, Arc::new(EarcutTriangulator))
    }

    pub fn with_solver(options: MeshingOptions, solver: Arc<dyn PlanarTriangulator>) -> Self {
        Self { options, solver }
    }

    #[inline]
    pub fn options(&self) -> &MeshingOptions {
        &self.options
    }

    /// Mesh one polygon.
    ///
    /// Every error is local to this polygon; callers are expected to log it
    /// and continue with the next one.
    pub fn process(&self, polygon: &Polygon) -> Result<MeshedPolygon> {
        let exterior = polygon.exterior.cleaned();
        let interiors: Vec<Ring> = polygon.interiors.iter().map(Ring::cleaned).collect();

        if self.options.validate {
            let defect = first_defect(&exterior)
                .or_else(|| interiors.iter().find_map(first_defect));
            if let Some(defect) = defect {
                return Err(Error::RejectedPolygon {
                    polygon: polygon.label(),
                    defect,
                });
            }
        }

        if self.options.skip_triangulation {
            if !interiors.is_empty() {
                return Err(Error::UnsupportedPassthroughWithHoles(polygon.label()));
            }
            let mut points = exterior.open_points().to_vec();
            // A doubled closing point survives cleanup; drop its copies
            while points.len() > 1 && points.last() == points.first() {
                points.pop();
            }
            if points.len() < MIN_RING_POINTS - 1 {
                return Err(Error::RejectedPolygon {
                    polygon: polygon.label(),
                    defect: RingDefect::TooFewPoints(exterior.len()),
                });
            }
            return Ok(MeshedPolygon::Polygon(points));
        }

        let triangles = triangulate_polygon_with(self.solver.as_ref(), &exterior, &interiors)?;
        Ok(MeshedPolygon::Triangles(triangles))
    }
}

impl Default for PolygonMesher {
    fn default() -> Self {
        Self::new(MeshingOptions::default())
    }
}

fn first_defect(ring: &Ring) -> Option<RingDefect> {
    ring.defects().first().copied()
}
