// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CityMesh Geometry Processing
//!
//! Turns planar 3D polygons (exterior ring plus holes) into triangles using
//! PCA plane fitting, an axis-dropping projection and earcutr triangulation.

pub mod error;
pub mod ring;
pub mod projection;
pub mod triangulation;
pub mod polygon;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3, Vector2, Vector3};

pub use error::{Error, Result};
pub use ring::{surface_angles, Ring, RingDefect};
pub use projection::{FittedPlane, PlanarProjector, ProjectionKind};
pub use triangulation::{
    triangulate_polygon, triangulate_polygon_with, EarcutTriangulator, PlanarTriangulator,
    SolverFlags, Triangle, TriangulationInput,
};
pub use polygon::{MeshedPolygon, MeshingOptions, Polygon, PolygonMesher};
