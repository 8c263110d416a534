// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CityMesh Processing
//!
//! Per-class vertex indexing and mesh assembly on top of `citymesh-geometry`,
//! with OBJ serialization and the coordinate/namespace helpers readers need.

pub mod assembler;
pub mod config;
pub mod error;
pub mod obj;
pub mod semantic;
pub mod source;
pub mod vertex_index;

pub use assembler::{
    AssemblySummary, BuildingReport, BuildingSurfaces, ClassifiedPolygon, MeshAssembler,
};
pub use config::ProcessingConfig;
pub use error::{Error, Result};
pub use obj::{FaceRecord, OBJ_HEADER};
pub use semantic::SemanticClass;
pub use source::{parse_pos_list, parse_ring, SchemaNamespaces, SchemaVersion};
pub use vertex_index::{VertexBucket, DEFAULT_VERTEX_TOLERANCE};
