// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh assembly: polygons in, one indexed mesh per semantic class out
//!
//! Polygons of a building are meshed (optionally in parallel), then their
//! faces are indexed on the calling thread, in input order, into a
//! building-local vertex bucket per class. Local indices are shifted by the
//! size of the class's global bucket, and the local points are appended to
//! it once the building is done. Vertices shared between buildings are not
//! merged.

use std::io::Write;
use std::sync::Arc;

use citymesh_geometry::{
    MeshedPolygon, PlanarTriangulator, Point3, Polygon, PolygonMesher, Vector3,
};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::Serialize;
use smallvec::{smallvec, SmallVec};

use crate::config::ProcessingConfig;
use crate::error::Result;
use crate::obj::{write_obj, FaceRecord};
use crate::semantic::SemanticClass;
use crate::vertex_index::{lexicographic, VertexBucket};

/// Building polygon together with the semantic feature it belongs to
#[derive(Debug, Clone)]
pub struct ClassifiedPolygon {
    pub polygon: Polygon,
    /// Class of the enclosing boundary surface or opening (`All` when the
    /// polygon has no semantic parent)
    pub class: SemanticClass,
    /// Identifier of the enclosing semantic feature
    pub feature: Option<String>,
}

impl ClassifiedPolygon {
    pub fn new(polygon: Polygon, class: SemanticClass) -> Self {
        Self {
            polygon,
            class,
            feature: None,
        }
    }

    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.feature = Some(feature.into());
        self
    }
}

/// All polygons of one building, in document order
#[derive(Debug, Clone, Default)]
pub struct BuildingSurfaces {
    pub id: Option<String>,
    pub surfaces: Vec<ClassifiedPolygon>,
}

/// Outcome of assembling one building (or the batch of other objects)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildingReport {
    pub name: String,
    pub polygons: usize,
    /// Polygons rejected or failed, contributing no faces
    pub skipped: usize,
    /// Faces produced, counted once per polygon
    pub faces: usize,
}

/// Totals over a finished run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssemblySummary {
    pub buildings: usize,
    pub vertices: usize,
    pub faces: usize,
    /// Offset subtracted from every vertex, when translation is on
    pub offset: Option<[f64; 3]>,
}

#[derive(Debug, Clone)]
struct ClassMesh {
    vertices: VertexBucket,
    records: Vec<FaceRecord>,
}

struct Job<'a> {
    polygon: &'a Polygon,
    targets: SmallVec<[SemanticClass; 2]>,
    feature: Option<&'a str>,
}

/// Accumulates per-class meshes over a whole dataset
pub struct MeshAssembler {
    config: ProcessingConfig,
    mesher: PolygonMesher,
    meshes: Vec<ClassMesh>,
    buildings: usize,
}

impl MeshAssembler {
    pub fn new(config: ProcessingConfig) -> Self {
        let mesher = PolygonMesher::new(config.meshing);
        Self::with_mesher(config, mesher)
    }

    /// Use a different planar solver for triangulation
    pub fn with_solver(config: ProcessingConfig, solver: Arc<dyn PlanarTriangulator>) -> Self {
        let mesher = PolygonMesher::with_solver(config.meshing, solver);
        Self::with_mesher(config, mesher)
    }

    fn with_mesher(config: ProcessingConfig, mesher: PolygonMesher) -> Self {
        let meshes = SemanticClass::ALL
            .iter()
            .map(|_| ClassMesh {
                vertices: VertexBucket::with_tolerance(config.vertex_tolerance),
                records: Vec::new(),
            })
            .collect();
        Self {
            config,
            mesher,
            meshes,
            buildings: 0,
        }
    }

    #[inline]
    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    /// Number of buildings processed so far
    #[inline]
    pub fn buildings(&self) -> usize {
        self.buildings
    }

    pub fn vertices(&self, class: SemanticClass) -> &[Point3<f64>] {
        self.meshes[class.index()].vertices.points()
    }

    pub fn records(&self, class: SemanticClass) -> &[FaceRecord] {
        &self.meshes[class.index()].records
    }

    pub fn face_count(&self, class: SemanticClass) -> usize {
        self.records(class).iter().filter(|r| r.is_face()).count()
    }

    /// Classes a building polygon of `class` is written to
    fn targets(&self, class: SemanticClass) -> SmallVec<[SemanticClass; 2]> {
        let mut targets: SmallVec<[SemanticClass; 2]> = smallvec![SemanticClass::All];
        if self.config.semantics && (class.is_boundary_surface() || class.is_opening()) {
            targets.push(class);
        }
        targets
    }

    /// Mesh and index every polygon of one building.
    ///
    /// Each polygon goes to `All` and, with semantics on, to its own class.
    /// Openings are classified `Window`/`Door` by the caller and so never
    /// reach the surface class that contains them.
    pub fn process_building(&mut self, building: &BuildingSurfaces) -> BuildingReport {
        self.buildings += 1;
        let label = building
            .id
            .clone()
            .unwrap_or_else(|| self.buildings.to_string());

        if building.surfaces.is_empty() {
            tracing::info!(building = %label, "Building has no polygons");
        }

        if self.config.group_objects {
            self.meshes[SemanticClass::All.index()]
                .records
                .push(FaceRecord::Object(label.clone()));
        }

        let jobs: Vec<Job<'_>> = building
            .surfaces
            .iter()
            .map(|surface| Job {
                polygon: &surface.polygon,
                targets: self.targets(surface.class),
                feature: surface.feature.as_deref(),
            })
            .collect();

        let group_features = self.config.group_objects;
        self.assemble(&label, &jobs, group_features)
    }

    /// Mesh polygons of non-building city objects into the `Other` class
    pub fn process_others(&mut self, polygons: &[Polygon]) -> BuildingReport {
        let jobs: Vec<Job<'_>> = polygons
            .iter()
            .map(|polygon| Job {
                polygon,
                targets: smallvec![SemanticClass::Other],
                feature: None,
            })
            .collect();
        self.assemble("other", &jobs, false)
    }

    fn assemble(&mut self, label: &str, jobs: &[Job<'_>], group_features: bool) -> BuildingReport {
        let results = self.mesh_all(jobs);

        let tolerance = self.config.vertex_tolerance;
        let mut locals: FxHashMap<SemanticClass, VertexBucket> = FxHashMap::default();
        let mut current_feature: FxHashMap<SemanticClass, Option<&str>> = FxHashMap::default();
        let mut report = BuildingReport {
            name: label.to_string(),
            polygons: jobs.len(),
            ..Default::default()
        };

        for (job, result) in jobs.iter().zip(results) {
            let meshed = match result {
                Ok(meshed) => meshed,
                Err(error) => {
                    tracing::warn!(
                        building = %label,
                        polygon = %job.polygon.label(),
                        error = %error,
                        "Skipping polygon"
                    );
                    report.skipped += 1;
                    continue;
                }
            };

            if group_features {
                for &class in job.targets.iter().filter(|&&c| c != SemanticClass::All) {
                    if current_feature.get(&class) == Some(&job.feature) {
                        continue;
                    }
                    current_feature.insert(class, job.feature);
                    let name = match job.feature {
                        Some(feature) => format!("{}_{}", label, feature),
                        None => label.to_string(),
                    };
                    self.meshes[class.index()].records.push(FaceRecord::Object(name));
                }
            }

            report.faces += meshed.face_count();
            for &class in &job.targets {
                let local = locals
                    .entry(class)
                    .or_insert_with(|| VertexBucket::with_tolerance(tolerance));
                index_faces(&mut self.meshes[class.index()], local, &meshed);
            }
        }

        // Merge only after every polygon is indexed; shifts depend on it
        for (class, local) in locals {
            self.meshes[class.index()].vertices.append(local);
        }

        tracing::debug!(
            building = %label,
            polygons = report.polygons,
            skipped = report.skipped,
            faces = report.faces,
            "Building assembled"
        );

        report
    }

    fn mesh_all(&self, jobs: &[Job<'_>]) -> Vec<citymesh_geometry::Result<MeshedPolygon>> {
        let mesher = &self.mesher;
        if self.config.parallel {
            jobs.par_iter().map(|job| mesher.process(job.polygon)).collect()
        } else {
            jobs.iter().map(|job| mesher.process(job.polygon)).collect()
        }
    }

    /// Shift every vertex of every class so the lexicographically smallest
    /// vertex lands on the origin. Returns the subtracted offset.
    pub fn translate_to_origin(&mut self) -> Option<Vector3<f64>> {
        let smallest = self
            .meshes
            .iter()
            .filter_map(|mesh| mesh.vertices.min_point())
            .min_by(lexicographic)?;

        let offset = smallest.coords;
        for mesh in &mut self.meshes {
            mesh.vertices.translate(&offset);
        }

        tracing::info!(
            dx = offset.x,
            dy = offset.y,
            dz = offset.z,
            "Translated vertices to local origin"
        );
        Some(offset)
    }

    /// Apply the configured translation and report totals
    pub fn finish(&mut self) -> AssemblySummary {
        let offset = if self.config.translate {
            self.translate_to_origin().map(|v| [v.x, v.y, v.z])
        } else {
            None
        };

        let summary = AssemblySummary {
            buildings: self.buildings,
            vertices: self.vertices(SemanticClass::All).len(),
            faces: self.face_count(SemanticClass::All),
            offset,
        };

        tracing::info!(
            buildings = summary.buildings,
            vertices = summary.vertices,
            faces = summary.faces,
            "Mesh assembly complete"
        );

        summary
    }

    /// Serialize one class as OBJ
    pub fn write_obj<W: Write>(&self, class: SemanticClass, writer: &mut W) -> Result<()> {
        let mesh = &self.meshes[class.index()];
        write_obj(writer, mesh.vertices.points(), &mesh.records)?;
        Ok(())
    }

    /// Write every class that has vertices, asking `sink` for a writer per
    /// class. Returns the number of meshes written.
    pub fn write_all<W, F>(&self, mut sink: F) -> Result<usize>
    where
        W: Write,
        F: FnMut(SemanticClass) -> Result<W>,
    {
        let mut written = 0;
        for class in SemanticClass::ALL {
            if self.meshes[class.index()].vertices.is_empty() {
                continue;
            }
            let mut writer = sink(class)?;
            self.write_obj(class, &mut writer)?;
            written += 1;
        }

        tracing::info!(meshes = written, "OBJ export complete");
        Ok(written)
    }
}

/// Index the faces of one meshed polygon into `local`, appending face
/// records to the class mesh.
fn index_faces(mesh: &mut ClassMesh, local: &mut VertexBucket, meshed: &MeshedPolygon) {
    let shift = mesh.vertices.len() as u32;
    meshed.for_each_face(|face| {
        let indices: SmallVec<[u32; 4]> = face
            .iter()
            .map(|point| local.index_point(point, shift))
            .collect();
        mesh.records.push(FaceRecord::Face(indices));
    });
}
