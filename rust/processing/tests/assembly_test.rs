// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Whole-building assembly: coordinate text in, OBJ text out.

use approx::assert_relative_eq;
use citymesh_geometry::{MeshingOptions, Polygon};
use citymesh_processing::{
    parse_ring, BuildingSurfaces, ClassifiedPolygon, MeshAssembler, ProcessingConfig,
    SchemaVersion, SemanticClass, OBJ_HEADER,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn polygon(pos_list: &str, id: &str) -> Polygon {
    Polygon::new(parse_ring([pos_list]).unwrap(), vec![]).with_id(id)
}

/// Unit cube with ground, roof and four walls
fn cube(id: &str, x0: f64) -> BuildingSurfaces {
    let x1 = x0 + 1.0;
    let surface = |class: SemanticClass, feature: &str, pos: String| {
        ClassifiedPolygon::new(polygon(&pos, &format!("{}-{}", id, feature)), class)
            .with_feature(feature)
    };
    BuildingSurfaces {
        id: Some(id.to_string()),
        surfaces: vec![
            surface(
                SemanticClass::GroundSurface,
                "ground",
                format!("{x0} 0 0 {x0} 1 0 {x1} 1 0 {x1} 0 0 {x0} 0 0"),
            ),
            surface(
                SemanticClass::RoofSurface,
                "roof",
                format!("{x0} 0 1 {x1} 0 1 {x1} 1 1 {x0} 1 1 {x0} 0 1"),
            ),
            surface(
                SemanticClass::WallSurface,
                "south",
                format!("{x0} 0 0 {x1} 0 0 {x1} 0 1 {x0} 0 1 {x0} 0 0"),
            ),
            surface(
                SemanticClass::WallSurface,
                "east",
                format!("{x1} 0 0 {x1} 1 0 {x1} 1 1 {x1} 0 1 {x1} 0 0"),
            ),
            surface(
                SemanticClass::WallSurface,
                "north",
                format!("{x1} 1 0 {x0} 1 0 {x0} 1 1 {x1} 1 1 {x1} 1 0"),
            ),
            surface(
                SemanticClass::WallSurface,
                "west",
                format!("{x0} 1 0 {x0} 0 0 {x0} 0 1 {x0} 1 1 {x0} 1 0"),
            ),
        ],
    }
}

fn obj_text(assembler: &MeshAssembler, class: SemanticClass) -> String {
    let mut out = Vec::new();
    assembler.write_obj(class, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

fn face_indices(text: &str) -> Vec<Vec<usize>> {
    text.lines()
        .filter_map(|line| line.strip_prefix("f "))
        .map(|rest| rest.split_whitespace().map(|i| i.parse().unwrap()).collect())
        .collect()
}

#[test]
fn test_cube_in_all_mesh() {
    init_tracing();
    let mut assembler = MeshAssembler::new(ProcessingConfig::default());
    let report = assembler.process_building(&cube("b1", 0.0));

    assert_eq!(report.polygons, 6);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.faces, 12);

    let text = obj_text(&assembler, SemanticClass::All);
    assert!(text.starts_with(OBJ_HEADER));

    let vertex_lines = text.lines().filter(|l| l.starts_with("v ")).count();
    assert_eq!(vertex_lines, 8);

    let faces = face_indices(&text);
    assert_eq!(faces.len(), 12);
    assert!(faces.iter().flatten().all(|&i| (1..=8).contains(&i)));

    // Vertex lines come before any face line
    let last_v = text.lines().collect::<Vec<_>>().iter().rposition(|l| l.starts_with("v ")).unwrap();
    let first_f = text.lines().position(|l| l.starts_with("f ")).unwrap();
    assert!(last_v < first_f);
}

#[test]
fn test_two_buildings_keep_separate_vertices() {
    init_tracing();
    let mut assembler = MeshAssembler::new(ProcessingConfig::default());
    assembler.process_building(&cube("b1", 0.0));
    // Shares the x = 1 wall with b1
    assembler.process_building(&cube("b2", 1.0));

    assert_eq!(assembler.vertices(SemanticClass::All).len(), 16);
    let faces = face_indices(&obj_text(&assembler, SemanticClass::All));
    assert!(faces[..12].iter().flatten().all(|&i| i <= 8));
    assert!(faces[12..].iter().flatten().all(|&i| i > 8 && i <= 16));
}

#[test]
fn test_semantic_meshes_and_groups() {
    init_tracing();
    let config = ProcessingConfig {
        semantics: true,
        group_objects: true,
        ..Default::default()
    };
    let mut assembler = MeshAssembler::new(config);
    assembler.process_building(&cube("b1", 0.0));

    let walls = obj_text(&assembler, SemanticClass::WallSurface);
    assert_eq!(face_indices(&walls).len(), 8);
    let groups: Vec<&str> = walls.lines().filter(|l| l.starts_with("o ")).collect();
    assert_eq!(groups, vec!["o b1_south", "o b1_east", "o b1_north", "o b1_west"]);

    let all = obj_text(&assembler, SemanticClass::All);
    assert!(all.contains("o b1\n"));

    let mut written = Vec::new();
    let count = assembler
        .write_all(|class| {
            written.push(class.file_suffix());
            Ok(Vec::<u8>::new())
        })
        .unwrap();
    assert_eq!(count, 4);
    assert_eq!(written, vec!["", "-GroundSurface", "-WallSurface", "-RoofSurface"]);
}

#[test]
fn test_validation_skips_bad_polygon() {
    init_tracing();
    let config = ProcessingConfig {
        meshing: MeshingOptions {
            validate: true,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut assembler = MeshAssembler::new(config);
    let mut building = cube("b1", 0.0);
    building.surfaces.push(ClassifiedPolygon::new(
        polygon("0 0 5 1 0 5 1 1 5 0 0 5", "triangle"),
        SemanticClass::RoofSurface,
    ));
    building.surfaces.push(ClassifiedPolygon::new(
        polygon("0 0 5 1 0 5 1 1 6 0 1 5", "open-ring"),
        SemanticClass::RoofSurface,
    ));

    let report = assembler.process_building(&building);
    assert_eq!(report.polygons, 8);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.faces, 13);
}

#[test]
fn test_passthrough_writes_polygon_faces() {
    init_tracing();
    let config = ProcessingConfig {
        meshing: MeshingOptions {
            skip_triangulation: true,
            ..Default::default()
        },
        parallel: false,
        ..Default::default()
    };
    let mut assembler = MeshAssembler::new(config);
    assembler.process_building(&cube("b1", 0.0));

    let faces = face_indices(&obj_text(&assembler, SemanticClass::All));
    assert_eq!(faces.len(), 6);
    assert!(faces.iter().all(|f| f.len() == 4));
    assert_eq!(faces[0], vec![1, 2, 3, 4]);
}

#[test]
fn test_translate_on_finish() {
    init_tracing();
    let config = ProcessingConfig {
        translate: true,
        ..Default::default()
    };
    let mut assembler = MeshAssembler::new(config);
    assembler.process_building(&cube("b1", 100.0));
    let summary = assembler.finish();

    assert_eq!(summary.buildings, 1);
    assert_eq!(summary.vertices, 8);
    assert_eq!(summary.faces, 12);
    let offset = summary.offset.unwrap();
    assert_relative_eq!(offset[0], 100.0, epsilon = 1e-9);
    assert_relative_eq!(offset[1], 0.0, epsilon = 1e-9);
    assert_relative_eq!(offset[2], 0.0, epsilon = 1e-9);
    assert!(assembler
        .vertices(SemanticClass::All)
        .iter()
        .all(|v| v.x > -1e-9 && v.x < 1.0 + 1e-9));
}

#[test]
fn test_schema_driven_classification() {
    let ns = SchemaVersion::detect("{http://www.opengis.net/citygml/2.0}CityModel").namespaces();
    let class = ns.semantic_class(&ns.bldg_tag("WallSurface")).unwrap();
    assert_eq!(class, SemanticClass::WallSurface);
    assert_eq!(class.file_suffix(), "-WallSurface");
}
