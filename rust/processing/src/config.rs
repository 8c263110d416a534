// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Run configuration, loadable from environment variables or JSON.

use citymesh_geometry::MeshingOptions;
use serde::{Deserialize, Serialize};

use crate::vertex_index::DEFAULT_VERTEX_TOLERANCE;

/// Mesh assembly configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Per-polygon validation and triangulation flags.
    pub meshing: MeshingOptions,
    /// Write one mesh per semantic class in addition to `All`.
    pub semantics: bool,
    /// Emit `o` object markers per building and per semantic feature.
    pub group_objects: bool,
    /// Shift all vertices so the smallest one sits at the origin.
    pub translate: bool,
    /// Triangulate the polygons of a building on the rayon pool.
    pub parallel: bool,
    /// Quantization step for vertex deduplication (0 for exact matching).
    pub vertex_tolerance: f64,
}

impl ProcessingConfig {
    /// Load configuration from `CITYMESH_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Missing or unparsable values fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let flag = |key: &str, default: bool| {
            lookup(key)
                .and_then(|value| parse_flag(&value))
                .unwrap_or(default)
        };

        Self {
            meshing: MeshingOptions {
                validate: flag("CITYMESH_VALIDATE", defaults.meshing.validate),
                skip_triangulation: flag(
                    "CITYMESH_SKIP_TRIANGULATION",
                    defaults.meshing.skip_triangulation,
                ),
            },
            semantics: flag("CITYMESH_SEMANTICS", defaults.semantics),
            group_objects: flag("CITYMESH_OBJECTS", defaults.group_objects),
            translate: flag("CITYMESH_TRANSLATE", defaults.translate),
            parallel: flag("CITYMESH_PARALLEL", defaults.parallel),
            vertex_tolerance: lookup("CITYMESH_VERTEX_TOLERANCE")
                .unwrap_or_else(|| DEFAULT_VERTEX_TOLERANCE.to_string())
                .parse()
                .ok()
                .filter(|t: &f64| t.is_finite() && *t >= 0.0)
                .unwrap_or(DEFAULT_VERTEX_TOLERANCE),
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            meshing: MeshingOptions::default(),
            semantics: false,
            group_objects: false,
            translate: false,
            parallel: true,
            vertex_tolerance: DEFAULT_VERTEX_TOLERANCE,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
