// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

use crate::ring::RingDefect;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while meshing a single polygon.
///
/// None of these are fatal to a conversion run: the caller logs them and
/// moves on to the next polygon.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Rejected polygon {polygon}: {defect}")]
    RejectedPolygon { polygon: String, defect: RingDefect },

    #[error("Degenerate normal: {0}")]
    DegenerateNormal(String),

    #[error("Triangulation failed: {0}")]
    TriangulationFailure(String),

    #[error("Duplicate input vertices: {0} coincident points")]
    DuplicateVertices(usize),

    #[error("Polygon {0} has interior rings and cannot be written untriangulated")]
    UnsupportedPassthroughWithHoles(String),
}

impl Error {
    pub fn triangulation(msg: impl Into<String>) -> Self {
        Error::TriangulationFailure(msg.into())
    }

    pub fn degenerate(msg: impl Into<String>) -> Self {
        Error::DegenerateNormal(msg.into())
    }
}
