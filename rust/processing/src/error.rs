// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for mesh assembly and export
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Geometry error: {0}")]
    Geometry(#[from] citymesh_geometry::Error),

    #[error("Invalid coordinate list: {0}")]
    InvalidPosList(String),

    #[error("Unknown semantic class: {0}")]
    UnknownSemanticClass(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
