// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wavefront OBJ serialization

use std::io::Write;

use citymesh_geometry::Point3;
use smallvec::SmallVec;

/// Comment block at the top of every written mesh
pub const OBJ_HEADER: &str = "# Converted from CityGML to OBJ with citymesh.\n\
# Vertex indices are 1-based and local to this file.\n\
#\n";

/// One line of the face section
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaceRecord {
    /// `f i j k ...`, 1-based vertex indices
    Face(SmallVec<[u32; 4]>),
    /// `o name`, starts a named object group
    Object(String),
}

impl FaceRecord {
    #[inline]
    pub fn is_face(&self) -> bool {
        matches!(self, FaceRecord::Face(_))
    }
}

/// Write header, vertex lines, then face and object lines in order
pub fn write_obj<W: Write>(
    writer: &mut W,
    vertices: &[Point3<f64>],
    records: &[FaceRecord],
) -> std::io::Result<()> {
    writer.write_all(OBJ_HEADER.as_bytes())?;

    writeln!(writer)?;
    for v in vertices {
        writeln!(writer, "v {} {} {}", v.x, v.y, v.z)?;
    }

    writeln!(writer)?;
    for record in records {
        match record {
            FaceRecord::Face(indices) => {
                writer.write_all(b"f")?;
                for index in indices {
                    write!(writer, " {}", index)?;
                }
                writeln!(writer)?;
            }
            FaceRecord::Object(name) => writeln!(writer, "o {}", name)?,
        }
    }

    writer.flush()
}
