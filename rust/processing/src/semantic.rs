// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Output classes for building surfaces
//!
//! Every class owns one vertex bucket and one output mesh. `All` aggregates
//! every building polygon, `Other` collects non-building city objects.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SemanticClass {
    All,
    GroundSurface,
    WallSurface,
    RoofSurface,
    ClosureSurface,
    CeilingSurface,
    InteriorWallSurface,
    FloorSurface,
    OuterCeilingSurface,
    OuterFloorSurface,
    Door,
    Window,
    Other,
}

impl SemanticClass {
    /// Every class, in output order
    pub const ALL: [SemanticClass; 13] = [
        SemanticClass::All,
        SemanticClass::GroundSurface,
        SemanticClass::WallSurface,
        SemanticClass::RoofSurface,
        SemanticClass::ClosureSurface,
        SemanticClass::CeilingSurface,
        SemanticClass::InteriorWallSurface,
        SemanticClass::FloorSurface,
        SemanticClass::OuterCeilingSurface,
        SemanticClass::OuterFloorSurface,
        SemanticClass::Door,
        SemanticClass::Window,
        SemanticClass::Other,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SemanticClass::All => "All",
            SemanticClass::GroundSurface => "GroundSurface",
            SemanticClass::WallSurface => "WallSurface",
            SemanticClass::RoofSurface => "RoofSurface",
            SemanticClass::ClosureSurface => "ClosureSurface",
            SemanticClass::CeilingSurface => "CeilingSurface",
            SemanticClass::InteriorWallSurface => "InteriorWallSurface",
            SemanticClass::FloorSurface => "FloorSurface",
            SemanticClass::OuterCeilingSurface => "OuterCeilingSurface",
            SemanticClass::OuterFloorSurface => "OuterFloorSurface",
            SemanticClass::Door => "Door",
            SemanticClass::Window => "Window",
            SemanticClass::Other => "Other",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|class| class.name() == name)
    }

    /// Position in [`SemanticClass::ALL`]
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Suffix appended to the output file stem
    pub fn file_suffix(&self) -> String {
        match self {
            SemanticClass::All => String::new(),
            other => format!("-{}", other.name()),
        }
    }

    /// Window or door, written only to its own class
    pub fn is_opening(&self) -> bool {
        matches!(self, SemanticClass::Door | SemanticClass::Window)
    }

    /// Thematic boundary surface of a building
    pub fn is_boundary_surface(&self) -> bool {
        !matches!(
            self,
            SemanticClass::All | SemanticClass::Other | SemanticClass::Door | SemanticClass::Window
        )
    }
}

impl fmt::Display for SemanticClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SemanticClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| Error::UnknownSemanticClass(s.to_string()))
    }
}
