// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Helpers for readers feeding polygons into the assembler
//!
//! Coordinate text decoding for `gml:posList` / `gml:pos` and the CityGML
//! namespace table for each schema version. The namespace table is a plain
//! value handed to whoever resolves element names.

use citymesh_geometry::{Point3, Ring};

use crate::error::{Error, Result};
use crate::semantic::SemanticClass;

/// Decode whitespace-separated `x y z` triples
pub fn parse_pos_list(text: &str) -> Result<Vec<Point3<f64>>> {
    let values = text
        .split_whitespace()
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|_| Error::InvalidPosList(format!("'{}' is not a number", token)))
        })
        .collect::<Result<Vec<f64>>>()?;

    if values.len() % 3 != 0 {
        return Err(Error::InvalidPosList(format!(
            "{} values is not a multiple of 3",
            values.len()
        )));
    }

    Ok(values
        .chunks_exact(3)
        .map(|c| Point3::new(c[0], c[1], c[2]))
        .collect())
}

/// Decode a ring given as one `posList` or as a sequence of `pos` texts
pub fn parse_ring<'a>(texts: impl IntoIterator<Item = &'a str>) -> Result<Ring> {
    let mut points = Vec::new();
    for text in texts {
        points.extend(parse_pos_list(text)?);
    }
    Ok(Ring::new(points))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaVersion {
    V1,
    V2,
    V3,
}

impl SchemaVersion {
    /// Detect the version from the Clark-notation tag of the root element.
    ///
    /// Anything that is not a 1.0 or 3.0 `CityModel` is read as 2.0.
    pub fn detect(root_tag: &str) -> Self {
        if root_tag == SchemaNamespaces::V1.tag(SchemaNamespaces::V1.citygml, "CityModel") {
            SchemaVersion::V1
        } else if root_tag == SchemaNamespaces::V3.tag(SchemaNamespaces::V3.citygml, "CityModel") {
            SchemaVersion::V3
        } else {
            SchemaVersion::V2
        }
    }

    pub fn namespaces(self) -> &'static SchemaNamespaces {
        match self {
            SchemaVersion::V1 => &SchemaNamespaces::V1,
            SchemaVersion::V2 => &SchemaNamespaces::V2,
            SchemaVersion::V3 => &SchemaNamespaces::V3,
        }
    }
}

/// Namespace URIs of one CityGML version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaNamespaces {
    pub version: SchemaVersion,
    pub citygml: &'static str,
    pub gml: &'static str,
    pub bldg: &'static str,
    /// Construction module, 3.0 only; boundary surfaces live here
    pub con: Option<&'static str>,
    pub tran: &'static str,
    pub veg: &'static str,
    pub gen: &'static str,
    pub dem: &'static str,
    pub frn: &'static str,
    pub tun: &'static str,
    pub wtr: &'static str,
    pub brid: &'static str,
    pub app: &'static str,
    pub xlink: &'static str,
    pub xal: &'static str,
}

impl SchemaNamespaces {
    pub const V1: SchemaNamespaces = SchemaNamespaces {
        version: SchemaVersion::V1,
        citygml: "http://www.opengis.net/citygml/1.0",
        gml: "http://www.opengis.net/gml",
        bldg: "http://www.opengis.net/citygml/building/1.0",
        con: None,
        tran: "http://www.opengis.net/citygml/transportation/1.0",
        veg: "http://www.opengis.net/citygml/vegetation/1.0",
        gen: "http://www.opengis.net/citygml/generics/1.0",
        dem: "http://www.opengis.net/citygml/relief/1.0",
        frn: "http://www.opengis.net/citygml/cityfurniture/1.0",
        tun: "http://www.opengis.net/citygml/tunnel/1.0",
        wtr: "http://www.opengis.net/citygml/waterbody/1.0",
        brid: "http://www.opengis.net/citygml/bridge/1.0",
        app: "http://www.opengis.net/citygml/appearance/1.0",
        xlink: "http://www.w3.org/1999/xlink",
        xal: "urn:oasis:names:tc:ciq:xsdschema:xAL:1.0",
    };

    pub const V2: SchemaNamespaces = SchemaNamespaces {
        version: SchemaVersion::V2,
        citygml: "http://www.opengis.net/citygml/2.0",
        gml: "http://www.opengis.net/gml",
        bldg: "http://www.opengis.net/citygml/building/2.0",
        con: None,
        tran: "http://www.opengis.net/citygml/transportation/2.0",
        veg: "http://www.opengis.net/citygml/vegetation/2.0",
        gen: "http://www.opengis.net/citygml/generics/2.0",
        dem: "http://www.opengis.net/citygml/relief/2.0",
        frn: "http://www.opengis.net/citygml/cityfurniture/2.0",
        tun: "http://www.opengis.net/citygml/tunnel/2.0",
        wtr: "http://www.opengis.net/citygml/waterbody/2.0",
        brid: "http://www.opengis.net/citygml/bridge/2.0",
        app: "http://www.opengis.net/citygml/appearance/2.0",
        xlink: "http://www.w3.org/1999/xlink",
        xal: "urn:oasis:names:tc:ciq:xsdschema:xAL:2.0",
    };

    pub const V3: SchemaNamespaces = SchemaNamespaces {
        version: SchemaVersion::V3,
        citygml: "http://www.opengis.net/citygml/3.0",
        gml: "http://www.opengis.net/gml/3.2",
        bldg: "http://www.opengis.net/citygml/building/3.0",
        con: Some("http://www.opengis.net/citygml/construction/3.0"),
        tran: "http://www.opengis.net/citygml/transportation/3.0",
        veg: "http://www.opengis.net/citygml/vegetation/3.0",
        gen: "http://www.opengis.net/citygml/generics/3.0",
        dem: "http://www.opengis.net/citygml/relief/3.0",
        frn: "http://www.opengis.net/citygml/cityfurniture/3.0",
        tun: "http://www.opengis.net/citygml/tunnel/3.0",
        wtr: "http://www.opengis.net/citygml/waterbody/3.0",
        brid: "http://www.opengis.net/citygml/bridge/3.0",
        app: "http://www.opengis.net/citygml/appearance/3.0",
        xlink: "http://www.w3.org/1999/xlink",
        xal: "urn:oasis:names:tc:ciq:xal:3",
    };

    /// Clark notation `{namespace}local`
    pub fn tag(&self, namespace: &str, local: &str) -> String {
        format!("{{{}}}{}", namespace, local)
    }

    pub fn gml_tag(&self, local: &str) -> String {
        self.tag(self.gml, local)
    }

    pub fn citygml_tag(&self, local: &str) -> String {
        self.tag(self.citygml, local)
    }

    pub fn bldg_tag(&self, local: &str) -> String {
        self.tag(self.bldg, local)
    }

    /// Semantic class of a building-module element, if it names one.
    ///
    /// `All` and `Other` are output buckets, not element names.
    pub fn semantic_class(&self, tag: &str) -> Option<SemanticClass> {
        let local = [Some(self.bldg), self.con]
            .into_iter()
            .flatten()
            .find_map(|ns| split_clark(tag).filter(|(tag_ns, _)| *tag_ns == ns))
            .map(|(_, local)| local)?;
        SemanticClass::from_name(local).filter(|class| {
            !matches!(class, SemanticClass::All | SemanticClass::Other)
        })
    }

    /// Non-building top-level city object whose polygons go to `Other`
    pub fn is_other_object(&self, tag: &str) -> bool {
        let Some((ns, local)) = split_clark(tag) else {
            return false;
        };
        [
            (self.tran, "Road"),
            (self.veg, "PlantCover"),
            (self.gen, "GenericCityObject"),
            (self.frn, "CityFurniture"),
            (self.dem, "Relief"),
            (self.tun, "Tunnel"),
            (self.wtr, "WaterBody"),
            (self.brid, "Bridge"),
        ]
        .iter()
        .any(|&(module, name)| module == ns && name == local)
    }
}

fn split_clark(tag: &str) -> Option<(&str, &str)> {
    tag.strip_prefix('{')?.split_once('}')
}
