//! Coordinate reference systems available to projects.
//!
//! The catalog is fixed at compile time and materialised once on first use.
//! Geodetic entries carry a PROJ definition string; the `local` entry has no
//! real-world definition and is handled by an equirectangular approximation in
//! [`crate::projection`].

use crate::error::{CalibrationError, Result};
use crate::geometry::LengthUnit;
use once_cell::sync::Lazy;

/// Identifier of the pseudo-CRS used when a project has no national grid.
pub const LOCAL_CRS_ID: &str = "local";

/// How planar coordinates of a CRS relate to the Earth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrsKind {
    /// Real projected system described by a PROJ definition.
    Geodetic { definition: &'static str },
    /// No real coordinates; planar meters around a site anchor.
    Local,
}

/// Representation of a coordinate reference system entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinateReferenceSystem {
    pub id: &'static str,
    pub name: &'static str,
    /// ISO 3166-1 alpha-2 code, absent for global or local systems.
    pub country_code: Option<&'static str>,
    pub epsg: Option<u32>,
    pub kind: CrsKind,
    /// Unit of the planar axes.
    pub unit: LengthUnit,
}

impl CoordinateReferenceSystem {
    pub fn is_local(&self) -> bool {
        matches!(self.kind, CrsKind::Local)
    }

    /// Returns the raw PROJ definition, if any.
    pub fn definition(&self) -> Option<&'static str> {
        match self.kind {
            CrsKind::Geodetic { definition } => Some(definition),
            CrsKind::Local => None,
        }
    }

    /// Definition string suitable for `proj_create_crs_to_crs`.
    pub fn proj_definition(&self) -> Option<String> {
        self.definition().map(|d| {
            if d.contains("+type=crs") {
                d.to_string()
            } else {
                format!("{d} +type=crs")
            }
        })
    }
}

const fn geodetic(
    id: &'static str,
    name: &'static str,
    country_code: &'static str,
    epsg: u32,
    definition: &'static str,
    unit: LengthUnit,
) -> CoordinateReferenceSystem {
    CoordinateReferenceSystem {
        id,
        name,
        country_code: Some(country_code),
        epsg: Some(epsg),
        kind: CrsKind::Geodetic { definition },
        unit,
    }
}

static CATALOG: Lazy<Vec<CoordinateReferenceSystem>> = Lazy::new(|| {
    vec![
        CoordinateReferenceSystem {
            id: LOCAL_CRS_ID,
            name: "Local (no real coordinates)",
            country_code: None,
            epsg: None,
            kind: CrsKind::Local,
            unit: LengthUnit::Meters,
        },
        geodetic(
            "ee-lest97",
            "Estonian Coordinate System of 1997 (L-EST97)",
            "EE",
            3301,
            "+proj=lcc +lat_0=57.5175539305556 +lon_0=24 +lat_1=59.3333333333333 +lat_2=58 +x_0=500000 +y_0=6375000 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs",
            LengthUnit::Meters,
        ),
        geodetic(
            "lv-lks92",
            "LKS-92 / Latvia TM",
            "LV",
            3059,
            "+proj=tmerc +lat_0=0 +lon_0=24 +k=0.9996 +x_0=500000 +y_0=-6000000 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs",
            LengthUnit::Meters,
        ),
        geodetic(
            "lt-lks94",
            "LKS94 / Lithuania TM",
            "LT",
            3346,
            "+proj=tmerc +lat_0=0 +lon_0=24 +k=0.9998 +x_0=500000 +y_0=0 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs",
            LengthUnit::Meters,
        ),
        geodetic(
            "fi-tm35fin",
            "ETRS89 / TM35FIN",
            "FI",
            3067,
            "+proj=utm +zone=35 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs",
            LengthUnit::Meters,
        ),
        geodetic(
            "se-sweref99tm",
            "SWEREF99 TM",
            "SE",
            3006,
            "+proj=utm +zone=33 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs",
            LengthUnit::Meters,
        ),
        geodetic(
            "no-utm33",
            "ETRS89 / UTM zone 33N",
            "NO",
            25833,
            "+proj=utm +zone=33 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs",
            LengthUnit::Meters,
        ),
        geodetic(
            "de-utm32",
            "ETRS89 / UTM zone 32N",
            "DE",
            25832,
            "+proj=utm +zone=32 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs",
            LengthUnit::Meters,
        ),
        geodetic(
            "gb-osgb36",
            "OSGB36 / British National Grid",
            "GB",
            27700,
            "+proj=tmerc +lat_0=49 +lon_0=-2 +k=0.9996012717 +x_0=400000 +y_0=-100000 +ellps=airy +towgs84=446.448,-125.157,542.06,0.15,0.247,0.842,-20.489 +units=m +no_defs",
            LengthUnit::Meters,
        ),
        geodetic(
            "nl-rdnew",
            "Amersfoort / RD New",
            "NL",
            28992,
            "+proj=sterea +lat_0=52.1561605555556 +lon_0=5.38763888888889 +k=0.9999079 +x_0=155000 +y_0=463000 +ellps=bessel +towgs84=565.417,50.3319,465.552,-0.398957,0.343988,-1.8774,4.0725 +units=m +no_defs",
            LengthUnit::Meters,
        ),
        geodetic(
            "us-az-central-ft",
            "NAD83 / Arizona Central (ft)",
            "US",
            2223,
            "+proj=tmerc +lat_0=31 +lon_0=-111.916666666667 +k=0.9999 +x_0=213360 +y_0=0 +datum=NAD83 +units=ft +no_defs",
            LengthUnit::Feet,
        ),
        CoordinateReferenceSystem {
            id: "web-mercator",
            name: "WGS 84 / Pseudo-Mercator",
            country_code: None,
            epsg: Some(3857),
            kind: CrsKind::Geodetic {
                definition: "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +nadgrids=@null +wktext +no_defs",
            },
            unit: LengthUnit::Meters,
        },
    ]
});

/// Returns every catalog entry.
pub fn catalog() -> &'static [CoordinateReferenceSystem] {
    CATALOG.as_slice()
}

/// Finds a CRS by identifier.
pub fn find(id: &str) -> Option<&'static CoordinateReferenceSystem> {
    let id = id.trim();
    catalog().iter().find(|c| c.id.eq_ignore_ascii_case(id))
}

/// Like [`find`] but reports an unknown identifier as [`CalibrationError::UnsupportedCrs`].
pub fn lookup(id: &str) -> Result<&'static CoordinateReferenceSystem> {
    find(id).ok_or_else(|| CalibrationError::UnsupportedCrs(id.to_string()))
}

/// Finds a CRS by its EPSG code.
pub fn by_epsg(code: u32) -> Option<&'static CoordinateReferenceSystem> {
    catalog().iter().find(|c| c.epsg == Some(code))
}

/// All entries registered for a country.
pub fn for_country(code: &str) -> impl Iterator<Item = &'static CoordinateReferenceSystem> + '_ {
    catalog()
        .iter()
        .filter(move |c| c.country_code.is_some_and(|cc| cc.eq_ignore_ascii_case(code)))
}
