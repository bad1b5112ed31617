//! Conversion between geographic coordinates and CRS planar meters.
//!
//! Geodetic systems go through PROJ; the local pseudo-CRS uses an
//! equirectangular approximation about a caller-supplied anchor, which is only
//! adequate over site-scale distances (a few kilometres).

use std::fmt;

use proj::Proj;

use crate::crs::{self, CoordinateReferenceSystem, CrsKind};
use crate::error::{CalibrationError, Result};
use crate::geometry::{wrap_longitude, GeoPoint, Point, EARTH_RADIUS_M};

/// Geographic WGS 84 in longitude/latitude order.
const WGS84_LONLAT: &str = "+proj=longlat +datum=WGS84 +no_defs +type=crs";

enum Backend {
    Proj {
        forward: Proj,
        inverse: Proj,
        meters_per_unit: f64,
    },
    Equirectangular {
        anchor: GeoPoint,
        cos_lat: f64,
    },
}

/// Compiled conversion for one CRS.
pub struct Projection {
    crs: &'static CoordinateReferenceSystem,
    backend: Backend,
}

impl fmt::Debug for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let backend = match &self.backend {
            Backend::Proj { .. } => "proj",
            Backend::Equirectangular { .. } => "equirectangular",
        };
        f.debug_struct("Projection")
            .field("crs", &self.crs.id)
            .field("backend", &backend)
            .finish()
    }
}

impl Projection {
    /// Compiles the conversion for `crs`.
    ///
    /// `anchor` is only used by the local pseudo-CRS, where it becomes the
    /// planar origin.
    pub fn new(crs: &'static CoordinateReferenceSystem, anchor: GeoPoint) -> Result<Self> {
        let backend = match crs.kind {
            CrsKind::Local => {
                let cos_lat = anchor.lat.to_radians().cos();
                if !anchor.is_valid() || cos_lat < 1e-9 {
                    return Err(CalibrationError::Projection(format!(
                        "anchor ({}, {}) cannot be used for a local frame",
                        anchor.lat, anchor.lon
                    )));
                }
                Backend::Equirectangular { anchor, cos_lat }
            }
            CrsKind::Geodetic { .. } => {
                let definition = crs
                    .proj_definition()
                    .ok_or_else(|| CalibrationError::UnsupportedCrs(crs.id.to_string()))?;
                let forward = Proj::new_known_crs(WGS84_LONLAT, &definition, None)
                    .map_err(|e| {
                        log::warn!("PROJ rejected definition of {}: {e}", crs.id);
                        CalibrationError::UnsupportedCrs(crs.id.to_string())
                    })?;
                let inverse = Proj::new_known_crs(&definition, WGS84_LONLAT, None)
                    .map_err(|_| CalibrationError::UnsupportedCrs(crs.id.to_string()))?;
                Backend::Proj {
                    forward,
                    inverse,
                    meters_per_unit: crs.unit.meters_per_unit(),
                }
            }
        };
        Ok(Self { crs, backend })
    }

    /// Looks `crs_id` up in the catalog and compiles it.
    pub fn for_id(crs_id: &str, anchor: GeoPoint) -> Result<Self> {
        Self::new(crs::lookup(crs_id)?, anchor)
    }

    pub fn crs(&self) -> &'static CoordinateReferenceSystem {
        self.crs
    }

    /// Geographic → planar meters.
    pub fn to_planar(&self, geo: GeoPoint) -> Result<Point> {
        if !geo.is_valid() {
            return Err(CalibrationError::Projection(format!(
                "invalid geographic position ({}, {})",
                geo.lat, geo.lon
            )));
        }
        match &self.backend {
            Backend::Proj {
                forward,
                meters_per_unit,
                ..
            } => {
                let (x, y) = forward
                    .convert((geo.lon, geo.lat))
                    .map_err(|e| CalibrationError::Projection(e.to_string()))?;
                finite(Point::new(x * meters_per_unit, y * meters_per_unit))
            }
            Backend::Equirectangular { anchor, cos_lat } => {
                let d_lon = wrap_longitude(geo.lon - anchor.lon).to_radians();
                let x = EARTH_RADIUS_M * d_lon * cos_lat;
                let y = EARTH_RADIUS_M * (geo.lat - anchor.lat).to_radians();
                Ok(Point::new(x, y))
            }
        }
    }

    /// Planar meters → geographic.
    pub fn to_geographic(&self, planar: Point) -> Result<GeoPoint> {
        finite(planar)?;
        match &self.backend {
            Backend::Proj {
                inverse,
                meters_per_unit,
                ..
            } => {
                let (lon, lat) = inverse
                    .convert((planar.x / meters_per_unit, planar.y / meters_per_unit))
                    .map_err(|e| CalibrationError::Projection(e.to_string()))?;
                finite(Point::new(lon, lat)).map(|p| GeoPoint::new(p.y, p.x))
            }
            Backend::Equirectangular { anchor, cos_lat } => {
                let lat = anchor.lat + (planar.y / EARTH_RADIUS_M).to_degrees();
                let lon = anchor.lon + (planar.x / (EARTH_RADIUS_M * cos_lat)).to_degrees();
                Ok(GeoPoint::new(lat, wrap_longitude(lon)))
            }
        }
    }
}

fn finite(p: Point) -> Result<Point> {
    if p.x.is_finite() && p.y.is_finite() {
        Ok(p)
    } else {
        Err(CalibrationError::Projection(format!(
            "non-finite coordinate ({}, {})",
            p.x, p.y
        )))
    }
}

/// Converts `(lat, lon)` to planar meters of the CRS identified by `crs_id`.
pub fn to_planar(crs_id: &str, anchor: GeoPoint, lat: f64, lon: f64) -> Result<(f64, f64)> {
    let p = Projection::for_id(crs_id, anchor)?.to_planar(GeoPoint::new(lat, lon))?;
    Ok((p.x, p.y))
}

/// Converts planar meters of the CRS identified by `crs_id` to `(lat, lon)`.
pub fn to_geographic(crs_id: &str, anchor: GeoPoint, x: f64, y: f64) -> Result<(f64, f64)> {
    let g = Projection::for_id(crs_id, anchor)?.to_geographic(Point::new(x, y))?;
    Ok((g.lat, g.lon))
}
