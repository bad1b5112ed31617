//! Geometry primitives, length units and geographic helpers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

mod point;
pub use point::{GeoPoint, Point};

/// Mean Earth radius (IUGG) in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Length units a model or a coordinate system may be expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    Millimeters,
    #[default]
    Meters,
    /// International foot, exactly 0.3048 m.
    Feet,
}

impl LengthUnit {
    /// Number of meters in one unit.
    pub fn meters_per_unit(self) -> f64 {
        match self {
            LengthUnit::Millimeters => 0.001,
            LengthUnit::Meters => 1.0,
            LengthUnit::Feet => 0.3048,
        }
    }

    pub fn to_meters(self, value: f64) -> f64 {
        value * self.meters_per_unit()
    }

    pub fn from_meters(self, value: f64) -> f64 {
        value / self.meters_per_unit()
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LengthUnit::Millimeters => "millimeters",
            LengthUnit::Meters => "meters",
            LengthUnit::Feet => "feet",
        };
        f.write_str(s)
    }
}

impl FromStr for LengthUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mm" | "millimeter" | "millimeters" => Ok(LengthUnit::Millimeters),
            "m" | "meter" | "meters" | "metre" | "metres" => Ok(LengthUnit::Meters),
            "ft" | "foot" | "feet" => Ok(LengthUnit::Feet),
            other => Err(format!("unknown length unit '{other}'")),
        }
    }
}

/// Calculates the Euclidean distance between two points.
pub fn distance(a: Point, b: Point) -> f64 {
    (b - a).norm()
}

/// Arithmetic mean of a set of points.
pub fn centroid(points: &[Point]) -> Option<Point> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let sum = points.iter().fold(Point::default(), |acc, p| acc + *p);
    Some(sum.scaled(1.0 / n))
}

/// Great-circle distance between two geographic points in meters.
pub fn haversine_distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Wraps a longitude difference into `[-180, 180)`.
pub fn wrap_longitude(delta: f64) -> f64 {
    (delta + 180.0).rem_euclid(360.0) - 180.0
}

/// Mean position of a set of geographic points.
///
/// Longitudes are averaged relative to the first point so sites straddling the
/// antimeridian stay together.
pub fn geo_centroid(points: &[GeoPoint]) -> Option<GeoPoint> {
    let first = points.first()?;
    let n = points.len() as f64;
    let lat = points.iter().map(|p| p.lat).sum::<f64>() / n;
    let d_lon = points
        .iter()
        .map(|p| wrap_longitude(p.lon - first.lon))
        .sum::<f64>()
        / n;
    Some(GeoPoint::new(lat, wrap_longitude(first.lon + d_lon)))
}
