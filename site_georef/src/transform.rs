//! 2D similarity transform between the model frame and CRS planar meters.

use serde::{Deserialize, Serialize};

use crate::geometry::{GeoPoint, Point};

/// Uniform scale, rotation and translation mapping model meters to planar
/// meters relative to [`SimilarityTransform::planar_origin`].
///
/// ```text
/// x' = a*x - b*y + tx
/// y' = b*x + a*y + ty
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityTransform {
    pub a: f64,
    pub b: f64,
    pub tx: f64,
    pub ty: f64,
    /// `sqrt(a² + b²)`.
    pub scale: f64,
    /// Counter-clockwise rotation from model X to planar east in radians.
    pub rotation: f64,
    /// Centroid of the model points the transform was fitted on.
    pub model_origin: Point,
    /// Geographic centroid of the calibration points.
    pub geo_origin: GeoPoint,
    /// `geo_origin` expressed in CRS planar meters.
    pub planar_origin: Point,
}

impl SimilarityTransform {
    /// Creates a transform from its linear parameters with empty anchors.
    pub fn from_parameters(a: f64, b: f64, tx: f64, ty: f64) -> Self {
        Self {
            a,
            b,
            tx,
            ty,
            scale: a.hypot(b),
            rotation: b.atan2(a),
            model_origin: Point::default(),
            geo_origin: GeoPoint::default(),
            planar_origin: Point::default(),
        }
    }

    /// Creates a transform from scale, rotation and translation.
    pub fn from_scale_rotation(scale: f64, rotation: f64, tx: f64, ty: f64) -> Self {
        Self::from_parameters(scale * rotation.cos(), scale * rotation.sin(), tx, ty)
    }

    /// Returns a copy carrying the given anchors.
    pub fn anchored(
        mut self,
        model_origin: Point,
        geo_origin: GeoPoint,
        planar_origin: Point,
    ) -> Self {
        self.model_origin = model_origin;
        self.geo_origin = geo_origin;
        self.planar_origin = planar_origin;
        self
    }

    /// Model meters → planar meters relative to `planar_origin`.
    pub fn apply(&self, p: Point) -> Point {
        Point::new(
            self.a * p.x - self.b * p.y + self.tx,
            self.b * p.x + self.a * p.y + self.ty,
        )
    }

    /// Planar meters relative to `planar_origin` → model meters.
    pub fn invert(&self, p: Point) -> Point {
        let det = self.a * self.a + self.b * self.b;
        let dx = p.x - self.tx;
        let dy = p.y - self.ty;
        Point::new(
            (self.a * dx + self.b * dy) / det,
            (-self.b * dx + self.a * dy) / det,
        )
    }

    /// Model meters → absolute CRS planar meters.
    pub fn model_to_planar(&self, p: Point) -> Point {
        self.apply(p) + self.planar_origin
    }

    /// Absolute CRS planar meters → model meters.
    pub fn planar_to_model(&self, p: Point) -> Point {
        self.invert(p - self.planar_origin)
    }

    /// Rotation in degrees, normalised to `[0, 360)`.
    pub fn rotation_degrees(&self) -> f64 {
        self.rotation.to_degrees().rem_euclid(360.0)
    }
}
