//! Records owned by a project: calibration points and coordinate settings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::crs::LOCAL_CRS_ID;
use crate::geometry::{GeoPoint, LengthUnit, Point};
use crate::quality::QualityTier;
use crate::transform::SimilarityTransform;

/// How the geographic side of a calibration point was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMethod {
    #[default]
    Manual,
    Averaged,
    Rtk,
}

impl CaptureMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureMethod::Manual => "manual",
            CaptureMethod::Averaged => "averaged",
            CaptureMethod::Rtk => "rtk",
        }
    }
}

impl fmt::Display for CaptureMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaptureMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "manual" => Ok(CaptureMethod::Manual),
            "averaged" => Ok(CaptureMethod::Averaged),
            "rtk" => Ok(CaptureMethod::Rtk),
            other => Err(format!("unknown capture method '{other}'")),
        }
    }
}

/// One model ↔ geographic correspondence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    pub id: String,
    pub project_id: String,
    /// Model element the point was picked on, if any.
    pub element_id: Option<String>,
    pub label: Option<String>,
    /// Model coordinates in the project's model unit.
    pub model_x: f64,
    pub model_y: f64,
    pub model_z: Option<f64>,
    pub lat: f64,
    pub lon: f64,
    pub alt: Option<f64>,
    /// Reported horizontal accuracy of the geographic position in meters.
    pub accuracy: Option<f64>,
    pub method: CaptureMethod,
    pub active: bool,
    /// Planar residual after the last successful solve, meters.
    pub error: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl CalibrationPoint {
    /// Creates an active, manually captured point with a fresh identifier.
    pub fn new(project_id: impl Into<String>, model: Point, geo: GeoPoint) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.into(),
            element_id: None,
            label: None,
            model_x: model.x,
            model_y: model.y,
            model_z: None,
            lat: geo.lat,
            lon: geo.lon,
            alt: None,
            accuracy: None,
            method: CaptureMethod::Manual,
            active: true,
            error: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_element(mut self, element_id: impl Into<String>) -> Self {
        self.element_id = Some(element_id.into());
        self
    }

    pub fn with_method(mut self, method: CaptureMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    pub fn with_heights(mut self, model_z: Option<f64>, alt: Option<f64>) -> Self {
        self.model_z = model_z;
        self.alt = alt;
        self
    }

    pub fn model_point(&self) -> Point {
        Point::new(self.model_x, self.model_y)
    }

    pub fn geo_point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }

    /// Returns true if both sides hold usable coordinates.
    pub fn is_valid(&self) -> bool {
        self.model_x.is_finite() && self.model_y.is_finite() && self.geo_point().is_valid()
    }
}

/// Calibration lifecycle of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationStatus {
    #[default]
    NotCalibrated,
    InProgress,
    Calibrated,
}

impl fmt::Display for CalibrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CalibrationStatus::NotCalibrated => "not_calibrated",
            CalibrationStatus::InProgress => "in_progress",
            CalibrationStatus::Calibrated => "calibrated",
        };
        f.write_str(s)
    }
}

/// Per-project coordinate configuration and the last solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectCoordinateSettings {
    pub project_id: String,
    pub crs_id: String,
    pub model_unit: LengthUnit,
    /// Model coordinates already are CRS planar coordinates.
    pub model_is_real_world: bool,
    pub status: CalibrationStatus,
    pub transform: Option<SimilarityTransform>,
    pub rmse: Option<f64>,
    pub max_error: Option<f64>,
    pub quality: Option<QualityTier>,
    /// Number of active points the transform was fitted on.
    pub point_count: usize,
    /// Incremented on every successful solve.
    pub generation: u64,
    pub updated_at: DateTime<Utc>,
}

impl ProjectCoordinateSettings {
    /// Settings of a project that has not been configured yet.
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            crs_id: LOCAL_CRS_ID.to_string(),
            model_unit: LengthUnit::Meters,
            model_is_real_world: false,
            status: CalibrationStatus::NotCalibrated,
            transform: None,
            rmse: None,
            max_error: None,
            quality: None,
            point_count: 0,
            generation: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn is_calibrated(&self) -> bool {
        self.status == CalibrationStatus::Calibrated && self.transform.is_some()
    }
}
