//! Error taxonomy shared by the calibration components.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why a point configuration cannot support a similarity solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegenerateReason {
    /// All model-side points coincide.
    CoincidentSource,
    /// All geographic-side points coincide.
    CoincidentDestination,
    /// Three or more model-side points lie on one line.
    CollinearSource,
}

impl fmt::Display for DegenerateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DegenerateReason::CoincidentSource => "all model points coincide",
            DegenerateReason::CoincidentDestination => "all geographic points coincide",
            DegenerateReason::CollinearSource => "model points are collinear",
        };
        f.write_str(s)
    }
}

/// Failures of the persistence collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("malformed record: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("at least 2 active calibration points are required, found {found}")]
    InsufficientPoints { found: usize },
    #[error("degenerate calibration geometry: {0}")]
    DegenerateGeometry(DegenerateReason),
    #[error("unsupported coordinate reference system '{0}'")]
    UnsupportedCrs(String),
    #[error("project is not calibrated")]
    NotCalibrated,
    #[error("calibration point '{0}' not found")]
    PointNotFound(String),
    #[error("calibration point '{id}' belongs to project '{project}'")]
    PointConflict { id: String, project: String },
    #[error("calibration point '{0}' has invalid coordinates")]
    InvalidPoint(String),
    #[error("projection failed: {0}")]
    Projection(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T, E = CalibrationError> = std::result::Result<T, E>;
