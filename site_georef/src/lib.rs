//! Georeferencing calibration for building models placed on construction
//! sites: fits a similarity transform between the model frame and a
//! national grid from user-picked correspondence points.

pub mod crs;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod io;
pub mod model;
pub mod projection;
pub mod quality;
pub mod solver;
pub mod store;
pub mod transform;

pub use engine::{CalibrationEngine, CalibrationReport, Georeference, PointResidual, RecalcOutcome};
pub use error::{CalibrationError, DegenerateReason, StoreError};
pub use geometry::{GeoPoint, LengthUnit, Point};
pub use io::CalibrationBundle;
pub use model::{CalibrationPoint, CalibrationStatus, CaptureMethod, ProjectCoordinateSettings};
pub use quality::QualityTier;
pub use transform::SimilarityTransform;
