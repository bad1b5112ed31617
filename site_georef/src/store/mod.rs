//! Persistence boundary for calibration points and project settings.
//!
//! Every operation is atomic per record; the engine never needs a multi-record
//! transaction. `list_points` makes no ordering promise.

use crate::error::StoreError;
use crate::model::{CalibrationPoint, ProjectCoordinateSettings};

pub mod memory;
pub use memory::MemoryStore;

pub mod sqlite;
pub use sqlite::SqliteStore;

pub trait CalibrationStore {
    fn load_settings(
        &self,
        project_id: &str,
    ) -> Result<Option<ProjectCoordinateSettings>, StoreError>;

    /// Replaces the whole settings record of `settings.project_id`.
    fn save_settings(&mut self, settings: &ProjectCoordinateSettings) -> Result<(), StoreError>;

    fn list_points(&self, project_id: &str) -> Result<Vec<CalibrationPoint>, StoreError>;

    /// Looks a point up by id in any project.
    fn get_point(&self, id: &str) -> Result<Option<CalibrationPoint>, StoreError>;

    /// Inserts or replaces the point with `point.id`.
    fn upsert_point(&mut self, point: &CalibrationPoint) -> Result<(), StoreError>;

    /// Deletes a point, returning whether it existed.
    fn delete_point(&mut self, id: &str) -> Result<bool, StoreError>;
}
