use std::collections::HashMap;

use super::CalibrationStore;
use crate::error::StoreError;
use crate::model::{CalibrationPoint, ProjectCoordinateSettings};

/// Hash map backed store; returns points in arbitrary order.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    settings: HashMap<String, ProjectCoordinateSettings>,
    points: HashMap<String, CalibrationPoint>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

}

impl CalibrationStore for MemoryStore {
    fn load_settings(
        &self,
        project_id: &str,
    ) -> Result<Option<ProjectCoordinateSettings>, StoreError> {
        Ok(self.settings.get(project_id).cloned())
    }

    fn save_settings(&mut self, settings: &ProjectCoordinateSettings) -> Result<(), StoreError> {
        self.settings
            .insert(settings.project_id.clone(), settings.clone());
        Ok(())
    }

    fn list_points(&self, project_id: &str) -> Result<Vec<CalibrationPoint>, StoreError> {
        Ok(self
            .points
            .values()
            .filter(|p| p.project_id == project_id)
            .cloned()
            .collect())
    }

    fn get_point(&self, id: &str) -> Result<Option<CalibrationPoint>, StoreError> {
        Ok(self.points.get(id).cloned())
    }

    fn upsert_point(&mut self, point: &CalibrationPoint) -> Result<(), StoreError> {
        self.points.insert(point.id.clone(), point.clone());
        Ok(())
    }

    fn delete_point(&mut self, id: &str) -> Result<bool, StoreError> {
        Ok(self.points.remove(id).is_some())
    }
}
