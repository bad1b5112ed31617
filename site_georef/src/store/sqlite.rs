use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::CalibrationStore;
use crate::error::StoreError;
use crate::model::{CalibrationPoint, CaptureMethod, ProjectCoordinateSettings};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS coordinate_settings (
        project_id TEXT PRIMARY KEY,
        status TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        data TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS calibration_points (
        id TEXT PRIMARY KEY,
        project_id TEXT NOT NULL,
        element_id TEXT,
        label TEXT,
        model_x REAL NOT NULL,
        model_y REAL NOT NULL,
        model_z REAL,
        lat REAL NOT NULL,
        lon REAL NOT NULL,
        alt REAL,
        accuracy REAL,
        method TEXT NOT NULL,
        active INTEGER NOT NULL,
        error REAL,
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS calibration_points_project ON calibration_points (project_id);";

/// SQLite backed store. Settings are kept as a JSON document per project,
/// points as one row each.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Runs a point query with a single text parameter.
    fn query_points(
        &self,
        filter: &str,
        value: &str,
    ) -> Result<Vec<CalibrationPoint>, StoreError> {
        let sql = format!(
            "SELECT id, project_id, element_id, label, model_x, model_y, model_z, lat, lon, alt,
                    accuracy, method, active, error, created_at
             FROM calibration_points WHERE {filter} = ?1"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![value], |row| {
            Ok(PointRow {
                point: CalibrationPoint {
                    id: row.get(0)?,
                    project_id: row.get(1)?,
                    element_id: row.get(2)?,
                    label: row.get(3)?,
                    model_x: row.get(4)?,
                    model_y: row.get(5)?,
                    model_z: row.get(6)?,
                    lat: row.get(7)?,
                    lon: row.get(8)?,
                    alt: row.get(9)?,
                    accuracy: row.get(10)?,
                    method: CaptureMethod::Manual,
                    active: row.get(12)?,
                    error: row.get(13)?,
                    created_at: DateTime::<Utc>::default(),
                },
                method: row.get(11)?,
                created_at: row.get(14)?,
            })
        })?;
        let mut res = Vec::new();
        for r in rows {
            let PointRow {
                mut point,
                method,
                created_at,
            } = r?;
            point.method = method.parse().unwrap_or_else(|_| {
                log::warn!("point {} has unknown capture method '{method}'", point.id);
                CaptureMethod::Manual
            });
            point.created_at = DateTime::parse_from_rfc3339(&created_at)?.with_timezone(&Utc);
            res.push(point);
        }
        Ok(res)
    }
}

struct PointRow {
    point: CalibrationPoint,
    method: String,
    created_at: String,
}

impl CalibrationStore for SqliteStore {
    fn load_settings(
        &self,
        project_id: &str,
    ) -> Result<Option<ProjectCoordinateSettings>, StoreError> {
        let data: Option<String> = self
            .conn
            .query_row(
                "SELECT data FROM coordinate_settings WHERE project_id = ?1",
                params![project_id],
                |row| row.get(0),
            )
            .optional()?;
        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn save_settings(&mut self, settings: &ProjectCoordinateSettings) -> Result<(), StoreError> {
        let data = serde_json::to_string(settings)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO coordinate_settings (project_id, status, updated_at, data)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                settings.project_id,
                settings.status.to_string(),
                settings.updated_at.to_rfc3339(),
                data
            ],
        )?;
        Ok(())
    }

    fn list_points(&self, project_id: &str) -> Result<Vec<CalibrationPoint>, StoreError> {
        self.query_points("project_id", project_id)
    }

    fn get_point(&self, id: &str) -> Result<Option<CalibrationPoint>, StoreError> {
        Ok(self.query_points("id", id)?.into_iter().next())
    }

    fn upsert_point(&mut self, point: &CalibrationPoint) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO calibration_points (id, project_id, element_id, label,
                model_x, model_y, model_z, lat, lon, alt, accuracy, method, active, error,
                created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                point.id,
                point.project_id,
                point.element_id,
                point.label,
                point.model_x,
                point.model_y,
                point.model_z,
                point.lat,
                point.lon,
                point.alt,
                point.accuracy,
                point.method.as_str(),
                point.active,
                point.error,
                point.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn delete_point(&mut self, id: &str) -> Result<bool, StoreError> {
        let n = self
            .conn
            .execute("DELETE FROM calibration_points WHERE id = ?1", params![id])?;
        Ok(n > 0)
    }
}
