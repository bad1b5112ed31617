//! Per-project calibration orchestration.
//!
//! The engine pulls the active calibration points from a [`CalibrationStore`],
//! projects their geographic side into the project CRS, fits a similarity
//! transform and writes the result back. Lack of calibration is a normal state
//! reported through [`RecalcOutcome`], not an error; only configuration and
//! storage failures are returned as `Err`.

use chrono::Utc;
use log::{debug, info, warn};

use crate::crs::{self, CoordinateReferenceSystem};
use crate::error::{CalibrationError, DegenerateReason, Result};
use crate::geometry::{geo_centroid, GeoPoint, LengthUnit, Point};
use crate::io::CalibrationBundle;
use crate::model::{CalibrationPoint, CalibrationStatus, ProjectCoordinateSettings};
use crate::projection::Projection;
use crate::quality::QualityTier;
use crate::solver::{self, PointPair, MIN_POINTS};
use crate::store::CalibrationStore;
use crate::transform::SimilarityTransform;

/// Residual of one calibration point after a solve.
#[derive(Debug, Clone, PartialEq)]
pub struct PointResidual {
    pub point_id: String,
    pub label: Option<String>,
    /// Planar distance in meters.
    pub residual: f64,
}

/// Summary of a successful solve.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationReport {
    pub transform: SimilarityTransform,
    pub rmse: f64,
    pub max_error: f64,
    pub quality: QualityTier,
    pub residuals: Vec<PointResidual>,
    pub generation: u64,
}

/// What a call to [`CalibrationEngine::recalculate`] achieved.
#[derive(Debug, Clone, PartialEq)]
pub enum RecalcOutcome {
    /// The model is already in real-world coordinates.
    Skipped,
    Calibrated(CalibrationReport),
    /// Fewer than two active points.
    Insufficient { active: usize },
    /// Points are active but cannot be fitted; the previous transform is kept.
    Degenerate(DegenerateReason),
}

impl RecalcOutcome {
    pub fn is_calibrated(&self) -> bool {
        matches!(self, RecalcOutcome::Calibrated(_))
    }

    /// Condition the user should be prompted about, if any.
    pub fn warning(&self) -> Option<DegenerateReason> {
        match self {
            RecalcOutcome::Degenerate(reason) => Some(*reason),
            _ => None,
        }
    }
}

/// Calibration state machine of one project.
pub struct CalibrationEngine<S: CalibrationStore> {
    store: S,
    settings: ProjectCoordinateSettings,
}

impl<S: CalibrationStore> CalibrationEngine<S> {
    /// Loads the project's settings, or starts from unconfigured defaults.
    pub fn open(project_id: impl Into<String>, store: S) -> Result<Self> {
        let project_id = project_id.into();
        let settings = match store.load_settings(&project_id)? {
            Some(settings) => settings,
            None => {
                debug!("project {project_id} has no coordinate settings yet");
                ProjectCoordinateSettings::new(project_id)
            }
        };
        Ok(Self { store, settings })
    }

    pub fn project_id(&self) -> &str {
        &self.settings.project_id
    }

    pub fn settings(&self) -> &ProjectCoordinateSettings {
        &self.settings
    }

    pub fn status(&self) -> CalibrationStatus {
        self.settings.status
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Re-reads the settings record, picking up writes made by other sessions.
    pub fn reload(&mut self) -> Result<()> {
        if let Some(settings) = self.store.load_settings(&self.settings.project_id)? {
            self.settings = settings;
        }
        Ok(())
    }

    /// The CRS selected for the project.
    pub fn crs(&self) -> Result<&'static CoordinateReferenceSystem> {
        crs::lookup(&self.settings.crs_id)
    }

    /// All points of the project ordered by creation time.
    pub fn points(&self) -> Result<Vec<CalibrationPoint>> {
        let mut points = self.store.list_points(&self.settings.project_id)?;
        points.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(points)
    }

    /// Selects the CRS and model unit, then re-solves.
    pub fn configure(
        &mut self,
        crs_id: &str,
        model_unit: LengthUnit,
        model_is_real_world: bool,
    ) -> Result<RecalcOutcome> {
        let crs = crs::lookup(crs_id)?;
        info!(
            "project {}: crs={} unit={} real_world={}",
            self.settings.project_id, crs.id, model_unit, model_is_real_world
        );
        self.settings.crs_id = crs.id.to_string();
        self.settings.model_unit = model_unit;
        self.settings.model_is_real_world = model_is_real_world;
        self.persist_settings()?;
        self.recalculate()
    }

    /// Inserts or replaces a point, then re-solves.
    pub fn add_or_update_point(&mut self, mut point: CalibrationPoint) -> Result<RecalcOutcome> {
        if !point.is_valid() {
            return Err(CalibrationError::InvalidPoint(point.id));
        }
        if let Some(stored) = self.store.get_point(&point.id)? {
            if stored.project_id != self.settings.project_id {
                return Err(CalibrationError::PointConflict {
                    id: point.id,
                    project: stored.project_id,
                });
            }
        }
        if point.project_id != self.settings.project_id {
            debug!(
                "point {} built for project {}, stored under {}",
                point.id, point.project_id, self.settings.project_id
            );
            point.project_id = self.settings.project_id.clone();
        }
        self.store.upsert_point(&point)?;
        self.recalculate()
    }

    /// Deletes a point, then re-solves.
    pub fn remove_point(&mut self, id: &str) -> Result<RecalcOutcome> {
        self.find_point(id)?;
        self.store.delete_point(id)?;
        self.recalculate()
    }

    /// Includes or excludes a point from the fit, then re-solves.
    pub fn set_point_active(&mut self, id: &str, active: bool) -> Result<RecalcOutcome> {
        let mut point = self.find_point(id)?;
        if point.active != active {
            point.active = active;
            self.store.upsert_point(&point)?;
        }
        self.recalculate()
    }

    fn find_point(&self, id: &str) -> Result<CalibrationPoint> {
        self.store
            .get_point(id)?
            .filter(|p| p.project_id == self.settings.project_id)
            .ok_or_else(|| CalibrationError::PointNotFound(id.to_string()))
    }

    /// Settings and points of the project for transfer to another store.
    pub fn export_bundle(&self) -> Result<CalibrationBundle> {
        Ok(CalibrationBundle {
            settings: self.settings.clone(),
            points: self.points()?,
        })
    }

    /// Loads a bundle into this project, then re-solves.
    ///
    /// Points keep their identifiers and are upserted; points already in the
    /// project but absent from the bundle stay. The bundle's solve results are
    /// not trusted, only its configuration.
    pub fn import_bundle(&mut self, bundle: CalibrationBundle) -> Result<RecalcOutcome> {
        let crs = crs::lookup(&bundle.settings.crs_id)?;
        for point in &bundle.points {
            if !point.is_valid() {
                return Err(CalibrationError::InvalidPoint(point.id.clone()));
            }
            if let Some(stored) = self.store.get_point(&point.id)? {
                if stored.project_id != self.settings.project_id {
                    return Err(CalibrationError::PointConflict {
                        id: point.id.clone(),
                        project: stored.project_id,
                    });
                }
            }
        }
        info!(
            "project {}: importing {} points from project {}",
            self.settings.project_id,
            bundle.points.len(),
            bundle.settings.project_id
        );
        for mut point in bundle.points {
            point.project_id = self.settings.project_id.clone();
            self.store.upsert_point(&point)?;
        }
        self.settings.crs_id = crs.id.to_string();
        self.settings.model_unit = bundle.settings.model_unit;
        self.settings.model_is_real_world = bundle.settings.model_is_real_world;
        self.persist_settings()?;
        self.recalculate()
    }

    fn persist_settings(&mut self) -> Result<()> {
        self.settings.updated_at = Utc::now();
        self.store.save_settings(&self.settings)?;
        Ok(())
    }

    fn set_status(&mut self, status: CalibrationStatus) -> Result<()> {
        if self.settings.status != status {
            info!(
                "project {}: {} -> {}",
                self.settings.project_id, self.settings.status, status
            );
        }
        self.settings.status = status;
        self.persist_settings()
    }

    /// Re-fits the transform from the currently active points.
    pub fn recalculate(&mut self) -> Result<RecalcOutcome> {
        let crs = crs::lookup(&self.settings.crs_id)?;
        if self.settings.model_is_real_world {
            debug!(
                "project {}: model is in real-world coordinates, calibration skipped",
                self.settings.project_id
            );
            return Ok(RecalcOutcome::Skipped);
        }

        let mut points = self.points()?;
        let active: Vec<&CalibrationPoint> = points.iter().filter(|p| p.active).collect();
        if active.len() < MIN_POINTS {
            let status = if points.len() >= MIN_POINTS || self.settings.transform.is_some() {
                CalibrationStatus::InProgress
            } else {
                CalibrationStatus::NotCalibrated
            };
            let found = active.len();
            self.set_status(status)?;
            return Ok(RecalcOutcome::Insufficient { active: found });
        }

        let (geo_origin, planar_origin, pairs) =
            match project_pairs(crs, self.settings.model_unit, &active) {
                Ok(projected) => projected,
                Err(e) => {
                    // A transform from another CRS or point set must not stay usable.
                    warn!(
                        "project {}: cannot project calibration points: {e}",
                        self.settings.project_id
                    );
                    self.set_status(CalibrationStatus::InProgress)?;
                    return Err(e);
                }
            };

        let fit = match solver::solve(&pairs) {
            Ok(fit) => fit,
            Err(CalibrationError::DegenerateGeometry(reason)) => {
                warn!(
                    "project {}: cannot calibrate, {reason}",
                    self.settings.project_id
                );
                self.set_status(CalibrationStatus::InProgress)?;
                return Ok(RecalcOutcome::Degenerate(reason));
            }
            Err(e) => return Err(e),
        };

        let transform = fit
            .transform
            .anchored(fit.transform.model_origin, geo_origin, planar_origin);
        let quality = QualityTier::from_rmse(fit.rmse);
        let residuals: Vec<PointResidual> = active
            .iter()
            .zip(&fit.residuals)
            .map(|(p, r)| PointResidual {
                point_id: p.id.clone(),
                label: p.label.clone(),
                residual: *r,
            })
            .collect();

        self.settings.transform = Some(transform);
        self.settings.rmse = Some(fit.rmse);
        self.settings.max_error = Some(fit.max_error);
        self.settings.quality = Some(quality);
        self.settings.point_count = active.len();
        self.settings.generation += 1;
        self.set_status(CalibrationStatus::Calibrated)?;

        for point in points.iter_mut() {
            let error = if point.active {
                residuals
                    .iter()
                    .find(|r| r.point_id == point.id)
                    .map(|r| r.residual)
            } else {
                None
            };
            if point.error != error {
                point.error = error;
                self.store.upsert_point(point)?;
            }
        }

        info!(
            "project {}: calibrated from {} points, rmse {:.3} m ({quality})",
            self.settings.project_id,
            residuals.len(),
            fit.rmse
        );
        Ok(RecalcOutcome::Calibrated(CalibrationReport {
            transform,
            rmse: fit.rmse,
            max_error: fit.max_error,
            quality,
            residuals,
            generation: self.settings.generation,
        }))
    }

    /// Report of the current calibration built from stored residuals.
    pub fn report(&self) -> Result<Option<CalibrationReport>> {
        let s = &self.settings;
        let (Some(transform), Some(rmse), Some(max_error), Some(quality)) =
            (s.transform, s.rmse, s.max_error, s.quality)
        else {
            return Ok(None);
        };
        if s.status != CalibrationStatus::Calibrated {
            return Ok(None);
        }
        let residuals = self
            .points()?
            .into_iter()
            .filter(|p| p.active)
            .filter_map(|p| {
                p.error.map(|residual| PointResidual {
                    point_id: p.id,
                    label: p.label,
                    residual,
                })
            })
            .collect();
        Ok(Some(CalibrationReport {
            transform,
            rmse,
            max_error,
            quality,
            residuals,
            generation: s.generation,
        }))
    }

    /// Snapshot for converting coordinates with the current transform.
    pub fn georeference(&self) -> Result<Georeference> {
        Georeference::from_settings(&self.settings)
    }

    /// Model coordinates (model unit) → geographic.
    pub fn to_geographic(&self, model: Point) -> Result<GeoPoint> {
        self.georeference()?.to_geographic(model)
    }

    /// Geographic → model coordinates (model unit).
    pub fn to_model(&self, geo: GeoPoint) -> Result<Point> {
        self.georeference()?.to_model(geo)
    }
}

/// Projects the active points into planar meters relative to their
/// geographic centroid.
fn project_pairs(
    crs: &'static CoordinateReferenceSystem,
    unit: LengthUnit,
    active: &[&CalibrationPoint],
) -> Result<(GeoPoint, Point, Vec<PointPair>)> {
    let geo: Vec<GeoPoint> = active.iter().map(|p| p.geo_point()).collect();
    let geo_origin = geo_centroid(&geo).unwrap_or_default();
    let projection = Projection::new(crs, geo_origin)?;
    let planar_origin = projection.to_planar(geo_origin)?;
    let mut pairs = Vec::with_capacity(active.len());
    for p in active {
        let source = p.model_point().scaled(unit.meters_per_unit());
        let destination = projection.to_planar(p.geo_point())? - planar_origin;
        pairs.push(PointPair::new(source, destination));
    }
    Ok((geo_origin, planar_origin, pairs))
}

/// Immutable conversion snapshot of one settings generation.
///
/// It holds everything needed to convert coordinates and stays usable while
/// the engine re-solves; compare [`Georeference::generation`] with the current
/// settings to detect staleness.
#[derive(Debug)]
pub struct Georeference {
    projection: Projection,
    model_unit: LengthUnit,
    /// `None` when model coordinates already are CRS planar coordinates.
    transform: Option<SimilarityTransform>,
    generation: u64,
}

impl Georeference {
    /// Builds a snapshot, failing with [`CalibrationError::NotCalibrated`]
    /// unless the settings describe a usable georeference.
    pub fn from_settings(settings: &ProjectCoordinateSettings) -> Result<Self> {
        let crs = crs::lookup(&settings.crs_id)?;
        if settings.model_is_real_world {
            if crs.is_local() {
                warn!(
                    "project {} declares real-world model coordinates without a geodetic CRS",
                    settings.project_id
                );
                return Err(CalibrationError::NotCalibrated);
            }
            return Ok(Self {
                projection: Projection::new(crs, GeoPoint::default())?,
                model_unit: settings.model_unit,
                transform: None,
                generation: settings.generation,
            });
        }
        match settings.transform {
            Some(transform) if settings.status == CalibrationStatus::Calibrated => Ok(Self {
                projection: Projection::new(crs, transform.geo_origin)?,
                model_unit: settings.model_unit,
                transform: Some(transform),
                generation: settings.generation,
            }),
            _ => Err(CalibrationError::NotCalibrated),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn crs(&self) -> &'static CoordinateReferenceSystem {
        self.projection.crs()
    }

    /// Model coordinates (model unit) → CRS planar meters.
    pub fn to_planar(&self, model: Point) -> Point {
        let m = model.scaled(self.model_unit.meters_per_unit());
        match &self.transform {
            Some(t) => t.model_to_planar(m),
            None => m,
        }
    }

    /// CRS planar meters → model coordinates (model unit).
    pub fn from_planar(&self, planar: Point) -> Point {
        let m = match &self.transform {
            Some(t) => t.planar_to_model(planar),
            None => planar,
        };
        m.scaled(1.0 / self.model_unit.meters_per_unit())
    }

    pub fn to_geographic(&self, model: Point) -> Result<GeoPoint> {
        self.projection.to_geographic(self.to_planar(model))
    }

    pub fn to_model(&self, geo: GeoPoint) -> Result<Point> {
        Ok(self.from_planar(self.projection.to_planar(geo)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::LOCAL_CRS_ID;
    use crate::geometry::EARTH_RADIUS_M;
    use crate::store::{CalibrationStore, MemoryStore};

    const LAT: f64 = 59.437;
    const LON: f64 = 24.7536;

    /// Geographic position `east`/`north` meters from the reference point,
    /// using the same spherical approximation as the local frame.
    fn offset(east: f64, north: f64) -> GeoPoint {
        let lat = LAT + (north / EARTH_RADIUS_M).to_degrees();
        let lon = LON + (east / (EARTH_RADIUS_M * LAT.to_radians().cos())).to_degrees();
        GeoPoint::new(lat, lon)
    }

    fn engine() -> CalibrationEngine<MemoryStore> {
        CalibrationEngine::open("site", MemoryStore::new()).unwrap()
    }

    fn add(
        engine: &mut CalibrationEngine<MemoryStore>,
        id: &str,
        model: (f64, f64),
        geo: GeoPoint,
    ) -> RecalcOutcome {
        let p = CalibrationPoint::new("site", Point::new(model.0, model.1), geo).with_id(id);
        engine.add_or_update_point(p).unwrap()
    }

    #[test]
    fn fresh_project_is_not_calibrated() {
        let mut e = engine();
        assert_eq!(e.status(), CalibrationStatus::NotCalibrated);
        assert_eq!(e.recalculate().unwrap(), RecalcOutcome::Insufficient { active: 0 });
        assert!(matches!(
            e.to_geographic(Point::new(0.0, 0.0)),
            Err(CalibrationError::NotCalibrated)
        ));
        let out = add(&mut e, "a", (0.0, 0.0), offset(0.0, 0.0));
        assert_eq!(out, RecalcOutcome::Insufficient { active: 1 });
        assert_eq!(e.status(), CalibrationStatus::NotCalibrated);
    }

    #[test]
    fn two_points_due_east() {
        let mut e = engine();
        add(&mut e, "a", (0.0, 0.0), offset(0.0, 0.0));
        let out = add(&mut e, "b", (10.0, 0.0), offset(10.0, 0.0));
        let report = match out {
            RecalcOutcome::Calibrated(report) => report,
            other => panic!("expected calibration, got {other:?}"),
        };
        assert!((report.transform.scale - 1.0).abs() < 1e-9);
        assert!(report.transform.rotation.abs() < 1e-9);
        assert!(report.rmse < 1e-9);
        assert_eq!(report.quality, QualityTier::Excellent);
        assert_eq!(e.status(), CalibrationStatus::Calibrated);

        let mid = e.to_geographic(Point::new(5.0, 0.0)).unwrap();
        let expected = offset(5.0, 0.0);
        assert!((mid.lat - expected.lat).abs() < 1e-9);
        assert!((mid.lon - expected.lon).abs() < 1e-9);
    }

    #[test]
    fn millimeter_models_are_normalised() {
        let mut e = engine();
        e.configure(LOCAL_CRS_ID, LengthUnit::Millimeters, false).unwrap();
        add(&mut e, "a", (0.0, 0.0), offset(0.0, 0.0));
        let out = add(&mut e, "b", (0.0, 20_000.0), offset(0.0, 20.0));
        assert!(out.is_calibrated());
        let t = e.settings().transform.unwrap();
        assert!((t.scale - 1.0).abs() < 1e-9);
        let back = e.to_model(offset(0.0, 10.0)).unwrap();
        assert!(back.x.abs() < 1e-3);
        assert!((back.y - 10_000.0).abs() < 1e-3);
    }

    #[test]
    fn unknown_crs_is_a_hard_error() {
        let mut e = engine();
        assert!(matches!(
            e.configure("moon-grid", LengthUnit::Meters, false),
            Err(CalibrationError::UnsupportedCrs(_))
        ));
        assert_eq!(e.settings().crs_id, LOCAL_CRS_ID);
    }

    #[test]
    fn unknown_point_ids_are_reported() {
        let mut e = engine();
        assert!(matches!(
            e.set_point_active("nope", false),
            Err(CalibrationError::PointNotFound(_))
        ));
        assert!(matches!(
            e.remove_point("nope"),
            Err(CalibrationError::PointNotFound(_))
        ));
    }

    #[test]
    fn invalid_points_are_rejected() {
        let mut e = engine();
        let p = CalibrationPoint::new("site", Point::new(0.0, 0.0), GeoPoint::new(120.0, 0.0));
        assert!(matches!(
            e.add_or_update_point(p),
            Err(CalibrationError::InvalidPoint(_))
        ));
    }

    #[test]
    fn report_mirrors_last_solve() {
        let mut e = engine();
        assert!(e.report().unwrap().is_none());
        add(&mut e, "a", (0.0, 0.0), offset(0.0, 0.0));
        add(&mut e, "b", (10.0, 0.0), offset(10.0, 0.0));
        add(&mut e, "c", (0.0, 10.0), offset(0.0, 10.0));
        let report = e.report().unwrap().unwrap();
        assert_eq!(report.residuals.len(), 3);
        assert_eq!(report.generation, e.settings().generation);
        assert!(report.residuals.iter().all(|r| r.residual < 1e-6));
    }

    #[test]
    fn point_ids_cannot_move_between_projects() {
        let mut e = engine();
        add(&mut e, "a", (0.0, 0.0), offset(0.0, 0.0));
        let mut other = CalibrationEngine::open("other", e.into_store()).unwrap();
        let p = CalibrationPoint::new("other", Point::new(1.0, 1.0), offset(1.0, 1.0)).with_id("a");
        match other.add_or_update_point(p) {
            Err(CalibrationError::PointConflict { id, project }) => {
                assert_eq!(id, "a");
                assert_eq!(project, "site");
            }
            res => panic!("expected conflict, got {res:?}"),
        }
        assert!(matches!(
            other.set_point_active("a", false),
            Err(CalibrationError::PointNotFound(_))
        ));
        let stored = other.store().get_point("a").unwrap().unwrap();
        assert_eq!(stored.project_id, "site");
        assert!(stored.active);
    }

    #[test]
    fn projection_failure_withdraws_calibration() {
        let mut e = engine();
        add(&mut e, "a", (0.0, 0.0), offset(0.0, 0.0));
        add(&mut e, "b", (10.0, 0.0), offset(10.0, 0.0));
        add(&mut e, "c", (0.0, 10.0), offset(0.0, 10.0));
        let before = e.settings().transform;

        // Written behind the engine's back, so it skips validation.
        let mut store = e.into_store();
        let bad = CalibrationPoint::new("site", Point::new(5.0, 5.0), GeoPoint::new(120.0, 0.0))
            .with_id("bad");
        store.upsert_point(&bad).unwrap();
        let mut e = CalibrationEngine::open("site", store).unwrap();
        assert_eq!(e.status(), CalibrationStatus::Calibrated);

        assert!(matches!(e.recalculate(), Err(CalibrationError::Projection(_))));
        assert_eq!(e.status(), CalibrationStatus::InProgress);
        assert_eq!(e.settings().transform, before);
        let saved = e.store().load_settings("site").unwrap().unwrap();
        assert_eq!(saved.status, CalibrationStatus::InProgress);
        assert!(matches!(
            e.to_geographic(Point::new(1.0, 1.0)),
            Err(CalibrationError::NotCalibrated)
        ));

        assert!(e.remove_point("bad").unwrap().is_calibrated());
        assert_eq!(e.status(), CalibrationStatus::Calibrated);
    }
}
