use site_georef::store::{CalibrationStore, SqliteStore};
use site_georef::{
    CalibrationEngine, CalibrationPoint, CalibrationStatus, GeoPoint, LengthUnit, Point,
};
use tempfile::NamedTempFile;

#[test]
fn calibration_survives_reopen() {
    let file = NamedTempFile::new().unwrap();
    let path = file.path().to_str().unwrap();

    let reference = {
        let store = SqliteStore::open(path).unwrap();
        let mut engine = CalibrationEngine::open("p1", store).unwrap();
        engine.configure("fi-tm35fin", LengthUnit::Feet, false).unwrap();
        let pts = [
            ((0.0, 0.0), GeoPoint::new(60.1699, 24.9384)),
            ((300.0, 0.0), GeoPoint::new(60.1699, 24.94005)),
            ((0.0, 300.0), GeoPoint::new(60.17072, 24.9384)),
        ];
        for ((x, y), geo) in pts {
            let p = CalibrationPoint::new("p1", Point::new(x, y), geo);
            engine.add_or_update_point(p).unwrap();
        }
        assert_eq!(engine.status(), CalibrationStatus::Calibrated);
        engine.to_geographic(Point::new(150.0, 150.0)).unwrap()
    };

    let store = SqliteStore::open(path).unwrap();
    let points = store.list_points("p1").unwrap();
    assert_eq!(points.len(), 3);
    assert!(points.iter().all(|p| p.error.is_some()));

    let engine = CalibrationEngine::open("p1", store).unwrap();
    assert_eq!(engine.status(), CalibrationStatus::Calibrated);
    assert_eq!(engine.settings().model_unit, LengthUnit::Feet);
    let again = engine.to_geographic(Point::new(150.0, 150.0)).unwrap();
    assert!((reference.lat - again.lat).abs() < 1e-10);
    assert!((reference.lon - again.lon).abs() < 1e-10);
}
