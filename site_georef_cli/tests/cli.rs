use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use std::process::Command;

fn cli_for(db: &assert_fs::fixture::ChildPath, project: &str) -> Command {
    let mut cmd = Command::cargo_bin("site_georef_cli").unwrap();
    cmd.env("SITE_GEOREF_DB", db.path())
        .args(["--project", project]);
    cmd
}

fn cli(db: &assert_fs::fixture::ChildPath) -> Command {
    cli_for(db, "site-a")
}

fn calibrate_site_a(db: &assert_fs::fixture::ChildPath) {
    cli(db).args(["configure", "ee-lest97"]).assert().success();
    cli(db)
        .args(["add-point", "0", "0", "59.437", "24.7536", "--id", "a"])
        .assert()
        .success();
    cli(db)
        .args(["add-point", "50", "0", "59.437", "24.75448", "--id", "b"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Calibrated from 2 points"));
}

#[test]
fn crs_list_command() {
    Command::cargo_bin("site_georef_cli")
        .unwrap()
        .args(["crs-list", "--country", "EE"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ee-lest97"))
        .stdout(predicate::str::contains("EPSG:3301"))
        .stdout(predicate::str::contains("gb-osgb36").not());
}

#[test]
fn calibration_workflow() {
    let dir = assert_fs::TempDir::new().unwrap();
    let db = dir.child("site.db");

    cli(&db)
        .args(["configure", "ee-lest97"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Not calibrated: 0 active point(s)"));

    cli(&db)
        .args(["add-point", "0", "0", "59.437", "24.7536", "--id", "a"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added point a"));

    cli(&db)
        .args(["to-geo", "1", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not calibrated"));

    cli(&db)
        .args(["add-point", "50", "0", "59.437", "24.75448", "--id", "b", "--method", "rtk"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Calibrated from 2 points"))
        .stdout(predicate::str::contains("quality excellent"));

    cli(&db)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Status: calibrated"))
        .stdout(predicate::str::contains("CRS: ee-lest97"));

    cli(&db)
        .args(["to-geo", "0", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("59.43700000,24.75360000"));

    cli(&db)
        .args(["set-active", "b", "false"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Not calibrated: 1 active point(s)"));

    cli(&db)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Status: in_progress"));

    let out = dir.child("points.geojson");
    cli(&db)
        .args(["export-geojson", out.path().to_str().unwrap()])
        .assert()
        .success();
    out.assert(predicate::str::contains("FeatureCollection"));
    dir.close().unwrap();
}

#[test]
fn collinear_points_warn() {
    let dir = assert_fs::TempDir::new().unwrap();
    let db = dir.child("site.db");
    for (x, lon) in [("0", "24.7536"), ("10", "24.75378"), ("20", "24.75396")] {
        cli(&db)
            .args(["add-point", x, "0", "59.437", lon])
            .assert()
            .success();
    }
    cli(&db)
        .arg("recalculate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Warning: model points are collinear"));
}

#[test]
fn unknown_crs_fails() {
    let dir = assert_fs::TempDir::new().unwrap();
    let db = dir.child("site.db");
    cli(&db)
        .args(["configure", "atlantis-grid"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "unsupported coordinate reference system 'atlantis-grid'",
        ));
}

#[test]
fn unknown_point_fails() {
    let dir = assert_fs::TempDir::new().unwrap();
    let db = dir.child("site.db");
    cli(&db)
        .args(["remove-point", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("calibration point 'ghost' not found"));
}

#[test]
fn point_ids_stay_with_their_project() {
    let dir = assert_fs::TempDir::new().unwrap();
    let db = dir.child("site.db");
    calibrate_site_a(&db);

    cli_for(&db, "site-b")
        .args(["add-point", "5", "5", "59.4371", "24.7537", "--id", "a"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "calibration point 'a' belongs to project 'site-a'",
        ));

    cli(&db)
        .arg("points")
        .assert()
        .success()
        .stdout(predicate::str::contains("a,,0.000,0.000"));
    cli(&db)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Status: calibrated"));
}

#[test]
fn bundle_export_and_import() {
    let dir = assert_fs::TempDir::new().unwrap();
    let db = dir.child("site.db");
    calibrate_site_a(&db);

    let bundle = dir.child("site-a.json");
    cli(&db)
        .args(["export-bundle", bundle.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 2 points"));
    bundle.assert(predicate::str::contains("ee-lest97"));

    let other = dir.child("other.db");
    cli_for(&other, "site-b")
        .args(["import-bundle", bundle.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 2 points into site-b"))
        .stdout(predicate::str::contains("Calibrated from 2 points"));
    cli_for(&other, "site-b")
        .args(["to-geo", "0", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("59.43700000,24.75360000"));

    cli_for(&db, "site-b")
        .args(["import-bundle", bundle.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("belongs to project 'site-a'"));
    dir.close().unwrap();
}
