use clap::{ArgAction, Parser, Subcommand};
use site_georef::{
    crs,
    io::{read_bundle_json, write_bundle_json, write_points_geojson},
    store::SqliteStore,
    CalibrationEngine, CalibrationError, CalibrationPoint, CaptureMethod, GeoPoint, LengthUnit,
    Point, RecalcOutcome,
};

#[derive(Parser)]
#[command(name = "site_georef_cli", version)]
struct Cli {
    /// SQLite database holding calibration points and settings
    #[arg(long, env = "SITE_GEOREF_DB", default_value = "site_georef.db", global = true)]
    db: String,
    /// Project identifier
    #[arg(long, default_value = "default", global = true)]
    project: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available coordinate reference systems.
    CrsList {
        /// Only show systems of this country (ISO code).
        #[arg(long)]
        country: Option<String>,
    },
    /// Select the project CRS and model unit.
    Configure {
        crs: String,
        #[arg(long, default_value = "meters")]
        unit: LengthUnit,
        /// Model coordinates already are CRS coordinates.
        #[arg(long)]
        real_world: bool,
    },
    /// Add or replace a calibration point (model x y, then latitude longitude).
    #[command(allow_negative_numbers = true)]
    AddPoint {
        x: f64,
        y: f64,
        lat: f64,
        lon: f64,
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        element: Option<String>,
        #[arg(long, default_value = "manual")]
        method: CaptureMethod,
        #[arg(long)]
        accuracy: Option<f64>,
    },
    /// Include (true) or exclude (false) a point from the fit.
    SetActive {
        id: String,
        #[arg(action = ArgAction::Set)]
        active: bool,
    },
    /// Delete a calibration point.
    RemovePoint { id: String },
    /// List calibration points as CSV.
    Points,
    /// Re-fit the transform from the active points.
    Recalculate,
    /// Show the project's calibration state.
    Status,
    /// Convert model coordinates to latitude/longitude.
    #[command(allow_negative_numbers = true)]
    ToGeo { x: f64, y: f64 },
    /// Convert latitude/longitude to model coordinates.
    #[command(allow_negative_numbers = true)]
    ToModel { lat: f64, lon: f64 },
    /// Export calibration points to GeoJSON.
    ExportGeojson { output: String },
    /// Write the project's settings and points to a JSON bundle.
    ExportBundle { output: String },
    /// Load a JSON bundle into the project and re-fit.
    ImportBundle { input: String },
}

fn print_outcome(outcome: &RecalcOutcome) {
    match outcome {
        RecalcOutcome::Skipped => {
            println!("Model uses real-world coordinates; calibration skipped")
        }
        RecalcOutcome::Calibrated(report) => {
            println!(
                "Calibrated from {} points: RMSE {:.3} m, max error {:.3} m, quality {}",
                report.residuals.len(),
                report.rmse,
                report.max_error,
                report.quality
            );
            println!(
                "Scale {:.6}, rotation {:.4} deg",
                report.transform.scale,
                report.transform.rotation_degrees()
            );
        }
        RecalcOutcome::Insufficient { active } => {
            println!("Not calibrated: {active} active point(s), at least 2 required")
        }
        RecalcOutcome::Degenerate(reason) => {
            println!("Warning: {reason}; add a better distributed point")
        }
    }
}

fn format_opt(v: Option<f64>) -> String {
    v.map(|v| format!("{v:.3}")).unwrap_or_default()
}

fn run(cli: Cli) -> Result<(), CalibrationError> {
    if let Commands::CrsList { country } = &cli.command {
        let entries: Vec<_> = match country {
            Some(code) => crs::for_country(code).collect(),
            None => crs::catalog().iter().collect(),
        };
        for entry in entries {
            let epsg = entry.epsg.map(|c| format!("EPSG:{c}")).unwrap_or_default();
            println!(
                "{},{},{},{},{}",
                entry.id,
                entry.name,
                entry.country_code.unwrap_or(""),
                epsg,
                entry.unit
            );
        }
        return Ok(());
    }

    let store = SqliteStore::open(&cli.db)?;
    let mut engine = CalibrationEngine::open(cli.project.clone(), store)?;
    match cli.command {
        Commands::CrsList { .. } => {}
        Commands::Configure {
            crs,
            unit,
            real_world,
        } => {
            let outcome = engine.configure(&crs, unit, real_world)?;
            println!("Configured {} with {}", cli.project, crs);
            print_outcome(&outcome);
        }
        Commands::AddPoint {
            x,
            y,
            lat,
            lon,
            id,
            label,
            element,
            method,
            accuracy,
        } => {
            let geo = GeoPoint::new(lat, lon);
            let mut point = CalibrationPoint::new(cli.project.clone(), Point::new(x, y), geo)
                .with_method(method);
            if let Some(id) = id {
                point = point.with_id(id);
            }
            if let Some(label) = label {
                point = point.with_label(label);
            }
            if let Some(element) = element {
                point = point.with_element(element);
            }
            if let Some(accuracy) = accuracy {
                point = point.with_accuracy(accuracy);
            }
            let id = point.id.clone();
            let outcome = engine.add_or_update_point(point)?;
            println!("Added point {id}");
            print_outcome(&outcome);
        }
        Commands::SetActive { id, active } => {
            let outcome = engine.set_point_active(&id, active)?;
            println!("Point {id} active: {active}");
            print_outcome(&outcome);
        }
        Commands::RemovePoint { id } => {
            let outcome = engine.remove_point(&id)?;
            println!("Removed point {id}");
            print_outcome(&outcome);
        }
        Commands::Points => {
            for p in engine.points()? {
                println!(
                    "{},{},{:.3},{:.3},{:.8},{:.8},{},{}",
                    p.id,
                    p.label.as_deref().unwrap_or(""),
                    p.model_x,
                    p.model_y,
                    p.lat,
                    p.lon,
                    p.active,
                    format_opt(p.error)
                );
            }
        }
        Commands::Recalculate => {
            let outcome = engine.recalculate()?;
            print_outcome(&outcome);
        }
        Commands::Status => {
            let s = engine.settings();
            let crs = engine.crs()?;
            println!("Project: {}", s.project_id);
            println!("CRS: {} ({})", crs.id, crs.name);
            println!("Model unit: {}", s.model_unit);
            println!("Real-world model: {}", s.model_is_real_world);
            println!("Status: {}", s.status);
            if let Some(quality) = s.quality {
                println!(
                    "Quality: {} (RMSE {} m, max error {} m, {} points)",
                    quality,
                    format_opt(s.rmse),
                    format_opt(s.max_error),
                    s.point_count
                );
            }
        }
        Commands::ToGeo { x, y } => {
            let g = engine.to_geographic(Point::new(x, y))?;
            println!("{:.8},{:.8}", g.lat, g.lon);
        }
        Commands::ToModel { lat, lon } => {
            let p = engine.to_model(GeoPoint::new(lat, lon))?;
            println!("{:.3},{:.3}", p.x, p.y);
        }
        Commands::ExportGeojson { output } => {
            let points = engine.points()?;
            write_points_geojson(&output, &points).map_err(site_georef::StoreError::from)?;
            println!("Wrote {}", output);
        }
        Commands::ExportBundle { output } => {
            let bundle = engine.export_bundle()?;
            write_bundle_json(&output, &bundle)?;
            println!("Exported {} points to {}", bundle.points.len(), output);
        }
        Commands::ImportBundle { input } => {
            let bundle = read_bundle_json(&input)?;
            let count = bundle.points.len();
            let outcome = engine.import_bundle(bundle)?;
            println!("Imported {count} points into {}", cli.project);
            print_outcome(&outcome);
        }
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_default_env().init();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        log::debug!("command failed: {e:?}");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
