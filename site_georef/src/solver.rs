//! Least squares fit of a 2D similarity transform to point correspondences.
//! Both frames are centered before the design matrix is built and the system is
//! solved through SVD, so near-collinear inputs do not square the condition
//! number the way raw normal equations would.

use nalgebra::{DMatrix, DVector, Matrix2};

use crate::error::{CalibrationError, DegenerateReason, Result};
use crate::geometry::{centroid, distance, Point};
use crate::transform::SimilarityTransform;

/// Minimum number of correspondences for a solve.
pub const MIN_POINTS: usize = 2;
/// Spread (meters) below which a point set counts as a single location.
pub const COINCIDENT_TOLERANCE: f64 = 1e-6;
/// RMS off-axis distance (meters) below which points count as collinear.
pub const COLLINEAR_TOLERANCE: f64 = 1e-6;
/// Relative counterpart of [`COLLINEAR_TOLERANCE`], scaled by the spread.
pub const COLLINEAR_RELATIVE_TOLERANCE: f64 = 1e-9;

const SVD_EPS: f64 = 1e-12;

/// One correspondence between model meters and planar meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointPair {
    pub source: Point,
    pub destination: Point,
}

impl PointPair {
    pub fn new(source: Point, destination: Point) -> Self {
        Self {
            source,
            destination,
        }
    }
}

/// Result of a similarity fit.
#[derive(Debug, Clone)]
pub struct SolveResult {
    /// Fitted transform; only `model_origin` is anchored.
    pub transform: SimilarityTransform,
    /// Residual distance per input pair, in input order.
    pub residuals: Vec<f64>,
    pub rmse: f64,
    pub max_error: f64,
}

fn max_spread(points: &[Point], center: Point) -> f64 {
    points
        .iter()
        .map(|p| distance(*p, center))
        .fold(0.0, f64::max)
}

/// RMS distance of `points` from their principal axis.
fn off_axis_rms(points: &[Point], center: Point) -> f64 {
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for p in points {
        let d = *p - center;
        sxx += d.x * d.x;
        sxy += d.x * d.y;
        syy += d.y * d.y;
    }
    let eig = Matrix2::new(sxx, sxy, sxy, syy).symmetric_eigenvalues();
    let minor = eig[0].min(eig[1]).max(0.0);
    (minor / points.len() as f64).sqrt()
}

/// Checks that a set of correspondences can support a similarity fit.
///
/// Two distinct points always qualify; from three points on, the model side
/// must not lie on a single line.
pub fn check_geometry(pairs: &[PointPair]) -> Result<(), DegenerateReason> {
    let sources: Vec<Point> = pairs.iter().map(|p| p.source).collect();
    let destinations: Vec<Point> = pairs.iter().map(|p| p.destination).collect();
    let (Some(cs), Some(cd)) = (centroid(&sources), centroid(&destinations)) else {
        return Ok(());
    };
    let spread = max_spread(&sources, cs);
    if spread < COINCIDENT_TOLERANCE {
        return Err(DegenerateReason::CoincidentSource);
    }
    if max_spread(&destinations, cd) < COINCIDENT_TOLERANCE {
        return Err(DegenerateReason::CoincidentDestination);
    }
    if pairs.len() >= 3 {
        let tolerance = COLLINEAR_TOLERANCE.max(COLLINEAR_RELATIVE_TOLERANCE * spread);
        if off_axis_rms(&sources, cs) < tolerance {
            return Err(DegenerateReason::CollinearSource);
        }
    }
    Ok(())
}

/// Fits `destination ≈ T(source)` in the least squares sense.
pub fn solve(pairs: &[PointPair]) -> Result<SolveResult> {
    if pairs.len() < MIN_POINTS {
        return Err(CalibrationError::InsufficientPoints { found: pairs.len() });
    }
    check_geometry(pairs).map_err(CalibrationError::DegenerateGeometry)?;

    let sources: Vec<Point> = pairs.iter().map(|p| p.source).collect();
    let destinations: Vec<Point> = pairs.iter().map(|p| p.destination).collect();
    let cs = centroid(&sources).unwrap_or_default();
    let cd = centroid(&destinations).unwrap_or_default();

    let rows = 2 * pairs.len();
    let mut a = DMatrix::<f64>::zeros(rows, 4);
    let mut l = DVector::<f64>::zeros(rows);
    for (i, pair) in pairs.iter().enumerate() {
        let s = pair.source - cs;
        let d = pair.destination - cd;
        let r = 2 * i;
        a[(r, 0)] = s.x;
        a[(r, 1)] = -s.y;
        a[(r, 2)] = 1.0;
        l[r] = d.x;
        a[(r + 1, 0)] = s.y;
        a[(r + 1, 1)] = s.x;
        a[(r + 1, 3)] = 1.0;
        l[r + 1] = d.y;
    }

    let svd = a.svd(true, true);
    let x = svd
        .solve(&l, SVD_EPS)
        .map_err(|_| CalibrationError::DegenerateGeometry(DegenerateReason::CoincidentSource))?;
    let (pa, pb) = (x[0], x[1]);
    if pa.hypot(pb) < SVD_EPS {
        return Err(CalibrationError::DegenerateGeometry(
            DegenerateReason::CoincidentDestination,
        ));
    }

    // d - cd = R (s - cs) + t'  =>  t = cd + t' - R cs
    let tx = cd.x + x[2] - (pa * cs.x - pb * cs.y);
    let ty = cd.y + x[3] - (pb * cs.x + pa * cs.y);
    let mut transform = SimilarityTransform::from_parameters(pa, pb, tx, ty);
    transform.model_origin = cs;

    let residuals: Vec<f64> = pairs
        .iter()
        .map(|p| distance(transform.apply(p.source), p.destination))
        .collect();
    let rmse = (residuals.iter().map(|r| r * r).sum::<f64>() / residuals.len() as f64).sqrt();
    let max_error = residuals.iter().copied().fold(0.0, f64::max);

    log::debug!(
        "similarity fit: n={} scale={:.6} rotation={:.6} rmse={:.4} max={:.4}",
        pairs.len(),
        transform.scale,
        transform.rotation,
        rmse,
        max_error
    );

    Ok(SolveResult {
        transform,
        residuals,
        rmse,
        max_error,
    })
}
