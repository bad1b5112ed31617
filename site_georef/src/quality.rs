//! Advisory trust labels derived from the fit RMSE.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper RMSE bound (exclusive, meters) for [`QualityTier::Excellent`].
pub const EXCELLENT_RMSE_M: f64 = 1.0;
/// Upper RMSE bound (exclusive, meters) for [`QualityTier::Good`].
pub const GOOD_RMSE_M: f64 = 3.0;
/// Upper RMSE bound (exclusive, meters) for [`QualityTier::Fair`].
pub const FAIR_RMSE_M: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl QualityTier {
    /// Classifies a fit by its RMSE in meters. NaN is treated as poor.
    pub fn from_rmse(rmse: f64) -> Self {
        if rmse < EXCELLENT_RMSE_M {
            QualityTier::Excellent
        } else if rmse < GOOD_RMSE_M {
            QualityTier::Good
        } else if rmse < FAIR_RMSE_M {
            QualityTier::Fair
        } else {
            QualityTier::Poor
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QualityTier::Excellent => "excellent",
            QualityTier::Good => "good",
            QualityTier::Fair => "fair",
            QualityTier::Poor => "poor",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_boundaries() {
        assert_eq!(QualityTier::from_rmse(0.0), QualityTier::Excellent);
        assert_eq!(QualityTier::from_rmse(0.999), QualityTier::Excellent);
        assert_eq!(QualityTier::from_rmse(1.0), QualityTier::Good);
        assert_eq!(QualityTier::from_rmse(2.5), QualityTier::Good);
        assert_eq!(QualityTier::from_rmse(3.0), QualityTier::Fair);
        assert_eq!(QualityTier::from_rmse(9.99), QualityTier::Fair);
        assert_eq!(QualityTier::from_rmse(10.0), QualityTier::Poor);
        assert_eq!(QualityTier::from_rmse(f64::NAN), QualityTier::Poor);
    }
}
