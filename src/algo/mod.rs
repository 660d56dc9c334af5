//! Accessibility algorithms: isochrone computation and score aggregation

pub mod isochrone;
pub mod score;

pub use isochrone::{Isochrone, bulk_isochrones, compute_isochrone};
pub use score::{AccessibilityScore, AreaIndex, CoverageBasis, ScoreSet, Zone, score_accessibility};
