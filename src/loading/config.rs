use hashbrown::HashMap;

use crate::{Error, model::TravelMode};

/// Tunable parameters of the accessibility pipeline.
///
/// All distances are in canonical-plane metres; the engine performs no
/// unit inference. Defaults reflect a 15-minute walk at 5 km/h; corridor
/// and snap widths are policy values to be validated against the density
/// of the actual network.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Distance below which two candidate nodes merge into one
    pub snap_tolerance: f64,
    /// Edges shorter than this are dropped as duplicate-geometry artifacts
    pub degenerate_length: f64,
    /// Maximum accumulated traversal cost of the reachability expansion
    pub budget: f64,
    /// Half-width of the corridor buffered around each reachable edge
    pub corridor_radius: f64,
    /// Maximum distance an origin may lie from its snapped network node
    pub max_snap_distance: f64,
    /// Cost profile used for the expansion
    pub mode: TravelMode,
    /// Per-category weights of the combined index; unweighted mean if absent
    pub category_weights: Option<HashMap<String, f64>>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            snap_tolerance: 1.0,
            degenerate_length: 0.01,
            budget: 1200.0,
            corridor_radius: 30.0,
            max_snap_distance: 100.0,
            mode: TravelMode::Walk,
            category_weights: None,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), Error> {
        for (name, value) in [
            ("snap_tolerance", self.snap_tolerance),
            ("budget", self.budget),
            ("corridor_radius", self.corridor_radius),
            ("max_snap_distance", self.max_snap_distance),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::InvalidData(format!(
                    "{name} must be finite and positive, got {value}"
                )));
            }
        }
        if !self.degenerate_length.is_finite() || self.degenerate_length < 0.0 {
            return Err(Error::InvalidData(format!(
                "degenerate_length must be finite and non-negative, got {}",
                self.degenerate_length
            )));
        }
        if let Some(weights) = &self.category_weights {
            for (category, weight) in weights {
                if !weight.is_finite() || *weight < 0.0 {
                    return Err(Error::InvalidData(format!(
                        "weight for category `{category}` must be finite and non-negative, got {weight}"
                    )));
                }
            }
        }
        Ok(())
    }
}
