//! End-to-end accessibility pipeline.
//!
//! Stages run strictly in sequence: the network is immutable from the
//! moment reachability computation starts, so the per-origin parallelism
//! inside [`bulk_isochrones`] only ever reads shared state.

use log::info;

use crate::Error;
use crate::algo::{Isochrone, ScoreSet, bulk_isochrones, score_accessibility};
use crate::algo::score::Zone;
use crate::loading::{AnalysisConfig, LineGeometry, PopulationTable, build_network};
use crate::model::Origin;
use crate::output::{NetworkSummary, network_summary};

/// Everything one batch run produces, handed to the output adapter and
/// on to visualization/reporting.
#[derive(Debug)]
pub struct AccessibilityReport {
    pub summary: NetworkSummary,
    pub isochrones: Vec<Isochrone>,
    pub scores: ScoreSet,
}

/// Runs network build, per-origin reachability and score aggregation.
///
/// `categories` enumerates every amenity category under analysis;
/// categories without origins still receive explicit zero scores.
/// Loader and builder failures abort the batch; unreachable origins are
/// reported in the output with a flag instead.
pub fn run_accessibility(
    lines: &[LineGeometry],
    origins: &[Origin],
    population: &PopulationTable,
    zones: &[Zone],
    categories: &[String],
    config: &AnalysisConfig,
) -> Result<AccessibilityReport, Error> {
    config.validate()?;

    info!("Building network from {} line geometries", lines.len());
    let network = build_network(lines, config)?;
    let summary = network_summary(&network);
    info!(
        "Network ready: {} nodes, {} edges, {} component(s)",
        summary.node_count, summary.edge_count, summary.component_count
    );

    info!(
        "Computing isochrones for {} origin(s) at budget {}",
        origins.len(),
        config.budget
    );
    let isochrones = bulk_isochrones(&network, origins, config)?;
    let unreachable = isochrones.iter().filter(|i| i.unreachable).count();
    if unreachable > 0 {
        info!("{unreachable} origin(s) reported unreachable");
    }

    info!("Scoring {} area(s)", zones.len());
    let scores = score_accessibility(
        &isochrones,
        population,
        zones,
        categories,
        config.category_weights.as_ref(),
    )?;

    Ok(AccessibilityReport {
        summary,
        isochrones,
        scores,
    })
}
