//! Aggregation of isochrone coverage into per-area accessibility scores.

use geo::{Area, BooleanOps, MultiPolygon};
use hashbrown::HashMap;
use log::debug;
use serde::{Deserialize, Serialize};

use super::isochrone::Isochrone;
use crate::Error;
use crate::loading::PopulationTable;

/// One area of the scoring partition.
///
/// Geometry is optional at the type level because partitions arrive from
/// external tables; scoring an area without geometry is a hard error,
/// not a silent zero.
#[derive(Debug, Clone)]
pub struct Zone {
    pub id: String,
    pub geometry: Option<MultiPolygon<f64>>,
}

/// What the covered fraction was measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageBasis {
    /// Fraction of recorded population within reach (uniform density)
    Population,
    /// No population recorded; fraction of the area's surface instead
    AreaFallback,
    /// The category has no origins at all; score is a defined zero
    NoOrigins,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessibilityScore {
    pub area_id: String,
    pub category: String,
    pub fraction_covered: f64,
    pub basis: CoverageBasis,
}

/// Combined multi-category index of one area.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaIndex {
    pub area_id: String,
    pub combined_index: f64,
    /// Set when the per-category fractions were measured against area
    /// rather than population
    pub area_fallback: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreSet {
    pub scores: Vec<AccessibilityScore>,
    pub indices: Vec<AreaIndex>,
}

/// Scores every (area, category) pair and derives the combined index.
///
/// The coverage of a category is the union of its isochrones, including
/// flagged unreachable ones (their empty polygons contribute nothing but
/// keep the category defined). `categories` lists every category under
/// analysis so that a category without origins still produces explicit
/// zero scores. Output order follows the zone and category input order.
pub fn score_accessibility(
    isochrones: &[Isochrone],
    population: &PopulationTable,
    zones: &[Zone],
    categories: &[String],
    weights: Option<&HashMap<String, f64>>,
) -> Result<ScoreSet, Error> {
    for zone in zones {
        if zone.geometry.is_none() {
            return Err(Error::AreaGeometryMissing(zone.id.clone()));
        }
    }

    let mut unions: HashMap<&str, MultiPolygon<f64>> = HashMap::new();
    for isochrone in isochrones {
        unions
            .entry(isochrone.category.as_str())
            .and_modify(|u| *u = u.union(&isochrone.polygon))
            .or_insert_with(|| isochrone.polygon.clone());
    }
    debug!(
        "Scoring {} zone(s) against {} categorie(s)",
        zones.len(),
        categories.len()
    );

    let mut set = ScoreSet::default();
    for zone in zones {
        let geometry = zone.geometry.as_ref().expect("checked above");
        let zone_area = geometry.unsigned_area();
        let recorded_population = population.get(&zone.id).copied();
        let has_population = recorded_population.is_some_and(|p| p > 0.0);

        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;
        for category in categories {
            let (fraction, basis) = match unions.get(category.as_str()) {
                None => (0.0, CoverageBasis::NoOrigins),
                Some(union) => {
                    let fraction = if zone_area > 0.0 {
                        (geometry.intersection(union).unsigned_area() / zone_area).min(1.0)
                    } else {
                        0.0
                    };
                    let basis = if has_population {
                        CoverageBasis::Population
                    } else {
                        CoverageBasis::AreaFallback
                    };
                    (fraction, basis)
                }
            };

            let weight = weights
                .and_then(|w| w.get(category).copied())
                .unwrap_or(1.0);
            weighted_sum += weight * fraction;
            weight_total += weight;

            set.scores.push(AccessibilityScore {
                area_id: zone.id.clone(),
                category: category.clone(),
                fraction_covered: fraction,
                basis,
            });
        }

        set.indices.push(AreaIndex {
            area_id: zone.id.clone(),
            combined_index: if weight_total > 0.0 {
                weighted_sum / weight_total
            } else {
                0.0
            },
            area_fallback: !has_population,
        });
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Coord, LineString, Polygon};

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![Polygon::new(
            LineString::new(vec![
                Coord { x: x0, y: y0 },
                Coord { x: x1, y: y0 },
                Coord { x: x1, y: y1 },
                Coord { x: x0, y: y1 },
                Coord { x: x0, y: y0 },
            ]),
            vec![],
        )])
    }

    fn isochrone(category: &str, polygon: MultiPolygon<f64>) -> Isochrone {
        Isochrone {
            origin_id: format!("{category}-origin"),
            category: category.to_string(),
            budget: 1200.0,
            polygon,
            reachable_nodes: Vec::new(),
            reachable_segments: Vec::new(),
            unreachable: false,
        }
    }

    fn zone(id: &str) -> Zone {
        Zone {
            id: id.to_string(),
            geometry: Some(rect(0.0, 0.0, 10.0, 10.0)),
        }
    }

    #[test]
    fn population_basis_with_partial_coverage() {
        let isochrones = vec![isochrone("park", rect(0.0, 0.0, 5.0, 10.0))];
        let mut population = PopulationTable::new();
        population.insert("A".to_string(), 2400.0);
        let categories = vec!["park".to_string()];

        let set =
            score_accessibility(&isochrones, &population, &[zone("A")], &categories, None)
                .unwrap();
        assert_eq!(set.scores.len(), 1);
        let score = &set.scores[0];
        assert!((score.fraction_covered - 0.5).abs() < 1e-9);
        assert_eq!(score.basis, CoverageBasis::Population);
        assert!(!set.indices[0].area_fallback);
    }

    #[test]
    fn zero_population_area_falls_back_to_area_fraction() {
        // 60% of the zone covered, population recorded as zero.
        let isochrones = vec![isochrone("park", rect(0.0, 0.0, 6.0, 10.0))];
        let mut population = PopulationTable::new();
        population.insert("A".to_string(), 0.0);
        let categories = vec!["park".to_string()];

        let set =
            score_accessibility(&isochrones, &population, &[zone("A")], &categories, None)
                .unwrap();
        let score = &set.scores[0];
        assert!((score.fraction_covered - 0.6).abs() < 1e-9);
        assert_eq!(score.basis, CoverageBasis::AreaFallback);
        assert!(set.indices[0].area_fallback);
    }

    #[test]
    fn category_without_origins_scores_defined_zero() {
        let isochrones = vec![isochrone("park", rect(0.0, 0.0, 10.0, 10.0))];
        let mut population = PopulationTable::new();
        population.insert("A".to_string(), 1000.0);
        let categories = vec!["park".to_string(), "transit_stop".to_string()];

        let set =
            score_accessibility(&isochrones, &population, &[zone("A")], &categories, None)
                .unwrap();
        let transit = set
            .scores
            .iter()
            .find(|s| s.category == "transit_stop")
            .unwrap();
        assert_eq!(transit.fraction_covered, 0.0);
        assert_eq!(transit.basis, CoverageBasis::NoOrigins);
        // Combined index is the mean of 1.0 and 0.0.
        assert!((set.indices[0].combined_index - 0.5).abs() < 1e-9);
    }

    #[test]
    fn missing_zone_geometry_is_an_error() {
        let zones = vec![Zone {
            id: "ghost".to_string(),
            geometry: None,
        }];
        let result = score_accessibility(&[], &PopulationTable::new(), &zones, &[], None);
        assert!(matches!(result, Err(Error::AreaGeometryMissing(id)) if id == "ghost"));
    }

    #[test]
    fn category_weights_shift_the_combined_index() {
        let isochrones = vec![isochrone("park", rect(0.0, 0.0, 10.0, 10.0))];
        let mut population = PopulationTable::new();
        population.insert("A".to_string(), 1000.0);
        let categories = vec!["park".to_string(), "school".to_string()];
        let mut weights = HashMap::new();
        weights.insert("park".to_string(), 3.0);
        weights.insert("school".to_string(), 1.0);

        let set = score_accessibility(
            &isochrones,
            &population,
            &[zone("A")],
            &categories,
            Some(&weights),
        )
        .unwrap();
        // (3 * 1.0 + 1 * 0.0) / 4
        assert!((set.indices[0].combined_index - 0.75).abs() < 1e-9);
    }

    #[test]
    fn unions_overlapping_isochrones_of_one_category() {
        let isochrones = vec![
            isochrone("park", rect(0.0, 0.0, 6.0, 10.0)),
            isochrone("park", rect(4.0, 0.0, 8.0, 10.0)),
        ];
        let mut population = PopulationTable::new();
        population.insert("A".to_string(), 100.0);
        let categories = vec!["park".to_string()];

        let set =
            score_accessibility(&isochrones, &population, &[zone("A")], &categories, None)
                .unwrap();
        assert!((set.scores[0].fraction_covered - 0.8).abs() < 1e-6);
    }
}
