//! Travel-budget-bounded reachability per origin.
//!
//! The reachable edge set of a bounded shortest-path expansion is
//! buffered by a corridor half-width and unioned into the isochrone
//! polygon. This models "anywhere within the budget along the network"
//! rather than a Euclidean radius around the origin, which is what makes
//! the coverage honest around rivers, highways and other barriers.

use std::f64::consts::{FRAC_PI_2, PI};

use geo::{BooleanOps, Coord, LineString, MultiPolygon, Polygon};
use itertools::Itertools;
use log::warn;
use petgraph::visit::EdgeRef;
use rayon::prelude::*;

use crate::loading::AnalysisConfig;
use crate::model::{Network, Origin};
use crate::routing::bounded_path_costs;
use crate::{Error, NodeId, SegmentId};

/// Vertices per semicircular corridor cap
const CAP_STEPS: usize = 8;

/// Reachable region of one origin within one traversal budget.
///
/// Derived data: references graph entities by id only and is always
/// reproducible from (network, origin, budget).
#[derive(Debug, Clone)]
pub struct Isochrone {
    pub origin_id: String,
    pub category: String,
    pub budget: f64,
    /// Corridor union over the reachable edge set; empty when unreachable
    pub polygon: MultiPolygon<f64>,
    /// Reached node ids with their accumulated cost, ascending by id
    pub reachable_nodes: Vec<(NodeId, f64)>,
    /// Segments contributing to the polygon (fully or partially), ascending
    pub reachable_segments: Vec<SegmentId>,
    /// Set when the origin could not be snapped to the network
    pub unreachable: bool,
}

impl Isochrone {
    /// Zero-coverage placeholder for an origin that could not be snapped;
    /// reported in the batch output instead of being silently omitted.
    pub fn unreachable(origin: &Origin, budget: f64) -> Self {
        Self {
            origin_id: origin.id.clone(),
            category: origin.category.clone(),
            budget,
            polygon: MultiPolygon(vec![]),
            reachable_nodes: Vec::new(),
            reachable_segments: Vec::new(),
            unreachable: true,
        }
    }
}

/// Computes the isochrone of a single origin.
///
/// Fails with [`Error::OriginUnreachable`] when no network node lies
/// within the configured maximum snap distance (including the empty
/// network). Pure function of its inputs.
pub fn compute_isochrone(
    network: &Network,
    origin: &Origin,
    config: &AnalysisConfig,
) -> Result<Isochrone, Error> {
    let Some((start, snap_distance)) = network.nearest_node(&origin.geometry) else {
        return Err(Error::OriginUnreachable {
            origin_id: origin.id.clone(),
            distance: f64::INFINITY,
            max_snap_distance: config.max_snap_distance,
        });
    };
    if snap_distance > config.max_snap_distance {
        return Err(Error::OriginUnreachable {
            origin_id: origin.id.clone(),
            distance: snap_distance,
            max_snap_distance: config.max_snap_distance,
        });
    }

    let costs = bounded_path_costs(network, start, config.budget, config.mode);

    let mut reachable_nodes: Vec<(NodeId, f64)> = costs
        .iter()
        .map(|(index, cost)| (network.node(*index).id, *cost))
        .collect();
    reachable_nodes.sort_by_key(|(id, _)| *id);

    let graph = network.graph();
    let mut polylines: Vec<LineString<f64>> = Vec::new();
    let mut segments: Vec<SegmentId> = Vec::new();

    for edge in graph.edge_references() {
        let Some(&near_cost) = costs.get(&edge.source()) else {
            continue;
        };
        let weight = edge.weight();
        let both_reachable =
            edge.source() != edge.target() && costs.contains_key(&edge.target());

        if both_reachable {
            polylines.push(weight.geometry.clone());
            segments.push(weight.segment);
        } else {
            // Partial coverage: walk the edge until the budget runs out.
            let remaining = config.budget - near_cost;
            let cost = weight.cost(config.mode);
            if remaining > 0.0 && cost > 0.0 {
                let reachable_length = weight.length * (remaining / cost).min(1.0);
                let clipped = clip_polyline(&weight.geometry, reachable_length);
                if clipped.0.len() >= 2 {
                    polylines.push(clipped);
                    segments.push(weight.segment);
                }
            }
        }
    }
    segments.sort_unstable();
    segments.dedup();

    let origin_node = network.node(start).geometry;
    let polygon = corridor_union(
        &polylines,
        origin_node.into(),
        config.corridor_radius,
    );

    Ok(Isochrone {
        origin_id: origin.id.clone(),
        category: origin.category.clone(),
        budget: config.budget,
        polygon,
        reachable_nodes,
        reachable_segments: segments,
        unreachable: false,
    })
}

/// Computes isochrones for a batch of origins in parallel.
///
/// Origins are independent and the network is read-only for the whole
/// phase, so rayon fans the batch out over the worker pool. A failed
/// origin snap is recoverable: it yields a flagged zero-coverage
/// isochrone and the batch continues. Any other error aborts the batch.
/// Output order matches input order.
pub fn bulk_isochrones(
    network: &Network,
    origins: &[Origin],
    config: &AnalysisConfig,
) -> Result<Vec<Isochrone>, Error> {
    origins
        .par_iter()
        .map(|origin| match compute_isochrone(network, origin, config) {
            Ok(isochrone) => Ok(isochrone),
            Err(Error::OriginUnreachable {
                origin_id,
                distance,
                max_snap_distance,
            }) => {
                warn!(
                    "Origin `{origin_id}` is unreachable ({distance:.1} from nearest node, max {max_snap_distance:.1}); reporting zero coverage"
                );
                Ok(Isochrone::unreachable(origin, config.budget))
            }
            Err(e) => Err(e),
        })
        .collect()
}

/// First `max_length` units of a polyline.
fn clip_polyline(line: &LineString<f64>, max_length: f64) -> LineString<f64> {
    let mut out = vec![line.0[0]];
    let mut remaining = max_length;
    for (a, b) in line.0.iter().tuple_windows() {
        let seg = (b.x - a.x).hypot(b.y - a.y);
        if seg <= remaining {
            out.push(*b);
            remaining -= seg;
        } else {
            if remaining > 0.0 && seg > 0.0 {
                let t = remaining / seg;
                out.push(Coord {
                    x: a.x + t * (b.x - a.x),
                    y: a.y + t * (b.y - a.y),
                });
            }
            break;
        }
    }
    LineString::new(out)
}

/// Buffers every polyline by the corridor half-width and unions the
/// result, seeding with a disc at the snapped origin node so a reachable
/// but edgeless origin still reports positive coverage.
fn corridor_union(
    polylines: &[LineString<f64>],
    origin: Coord<f64>,
    radius: f64,
) -> MultiPolygon<f64> {
    let mut pieces: Vec<MultiPolygon<f64>> = vec![MultiPolygon(vec![disc(origin, radius)])];
    for polyline in polylines {
        for (a, b) in polyline.0.iter().tuple_windows() {
            pieces.push(MultiPolygon(vec![capsule(*a, *b, radius)]));
        }
    }
    union_all(pieces)
}

/// Balanced pairwise union; equivalent to a fold but O(n log n) in the
/// number of boundary points.
fn union_all(mut pieces: Vec<MultiPolygon<f64>>) -> MultiPolygon<f64> {
    if pieces.is_empty() {
        return MultiPolygon(vec![]);
    }
    while pieces.len() > 1 {
        pieces = pieces
            .chunks(2)
            .map(|pair| match pair {
                [a, b] => a.union(b),
                [a] => a.clone(),
                _ => unreachable!(),
            })
            .collect();
    }
    pieces.pop().expect("non-empty")
}

fn capsule(a: Coord<f64>, b: Coord<f64>, radius: f64) -> Polygon<f64> {
    let d = (b.x - a.x).hypot(b.y - a.y);
    if d < 1e-12 {
        return disc(a, radius);
    }
    let theta = (b.y - a.y).atan2(b.x - a.x);
    let mut coords = Vec::with_capacity(2 * (CAP_STEPS + 1) + 1);
    for i in 0..=CAP_STEPS {
        let angle = theta - FRAC_PI_2 + PI * (i as f64 / CAP_STEPS as f64);
        coords.push(Coord {
            x: b.x + radius * angle.cos(),
            y: b.y + radius * angle.sin(),
        });
    }
    for i in 0..=CAP_STEPS {
        let angle = theta + FRAC_PI_2 + PI * (i as f64 / CAP_STEPS as f64);
        coords.push(Coord {
            x: a.x + radius * angle.cos(),
            y: a.y + radius * angle.sin(),
        });
    }
    coords.push(coords[0]);
    Polygon::new(LineString::new(coords), vec![])
}

fn disc(center: Coord<f64>, radius: f64) -> Polygon<f64> {
    let steps = 4 * CAP_STEPS;
    let mut coords: Vec<Coord<f64>> = (0..=steps)
        .map(|i| {
            let angle = 2.0 * PI * (i as f64 / steps as f64);
            Coord {
                x: center.x + radius * angle.cos(),
                y: center.y + radius * angle.sin(),
            }
        })
        .collect();
    coords.push(coords[0]);
    Polygon::new(LineString::new(coords), vec![])
}
