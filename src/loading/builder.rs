//! Network builder: noisy line geometries to a routable graph.
//!
//! Candidate nodes are line endpoints and cross-line intersection points.
//! Candidates within the snap tolerance merge into one node so that small
//! digitization gaps do not disconnect the network. Merging is
//! deterministic: candidates are processed in lexicographic coordinate
//! order and join the nearest existing cluster centroid, ties resolving
//! toward the cluster with the lowest seed coordinate.

use geo::algorithm::line_intersection::{LineIntersection, line_intersection};
use geo::{Coord, Euclidean, Length, Line, LineString};
use hashbrown::HashMap;
use log::{debug, info, trace};
use petgraph::graph::{DiGraph, NodeIndex};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{AABB, RTree};

use super::config::AnalysisConfig;
use super::geometry::LineGeometry;
use crate::model::components::BIKE_COST_FACTOR;
use crate::model::{IndexedPoint, Network, NetworkEdge, NetworkNode};
use crate::{Error, NodeId};

/// Relative parameter below which an intersection is taken to lie on an
/// existing vertex instead of splitting the segment.
const PARAM_EPS: f64 = 1e-9;

type SegmentItem = GeomWithData<Rectangle<[f64; 2]>, (usize, usize)>;

/// Builds the routable network from validated line geometries.
///
/// Returns an empty network (not an error) when fewer than two distinct
/// nodes remain after merging; callers must handle a graph with no
/// reachable area. Disconnected components are preserved.
pub fn build_network(lines: &[LineGeometry], config: &AnalysisConfig) -> Result<Network, Error> {
    config.validate()?;

    let chains = split_into_chains(lines);
    let clusters = cluster_endpoints(&chains, config.snap_tolerance);

    if clusters.centroids.len() < 2 {
        info!(
            "Network build yielded {} node(s) from {} line(s); returning empty network",
            clusters.centroids.len(),
            lines.len()
        );
        return Ok(Network::default());
    }

    let mut graph = DiGraph::with_capacity(clusters.centroids.len(), chains.len() * 2);
    for (id, centroid) in clusters.centroids.iter().enumerate() {
        graph.add_node(NetworkNode {
            id: id as NodeId,
            geometry: (*centroid).into(),
        });
    }

    let mut segment_count: u64 = 0;
    let mut dropped = 0usize;
    for chain in &chains {
        let a = clusters.assignment[&coord_key(chain.coords[0])];
        let b = clusters.assignment[&coord_key(*chain.coords.last().expect("chain has coords"))];

        let Some(geometry) = chain_geometry(chain, clusters.centroids[a], clusters.centroids[b])
        else {
            dropped += 1;
            continue;
        };
        let length = Euclidean.length(&geometry);
        if length < config.degenerate_length {
            trace!("Dropping degenerate edge of length {length} between nodes {a} and {b}");
            dropped += 1;
            continue;
        }

        let segment = segment_count;
        segment_count += 1;
        let walk_cost = length * chain.cost_factor;
        let edge = NetworkEdge {
            segment,
            length,
            walk_cost,
            bike_cost: walk_cost * BIKE_COST_FACTOR,
            geometry: geometry.clone(),
        };
        graph.add_edge(NodeIndex::new(a), NodeIndex::new(b), edge);
        if !chain.oneway {
            let mut reversed = geometry.0.clone();
            reversed.reverse();
            graph.add_edge(
                NodeIndex::new(b),
                NodeIndex::new(a),
                NetworkEdge {
                    segment,
                    length,
                    walk_cost,
                    bike_cost: walk_cost * BIKE_COST_FACTOR,
                    geometry: LineString::new(reversed),
                },
            );
        }
    }

    let rtree = RTree::bulk_load(
        graph
            .node_indices()
            .map(|index| {
                let p = graph[index].geometry;
                IndexedPoint::new([p.x(), p.y()], index)
            })
            .collect(),
    );

    let network = Network::new(graph, rtree, segment_count);
    info!(
        "Built network with {} nodes, {} segments ({} arcs), {} component(s); dropped {} degenerate chain(s)",
        network.node_count(),
        network.edge_count(),
        network.arc_count(),
        network.component_count(),
        dropped
    );
    Ok(network)
}

/// A sub-polyline between two consecutive candidate nodes.
struct Chain {
    coords: Vec<Coord<f64>>,
    cost_factor: f64,
    oneway: bool,
}

/// Splits every line at its intersections with other lines, then cuts the
/// result into chains whose endpoints are the candidate nodes.
fn split_into_chains(lines: &[LineGeometry]) -> Vec<Chain> {
    let rtree = RTree::bulk_load(
        lines
            .iter()
            .enumerate()
            .flat_map(|(line_idx, line)| {
                line.geometry.lines().enumerate().map(move |(seg_idx, seg)| {
                    let (lower, upper) = segment_corners(&seg);
                    SegmentItem::new(Rectangle::from_corners(lower, upper), (line_idx, seg_idx))
                })
            })
            .collect(),
    );

    let mut chains = Vec::new();
    for (line_idx, line) in lines.iter().enumerate() {
        let marked = mark_candidates(line, line_idx, lines, &rtree);
        chains.extend(cut_chains(line, marked));
    }
    debug!("Split {} line(s) into {} chain(s)", lines.len(), chains.len());
    chains
}

/// Coordinates of one line with intersection points inserted, paired with
/// a candidate-node marker per vertex.
fn mark_candidates(
    line: &LineGeometry,
    line_idx: usize,
    lines: &[LineGeometry],
    rtree: &RTree<SegmentItem>,
) -> Vec<(Coord<f64>, bool)> {
    let coords = &line.geometry.0;
    let mut marked: Vec<(Coord<f64>, bool)> = Vec::with_capacity(coords.len());
    marked.push((coords[0], true));

    for (seg_idx, seg) in line.geometry.lines().enumerate() {
        let mut splits: Vec<(f64, Coord<f64>)> = Vec::new();
        let (lower, upper) = segment_corners(&seg);
        for item in rtree.locate_in_envelope_intersecting(&AABB::from_corners(lower, upper)) {
            let (other_line, other_seg) = item.data;
            if other_line == line_idx {
                continue;
            }
            let other = nth_segment(&lines[other_line].geometry, other_seg);
            // Collinear overlaps carry no crossing point; duplicate
            // geometry is handled by snapping and the degenerate filter.
            if let Some(LineIntersection::SinglePoint { intersection, .. }) =
                line_intersection(seg, other)
            {
                splits.push((param_along(&seg, intersection), intersection));
            }
        }
        splits.sort_by(|a, b| a.0.total_cmp(&b.0));
        splits.dedup_by(|a, b| (a.0 - b.0).abs() < PARAM_EPS);

        let mut mark_next = false;
        for (t, coord) in splits {
            if t <= PARAM_EPS {
                // Intersection at the segment start: promote that vertex.
                marked.last_mut().expect("non-empty").1 = true;
            } else if t >= 1.0 - PARAM_EPS {
                mark_next = true;
            } else {
                marked.push((coord, true));
            }
        }
        let is_last = seg_idx + 2 == coords.len();
        marked.push((coords[seg_idx + 1], mark_next || is_last));
    }
    marked
}

fn cut_chains(line: &LineGeometry, marked: Vec<(Coord<f64>, bool)>) -> Vec<Chain> {
    let mut chains = Vec::new();
    let mut current: Vec<Coord<f64>> = Vec::new();
    for (i, (coord, candidate)) in marked.iter().enumerate() {
        current.push(*coord);
        if *candidate && i > 0 {
            chains.push(Chain {
                coords: std::mem::take(&mut current),
                cost_factor: line.cost_factor,
                oneway: line.oneway,
            });
            current.push(*coord);
        }
    }
    chains
}

struct Clusters {
    /// Node position per cluster, in creation (= node id) order
    centroids: Vec<Coord<f64>>,
    /// Candidate coordinate (bit pattern) to cluster index
    assignment: HashMap<(u64, u64), usize>,
}

fn cluster_endpoints(chains: &[Chain], tolerance: f64) -> Clusters {
    let mut candidates: Vec<Coord<f64>> = chains
        .iter()
        .flat_map(|c| [c.coords[0], *c.coords.last().expect("chain has coords")])
        .collect();
    candidates.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    candidates.dedup_by(|a, b| a.x == b.x && a.y == b.y);

    struct Cluster {
        seed: Coord<f64>,
        sum: Coord<f64>,
        count: usize,
    }
    impl Cluster {
        fn centroid(&self) -> Coord<f64> {
            Coord {
                x: self.sum.x / self.count as f64,
                y: self.sum.y / self.count as f64,
            }
        }
    }

    let mut clusters: Vec<Cluster> = Vec::new();
    // Indexes live centroids; each merge moves one, so the entry is
    // reinserted at its new position.
    let mut centroids: RTree<GeomWithData<[f64; 2], usize>> = RTree::new();
    let mut assignment = HashMap::new();

    for coord in candidates {
        let best = centroids
            .locate_within_distance([coord.x, coord.y], tolerance * tolerance)
            .map(|item| (*item.geom(), item.data))
            .min_by(|(ca, ia), (cb, ib)| {
                let da = (ca[0] - coord.x).hypot(ca[1] - coord.y);
                let db = (cb[0] - coord.x).hypot(cb[1] - coord.y);
                da.total_cmp(&db).then_with(|| {
                    let sa = clusters[*ia].seed;
                    let sb = clusters[*ib].seed;
                    sa.x.total_cmp(&sb.x).then(sa.y.total_cmp(&sb.y))
                })
            });

        match best {
            Some((at, idx)) => {
                let cluster = &mut clusters[idx];
                cluster.sum.x += coord.x;
                cluster.sum.y += coord.y;
                cluster.count += 1;
                let moved = cluster.centroid();
                centroids.remove(&GeomWithData::new(at, idx));
                centroids.insert(GeomWithData::new([moved.x, moved.y], idx));
                assignment.insert(coord_key(coord), idx);
            }
            None => {
                let idx = clusters.len();
                clusters.push(Cluster {
                    seed: coord,
                    sum: coord,
                    count: 1,
                });
                centroids.insert(GeomWithData::new([coord.x, coord.y], idx));
                assignment.insert(coord_key(coord), idx);
            }
        }
    }

    Clusters {
        centroids: clusters.iter().map(Cluster::centroid).collect(),
        assignment,
    }
}

/// Chain geometry with endpoints replaced by their snapped node
/// positions; `None` when snapping collapses the whole chain.
fn chain_geometry(chain: &Chain, start: Coord<f64>, end: Coord<f64>) -> Option<LineString<f64>> {
    let mut coords = chain.coords.clone();
    *coords.first_mut()? = start;
    *coords.last_mut()? = end;
    coords.dedup_by(|a, b| a.x == b.x && a.y == b.y);
    (coords.len() >= 2).then(|| LineString::new(coords))
}

fn segment_corners(seg: &Line<f64>) -> ([f64; 2], [f64; 2]) {
    (
        [seg.start.x.min(seg.end.x), seg.start.y.min(seg.end.y)],
        [seg.start.x.max(seg.end.x), seg.start.y.max(seg.end.y)],
    )
}

fn nth_segment(line: &LineString<f64>, n: usize) -> Line<f64> {
    Line::new(line.0[n], line.0[n + 1])
}

fn param_along(seg: &Line<f64>, coord: Coord<f64>) -> f64 {
    let dx = seg.end.x - seg.start.x;
    let dy = seg.end.y - seg.start.y;
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        0.0
    } else {
        ((coord.x - seg.start.x) * dx + (coord.y - seg.start.y) * dy) / len2
    }
}

fn coord_key(coord: Coord<f64>) -> (u64, u64) {
    (coord.x.to_bits(), coord.y.to_bits())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TravelMode;

    fn line(coords: &[(f64, f64)]) -> LineGeometry {
        LineGeometry {
            geometry: LineString::new(coords.iter().map(|&(x, y)| Coord { x, y }).collect()),
            cost_factor: 1.0,
            oneway: false,
        }
    }

    fn config() -> AnalysisConfig {
        AnalysisConfig::default()
    }

    #[test]
    fn builds_single_segment() {
        let network = build_network(&[line(&[(0.0, 0.0), (100.0, 0.0)])], &config()).unwrap();
        assert_eq!(network.node_count(), 2);
        assert_eq!(network.edge_count(), 1);
        assert_eq!(network.arc_count(), 2);
        assert_eq!(network.component_count(), 1);
    }

    #[test]
    fn every_arc_references_nodes_of_the_graph() {
        let network = build_network(
            &[
                line(&[(0.0, 0.0), (100.0, 0.0), (100.0, 100.0)]),
                line(&[(100.0, 0.0), (200.0, 0.0)]),
            ],
            &config(),
        )
        .unwrap();
        for edge in network.graph().edge_indices() {
            let (a, b) = network.graph().edge_endpoints(edge).unwrap();
            assert!(network.graph().node_weight(a).is_some());
            assert!(network.graph().node_weight(b).is_some());
        }
    }

    #[test]
    fn snaps_nearby_endpoints_into_one_node() {
        // Second line starts 0.5 away from the first line's end.
        let network = build_network(
            &[
                line(&[(0.0, 0.0), (100.0, 0.0)]),
                line(&[(100.5, 0.0), (200.0, 0.0)]),
            ],
            &config(),
        )
        .unwrap();
        assert_eq!(network.node_count(), 3);
        assert_eq!(network.component_count(), 1);
    }

    #[test]
    fn gap_wider_than_tolerance_stays_disconnected() {
        let network = build_network(
            &[
                line(&[(0.0, 0.0), (100.0, 0.0)]),
                line(&[(105.0, 0.0), (200.0, 0.0)]),
            ],
            &config(),
        )
        .unwrap();
        assert_eq!(network.node_count(), 4);
        assert_eq!(network.component_count(), 2);
    }

    #[test]
    fn crossing_lines_share_an_intersection_node() {
        let network = build_network(
            &[
                line(&[(-50.0, 0.0), (50.0, 0.0)]),
                line(&[(0.0, -50.0), (0.0, 50.0)]),
            ],
            &config(),
        )
        .unwrap();
        // Four endpoints plus the crossing, each crossing leg a segment.
        assert_eq!(network.node_count(), 5);
        assert_eq!(network.edge_count(), 4);
        assert_eq!(network.component_count(), 1);
    }

    #[test]
    fn t_junction_splits_the_crossed_line() {
        let network = build_network(
            &[
                line(&[(-50.0, 0.0), (50.0, 0.0)]),
                line(&[(0.0, 0.0), (0.0, 50.0)]),
            ],
            &config(),
        )
        .unwrap();
        assert_eq!(network.node_count(), 4);
        assert_eq!(network.edge_count(), 3);
        assert_eq!(network.component_count(), 1);
    }

    #[test]
    fn duplicate_geometry_is_dropped_as_degenerate() {
        // The duplicate collapses onto the same pair of snapped nodes with
        // near-zero residual length once endpoints merge.
        let network = build_network(
            &[
                line(&[(0.0, 0.0), (100.0, 0.0)]),
                line(&[(0.0, 0.0), (0.005, 0.0)]),
            ],
            &config(),
        )
        .unwrap();
        assert_eq!(network.node_count(), 2);
        assert_eq!(network.edge_count(), 1);
    }

    #[test]
    fn fewer_than_two_nodes_yields_empty_network() {
        let network = build_network(
            &[line(&[(0.0, 0.0), (0.5, 0.0)])],
            &config(),
        )
        .unwrap();
        assert!(network.is_empty());
        assert_eq!(network.edge_count(), 0);
    }

    #[test]
    fn no_lines_yields_empty_network() {
        let network = build_network(&[], &config()).unwrap();
        assert!(network.is_empty());
    }

    #[test]
    fn oneway_line_produces_single_arc() {
        let mut l = line(&[(0.0, 0.0), (100.0, 0.0)]);
        l.oneway = true;
        let network = build_network(&[l], &config()).unwrap();
        assert_eq!(network.edge_count(), 1);
        assert_eq!(network.arc_count(), 1);
    }

    #[test]
    fn cost_factor_scales_mode_costs() {
        let mut l = line(&[(0.0, 0.0), (100.0, 0.0)]);
        l.cost_factor = 1.5;
        let network = build_network(&[l], &config()).unwrap();
        let edge = network.graph().edge_indices().next().unwrap();
        let weight = network.graph().edge_weight(edge).unwrap();
        assert!((weight.length - 100.0).abs() < 1e-9);
        assert!((weight.cost(TravelMode::Walk) - 150.0).abs() < 1e-9);
        assert!((weight.cost(TravelMode::Bike) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn merge_follows_the_drifting_centroid() {
        // Five parallel lines whose endpoints merge one after another; the
        // running centroid ends up more than one tolerance from the first
        // endpoint, and the last endpoint is within tolerance of the
        // centroid only. All five must still collapse onto one node pair.
        let xs = [0.0, 0.95, 1.45, 1.78, 2.04];
        let lines: Vec<LineGeometry> = xs
            .iter()
            .map(|&x| line(&[(x, 0.0), (x, 100.0)]))
            .collect();
        let network = build_network(&lines, &config()).unwrap();
        assert_eq!(network.node_count(), 2);
        assert_eq!(network.edge_count(), 5);
        assert_eq!(network.component_count(), 1);
    }

    #[test]
    fn node_set_is_stable_under_input_permutation() {
        let a = line(&[(0.0, 0.0), (100.0, 0.0)]);
        let b = line(&[(100.4, 0.2), (200.0, 0.0)]);
        let c = line(&[(50.0, -50.0), (50.0, 50.0)]);

        let forward = build_network(&[a.clone(), b.clone(), c.clone()], &config()).unwrap();
        let backward = build_network(&[c, b, a], &config()).unwrap();

        let coords = |n: &Network| {
            let mut v: Vec<(f64, f64)> = n
                .graph()
                .node_indices()
                .map(|i| {
                    let p = n.node(i).geometry;
                    (p.x(), p.y())
                })
                .collect();
            v.sort_by(|p, q| p.0.total_cmp(&q.0).then(p.1.total_cmp(&q.1)));
            v
        };
        assert_eq!(forward.node_count(), backward.node_count());
        assert_eq!(forward.edge_count(), backward.edge_count());
        assert_eq!(coords(&forward), coords(&backward));
    }
}
