//! Routable network: petgraph graph plus an R-tree over node positions

use geo::Point;
use petgraph::algo::connected_components;
use petgraph::graph::{DiGraph, NodeIndex};
use rstar::RTree;
use rstar::primitives::GeomWithData;

use super::components::{NetworkEdge, NetworkNode};

/// Node position indexed for nearest-neighbour queries
pub type IndexedPoint = GeomWithData<[f64; 2], NodeIndex>;

/// Routable walk/bike network.
///
/// Owns its nodes and edges; read-only once built. The graph may be
/// disconnected - isolated path networks are a legitimate state, and
/// component count is part of the summary rather than an error.
#[derive(Debug, Default)]
pub struct Network {
    graph: DiGraph<NetworkNode, NetworkEdge>,
    rtree: RTree<IndexedPoint>,
    segment_count: u64,
}

impl Network {
    pub(crate) fn new(
        graph: DiGraph<NetworkNode, NetworkEdge>,
        rtree: RTree<IndexedPoint>,
        segment_count: u64,
    ) -> Self {
        Self {
            graph,
            rtree,
            segment_count,
        }
    }

    pub fn graph(&self) -> &DiGraph<NetworkNode, NetworkEdge> {
        &self.graph
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of undirected street segments (twin arcs counted once)
    pub fn edge_count(&self) -> u64 {
        self.segment_count
    }

    /// Number of directed arcs stored in the graph
    pub fn arc_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Number of weakly connected components
    pub fn component_count(&self) -> usize {
        connected_components(&self.graph)
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn node(&self, index: NodeIndex) -> &NetworkNode {
        &self.graph[index]
    }

    /// Nearest network node to a point, with its Euclidean distance.
    ///
    /// Equidistant candidates resolve to the lowest node id so that
    /// origin snapping is deterministic.
    pub fn nearest_node(&self, point: &Point<f64>) -> Option<(NodeIndex, f64)> {
        let query = [point.x(), point.y()];
        let mut nearest = self.rtree.nearest_neighbor_iter(&query);
        let first = nearest.next()?;
        let best_dist = distance(first.geom(), &query);
        let mut best = first.data;

        for item in nearest {
            if distance(item.geom(), &query) > best_dist + f64::EPSILON {
                break;
            }
            if item.data.index() < best.index() {
                best = item.data;
            }
        }
        Some((best, best_dist))
    }
}

fn distance(a: &[f64; 2], b: &[f64; 2]) -> f64 {
    (a[0] - b[0]).hypot(a[1] - b[1])
}
