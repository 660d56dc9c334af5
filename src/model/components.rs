//! Network components - nodes, edges, travel modes and origins

use geo::{LineString, Point};
use serde::{Deserialize, Serialize};

use crate::{NodeId, SegmentId};

/// Cycling traverses a unit of network length at a third of the walking
/// cost (5 km/h walking against 15 km/h cycling).
pub const BIKE_COST_FACTOR: f64 = 5.0 / 15.0;

/// Travel mode selecting the per-unit-length traversal cost profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    Walk,
    Bike,
}

/// Graph node at a snapped candidate coordinate
#[derive(Debug, Clone)]
pub struct NetworkNode {
    /// Stable id assigned during graph build
    pub id: NodeId,
    /// Node coordinates on the canonical plane
    pub geometry: Point<f64>,
}

/// Directed arc of the network. Two-way street segments are stored as
/// twin arcs sharing a `segment` id.
#[derive(Debug, Clone)]
pub struct NetworkEdge {
    /// Undirected segment this arc belongs to
    pub segment: SegmentId,
    /// Euclidean length on the canonical plane
    pub length: f64,
    /// Traversal cost on foot (length scaled by the surface factor)
    pub walk_cost: f64,
    /// Traversal cost by bike
    pub bike_cost: f64,
    /// Arc geometry, oriented source to target
    pub geometry: LineString<f64>,
}

impl NetworkEdge {
    pub fn cost(&self, mode: TravelMode) -> f64 {
        match mode {
            TravelMode::Walk => self.walk_cost,
            TravelMode::Bike => self.bike_cost,
        }
    }
}

/// An amenity or population centroid from which reachability is computed.
#[derive(Debug, Clone)]
pub struct Origin {
    pub id: String,
    /// Amenity category, e.g. "green_space" or "transit_stop"
    pub category: String,
    /// Location on the canonical plane
    pub geometry: Point<f64>,
    /// Optional weight (e.g. population served)
    pub weight: Option<f64>,
}
