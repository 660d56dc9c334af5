//! Spatial network accessibility engine.
//!
//! Builds a routable pedestrian/cycling graph from raw line geometries,
//! computes travel-budget-bounded reachability (isochrones) per origin,
//! and aggregates per-area accessibility scores for amenity categories.

pub mod algo;
pub mod analysis;
pub mod error;
pub mod loading;
pub mod model;
pub mod output;
pub mod prelude;
pub mod routing;

pub use error::Error;

/// Stable identifier of a network node, assigned at build time.
pub type NodeId = u64;
/// Identifier of an undirected street segment; twin arcs share one id.
pub type SegmentId = u64;

pub use model::{Network, NetworkEdge, NetworkNode, Origin, TravelMode};
