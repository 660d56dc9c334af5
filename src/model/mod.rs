//! Data model for the walk/bike accessibility network

pub mod components;
pub mod network;

pub use components::{NetworkEdge, NetworkNode, Origin, TravelMode};
pub use network::{IndexedPoint, Network};
