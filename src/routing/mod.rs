//! Shortest-path search over the network

pub mod dijkstra;

pub use dijkstra::bounded_path_costs;
