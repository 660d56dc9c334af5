//! Loading of raw geometric and tabular inputs and construction of the
//! routable network.

mod builder;
mod config;
mod geometry;
mod projection;
mod tables;

pub use builder::build_network;
pub use config::AnalysisConfig;
pub use geometry::{GeometrySet, LineGeometry, RawGeometries, RawLine, RawPoint, RawPolygon, load_geometries};
pub use projection::{Crs, Projector};
pub use tables::{PopulationTable, load_origins, load_population};
