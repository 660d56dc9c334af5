// Re-export key components
pub use crate::algo::isochrone::{Isochrone, bulk_isochrones, compute_isochrone};
pub use crate::algo::score::{
    AccessibilityScore, AreaIndex, CoverageBasis, ScoreSet, Zone, score_accessibility,
};
pub use crate::analysis::{AccessibilityReport, run_accessibility};
pub use crate::loading::{
    AnalysisConfig, Crs, GeometrySet, LineGeometry, PopulationTable, Projector, RawGeometries,
    RawLine, RawPoint, RawPolygon, build_network, load_geometries, load_origins, load_population,
};
pub use crate::model::{Network, NetworkEdge, NetworkNode, Origin, TravelMode};
pub use crate::output::{
    NetworkSummary, indices_to_csv, isochrones_from_geojson_str, isochrones_to_geojson,
    isochrones_to_geojson_string, network_summary, scores_to_csv, scores_to_json,
};

// Core identifier types
pub use crate::Error;
pub use crate::{NodeId, SegmentId};
