use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid geometry: {0}")]
    GeometryError(String),
    #[error("Projection error: {0}")]
    ProjectionError(String),
    #[error(
        "Origin `{origin_id}` is {distance:.1} from the nearest network node (max snap distance {max_snap_distance:.1})"
    )]
    OriginUnreachable {
        origin_id: String,
        distance: f64,
        max_snap_distance: f64,
    },
    #[error("No geometry for area `{0}`")]
    AreaGeometryMissing(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("GeoJSON error: {0}")]
    GeoJsonError(String),
}
