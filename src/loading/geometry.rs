//! Geometry loader: raw coordinate records to validated primitives on the
//! canonical plane.

use geo::{Coord, LineString, Point, Polygon};
use log::debug;

use super::projection::{Crs, Projector};
use crate::Error;

/// A raw path segment as delivered by the ingestion collaborator.
#[derive(Debug, Clone, Default)]
pub struct RawLine {
    pub coords: Vec<(f64, f64)>,
    /// Surface/slope multiplier applied to traversal cost
    pub cost_factor: Option<f64>,
    /// Set when the source geometry encodes one-way travel
    pub oneway: bool,
}

#[derive(Debug, Clone)]
pub struct RawPoint {
    pub coord: (f64, f64),
}

#[derive(Debug, Clone)]
pub struct RawPolygon {
    pub exterior: Vec<(f64, f64)>,
}

/// Raw geometric records grouped by type, with one declared CRS.
#[derive(Debug, Clone, Default)]
pub struct RawGeometries {
    pub crs: String,
    pub lines: Vec<RawLine>,
    pub points: Vec<RawPoint>,
    pub polygons: Vec<RawPolygon>,
}

impl RawGeometries {
    pub fn new(crs: impl Into<String>) -> Self {
        Self {
            crs: crs.into(),
            ..Self::default()
        }
    }
}

/// A validated path segment, source of graph edges.
#[derive(Debug, Clone)]
pub struct LineGeometry {
    pub geometry: LineString<f64>,
    pub cost_factor: f64,
    pub oneway: bool,
}

/// Validated geometries on the canonical plane.
#[derive(Debug, Clone, Default)]
pub struct GeometrySet {
    pub lines: Vec<LineGeometry>,
    pub points: Vec<Point<f64>>,
    pub polygons: Vec<Polygon<f64>>,
}

/// Validates and reprojects raw records.
///
/// Fails with [`Error::GeometryError`] on a line with fewer than two
/// coordinates, a polygon ring with fewer than three, any non-finite
/// coordinate, or a non-positive cost factor, and with
/// [`Error::ProjectionError`] on an unrecognized CRS. Pure transform.
///
/// The returned [`Projector`] must be reused for origins and area
/// polygons so that all inputs share one plane.
pub fn load_geometries(raw: &RawGeometries) -> Result<(GeometrySet, Projector), Error> {
    let crs = Crs::parse(&raw.crs)?;
    let projector = Projector::new(crs, anchor_of(raw)?);

    let mut set = GeometrySet::default();

    for (index, line) in raw.lines.iter().enumerate() {
        if line.coords.len() < 2 {
            return Err(Error::GeometryError(format!(
                "line {index} has {} coordinate(s), need at least 2",
                line.coords.len()
            )));
        }
        let cost_factor = line.cost_factor.unwrap_or(1.0);
        if !cost_factor.is_finite() || cost_factor <= 0.0 {
            return Err(Error::GeometryError(format!(
                "line {index} has invalid cost factor {cost_factor}"
            )));
        }
        set.lines.push(LineGeometry {
            geometry: project_ring(&projector, &line.coords, index, "line")?,
            cost_factor,
            oneway: line.oneway,
        });
    }

    for (index, point) in raw.points.iter().enumerate() {
        let (x, y) = point.coord;
        check_finite(x, y, index, "point")?;
        set.points.push(projector.project(x, y)?.into());
    }

    for (index, polygon) in raw.polygons.iter().enumerate() {
        if polygon.exterior.len() < 3 {
            return Err(Error::GeometryError(format!(
                "polygon {index} has {} coordinate(s), need at least 3",
                polygon.exterior.len()
            )));
        }
        let ring = project_ring(&projector, &polygon.exterior, index, "polygon")?;
        set.polygons.push(Polygon::new(ring, vec![]));
    }

    debug!(
        "Loaded {} lines, {} points, {} polygons ({:?})",
        set.lines.len(),
        set.points.len(),
        set.polygons.len(),
        crs
    );
    Ok((set, projector))
}

fn project_ring(
    projector: &Projector,
    coords: &[(f64, f64)],
    index: usize,
    kind: &str,
) -> Result<LineString<f64>, Error> {
    let mut projected = Vec::with_capacity(coords.len());
    for &(x, y) in coords {
        check_finite(x, y, index, kind)?;
        projected.push(projector.project(x, y)?);
    }
    Ok(LineString::new(projected))
}

fn check_finite(x: f64, y: f64, index: usize, kind: &str) -> Result<(), Error> {
    if x.is_finite() && y.is_finite() {
        Ok(())
    } else {
        Err(Error::GeometryError(format!(
            "{kind} {index} contains non-finite coordinate ({x}, {y})"
        )))
    }
}

/// Centre of the raw input extent, the anchor of the local plane for
/// geographic input. Deterministic for identical inputs.
fn anchor_of(raw: &RawGeometries) -> Result<Coord<f64>, Error> {
    let mut min = (f64::INFINITY, f64::INFINITY);
    let mut max = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    let coords = raw
        .lines
        .iter()
        .flat_map(|l| l.coords.iter())
        .chain(raw.points.iter().map(|p| &p.coord))
        .chain(raw.polygons.iter().flat_map(|p| p.exterior.iter()));

    let mut seen = false;
    for &(x, y) in coords {
        if !x.is_finite() || !y.is_finite() {
            continue; // reported with its record during validation
        }
        seen = true;
        min = (min.0.min(x), min.1.min(y));
        max = (max.0.max(x), max.1.max(y));
    }
    if seen {
        Ok(Coord {
            x: (min.0 + max.0) / 2.0,
            y: (min.1 + max.1) / 2.0,
        })
    } else {
        Ok(Coord { x: 0.0, y: 0.0 })
    }
}
