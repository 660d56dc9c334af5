//! Coordinate reference system handling.
//!
//! Downstream distance math is Euclidean, so every input is brought onto
//! one canonical metric plane. Geographic coordinates (EPSG:4326) are
//! projected onto a local equirectangular plane anchored at the centre of
//! the input extent; recognized projected metric systems pass through
//! unchanged.

use geo::Coord;

use crate::Error;

/// Mean Earth radius in metres (IUGG)
const EARTH_RADIUS: f64 = 6_371_008.8;

/// Recognized coordinate reference systems
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crs {
    /// EPSG:4326, longitude/latitude degrees; requires reprojection
    Geographic,
    /// A projected system with metre units, used as-is
    ProjectedMetric(u32),
}

impl Crs {
    /// Parses an `EPSG:<code>` identifier.
    ///
    /// Accepted metric systems: WGS84 UTM (326xx/327xx), ETRS89 UTM
    /// (25832/25833) and TUREF TM30 (5253). Anything else fails - guessing
    /// units here would silently corrupt every distance downstream.
    pub fn parse(identifier: &str) -> Result<Self, Error> {
        let code = identifier
            .trim()
            .strip_prefix("EPSG:")
            .or_else(|| identifier.trim().strip_prefix("epsg:"))
            .ok_or_else(|| {
                Error::ProjectionError(format!(
                    "expected an `EPSG:<code>` identifier, got `{identifier}`"
                ))
            })?
            .parse::<u32>()
            .map_err(|_| {
                Error::ProjectionError(format!("malformed EPSG code in `{identifier}`"))
            })?;

        match code {
            4326 => Ok(Self::Geographic),
            5253 | 25832 | 25833 | 32601..=32660 | 32701..=32760 => {
                Ok(Self::ProjectedMetric(code))
            }
            other => Err(Error::ProjectionError(format!(
                "unsupported CRS EPSG:{other}"
            ))),
        }
    }
}

/// Reprojects coordinates of one declared CRS onto the canonical plane.
///
/// A single `Projector` is shared by every input of one analysis run so
/// that geometries, origins and area polygons land on the same plane.
#[derive(Debug, Clone, Copy)]
pub struct Projector {
    crs: Crs,
    /// Plane anchor in degrees, meaningful for geographic input only
    anchor: Coord<f64>,
}

impl Projector {
    pub fn new(crs: Crs, anchor: Coord<f64>) -> Self {
        Self { crs, anchor }
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    /// Projects a single coordinate pair onto the canonical plane.
    pub fn project(&self, x: f64, y: f64) -> Result<Coord<f64>, Error> {
        if !x.is_finite() || !y.is_finite() {
            return Err(Error::ProjectionError(format!(
                "non-finite coordinate ({x}, {y})"
            )));
        }
        match self.crs {
            Crs::ProjectedMetric(_) => Ok(Coord { x, y }),
            Crs::Geographic => {
                if !(-180.0..=180.0).contains(&x) || !(-90.0..=90.0).contains(&y) {
                    return Err(Error::ProjectionError(format!(
                        "({x}, {y}) is outside valid longitude/latitude ranges"
                    )));
                }
                let lat0 = self.anchor.y.to_radians();
                Ok(Coord {
                    x: EARTH_RADIUS * (x - self.anchor.x).to_radians() * lat0.cos(),
                    y: EARTH_RADIUS * (y - self.anchor.y).to_radians(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_geographic_and_metric_codes() {
        assert_eq!(Crs::parse("EPSG:4326").unwrap(), Crs::Geographic);
        assert_eq!(
            Crs::parse("epsg:32635").unwrap(),
            Crs::ProjectedMetric(32635)
        );
        assert_eq!(Crs::parse(" EPSG:5253 ").unwrap(), Crs::ProjectedMetric(5253));
    }

    #[test]
    fn rejects_unknown_or_malformed_crs() {
        assert!(matches!(
            Crs::parse("EPSG:3857"),
            Err(Error::ProjectionError(_))
        ));
        assert!(matches!(Crs::parse("WGS84"), Err(Error::ProjectionError(_))));
        assert!(matches!(Crs::parse(""), Err(Error::ProjectionError(_))));
    }

    #[test]
    fn metric_crs_passes_through() {
        let projector = Projector::new(Crs::ProjectedMetric(32635), Coord { x: 0.0, y: 0.0 });
        let c = projector.project(1500.0, -320.0).unwrap();
        assert_eq!(c, Coord { x: 1500.0, y: -320.0 });
    }

    #[test]
    fn local_plane_preserves_small_distances() {
        // Anchor near Istanbul; one millidegree of latitude is ~111 m.
        let projector = Projector::new(Crs::Geographic, Coord { x: 29.0, y: 41.0 });
        let a = projector.project(29.0, 41.0).unwrap();
        let b = projector.project(29.0, 41.001).unwrap();
        let d = (b.y - a.y).hypot(b.x - a.x);
        assert!((d - 111.2).abs() < 1.0, "got {d}");
    }

    #[test]
    fn rejects_out_of_range_geographic_coordinates() {
        let projector = Projector::new(Crs::Geographic, Coord { x: 0.0, y: 0.0 });
        assert!(projector.project(181.0, 0.0).is_err());
        assert!(projector.project(0.0, f64::NAN).is_err());
    }
}
