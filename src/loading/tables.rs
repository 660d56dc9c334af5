//! Tabular inputs: the amenity/origin registry and the population table.

use std::io::Read;

use hashbrown::HashMap;
use log::debug;
use serde::Deserialize;

use super::projection::Projector;
use crate::{Error, model::Origin};

/// Recorded population per area id.
pub type PopulationTable = HashMap<String, f64>;

#[derive(Debug, Deserialize)]
struct RawOrigin {
    id: String,
    category: String,
    x: f64,
    y: f64,
    weight: Option<f64>,
}

/// Reads the origin registry (`id,category,x,y[,weight]`) and projects
/// coordinates onto the canonical plane of this run.
pub fn load_origins<R: Read>(reader: R, projector: &Projector) -> Result<Vec<Origin>, Error> {
    let mut origins = Vec::new();
    for record in csv::Reader::from_reader(reader).deserialize() {
        let raw: RawOrigin = record?;
        if !raw.x.is_finite() || !raw.y.is_finite() {
            return Err(Error::GeometryError(format!(
                "origin `{}` has non-finite coordinates ({}, {})",
                raw.id, raw.x, raw.y
            )));
        }
        if let Some(weight) = raw.weight
            && (!weight.is_finite() || weight < 0.0)
        {
            return Err(Error::InvalidData(format!(
                "origin `{}` has invalid weight {weight}",
                raw.id
            )));
        }
        origins.push(Origin {
            geometry: projector.project(raw.x, raw.y)?.into(),
            id: raw.id,
            category: raw.category,
            weight: raw.weight,
        });
    }
    debug!("Loaded {} origin(s)", origins.len());
    Ok(origins)
}

#[derive(Debug, Deserialize)]
struct RawPopulation {
    area_id: String,
    population: f64,
}

/// Reads the population table (`area_id,population`).
pub fn load_population<R: Read>(reader: R) -> Result<PopulationTable, Error> {
    let mut table = PopulationTable::new();
    for record in csv::Reader::from_reader(reader).deserialize() {
        let raw: RawPopulation = record?;
        if !raw.population.is_finite() || raw.population < 0.0 {
            return Err(Error::InvalidData(format!(
                "area `{}` has invalid population {}",
                raw.area_id, raw.population
            )));
        }
        table.insert(raw.area_id, raw.population);
    }
    debug!("Loaded population for {} area(s)", table.len());
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loading::projection::Crs;
    use geo::Coord;

    fn metric_projector() -> Projector {
        Projector::new(Crs::ProjectedMetric(32635), Coord { x: 0.0, y: 0.0 })
    }

    #[test]
    fn loads_origins_with_optional_weight() {
        let csv = "id,category,x,y,weight\n\
                   p1,green_space,10.0,20.0,150\n\
                   p2,transit_stop,30.0,40.0,\n";
        let origins = load_origins(csv.as_bytes(), &metric_projector()).unwrap();
        assert_eq!(origins.len(), 2);
        assert_eq!(origins[0].category, "green_space");
        assert_eq!(origins[0].weight, Some(150.0));
        assert_eq!(origins[1].weight, None);
        assert_eq!(origins[1].geometry.x(), 30.0);
    }

    #[test]
    fn rejects_malformed_origin_row() {
        let csv = "id,category,x,y,weight\np1,park,not-a-number,2.0,\n";
        assert!(matches!(
            load_origins(csv.as_bytes(), &metric_projector()),
            Err(Error::CsvError(_))
        ));
    }

    #[test]
    fn rejects_negative_origin_weight() {
        let csv = "id,category,x,y,weight\np1,park,1.0,2.0,-5\n";
        assert!(matches!(
            load_origins(csv.as_bytes(), &metric_projector()),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn loads_population_table() {
        let csv = "area_id,population\nA,1200\nB,0\n";
        let table = load_population(csv.as_bytes()).unwrap();
        assert_eq!(table.get("A"), Some(&1200.0));
        assert_eq!(table.get("B"), Some(&0.0));
    }

    #[test]
    fn rejects_negative_population() {
        let csv = "area_id,population\nA,-3\n";
        assert!(matches!(
            load_population(csv.as_bytes()),
            Err(Error::InvalidData(_))
        ));
    }
}
