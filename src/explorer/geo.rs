//! Joins the per-country averages with geographic data for the map view.
//!
//! Countries that cannot be placed are left out of the map: a missing
//! location never fails a report.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::explorer::*;

/// Initial view of the map, roughly centred on Africa.
pub const MAP_CENTER: (f64, f64) = (7.18805555556, 21.0936111111);
pub const MAP_ZOOM: u32 = 2;

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
struct LocationRow {
    country: String,
    lat: f64,
    lon: f64,
}

/// Coordinates of the countries, read once from a `country,lat,lon` file.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct LocationTable {
    coordinates: HashMap<String, (f64, f64)>,
}

impl LocationTable {
    pub fn read(path: &str) -> ExplorerResult<LocationTable> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .context(CsvOpenSnafu { path })?;
        let mut coordinates = HashMap::new();
        for (idx, row_r) in rdr.deserialize::<LocationRow>().enumerate() {
            // The header is line 1.
            let lineno = idx + 2;
            let row = row_r.context(CsvLineParseSnafu { path, lineno })?;
            if coordinates
                .insert(row.country.clone(), (row.lat, row.lon))
                .is_some()
            {
                warn!("LocationTable: {:?} is listed twice in {}, keeping the last one", row.country, path);
            }
        }
        info!("LocationTable: {} locations read from {}", coordinates.len(), path);
        Ok(LocationTable { coordinates })
    }

    pub fn from_pairs(pairs: &[(&str, f64, f64)]) -> LocationTable {
        LocationTable {
            coordinates: pairs
                .iter()
                .map(|(c, lat, lon)| (c.to_string(), (*lat, *lon)))
                .collect(),
        }
    }

    pub fn locate(&self, country: &str) -> Option<(f64, f64)> {
        self.coordinates.get(country.trim()).copied()
    }
}

/// The country names of a GeoJSON FeatureCollection, as found in the
/// `admin` property of each feature.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct BoundarySet {
    names: HashSet<String>,
}

impl BoundarySet {
    pub fn read(path: &str) -> ExplorerResult<BoundarySet> {
        let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
        let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
        let res = BoundarySet::from_geojson(&js).context(InvalidGeoJsonSnafu { path })?;
        info!("BoundarySet: {} boundaries read from {}", res.len(), path);
        Ok(res)
    }

    /// None if the document is not a collection of features.
    pub fn from_geojson(js: &JSValue) -> Option<BoundarySet> {
        let features = js.get("features")?.as_array()?;
        let mut names = HashSet::new();
        for feature in features {
            match feature.pointer("/properties/admin").and_then(|v| v.as_str()) {
                Some(name) => {
                    names.insert(name.to_string());
                }
                None => debug!("BoundarySet: feature without admin name"),
            }
        }
        Some(BoundarySet { names })
    }

    pub fn contains(&self, country: &str) -> bool {
        self.names.contains(country)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }
}

/// A marker on the map.
#[derive(PartialEq, Debug, Clone)]
pub struct MapPoint {
    pub country: String,
    pub lat: f64,
    pub lon: f64,
    pub value: f64,
    /// The value on the colour scale of the markers.
    pub colour: f64,
    /// Markers grow with the value.
    pub size: f64,
}

/// One marker per country of the table that has a location.
pub fn map_points(table: &SummaryTable, metric: &str, locations: &LocationTable) -> Vec<MapPoint> {
    let mut res = Vec::new();
    for row in table.rows.iter() {
        let value = match table.value(&row.country, metric) {
            Some(v) => v,
            None => continue,
        };
        match locations.locate(&row.country) {
            Some((lat, lon)) => res.push(MapPoint {
                country: row.country.clone(),
                lat,
                lon,
                value,
                colour: value * 100.0,
                size: value,
            }),
            None => warn!("map_points: no location for {:?}", row.country),
        }
    }
    res
}

/// The `(country, value)` pairs of the countries that have a boundary.
pub fn choropleth(table: &SummaryTable, metric: &str, boundaries: &BoundarySet) -> Vec<(String, f64)> {
    let mut res = Vec::new();
    for row in table.rows.iter() {
        match table.value(&row.country, metric) {
            Some(v) if boundaries.contains(&row.country) => res.push((row.country.clone(), v)),
            Some(_) => debug!("choropleth: no boundary for {:?}", row.country),
            None => {}
        }
    }
    res
}
