/*!
Turns the coverage records of a preventive-chemotherapy dataset into
chart series and summary tables.

The pipeline has three steps:
* a [`Dataset`] is built once from the rows of a source with
  [`builder::Builder`] (or [`builder::load_rows`]), following a
  [`schema::Schema`],
* a [`Selection`] of countries and years picks a [`Subset`] with [`select`],
* the subset is turned into [`Series`] with [`series`] or into per-country
  averages with [`averages`].

```
use coverage_pipeline::*;
use coverage_pipeline::schema::LF;

let mut rows: Vec<Vec<Cell>> = vec![LF
    .required_columns()
    .iter()
    .map(|c| Cell::Text(c.to_string()))
    .collect()];
for (country, year, cov) in [("Mali", 2009, 50.0), ("Mali", 2010, 70.0), ("Ethiopia", 2009, 40.0)] {
    rows.push(vec![
        Cell::Text(country.to_string()),
        Cell::Number(year as f64),
        Cell::Text("AFR".to_string()),
        Cell::Empty,
        Cell::Empty,
        Cell::Number(cov),
    ]);
}
let dataset = builder::load_rows(&LF, rows)?;

let selection = Selection::new(&["Mali", "Ethiopia"], YearRange::new(2009, 2011));
let subset = select(&dataset, &selection);
let table = averages(&subset);
assert_eq!(table.value("Mali", "Programme (drug) coverage"), Some(60.0));
# Ok::<(), LoadError>(())
```
*/

mod config;
pub mod builder;
pub mod cache;
pub mod manual;
pub mod schema;

use log::{debug, info};

use std::collections::HashSet;

pub use crate::config::*;

/// Picks the records of the given countries within the year range.
///
/// The records are grouped by country, in the order of the selection, and
/// sorted by year within each country. Unknown countries are ignored and an
/// empty selection gives an empty subset.
pub fn select<'a>(dataset: &'a Dataset, selection: &Selection) -> Subset<'a> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut records: Vec<&'a Record> = Vec::new();
    if !selection.years.is_empty() {
        for country in selection.countries.iter() {
            if !seen.insert(country.as_str()) {
                continue;
            }
            let recs = dataset.records_for(country);
            if recs.is_empty() {
                debug!("select: unknown country {:?}", country);
            }
            records.extend(recs.iter().filter(|r| selection.years.contains(r.year)));
        }
    }
    info!(
        "select: {} records for {} countries in [{}, {})",
        records.len(),
        seen.len(),
        selection.years.lo,
        selection.years.hi
    );
    Subset { dataset, records }
}

/// Per-country averages of every metric of the dataset.
pub fn averages(subset: &Subset) -> SummaryTable {
    let all: Vec<&str> = subset
        .dataset
        .metric_names
        .iter()
        .map(|s| s.as_str())
        .collect();
    // All the names come from the dataset itself.
    let indexes: Vec<usize> = (0..all.len()).collect();
    averages_internal(subset, &all, &indexes)
}

/// Per-country averages restricted to the given metrics, in that order.
pub fn averages_for(subset: &Subset, metrics: &[&str]) -> Result<SummaryTable, PipelineError> {
    let indexes = metric_indexes(subset.dataset, metrics)?;
    Ok(averages_internal(subset, metrics, &indexes))
}

fn averages_internal(subset: &Subset, metrics: &[&str], indexes: &[usize]) -> SummaryTable {
    let mut rows: Vec<CountryAverage> = Vec::new();
    for country in subset.countries() {
        let recs: Vec<&Record> = subset
            .records
            .iter()
            .filter(|r| r.country == country)
            .copied()
            .collect();
        // Never empty: the country comes from the subset.
        let n = recs.len() as f64;
        let values: Vec<f64> = indexes
            .iter()
            .map(|idx| round2(recs.iter().map(|r| r.metrics[*idx]).sum::<f64>() / n))
            .collect();
        rows.push(CountryAverage {
            country: country.to_string(),
            values,
        });
    }
    debug!("averages: {} rows over {} metrics", rows.len(), metrics.len());
    SummaryTable {
        metric_names: metrics.iter().map(|s| s.to_string()).collect(),
        rows,
    }
}

/// The `(year, value)` points of one metric, per country.
pub fn series(subset: &Subset, metric: &str) -> Result<Series, PipelineError> {
    let idx = subset
        .dataset
        .metric_index(metric)
        .ok_or_else(|| PipelineError::UnknownMetric(metric.to_string()))?;
    let mut by_country: Vec<CountrySeries> = Vec::new();
    for r in subset.records.iter() {
        let point = SeriesPoint {
            year: r.year,
            value: r.metrics[idx],
        };
        match by_country.last_mut() {
            Some(cs) if cs.country == r.country => cs.points.push(point),
            _ => by_country.push(CountrySeries {
                country: r.country.clone(),
                points: vec![point],
            }),
        }
    }
    Ok(Series {
        metric: metric.to_string(),
        by_country,
    })
}

/// Rounds to 2 decimal places, halves away from zero.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn metric_indexes(dataset: &Dataset, metrics: &[&str]) -> Result<Vec<usize>, PipelineError> {
    metrics
        .iter()
        .map(|m| {
            dataset
                .metric_index(m)
                .ok_or_else(|| PipelineError::UnknownMetric(m.to_string()))
        })
        .collect()
}
