pub use crate::config::*;
use crate::schema::Schema;

use log::{debug, info, warn};
use std::collections::HashMap;

/// A builder that turns raw rows into a [`Dataset`].
///
/// The first row handed over must be the header. Readers for the various
/// file formats only need to produce [`Cell`]s.
///
/// ```
/// use coverage_pipeline::builder::Builder;
/// use coverage_pipeline::schema::LF;
/// use coverage_pipeline::{Cell, LoadError};
///
/// let header: Vec<Cell> = LF
///     .required_columns()
///     .iter()
///     .map(|c| Cell::Text(c.to_string()))
///     .collect();
/// let mut builder = Builder::new(&LF).header(&header)?;
///
/// builder.add_row(&[
///     Cell::Text("Mali".to_string()),
///     Cell::Number(2009.0),
///     Cell::Text("AFR".to_string()),
///     Cell::Number(1200.0),
///     Cell::Text("n/a".to_string()),
/// ])?;
/// let dataset = builder.build()?;
///
/// assert_eq!(dataset.countries(), &["Mali".to_string()]);
/// // Unparseable and missing cells are zero.
/// assert_eq!(dataset.records_for("Mali")[0].metrics, vec![1200.0, 0.0, 0.0, 0.0, 0.0]);
///
/// # Ok::<(), LoadError>(())
/// ```
pub struct Builder {
    pub(crate) _schema: Schema,
    pub(crate) _columns: Option<ColumnPositions>,
    pub(crate) _records: Vec<Record>,
    pub(crate) _skipped_rows: usize,
    pub(crate) _other_region_rows: usize,
}

/// Where each canonical column sits in the source rows.
#[derive(Eq, PartialEq, Debug, Clone)]
pub(crate) struct ColumnPositions {
    country: usize,
    year: usize,
    region: usize,
    metrics: Vec<usize>,
    // Categorical columns absent from the source are None.
    categorical: Vec<Option<usize>>,
}

impl Builder {
    pub fn new(schema: &Schema) -> Builder {
        Builder {
            _schema: *schema,
            _columns: None,
            _records: Vec::new(),
            _skipped_rows: 0,
            _other_region_rows: 0,
        }
    }

    /// Registers the header row. Fails if any required column is missing.
    pub fn header(self, header: &[Cell]) -> Result<Builder, LoadError> {
        let names: Vec<Option<String>> = header.iter().map(|c| c.as_text()).collect();
        if names.iter().all(|n| n.is_none()) {
            return Err(LoadError::EmptySource);
        }
        let col_names: HashMap<&str, usize> = names
            .iter()
            .enumerate()
            .rev()
            .filter_map(|(idx, x)| x.as_ref().map(|s| (s.as_str(), idx)))
            .collect();

        let missing: Vec<String> = self
            ._schema
            .required_columns()
            .iter()
            .filter(|c| !col_names.contains_key(*c))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(LoadError::MissingColumns(missing));
        }

        for name in names.iter().flatten() {
            let s = &self._schema;
            if s.is_dropped(name) {
                debug!("header: dropping column {:?}", name);
            } else if name != s.country_column
                && name != s.year_column
                && !s.metrics.contains(&name.as_str())
                && !s.categorical.contains(&name.as_str())
            {
                debug!("header: ignoring unknown column {:?}", name);
            }
        }

        let positions = ColumnPositions {
            country: col_names[self._schema.country_column],
            year: col_names[self._schema.year_column],
            region: col_names[self._schema.region_column],
            metrics: self
                ._schema
                .metrics
                .iter()
                .map(|m| col_names[m])
                .collect(),
            categorical: self
                ._schema
                .categorical
                .iter()
                .map(|c| col_names.get(c).copied())
                .collect(),
        };
        debug!("header: column positions {:?}", positions);
        Ok(Builder {
            _columns: Some(positions),
            ..self
        })
    }

    /// Adds a data row.
    ///
    /// Rows of another region are discarded. Rows without a usable country
    /// or year are discarded with a warning. Rows shorter than the header
    /// are padded with empty cells.
    pub fn add_row(&mut self, row: &[Cell]) -> Result<(), LoadError> {
        let cols = self._columns.as_ref().ok_or(LoadError::EmptySource)?;
        let cell = |idx: usize| row.get(idx).unwrap_or(&Cell::Empty);

        if cell(cols.region).as_text().as_deref() != Some(self._schema.region) {
            self._other_region_rows += 1;
            return Ok(());
        }

        let country = match cell(cols.country).as_text() {
            Some(c) => c,
            None => {
                warn!("add_row: skipping row without country: {:?}", row);
                self._skipped_rows += 1;
                return Ok(());
            }
        };
        let year = match coerce_year(cell(cols.year)) {
            Some(y) => y,
            None => {
                warn!(
                    "add_row: skipping row for {} with unusable year {:?}",
                    country,
                    cell(cols.year)
                );
                self._skipped_rows += 1;
                return Ok(());
            }
        };

        let metrics: Vec<f64> = cols.metrics.iter().map(|idx| coerce_metric(cell(*idx))).collect();
        let categorical: Vec<String> = cols
            .categorical
            .iter()
            .map(|idx_o| {
                idx_o
                    .and_then(|idx| cell(idx).as_text())
                    .unwrap_or_default()
            })
            .collect();

        self._records.push(Record {
            country,
            year,
            metrics,
            categorical,
        });
        Ok(())
    }

    pub fn build(self) -> Result<Dataset, LoadError> {
        if self._columns.is_none() {
            return Err(LoadError::EmptySource);
        }
        let mut countries: Vec<String> = Vec::new();
        let mut by_country: HashMap<String, Vec<Record>> = HashMap::new();
        for r in self._records {
            if !by_country.contains_key(&r.country) {
                countries.push(r.country.clone());
            }
            by_country.entry(r.country.clone()).or_default().push(r);
        }
        for recs in by_country.values_mut() {
            recs.sort_by_key(|r| r.year);
        }

        let dataset = Dataset {
            schema_id: self._schema.id.to_string(),
            metric_names: self._schema.metrics.iter().map(|s| s.to_string()).collect(),
            categorical_names: self
                ._schema
                .categorical
                .iter()
                .map(|s| s.to_string())
                .collect(),
            countries,
            by_country,
        };
        info!(
            "build: dataset {}: {} records for {} countries ({} rows outside {}, {} rows skipped)",
            dataset.schema_id,
            dataset.len(),
            dataset.countries.len(),
            self._other_region_rows,
            self._schema.region,
            self._skipped_rows
        );
        Ok(dataset)
    }
}

/// Loads a dataset from rows whose first element is the header.
pub fn load_rows<I, R>(schema: &Schema, rows: I) -> Result<Dataset, LoadError>
where
    I: IntoIterator<Item = R>,
    R: AsRef<[Cell]>,
{
    let mut iter = rows.into_iter();
    let header = iter.next().ok_or(LoadError::EmptySource)?;
    let mut builder = Builder::new(schema).header(header.as_ref())?;
    for row in iter {
        builder.add_row(row.as_ref())?;
    }
    builder.build()
}

/// Numeric value of a metric cell. Anything that is not a finite number,
/// or text holding one, counts as zero.
pub fn coerce_metric(cell: &Cell) -> f64 {
    let x = match cell {
        Cell::Number(f) => *f,
        Cell::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        Cell::Empty => 0.0,
    };
    if x.is_finite() {
        x
    } else {
        0.0
    }
}

fn coerce_year(cell: &Cell) -> Option<i32> {
    let f = match cell {
        Cell::Number(f) => *f,
        Cell::Text(s) => s.trim().parse::<f64>().ok()?,
        Cell::Empty => return None,
    };
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i32::MAX as f64 {
        Some(f as i32)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{LF, STH};

    fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn lf_header() -> Vec<Cell> {
        vec![
            text("region"),
            text("country_code"),
            text("country"),
            text("year"),
            text("Mapping status"),
            text("Type of MDA"),
            text("Population requiring PC for LF"),
            text("Reported number of people treated"),
            text("Programme (drug) coverage"),
            text("Geographical coverage"),
            text("National coverage"),
            text("Current status of MDA"),
        ]
    }

    fn lf_row(region: &str, country: &str, year: Cell, cov: Cell) -> Vec<Cell> {
        vec![
            text(region),
            text("XXX"),
            text(country),
            year,
            text("Endemic"),
            text("IDA"),
            Cell::Number(1000.0),
            Cell::Number(500.0),
            cov,
            Cell::Number(10.0),
            Cell::Number(20.0),
            text("Started"),
        ]
    }

    #[test]
    fn region_filter_and_pruning() {
        init_logs();
        let rows = vec![
            lf_header(),
            lf_row("AFR", "Mali", Cell::Number(2010.0), Cell::Number(70.0)),
            lf_row("SEAR", "India", Cell::Number(2010.0), Cell::Number(80.0)),
            lf_row("AFR", "Mali", Cell::Number(2009.0), Cell::Number(50.0)),
        ];
        let ds = load_rows(&LF, rows).unwrap();
        assert_eq!(ds.countries(), &["Mali".to_string()]);
        assert_eq!(ds.len(), 2);
        // Sorted by year.
        let years: Vec<i32> = ds.records_for("Mali").iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2009, 2010]);
        let r = &ds.records_for("Mali")[0];
        assert_eq!(r.metrics, vec![1000.0, 500.0, 50.0, 10.0, 20.0]);
        assert_eq!(r.categorical, vec!["Endemic".to_string()]);
        assert_eq!(ds.metric_names().len(), 5);
    }

    #[test]
    fn unparseable_metrics_become_zero() {
        let cells = [
            Cell::Empty,
            text(""),
            text("NA"),
            text("-"),
            text("n/a"),
            text("inf"),
            Cell::Number(f64::NAN),
        ];
        for c in cells.iter() {
            let rows = vec![
                lf_header(),
                lf_row("AFR", "Mali", Cell::Number(2009.0), c.clone()),
            ];
            let ds = load_rows(&LF, rows).unwrap();
            assert_eq!(ds.records_for("Mali")[0].metrics[2], 0.0, "{:?}", c);
        }
        assert_eq!(coerce_metric(&text(" 42.5 ")), 42.5);
        assert_eq!(coerce_metric(&Cell::Number(3.0)), 3.0);
    }

    #[test]
    fn textual_years_are_accepted() {
        let rows = vec![
            lf_header(),
            lf_row("AFR", "Mali", text("2011"), Cell::Number(1.0)),
            lf_row("AFR", "Mali", text("twenty"), Cell::Number(1.0)),
            lf_row("AFR", "", Cell::Number(2011.0), Cell::Number(1.0)),
            lf_row("AFR", "Mali", Cell::Number(2011.5), Cell::Number(1.0)),
        ];
        let ds = load_rows(&LF, rows).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.years(), vec![2011]);
    }

    #[test]
    fn missing_columns_are_reported() {
        let header = vec![text("country"), text("year"), text("region")];
        let res = Builder::new(&STH).header(&header);
        match res {
            Err(LoadError::MissingColumns(cols)) => {
                assert_eq!(cols.len(), STH.metrics.len());
                assert_eq!(cols[0], "Population requiring PC for STH, Pre-SAC");
            }
            _ => panic!("expected missing columns"),
        }
    }

    #[test]
    fn empty_sources_fail() {
        let rows: Vec<Vec<Cell>> = vec![];
        assert_eq!(load_rows(&LF, rows), Err(LoadError::EmptySource));
        assert!(matches!(
            Builder::new(&LF).header(&[Cell::Empty, text("  ")]),
            Err(LoadError::EmptySource)
        ));
        assert_eq!(
            Builder::new(&LF).add_row(&[text("AFR")]),
            Err(LoadError::EmptySource)
        );
    }

    #[test]
    fn short_rows_are_padded() {
        let mut row = lf_row("AFR", "Mali", Cell::Number(2009.0), Cell::Number(50.0));
        row.truncate(9);
        let ds = load_rows(&LF, vec![lf_header(), row]).unwrap();
        assert_eq!(ds.records_for("Mali")[0].metrics, vec![1000.0, 500.0, 50.0, 0.0, 0.0]);
    }

    #[test]
    fn missing_categorical_column_is_empty_text() {
        let header: Vec<Cell> = LF.required_columns().iter().map(|c| text(c)).collect();
        let mut row = vec![text("Mali"), Cell::Number(2009.0), text("AFR")];
        row.extend((0..5).map(|i| Cell::Number(i as f64)));
        let ds = load_rows(&LF, vec![header, row]).unwrap();
        assert_eq!(ds.records_for("Mali")[0].categorical, vec![String::new()]);
    }
}
