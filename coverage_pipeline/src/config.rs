// ********* Input data structures ***********

use std::collections::HashMap;
use std::error::Error;
use std::fmt::Display;

/// A single cell as handed over by a spreadsheet or CSV reader.
///
/// Readers do not interpret the content: the coercion rules live in the
/// [`crate::builder::Builder`].
#[derive(PartialEq, Debug, Clone)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    /// The textual content of the cell, if any. Numbers are rendered without
    /// a trailing `.0` when they are whole.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Number(f) if f.fract() == 0.0 && f.is_finite() => Some(format!("{}", *f as i64)),
            Cell::Number(f) => Some(f.to_string()),
            Cell::Text(s) => {
                let t = s.trim();
                if t.is_empty() {
                    None
                } else {
                    Some(t.to_string())
                }
            }
        }
    }
}

/// Population bands tracked separately by some datasets (STH).
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum AgeBand {
    /// Pre-school-aged children (1 to 4 years).
    PreSchool,
    /// School-aged children (5 to 14 years).
    SchoolAge,
}

impl AgeBand {
    pub const ALL: [AgeBand; 2] = [AgeBand::PreSchool, AgeBand::SchoolAge];

    /// The suffix used by the source columns, e.g. `Pre-SAC`.
    pub fn label(&self) -> &'static str {
        match self {
            AgeBand::PreSchool => "Pre-SAC",
            AgeBand::SchoolAge => "SAC",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AgeBand::PreSchool => "Pre-School-Aged (PSA)",
            AgeBand::SchoolAge => "School-Aged (SA)",
        }
    }

    /// Accepts the column suffix (`Pre-SAC`, `SAC`) as well as the short
    /// forms `psa`/`sa`, case-insensitively.
    pub fn parse(s: &str) -> Result<AgeBand, PipelineError> {
        match s.trim().to_lowercase().as_str() {
            "pre-sac" | "presac" | "psa" | "pre-school" => Ok(AgeBand::PreSchool),
            "sac" | "sa" | "school" => Ok(AgeBand::SchoolAge),
            _ => Err(PipelineError::UnknownAgeBand(s.to_string())),
        }
    }
}

impl Display for AgeBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A half-open range of years: `lo <= year < hi`.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub struct YearRange {
    pub lo: i32,
    pub hi: i32,
}

impl YearRange {
    pub fn new(lo: i32, hi: i32) -> YearRange {
        YearRange { lo, hi }
    }

    /// Translates the bounds shown on a year slider.
    ///
    /// With `include_end` unset, the upper bound shown to the user is
    /// excluded, which is how the published dashboard filtered its data.
    pub fn from_slider(lo: i32, hi: i32, include_end: bool) -> YearRange {
        if include_end {
            YearRange {
                lo,
                hi: hi.saturating_add(1),
            }
        } else {
            YearRange { lo, hi }
        }
    }

    pub fn contains(&self, year: i32) -> bool {
        self.lo <= year && year < self.hi
    }

    pub fn is_empty(&self) -> bool {
        self.lo >= self.hi
    }

    /// `from <first year> to <last year>`, both included.
    pub fn describe(&self) -> String {
        format!("from {} to {}", self.lo, self.hi.saturating_sub(1))
    }
}

/// A user query against a dataset.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Selection {
    /// The countries, in display order. Duplicates are ignored.
    pub countries: Vec<String>,
    pub years: YearRange,
    /// Only meaningful for datasets with age bands.
    pub age_band: Option<AgeBand>,
}

impl Selection {
    pub fn new(countries: &[&str], years: YearRange) -> Selection {
        Selection {
            countries: countries.iter().map(|s| s.to_string()).collect(),
            years,
            age_band: None,
        }
    }

    pub fn with_age_band(self, age_band: AgeBand) -> Selection {
        Selection {
            age_band: Some(age_band),
            ..self
        }
    }

    /// No country, or a range that contains no year.
    pub fn is_empty(&self) -> bool {
        self.countries.is_empty() || self.years.is_empty()
    }
}

// ********* Canonical data **********

/// One country-year row after cleaning.
#[derive(PartialEq, Debug, Clone)]
pub struct Record {
    pub country: String,
    pub year: i32,
    /// Aligned with [`Dataset::metric_names`].
    pub metrics: Vec<f64>,
    /// Aligned with [`Dataset::categorical_names`]. Empty strings for
    /// missing cells.
    pub categorical: Vec<String>,
}

/// The cleaned table, indexed by country.
///
/// Immutable once built.
#[derive(PartialEq, Debug, Clone)]
pub struct Dataset {
    pub(crate) schema_id: String,
    pub(crate) metric_names: Vec<String>,
    pub(crate) categorical_names: Vec<String>,
    // Countries in order of first appearance in the source.
    pub(crate) countries: Vec<String>,
    // Invariant: every vector is sorted by year.
    pub(crate) by_country: HashMap<String, Vec<Record>>,
}

impl Dataset {
    pub fn schema_id(&self) -> &str {
        &self.schema_id
    }

    pub fn metric_names(&self) -> &[String] {
        &self.metric_names
    }

    pub fn categorical_names(&self) -> &[String] {
        &self.categorical_names
    }

    pub fn metric_index(&self, metric: &str) -> Option<usize> {
        self.metric_names.iter().position(|m| m == metric)
    }

    /// All the countries, in order of first appearance in the source.
    pub fn countries(&self) -> &[String] {
        &self.countries
    }

    pub fn records_for(&self, country: &str) -> &[Record] {
        self.by_country
            .get(country)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// The distinct years present, sorted. These are the year slider options.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self
            .by_country
            .values()
            .flat_map(|recs| recs.iter().map(|r| r.year))
            .collect();
        years.sort_unstable();
        years.dedup();
        years
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.countries.iter().flat_map(|c| self.records_for(c).iter())
    }

    pub fn len(&self) -> usize {
        self.by_country.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The records of a dataset matching a selection.
#[derive(PartialEq, Debug, Clone)]
pub struct Subset<'a> {
    pub(crate) dataset: &'a Dataset,
    pub(crate) records: Vec<&'a Record>,
}

impl<'a> Subset<'a> {
    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    pub fn records(&self) -> &[&'a Record] {
        &self.records
    }

    /// The distinct countries of the subset, in subset order.
    pub fn countries(&self) -> Vec<&'a str> {
        let mut res: Vec<&'a str> = Vec::new();
        for r in self.records.iter() {
            if res.last() != Some(&r.country.as_str()) {
                res.push(r.country.as_str());
            }
        }
        res
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ******** Output data structures *********

#[derive(PartialEq, Debug, Clone)]
pub struct CountryAverage {
    pub country: String,
    /// Aligned with [`SummaryTable::metric_names`], rounded to 2 decimals.
    pub values: Vec<f64>,
}

/// Per-country averages over the years of a subset.
#[derive(PartialEq, Debug, Clone)]
pub struct SummaryTable {
    pub metric_names: Vec<String>,
    pub rows: Vec<CountryAverage>,
}

impl SummaryTable {
    pub fn value(&self, country: &str, metric: &str) -> Option<f64> {
        let idx = self.metric_names.iter().position(|m| m == metric)?;
        self.rows
            .iter()
            .find(|r| r.country == country)
            .map(|r| r.values[idx])
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(PartialEq, Debug, Clone, Copy)]
pub struct SeriesPoint {
    pub year: i32,
    pub value: f64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct CountrySeries {
    pub country: String,
    /// Sorted by year.
    pub points: Vec<SeriesPoint>,
}

/// The values of one metric, per country, ready to be charted.
#[derive(PartialEq, Debug, Clone)]
pub struct Series {
    pub metric: String,
    pub by_country: Vec<CountrySeries>,
}

impl Series {
    pub fn get(&self, country: &str) -> Option<&[SeriesPoint]> {
        self.by_country
            .iter()
            .find(|cs| cs.country == country)
            .map(|cs| cs.points.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.by_country.is_empty()
    }
}

// ******** Errors *********

/// Errors that prevent a dataset from being built.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum LoadError {
    /// The source does not even have a header row.
    EmptySource,
    /// Some columns required by the schema are absent from the header.
    MissingColumns(Vec<String>),
}

impl Error for LoadError {}

impl Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::EmptySource => write!(f, "the source has no header row"),
            LoadError::MissingColumns(cols) => {
                write!(f, "missing required columns: {}", cols.join(", "))
            }
        }
    }
}

/// Errors raised when a query refers to something the dataset does not have.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum PipelineError {
    UnknownMetric(String),
    UnknownAgeBand(String),
    /// The dataset is split by age band and none was given.
    MissingAgeBand(String),
    UnknownSchema(String),
}

impl Error for PipelineError {}

impl Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::UnknownMetric(m) => write!(f, "unknown metric {:?}", m),
            PipelineError::UnknownAgeBand(b) => write!(f, "unknown age band {:?}", b),
            PipelineError::MissingAgeBand(s) => {
                write!(f, "dataset {} requires an age band", s)
            }
            PipelineError::UnknownSchema(s) => write!(f, "unknown dataset {:?}", s),
        }
    }
}
