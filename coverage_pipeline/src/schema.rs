//! Descriptions of the supported source datasets.
//!
//! The two datasets share the same shape and only differ in their columns,
//! so everything dataset-specific is captured here and the rest of the
//! pipeline is generic over a [`Schema`].

use crate::config::*;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ChartKind {
    Line,
    Area,
}

impl ChartKind {
    pub fn name(&self) -> &'static str {
        match self {
            ChartKind::Line => "line",
            ChartKind::Area => "area",
        }
    }
}

/// Position of a metric inside the list of metrics of an age band.
pub const BAND_POPULATION: usize = 0;
pub const BAND_TREATED: usize = 1;
pub const BAND_PROGRAMME_COVERAGE: usize = 2;
pub const BAND_NATIONAL_COVERAGE: usize = 3;

/// A reference to a metric column, possibly depending on the age band.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum MetricRef {
    Fixed(&'static str),
    /// Index into the metrics of the selected age band.
    Band(usize),
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub metric: MetricRef,
    pub title: &'static str,
    /// Whether the title mentions the year range.
    pub ranged_title: bool,
    pub log_x: bool,
}

impl ChartSpec {
    /// The title shown above the chart. The range shows the first and the
    /// last year actually included.
    pub fn title_for(&self, years: YearRange) -> String {
        if self.ranged_title {
            format!("{} {}", self.title, years.describe())
        } else {
            self.title.to_string()
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct BandColumns {
    pub band: AgeBand,
    /// Population requiring PC, number treated, programme coverage,
    /// national coverage. In this order.
    pub metrics: [&'static str; 4],
}

/// Everything the pipeline needs to know about one source dataset.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct Schema {
    pub id: &'static str,
    pub title: &'static str,
    /// Default file name of the published spreadsheet.
    pub file_name: &'static str,
    pub country_column: &'static str,
    pub year_column: &'static str,
    pub region_column: &'static str,
    /// Only the rows of this region are kept.
    pub region: &'static str,
    /// Numeric columns. All of them are required.
    pub metrics: &'static [&'static str],
    /// Text columns kept as they are, when present.
    pub categorical: &'static [&'static str],
    /// Columns that are known and discarded.
    pub dropped: &'static [&'static str],
    pub age_bands: &'static [BandColumns],
    pub charts: &'static [ChartSpec],
    pub map_metric: MetricRef,
    pub map_title: &'static str,
    pub glossary: &'static [(&'static str, &'static str)],
}

const COMMON_GLOSSARY: [(&str, &str); 4] = [
    ("PC", "Preventive Chemotherapy"),
    ("PCT", "Preventive Chemotherapy and Transmission Control"),
    ("MDA", "Mass Drug Administration"),
    ("IU", "Implementation Unit"),
];

pub static LF: Schema = Schema {
    id: "lf",
    title: "Lymphatic Filariasis",
    file_name: "LF_data.xlsx",
    country_column: "country",
    year_column: "year",
    region_column: "region",
    region: "AFR",
    metrics: &[
        "Population requiring PC for LF",
        "Reported number of people treated",
        "Programme (drug) coverage",
        "Geographical coverage",
        "National coverage",
    ],
    categorical: &["Mapping status"],
    dropped: &["Current status of MDA", "country_code", "Type of MDA"],
    age_bands: &[],
    charts: &[
        ChartSpec {
            kind: ChartKind::Line,
            metric: MetricRef::Fixed("Programme (drug) coverage"),
            title: "Program drug coverage by year",
            ranged_title: false,
            log_x: false,
        },
        ChartSpec {
            kind: ChartKind::Area,
            metric: MetricRef::Fixed("Population requiring PC for LF"),
            title: "Population requiring PC",
            ranged_title: true,
            log_x: false,
        },
        ChartSpec {
            kind: ChartKind::Area,
            metric: MetricRef::Fixed("Reported number of people treated"),
            title: "Number of people treated",
            ranged_title: true,
            log_x: false,
        },
        ChartSpec {
            kind: ChartKind::Line,
            metric: MetricRef::Fixed("National coverage"),
            title: "National coverage",
            ranged_title: true,
            log_x: false,
        },
        ChartSpec {
            kind: ChartKind::Line,
            metric: MetricRef::Fixed("Geographical coverage"),
            title: "Geographical coverage",
            ranged_title: true,
            log_x: true,
        },
    ],
    map_metric: MetricRef::Fixed("Programme (drug) coverage"),
    map_title: "Average program drug coverage rate",
    glossary: &[
        COMMON_GLOSSARY[0],
        COMMON_GLOSSARY[1],
        COMMON_GLOSSARY[2],
        COMMON_GLOSSARY[3],
        (
            "Population requiring PC for LF",
            "total population living in all the endemic IUs and which require preventive chemotherapy (PC)",
        ),
        (
            "Geographical coverage",
            "proportion (%) of endemic IUs covered by MDA",
        ),
        (
            "Programme (drug) coverage",
            "proportion (%) of individuals treated as per programme target (total population of targeted IUs)",
        ),
        (
            "National coverage",
            "proportion (%) of the population requiring PC for LF in the country that have been treated",
        ),
    ],
};

pub static STH: Schema = Schema {
    id: "sth",
    title: "Soil Transmitted Helminthiasis",
    file_name: "sth.xlsx",
    country_column: "country",
    year_column: "year",
    region_column: "region",
    region: "AFR",
    metrics: &[
        "Population requiring PC for STH, Pre-SAC",
        "Reported number of Pre-SAC treated",
        "Programme coverage, Pre-SAC",
        "National coverage, Pre-SAC",
        "Population requiring PC for STH, SAC",
        "Reported number of SAC treated",
        "Programme coverage, SAC",
        "National coverage, SAC",
    ],
    categorical: &[],
    dropped: &[
        "Number of Pre-SAC targeted",
        "Drug combination, Pre-SAC",
        "Number of SAC targeted",
        "Drug combination, SAC",
        "country_code",
    ],
    age_bands: &[
        BandColumns {
            band: AgeBand::PreSchool,
            metrics: [
                "Population requiring PC for STH, Pre-SAC",
                "Reported number of Pre-SAC treated",
                "Programme coverage, Pre-SAC",
                "National coverage, Pre-SAC",
            ],
        },
        BandColumns {
            band: AgeBand::SchoolAge,
            metrics: [
                "Population requiring PC for STH, SAC",
                "Reported number of SAC treated",
                "Programme coverage, SAC",
                "National coverage, SAC",
            ],
        },
    ],
    charts: &[
        ChartSpec {
            kind: ChartKind::Area,
            metric: MetricRef::Band(BAND_POPULATION),
            title: "Population requiring PC",
            ranged_title: true,
            log_x: false,
        },
        ChartSpec {
            kind: ChartKind::Area,
            metric: MetricRef::Band(BAND_TREATED),
            title: "Number treated",
            ranged_title: true,
            log_x: false,
        },
        ChartSpec {
            kind: ChartKind::Line,
            metric: MetricRef::Band(BAND_NATIONAL_COVERAGE),
            title: "National coverage",
            ranged_title: true,
            log_x: false,
        },
        ChartSpec {
            kind: ChartKind::Line,
            metric: MetricRef::Band(BAND_PROGRAMME_COVERAGE),
            title: "Program Coverage",
            ranged_title: true,
            log_x: true,
        },
    ],
    map_metric: MetricRef::Band(BAND_NATIONAL_COVERAGE),
    map_title: "Average national coverage by country",
    glossary: &[
        ("Pre-SAC", "pre-school age children aged >=1 and <5"),
        ("SAC", "school age children aged >=5 and <15"),
        COMMON_GLOSSARY[0],
        COMMON_GLOSSARY[1],
        COMMON_GLOSSARY[2],
        COMMON_GLOSSARY[3],
        (
            "Population requiring PC for STH",
            "total population of Pre-SAC and SAC living in all the endemic areas in a country and which require preventive chemotherapy (PC)",
        ),
        (
            "Geographical coverage",
            "proportion (%) of endemic administrative units covered by preventive chemotherapy in a country",
        ),
        (
            "Programme coverage",
            "proportion (%) of individuals treated as per programme target set",
        ),
        (
            "National coverage",
            "proportion (%) of the population requiring PC for STH in the country that have been treated",
        ),
    ],
};

pub fn all_schemas() -> [&'static Schema; 2] {
    [&LF, &STH]
}

/// Finds a schema by its id (`lf`, `sth`), case-insensitively.
pub fn lookup(id: &str) -> Result<&'static Schema, PipelineError> {
    let id_l = id.trim().to_lowercase();
    all_schemas()
        .into_iter()
        .find(|s| s.id == id_l)
        .ok_or_else(|| PipelineError::UnknownSchema(id.to_string()))
}

impl Schema {
    /// The columns that must be present in the header of a source.
    pub fn required_columns(&self) -> Vec<&'static str> {
        let mut res = vec![self.country_column, self.year_column, self.region_column];
        res.extend(self.metrics.iter());
        res
    }

    pub fn has_age_bands(&self) -> bool {
        !self.age_bands.is_empty()
    }

    pub fn band_metrics(&self, band: AgeBand) -> Result<&'static [&'static str; 4], PipelineError> {
        self.age_bands
            .iter()
            .find(|bc| bc.band == band)
            .map(|bc| &bc.metrics)
            .ok_or_else(|| PipelineError::UnknownAgeBand(band.label().to_string()))
    }

    /// Picks the age band to use for a query: the requested one, or none for
    /// datasets without bands.
    pub fn check_band(&self, band: Option<AgeBand>) -> Result<Option<AgeBand>, PipelineError> {
        match (self.has_age_bands(), band) {
            (false, _) => Ok(None),
            (true, Some(b)) => self.band_metrics(b).map(|_| Some(b)),
            (true, None) => Err(PipelineError::MissingAgeBand(self.id.to_string())),
        }
    }

    pub fn resolve(&self, metric: MetricRef, band: Option<AgeBand>) -> Result<&'static str, PipelineError> {
        match metric {
            MetricRef::Fixed(name) => Ok(name),
            MetricRef::Band(idx) => {
                let b = band.ok_or_else(|| PipelineError::MissingAgeBand(self.id.to_string()))?;
                let metrics = self.band_metrics(b)?;
                metrics
                    .get(idx)
                    .copied()
                    .ok_or_else(|| PipelineError::UnknownMetric(format!("{} #{}", b, idx)))
            }
        }
    }

    /// The metrics shown in the summary table: those of the band when the
    /// dataset is split by age band, all of them otherwise.
    pub fn table_metrics(&self, band: Option<AgeBand>) -> Result<Vec<&'static str>, PipelineError> {
        match self.check_band(band)? {
            Some(b) => Ok(self.band_metrics(b)?.to_vec()),
            None => Ok(self.metrics.to_vec()),
        }
    }

    pub fn is_dropped(&self, column: &str) -> bool {
        column == self.region_column || self.dropped.contains(&column)
    }
}
