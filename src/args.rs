use clap::Parser;

/// Explores the preventive chemotherapy coverage records of the Lymphatic Filariasis (LF) and
/// Soil Transmitted Helminthiasis (STH) datasets.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON file describing the sources and the selection.
    /// See the manual of the coverage_pipeline crate for the format.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) The spreadsheet (.xlsx) or CSV file to read. Setting this option overrides the
    /// sources of the --config option.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (lf or sth) The dataset contained in the input. When no input is given, the published file
    /// name of the dataset is read from the current directory.
    #[clap(short, long, value_parser)]
    pub dataset: Option<String>,

    /// When using an Excel file, the name of the worksheet to use (default: the first one).
    #[clap(long, value_parser)]
    pub worksheet: Option<String>,

    /// (repeatable, or comma-separated) The countries to select. Default: Mali, Ethiopia.
    #[clap(long = "country", value_parser)]
    pub countries: Vec<String>,

    /// (FIRST:LAST) The years to select, as shown on a year slider. Default: 2009:2019.
    /// The last year is excluded unless --include-end-year is passed.
    #[clap(short, long, value_parser)]
    pub years: Option<String>,

    /// If passed, the last year of --years is included in the selection.
    #[clap(long, takes_value = false)]
    pub include_end_year: bool,

    /// (pre-sac or sac) The population band, for the STH dataset. Default: pre-sac.
    #[clap(long, value_parser)]
    pub age_band: Option<String>,

    /// (file path) A CSV file with the columns country,lat,lon used to place the countries on the map.
    #[clap(long, value_parser)]
    pub locations: Option<String>,

    /// (file path) A GeoJSON file of country boundaries, with the country name in the 'admin' property.
    #[clap(long, value_parser)]
    pub boundaries: Option<String>,

    /// If passed, the selected records are included in the report.
    #[clap(long, takes_value = false)]
    pub raw: bool,

    /// (file path, 'stdout' or empty) Where to write the JSON report. Setting this option
    /// overrides the path that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference report in JSON format. If provided, the generated report must match it.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// If passed, lists the countries and the years available in each source instead of building a report.
    #[clap(long, takes_value = false)]
    pub list_countries: bool,

    /// If passed, prints the glossary of the datasets and exits.
    #[clap(long, takes_value = false)]
    pub glossary: bool,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
