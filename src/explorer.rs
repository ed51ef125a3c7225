use log::{debug, info, warn};

use coverage_pipeline::cache::{DatasetCache, SourceKey};
use coverage_pipeline::schema::{self, Schema};
use coverage_pipeline::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::explorer::config_reader::*;
use crate::explorer::geo::*;
use crate::explorer::io_common::*;
use crate::explorer::io_csv::read_csv_rows;
use crate::explorer::io_excel::read_excel_rows;

pub mod config_reader;
pub mod geo;
mod io_common;
mod io_csv;
mod io_excel;

#[derive(Debug, Snafu)]
pub enum ExplorerError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The workbook {path} has no worksheet named {worksheet}"))]
    MissingWorksheet { path: String, worksheet: String },
    #[snafu(display("The workbook {path} has no worksheet"))]
    EmptyExcel { path: String },
    #[snafu(display("Error opening file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading line {lineno} of {path}"))]
    CsvLineParse {
        source: csv::Error,
        path: String,
        lineno: usize,
    },
    #[snafu(display("Cannot read {path}: only .xlsx and .csv files are supported"))]
    UnsupportedFile { path: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing the JSON file {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("{path} is not a GeoJSON collection of features"))]
    InvalidGeoJson { path: String },
    #[snafu(display("Error writing the report to {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error serializing the report"))]
    SerializingReport { source: serde_json::Error },
    #[snafu(display("Error loading the dataset in {path}"))]
    Loading { source: LoadError, path: String },
    #[snafu(display("Invalid query"))]
    Query { source: PipelineError },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type ExplorerResult<T> = Result<T, ExplorerError>;

/// The optional geographic data used by the map.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct GeoData {
    pub locations: Option<LocationTable>,
    pub boundaries: Option<BoundarySet>,
}

impl GeoData {
    pub fn read(locations_path: Option<&str>, boundaries_path: Option<&str>) -> ExplorerResult<GeoData> {
        Ok(GeoData {
            locations: locations_path.map(LocationTable::read).transpose()?,
            boundaries: boundaries_path.map(BoundarySet::read).transpose()?,
        })
    }
}

fn load_source(cache: &DatasetCache, src: &ResolvedSource) -> ExplorerResult<Arc<Dataset>> {
    let mut location = fs::canonicalize(&src.path)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| src.path.clone());
    if let Some(ws) = &src.worksheet {
        location = format!("{}#{}", location, ws);
    }
    let key = SourceKey::new(&location, src.schema.id);
    cache.get_or_load(&key, || -> ExplorerResult<Dataset> {
        info!("Attempting to read {} data from {:?}", src.schema.id, src.path);
        let rows = match provider_for(&src.path) {
            Some(Provider::Excel) => read_excel_rows(&src.path, src.worksheet.as_deref())?,
            Some(Provider::Csv) => read_csv_rows(&src.path)?,
            None => {
                return UnsupportedFileSnafu {
                    path: src.path.clone(),
                }
                .fail()
            }
        };
        builder::load_rows(src.schema, rows).context(LoadingSnafu {
            path: src.path.clone(),
        })
    })
}

fn series_to_json(s: &Series) -> JSValue {
    let mut by_country: JSMap<String, JSValue> = JSMap::new();
    for cs in s.by_country.iter() {
        let points: Vec<JSValue> = cs.points.iter().map(|p| json!([p.year, p.value])).collect();
        by_country.insert(cs.country.clone(), JSValue::Array(points));
    }
    JSValue::Object(by_country)
}

fn table_to_json(table: &SummaryTable, years: YearRange) -> JSValue {
    let rows: Vec<JSValue> = table
        .rows
        .iter()
        .map(|row| {
            let values: JSMap<String, JSValue> = table
                .metric_names
                .iter()
                .cloned()
                .zip(row.values.iter().map(|v| json!(v)))
                .collect();
            json!({"country": row.country, "values": values})
        })
        .collect();
    json!({
        "title": format!("Average values by country {}", years.describe()),
        "metrics": table.metric_names,
        "rows": rows,
    })
}

fn map_to_json(
    schema: &Schema,
    table: &SummaryTable,
    metric: &str,
    years: YearRange,
    geo: &GeoData,
) -> JSValue {
    let mut map: JSMap<String, JSValue> = JSMap::new();
    map.insert(
        "title".to_string(),
        json!(format!("{} {}", schema.map_title, years.describe())),
    );
    map.insert("center".to_string(), json!([MAP_CENTER.0, MAP_CENTER.1]));
    map.insert("zoom".to_string(), json!(MAP_ZOOM));
    map.insert("metric".to_string(), json!(metric));
    if let Some(locations) = &geo.locations {
        let points: Vec<JSValue> = map_points(table, metric, locations)
            .iter()
            .map(|p| {
                json!({
                    "country": p.country,
                    "lat": p.lat,
                    "lon": p.lon,
                    "value": p.value,
                    "colour": p.colour,
                    "size": p.size,
                })
            })
            .collect();
        map.insert("points".to_string(), JSValue::Array(points));
    }
    if let Some(boundaries) = &geo.boundaries {
        let regions: Vec<JSValue> = choropleth(table, metric, boundaries)
            .iter()
            .map(|(country, value)| json!({"country": country, "value": value}))
            .collect();
        map.insert("regions".to_string(), JSValue::Array(regions));
    }
    JSValue::Object(map)
}

// The selected records, restricted to the given metrics.
fn raw_rows(subset: &Subset, metrics: &[&str]) -> Vec<JSValue> {
    let dataset = subset.dataset();
    let mut res: Vec<JSValue> = Vec::new();
    for r in subset.records() {
        let mut row: JSMap<String, JSValue> = JSMap::new();
        row.insert("country".to_string(), json!(r.country));
        row.insert("year".to_string(), json!(r.year));
        for m in metrics.iter() {
            if let Some(idx) = dataset.metric_index(m) {
                row.insert(m.to_string(), json!(r.metrics[idx]));
            }
        }
        for (name, value) in dataset.categorical_names().iter().zip(r.categorical.iter()) {
            row.insert(name.clone(), json!(value));
        }
        res.push(JSValue::Object(row));
    }
    res
}

/// Assembles everything a dashboard page shows for one dataset and one
/// selection: the charts, the table of averages and the map.
pub fn build_report(
    schema: &Schema,
    dataset: &Dataset,
    selection: &Selection,
    geo: &GeoData,
    include_raw: bool,
) -> ExplorerResult<JSValue> {
    let band = schema.check_band(selection.age_band).context(QuerySnafu {})?;
    let subset = select(dataset, selection);

    let mut charts: Vec<JSValue> = Vec::new();
    for chart in schema.charts.iter() {
        let metric = schema.resolve(chart.metric, band).context(QuerySnafu {})?;
        let s = series(&subset, metric).context(QuerySnafu {})?;
        charts.push(json!({
            "kind": chart.kind.name(),
            "metric": metric,
            "title": chart.title_for(selection.years),
            "logX": chart.log_x,
            "series": series_to_json(&s),
        }));
    }

    let metrics = schema.table_metrics(band).context(QuerySnafu {})?;
    let table = averages_for(&subset, &metrics).context(QuerySnafu {})?;
    let map_metric = schema.resolve(schema.map_metric, band).context(QuerySnafu {})?;

    let mut report: JSMap<String, JSValue> = JSMap::new();
    report.insert("dataset".to_string(), json!(schema.id));
    report.insert("title".to_string(), json!(schema.title));
    report.insert(
        "selection".to_string(),
        json!({
            "countries": selection.countries,
            "years": [selection.years.lo, selection.years.hi],
            "description": selection.years.describe(),
            "ageBand": band.map(|b| b.label()),
            "subtitle": band.map(|b| format!("{} Children Data", b.description())),
        }),
    );
    report.insert("charts".to_string(), JSValue::Array(charts));
    report.insert("table".to_string(), table_to_json(&table, selection.years));
    report.insert(
        "map".to_string(),
        map_to_json(schema, &table, map_metric, selection.years, geo),
    );
    if include_raw {
        report.insert("raw".to_string(), JSValue::Array(raw_rows(&subset, &metrics)));
    }
    if selection.is_empty() {
        report.insert(
            "message".to_string(),
            json!("Please select countries and a range of years to see the data."),
        );
    } else if subset.is_empty() {
        report.insert(
            "message".to_string(),
            json!("No data for the selected countries and years."),
        );
    }
    Ok(JSValue::Object(report))
}

/// Builds the report of every source. A single source gives a single
/// report, several sources give `{"reports": [...]}`.
pub fn run_explorer(settings: &RunSettings, cache: &DatasetCache) -> ExplorerResult<JSValue> {
    let geo = GeoData::read(
        settings.locations_path.as_deref(),
        settings.boundaries_path.as_deref(),
    )?;
    let mut reports: Vec<JSValue> = Vec::new();
    for src in settings.sources.iter() {
        let dataset = load_source(cache, src)?;
        debug!(
            "run_explorer: {} records in {:?}",
            dataset.len(),
            src.path
        );
        reports.push(build_report(
            src.schema,
            &dataset,
            &settings.selection,
            &geo,
            settings.include_raw,
        )?);
    }
    match reports.len() {
        1 => Ok(reports.remove(0)),
        _ => Ok(json!({ "reports": reports })),
    }
}

fn read_reference(path: &str) -> ExplorerResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    Ok(js)
}

/// Fails if the pretty-printed report differs from the reference file.
pub fn check_reference(pretty_report: &str, reference_path: &str) -> ExplorerResult<()> {
    let reference = read_reference(reference_path)?;
    let pretty_reference =
        serde_json::to_string_pretty(&reference).context(SerializingReportSnafu {})?;
    if pretty_reference != pretty_report {
        warn!("Found differences with the reference {}", reference_path);
        print_diff(pretty_reference.as_str(), pretty_report, "\n");
        whatever!(
            "Difference detected between the report and the reference {}",
            reference_path
        )
    }
    Ok(())
}

fn print_glossary(dataset: Option<&str>) -> ExplorerResult<()> {
    let schemas: Vec<&'static Schema> = match dataset {
        Some(d) => vec![schema::lookup(d).context(QuerySnafu {})?],
        None => schema::all_schemas().to_vec(),
    };
    for s in schemas {
        println!("{} ({})", s.title, s.id);
        for (term, definition) in s.glossary.iter() {
            println!("  {}: {}", term, definition);
        }
    }
    Ok(())
}

fn list_countries(settings: &RunSettings, cache: &DatasetCache) -> ExplorerResult<()> {
    for src in settings.sources.iter() {
        let dataset = load_source(cache, src)?;
        let years = dataset.years();
        match (years.first(), years.last()) {
            (Some(first), Some(last)) => println!(
                "{} ({}): {} countries, years {} to {}",
                src.schema.title,
                src.path,
                dataset.countries().len(),
                first,
                last
            ),
            _ => println!("{} ({}): no data", src.schema.title, src.path),
        }
        for country in dataset.countries() {
            println!("  {}", country);
        }
    }
    Ok(())
}

pub fn run(args: &Args) -> ExplorerResult<()> {
    if args.glossary {
        return print_glossary(args.dataset.as_deref());
    }

    let settings = resolve_settings(args)?;
    info!("settings: {:?}", settings);
    let cache = DatasetCache::new();

    if args.list_countries {
        return list_countries(&settings, &cache);
    }

    let report = run_explorer(&settings, &cache)?;
    let pretty_report = serde_json::to_string_pretty(&report).context(SerializingReportSnafu {})?;

    match settings.output_path.as_deref() {
        None | Some("") | Some("stdout") => println!("{}", pretty_report),
        Some(path) => {
            fs::write(path, &pretty_report).context(WritingOutputSnafu { path })?;
            info!("report written to {}", path);
        }
    }

    // The reference report, if provided for comparison
    if let Some(reference_path) = &args.reference {
        check_reference(&pretty_report, reference_path)?;
    }

    Ok(())
}

#[cfg(test)]
pub fn test_data_path(name: &str) -> String {
    let p: PathBuf = [env!("CARGO_MANIFEST_DIR"), "tests", "data", name].iter().collect();
    p.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    const PROGRAMME: &str = "Programme (drug) coverage";

    fn lf_source() -> ResolvedSource {
        ResolvedSource {
            schema: &schema::LF,
            path: test_data_path("lf_sample.csv"),
            worksheet: None,
        }
    }

    fn sth_source() -> ResolvedSource {
        ResolvedSource {
            schema: &schema::STH,
            path: test_data_path("sth_sample.csv"),
            worksheet: None,
        }
    }

    fn settings(sources: Vec<ResolvedSource>, selection: Selection) -> RunSettings {
        RunSettings {
            sources,
            selection,
            locations_path: Some(test_data_path("locations.csv")),
            boundaries_path: Some(test_data_path("boundaries.geojson")),
            output_path: None,
            include_raw: false,
        }
    }

    fn table_value(report: &JSValue, country: &str, metric: &str) -> Option<f64> {
        report["table"]["rows"]
            .as_array()?
            .iter()
            .find(|r| r["country"] == country)?["values"][metric]
            .as_f64()
    }

    #[test]
    fn loads_lf_fixture() {
        let cache = DatasetCache::new();
        let ds = load_source(&cache, &lf_source()).unwrap();
        // Haiti is outside the region, the row without country is skipped.
        assert_eq!(ds.countries(), &["Mali", "Ethiopia", "Ghana"]);
        assert_eq!(ds.records_for("Mali").len(), 4);
        assert_eq!(ds.categorical_names(), &["Mapping status"]);
        let again = load_source(&cache, &lf_source()).unwrap();
        assert!(Arc::ptr_eq(&ds, &again));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn unsupported_files() {
        let cache = DatasetCache::new();
        let src = ResolvedSource {
            schema: &schema::LF,
            path: test_data_path("boundaries.geojson"),
            worksheet: None,
        };
        let err = load_source(&cache, &src).unwrap_err();
        assert!(matches!(err, ExplorerError::UnsupportedFile { .. }), "{:?}", err);
        assert!(cache.is_empty());
    }

    #[test]
    fn wrong_schema_reports_missing_columns() {
        let cache = DatasetCache::new();
        let src = ResolvedSource {
            schema: &schema::STH,
            path: test_data_path("lf_sample.csv"),
            worksheet: None,
        };
        match load_source(&cache, &src) {
            Err(ExplorerError::Loading {
                source: LoadError::MissingColumns(cols),
                ..
            }) => assert_eq!(cols.len(), 8),
            x => panic!("unexpected {:?}", x),
        }
    }

    #[test]
    fn lf_default_report() {
        let s = settings(
            vec![lf_source()],
            Selection::new(&["Mali", "Ethiopia"], YearRange::from_slider(2009, 2019, false)),
        );
        let report = run_explorer(&s, &DatasetCache::new()).unwrap();
        assert_eq!(report["dataset"], "lf");
        assert!(report.get("message").is_none());
        assert!(report.get("raw").is_none());

        // Mali 2019 is left out by the upper bound.
        assert_eq!(table_value(&report, "Mali", PROGRAMME), Some(66.67));
        assert_eq!(table_value(&report, "Mali", "National coverage"), Some(36.67));
        assert_eq!(
            table_value(&report, "Mali", "Reported number of people treated"),
            Some(400000.0)
        );
        assert_eq!(table_value(&report, "Ethiopia", PROGRAMME), Some(50.25));
        assert_eq!(table_value(&report, "Ghana", PROGRAMME), None);
        assert_eq!(report["table"]["rows"][0]["country"], "Mali");

        let charts = report["charts"].as_array().unwrap();
        assert_eq!(charts.len(), 5);
        assert_eq!(charts[0]["kind"], "line");
        assert_eq!(charts[0]["title"], "Program drug coverage by year");
        assert_eq!(charts[1]["kind"], "area");
        assert_eq!(charts[1]["title"], "Population requiring PC from 2009 to 2018");
        assert_eq!(charts[4]["logX"], true);
        assert_eq!(
            charts[0]["series"]["Mali"],
            json!([[2009, 50.0], [2010, 70.0], [2018, 80.0]])
        );

        let map = &report["map"];
        assert_eq!(map["metric"], PROGRAMME);
        assert_eq!(map["zoom"], 2);
        assert_eq!(map["title"], "Average program drug coverage rate from 2009 to 2018");
        assert_eq!(map["points"][0]["size"], 66.67);
        assert_eq!(map["points"].as_array().unwrap().len(), 2);
        assert_eq!(map["regions"].as_array().unwrap().len(), 2);
        assert_eq!(report["selection"]["ageBand"], JSValue::Null);
    }

    #[test]
    fn end_year_can_be_included() {
        let s = settings(
            vec![lf_source()],
            Selection::new(&["Mali"], YearRange::from_slider(2009, 2019, true)),
        );
        let report = run_explorer(&s, &DatasetCache::new()).unwrap();
        assert_eq!(table_value(&report, "Mali", PROGRAMME), Some(75.0));
        assert_eq!(
            report["charts"][1]["title"],
            "Population requiring PC from 2009 to 2019"
        );
    }

    #[test]
    fn sth_band_report() {
        let selection = Selection::new(&["Mali", "Ethiopia", "Chad"], YearRange::new(2015, 2017))
            .with_age_band(AgeBand::SchoolAge);
        let mut s = settings(vec![sth_source()], selection);
        s.include_raw = true;
        let report = run_explorer(&s, &DatasetCache::new()).unwrap();
        assert_eq!(report["selection"]["ageBand"], "SAC");
        assert_eq!(report["selection"]["subtitle"], "School-Aged (SA) Children Data");
        assert_eq!(report["table"]["metrics"].as_array().unwrap().len(), 4);
        assert_eq!(table_value(&report, "Mali", "National coverage, SAC"), Some(78.9));
        assert_eq!(table_value(&report, "Mali", "Programme coverage, SAC"), Some(88.75));
        assert_eq!(table_value(&report, "Mali", "National coverage, Pre-SAC"), None);
        assert_eq!(report["charts"][0]["metric"], "Population requiring PC for STH, SAC");
        assert_eq!(report["map"]["metric"], "National coverage, SAC");
        assert_eq!(
            report["map"]["title"],
            "Average national coverage by country from 2015 to 2016"
        );

        let raw = report["raw"].as_array().unwrap();
        assert_eq!(raw.len(), 3);
        assert_eq!(raw[0]["country"], "Mali");
        assert!(raw[0].get("Reported number of SAC treated").is_some());
        assert!(raw[0].get("Reported number of Pre-SAC treated").is_none());
    }

    #[test]
    fn sth_needs_a_band() {
        let s = settings(
            vec![sth_source()],
            Selection::new(&["Mali"], YearRange::new(2015, 2017)),
        );
        let err = run_explorer(&s, &DatasetCache::new()).unwrap_err();
        assert!(matches!(
            err,
            ExplorerError::Query {
                source: PipelineError::MissingAgeBand(_)
            }
        ));
    }

    #[test]
    fn empty_selection_gives_guidance() {
        let s = settings(
            vec![lf_source()],
            Selection::new(&[], YearRange::new(2009, 2019)),
        );
        let report = run_explorer(&s, &DatasetCache::new()).unwrap();
        assert!(report["message"].as_str().unwrap().starts_with("Please select countries"));
        assert!(report["table"]["rows"].as_array().unwrap().is_empty());
        assert_eq!(report["charts"][0]["series"], json!({}));
        assert!(report["map"]["points"].as_array().unwrap().is_empty());

        let s = settings(
            vec![lf_source()],
            Selection::new(&["Unknownland"], YearRange::new(2000, 2020)),
        );
        let report = run_explorer(&s, &DatasetCache::new()).unwrap();
        assert!(report["message"].as_str().unwrap().starts_with("No data"));
    }

    #[test]
    fn config_gives_one_report_per_source() {
        let config = test_data_path("config.json");
        let args = Args::parse_from(["covex", "-c", config.as_str()]);
        let s = resolve_settings(&args).unwrap();
        let report = run_explorer(&s, &DatasetCache::new()).unwrap();
        let reports = report["reports"].as_array().unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0]["dataset"], "lf");
        assert_eq!(reports[1]["dataset"], "sth");
        assert_eq!(reports[1]["selection"]["ageBand"], "SAC");
        assert_eq!(table_value(&reports[0], "Ghana", PROGRAMME), Some(80.0));
    }

    #[test]
    fn reference_comparison() {
        let s = settings(
            vec![lf_source()],
            Selection::new(&["Mali", "Ethiopia"], YearRange::new(2009, 2019)),
        );
        let report = run_explorer(&s, &DatasetCache::new()).unwrap();
        let pretty = serde_json::to_string_pretty(&report).unwrap();

        let path = std::env::temp_dir().join(format!("covex_reference_{}.json", std::process::id()));
        let path_s = path.display().to_string();
        fs::write(&path, &pretty).unwrap();
        assert!(check_reference(&pretty, &path_s).is_ok());

        let mut changed = report.clone();
        changed["dataset"] = json!("sth");
        let changed_pretty = serde_json::to_string_pretty(&changed).unwrap();
        let err = check_reference(&changed_pretty, &path_s).unwrap_err();
        assert!(matches!(err, ExplorerError::Whatever { .. }));
        fs::remove_file(&path).unwrap();

        assert!(matches!(
            check_reference(&pretty, &test_data_path("missing.json")),
            Err(ExplorerError::OpeningJson { .. })
        ));
    }

    #[test]
    fn run_writes_the_report() {
        let out = std::env::temp_dir().join(format!("covex_out_{}.json", std::process::id()));
        let out_s = out.display().to_string();
        let input = test_data_path("lf_sample.csv");
        let args = Args::parse_from([
            "covex",
            "-i",
            input.as_str(),
            "-d",
            "lf",
            "--country",
            "Ghana",
            "--years",
            "2011:2011",
            "--include-end-year",
            "-o",
            out_s.as_str(),
        ]);
        run(&args).unwrap();
        let written = read_reference(&out_s).unwrap();
        assert_eq!(table_value(&written, "Ghana", PROGRAMME), Some(80.0));
        assert_eq!(written["selection"]["years"], json!([2011, 2012]));
        fs::remove_file(&out).unwrap();
    }
}
