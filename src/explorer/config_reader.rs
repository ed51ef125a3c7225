use crate::explorer::*;

use serde::{Deserialize, Serialize};
use snafu::prelude::*;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    /// The schema id: `lf` or `sth`.
    pub dataset: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "worksheet")]
    pub worksheet: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    pub countries: Option<Vec<String>>,
    /// The bounds as shown on a year slider.
    pub years: Option<(i32, i32)>,
    #[serde(rename = "includeEndYear")]
    pub include_end_year: Option<bool>,
    #[serde(rename = "ageBand")]
    pub age_band: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ExplorerConfig {
    #[serde(rename = "sources", default)]
    pub sources: Vec<FileSource>,
    pub selection: Option<SelectionConfig>,
    #[serde(rename = "locationsPath")]
    pub locations_path: Option<String>,
    #[serde(rename = "boundariesPath")]
    pub boundaries_path: Option<String>,
    #[serde(rename = "outputPath")]
    pub output_path: Option<String>,
    #[serde(rename = "includeRaw")]
    pub include_raw: Option<bool>,
}

pub fn read_config(path: &str) -> ExplorerResult<ExplorerConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: ExplorerConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

/// A source ready to be read.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ResolvedSource {
    pub schema: &'static Schema,
    pub path: String,
    pub worksheet: Option<String>,
}

/// The settings of one run, after merging the command line and the
/// configuration file.
#[derive(PartialEq, Debug, Clone)]
pub struct RunSettings {
    pub sources: Vec<ResolvedSource>,
    pub selection: Selection,
    pub locations_path: Option<String>,
    pub boundaries_path: Option<String>,
    pub output_path: Option<String>,
    pub include_raw: bool,
}

pub const DEFAULT_COUNTRIES: [&str; 2] = ["Mali", "Ethiopia"];
pub const DEFAULT_YEARS: (i32, i32) = (2009, 2019);

pub fn resolve_settings(args: &Args) -> ExplorerResult<RunSettings> {
    let config_o = match &args.config {
        Some(p) => Some(read_config(p)?),
        None => None,
    };
    // Relative paths of the configuration file are relative to its directory.
    let root: PathBuf = args
        .config
        .as_ref()
        .and_then(|p| Path::new(p).parent())
        .map(|p| p.to_path_buf())
        .unwrap_or_default();
    let rooted = |p: &String| -> String {
        let pb = Path::new(p);
        if pb.is_absolute() {
            p.clone()
        } else {
            root.join(pb).display().to_string()
        }
    };

    let sources: Vec<ResolvedSource> = if let Some(input) = &args.input {
        let schema = match &args.dataset {
            Some(d) => schema::lookup(d).context(QuerySnafu {})?,
            None => guess_schema(input)?,
        };
        vec![ResolvedSource {
            schema,
            path: input.clone(),
            worksheet: args.worksheet.clone(),
        }]
    } else if let Some(d) = &args.dataset {
        let schema = schema::lookup(d).context(QuerySnafu {})?;
        // Keep the file declared in the configuration for this dataset, if any.
        let from_config = config_o
            .as_ref()
            .and_then(|c| c.sources.iter().find(|s| s.dataset.eq_ignore_ascii_case(schema.id)));
        match from_config {
            Some(fs) => vec![ResolvedSource {
                schema,
                path: rooted(&fs.file_path),
                worksheet: args.worksheet.clone().or_else(|| fs.worksheet.clone()),
            }],
            None => vec![ResolvedSource {
                schema,
                path: schema.file_name.to_string(),
                worksheet: args.worksheet.clone(),
            }],
        }
    } else if let Some(c) = &config_o {
        let mut res = Vec::new();
        for fs in c.sources.iter() {
            res.push(ResolvedSource {
                schema: schema::lookup(&fs.dataset).context(QuerySnafu {})?,
                path: rooted(&fs.file_path),
                worksheet: fs.worksheet.clone(),
            });
        }
        res
    } else {
        Vec::new()
    };
    if sources.is_empty() {
        whatever!("No source to read: pass --input, --dataset or a --config file with sources")
    }

    let sel_config = config_o.as_ref().and_then(|c| c.selection.clone());

    let countries: Vec<String> = if !args.countries.is_empty() {
        split_list(&args.countries)
    } else if let Some(cs) = sel_config.as_ref().and_then(|s| s.countries.clone()) {
        cs
    } else {
        DEFAULT_COUNTRIES.iter().map(|s| s.to_string()).collect()
    };

    let (lo, hi) = match &args.years {
        Some(y) => parse_years(y)?,
        None => sel_config
            .as_ref()
            .and_then(|s| s.years)
            .unwrap_or(DEFAULT_YEARS),
    };
    let include_end = args.include_end_year
        || sel_config
            .as_ref()
            .and_then(|s| s.include_end_year)
            .unwrap_or(false);

    let age_band = match args
        .age_band
        .clone()
        .or_else(|| sel_config.as_ref().and_then(|s| s.age_band.clone()))
    {
        Some(b) => AgeBand::parse(&b).context(QuerySnafu {})?,
        None => AgeBand::PreSchool,
    };

    let selection = Selection {
        countries,
        years: YearRange::from_slider(lo, hi, include_end),
        age_band: Some(age_band),
    };

    let locations_path = args
        .locations
        .clone()
        .or_else(|| config_o.as_ref().and_then(|c| c.locations_path.as_ref().map(&rooted)));
    let boundaries_path = args
        .boundaries
        .clone()
        .or_else(|| config_o.as_ref().and_then(|c| c.boundaries_path.as_ref().map(&rooted)));
    let output_path = args
        .out
        .clone()
        .or_else(|| config_o.as_ref().and_then(|c| c.output_path.as_ref().map(&rooted)));
    let include_raw = args.raw || config_o.as_ref().and_then(|c| c.include_raw).unwrap_or(false);

    Ok(RunSettings {
        sources,
        selection,
        locations_path,
        boundaries_path,
        output_path,
        include_raw,
    })
}

/// Picks the dataset from the name of the file: the published files are
/// `LF_data.xlsx` and `sth.xlsx`.
fn guess_schema(path: &str) -> ExplorerResult<&'static Schema> {
    let name = simplify_file_name(path).to_lowercase();
    if name.contains("sth") {
        Ok(&schema::STH)
    } else if name.starts_with("lf") || name.contains("_lf") || name.contains("filariasis") {
        Ok(&schema::LF)
    } else {
        whatever!(
            "Cannot tell which dataset {} contains, use --dataset lf or --dataset sth",
            path
        )
    }
}

/// Parses `2009:2019`. `-` and `..` are accepted as separators too.
pub fn parse_years(s: &str) -> ExplorerResult<(i32, i32)> {
    let parts: Vec<&str> = if s.contains("..") {
        s.split("..").collect()
    } else if s.contains(':') {
        s.split(':').collect()
    } else {
        s.split('-').collect()
    };
    match parts.as_slice() {
        [lo, hi] => match (lo.trim().parse::<i32>(), hi.trim().parse::<i32>()) {
            (Ok(lo), Ok(hi)) => Ok((lo, hi)),
            _ => {
                whatever!("Cannot read the years in {:?}", s)
            }
        },
        [y] => match y.trim().parse::<i32>() {
            Ok(y) => Ok((y, y)),
            Err(_) => {
                whatever!("Cannot read the years in {:?}", s)
            }
        },
        _ => {
            whatever!("Cannot read the years in {:?}, expected FIRST:LAST", s)
        }
    }
}

fn split_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|v| v.split(','))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
