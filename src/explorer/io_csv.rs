// Primitives for reading CSV files.

use crate::explorer::*;

/// Reads all the records of a CSV file, the header included.
///
/// Lines may have different lengths: the loader pads short rows. Cells that
/// are not valid UTF-8 are read lossily and left to the loader to coerce.
pub fn read_csv_rows(path: &str) -> ExplorerResult<Vec<Vec<Cell>>> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let mut res: Vec<Vec<Cell>> = Vec::new();
    for (idx, line_r) in rdr.into_byte_records().enumerate() {
        let lineno = idx + 1;
        let line = line_r.context(CsvLineParseSnafu { path, lineno })?;
        res.push(
            line.iter()
                .map(|field| read_cell(&String::from_utf8_lossy(field)))
                .collect(),
        );
    }
    debug!("read_csv_rows: path: {:?} rows: {}", path, res.len());
    Ok(res)
}

// The loader does the parsing: everything non-blank stays text.
fn read_cell(s: &str) -> Cell {
    if s.trim().is_empty() {
        Cell::Empty
    } else {
        Cell::Text(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_fixture() {
        let rows = read_csv_rows(&test_data_path("lf_sample.csv")).unwrap();
        assert_eq!(rows[0][2], Cell::Text("country".to_string()));
        assert!(rows.len() > 5);
        assert!(rows.iter().skip(1).any(|r| r.contains(&Cell::Empty)));
    }

    #[test]
    fn latin1_cells_do_not_fail_the_load() {
        let rows = read_csv_rows(&test_data_path("lf_latin1.csv")).unwrap();
        assert_eq!(rows.len(), 3);
        let ds = builder::load_rows(&schema::LF, rows).unwrap();
        assert_eq!(ds.records_for("Mali")[0].metrics[2], 50.0);
        let other: Vec<&Record> = ds.records().filter(|r| r.country != "Mali").collect();
        assert_eq!(other.len(), 1);
        assert!(other[0].country.starts_with('C'));
        assert!(other[0].country.ends_with("te d'Ivoire"));
        // "n\xe9ant" is not a number.
        assert_eq!(other[0].metrics[2], 0.0);
        assert_eq!(other[0].metrics[0], 1500000.0);
    }

    #[test]
    fn missing_file() {
        let err = read_csv_rows(&test_data_path("nope.csv")).unwrap_err();
        assert!(matches!(err, ExplorerError::CsvOpen { .. }), "{:?}", err);
    }
}
