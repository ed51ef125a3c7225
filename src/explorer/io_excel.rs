// Primitives for reading Excel workbooks.

use calamine::{open_workbook, DataType, Range, Reader, Xlsx};

use crate::explorer::*;

/// Reads all the rows of a worksheet, the header included.
pub fn read_excel_rows(path: &str, worksheet: Option<&str>) -> ExplorerResult<Vec<Vec<Cell>>> {
    let wrange = get_range(path, worksheet)?;
    let mut res: Vec<Vec<Cell>> = Vec::with_capacity(wrange.height());
    for row in wrange.rows() {
        res.push(row.iter().map(read_cell).collect());
    }
    debug!("read_excel_rows: path: {:?} rows: {}", path, res.len());
    Ok(res)
}

fn get_range(path: &str, worksheet_o: Option<&str>) -> ExplorerResult<Range<DataType>> {
    debug!("get_range: path: {:?} worksheet: {:?}", path, worksheet_o);
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    // A worksheet name was provided, use it.
    if let Some(worksheet) = worksheet_o {
        let wrange = workbook
            .worksheet_range(worksheet)
            .context(MissingWorksheetSnafu { path, worksheet })?
            .context(OpeningExcelSnafu { path })?;
        Ok(wrange)
    } else {
        let wrange = workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu { path })?
            .context(OpeningExcelSnafu { path })?;
        Ok(wrange)
    }
}

fn read_cell(cell: &DataType) -> Cell {
    match cell {
        DataType::Int(i) => Cell::Number(*i as f64),
        DataType::Float(f) => Cell::Number(*f),
        DataType::String(s) => Cell::Text(s.clone()),
        // Booleans, dates and error cells carry no usable value here.
        _ => Cell::Empty,
    }
}
