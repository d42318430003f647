//! Reading uploaded files into a [`Sheet`].
//!
//! Workbooks go through calamine and only the first worksheet is read. Anything that is
//! not a workbook extension is treated as a header-less CSV file.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use log::debug;

use crate::error_handling::types::SheetError;

use super::types::Sheet;

const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

pub fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .map_or(false, |e| WORKBOOK_EXTENSIONS.contains(&e.as_str()))
}

/// Loads the file at `path`, picking the reader from its extension.
pub fn load_sheet(path: &Path) -> Result<Sheet, SheetError> {
    if is_workbook(path) {
        load_workbook(path)
    } else {
        let file = File::open(path)?;
        load_csv(file)
    }
}

/// Reads the first worksheet of a workbook.
///
/// calamine trims leading empty rows and columns from the range; rows are shifted back so
/// that column 0 is always column A and line numbers match the worksheet.
pub fn load_workbook(path: &Path) -> Result<Sheet, SheetError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SheetError::NoWorksheet)??;

    let (first_row, first_col) = range.start().unwrap_or((0, 0));
    let raw = anchor_at_column_a(
        range
            .rows()
            .map(|row| row.iter().map(cell_to_text).collect()),
        first_col as usize,
    );
    let width = first_col as usize + range.width();
    debug!(
        "Workbook {} read: {} row(s) x {} column(s)",
        path.display(),
        raw.len(),
        width
    );

    Ok(Sheet::from_raw_rows(raw, width, first_row as usize + 1))
}

fn anchor_at_column_a<I>(rows: I, first_col: usize) -> Vec<Vec<String>>
where
    I: Iterator<Item = Vec<String>>,
{
    rows.map(|row| {
        let mut anchored = vec![String::new(); first_col];
        anchored.extend(row);
        anchored
    })
    .collect()
}

/// Reads header-less CSV. The first record fixes the sheet width.
pub fn load_csv<R: Read>(reader: R) -> Result<Sheet, SheetError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut raw = Vec::new();
    for (idx, record) in csv_reader.byte_records().enumerate() {
        let record = record?;
        let line = record
            .position()
            .map_or(idx + 1, |pos| pos.line() as usize);
        let values = record
            .iter()
            .map(|field| String::from_utf8_lossy(field).into_owned())
            .collect::<Vec<_>>();
        raw.push((line, values));
    }
    let width = raw.first().map_or(0, |(_, r)| r.len());
    debug!("CSV read: {} row(s) x {} column(s)", raw.len(), width);

    Ok(Sheet::from_numbered_rows(raw, width))
}

/// Text rendering of a workbook cell.
///
/// Zero (numeric, boolean false or the text `0`) renders as `0`, integral numbers without
/// a decimal part, dates as `YYYY-MM-DD HH:MM:SS` (times of day as `HH:MM:SS`). Commas and
/// line breaks inside text are replaced by spaces.
pub fn cell_to_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::Int(0) | Data::Bool(false) => "0".to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => float_to_text(*f),
        Data::Bool(true) => "True".to_string(),
        Data::String(s) => clean_text(s),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            match dt.as_datetime() {
                Some(naive) if (0.0..1.0).contains(&serial) => {
                    naive.format("%H:%M:%S").to_string()
                }
                Some(naive) => naive.format("%Y-%m-%d %H:%M:%S").to_string(),
                None => float_to_text(serial),
            }
        }
        Data::DateTimeIso(s) | Data::DurationIso(s) => clean_text(s),
        Data::Error(e) => e.to_string(),
    }
}

fn float_to_text(f: f64) -> String {
    if f == 0.0 {
        "0".to_string()
    } else if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        format!("{}", f)
    }
}

fn clean_text(s: &str) -> String {
    s.replace([',', '\n', '\r'], " ")
}
