use serde::Serialize;
use serde_json::{Map, Value};

/// A cell after null-token normalization; `None` is a missing value.
pub type Cell = Option<String>;

/// Tokens read as missing values, whatever the source format.
pub const NULL_TOKENS: [&str; 5] = ["", "NULL", "null", "NaN", "nan"];

/// One non-blank row of the uploaded sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRow {
    /// 1-based row number in the source file, used for cell coordinates.
    pub line: usize,
    pub cells: Vec<Cell>,
}

/// Rectangular text view over the first worksheet (or the CSV file).
///
/// Blank rows are dropped on construction, so structural positions (rules row, headers
/// row, first data row) count kept rows only while coordinates keep pointing at the
/// source rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    rows: Vec<SheetRow>,
    width: usize,
}

impl Sheet {
    /// Builds a sheet from raw text rows.
    ///
    /// Every row is padded or truncated to `width`, null tokens become missing cells and
    /// rows without any non-blank cell are discarded. `raw[0]` is source line `first_line`
    /// and every row starts at column A.
    pub fn from_raw_rows(raw: Vec<Vec<String>>, width: usize, first_line: usize) -> Self {
        let numbered = raw
            .into_iter()
            .enumerate()
            .map(|(idx, values)| (first_line + idx, values))
            .collect();
        Self::from_numbered_rows(numbered, width)
    }

    /// Same as [`Sheet::from_raw_rows`] with an explicit source line for every row.
    pub fn from_numbered_rows(raw: Vec<(usize, Vec<String>)>, width: usize) -> Self {
        let rows = raw
            .into_iter()
            .map(|(line, mut values)| {
                values.resize(width, String::new());
                let cells = values.into_iter().map(normalize_null).collect();
                SheetRow { line, cells }
            })
            .filter(|row| !row_is_blank(row))
            .collect();

        Self { rows, width }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn row(&self, idx: usize) -> Option<&SheetRow> {
        self.rows.get(idx)
    }

    pub fn rows_from(&self, idx: usize) -> &[SheetRow] {
        self.rows.get(idx..).unwrap_or(&[])
    }

    /// Cell text at a kept-row index and column, `None` when out of range or missing.
    pub fn value(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.cells.get(col))
            .and_then(|c| c.as_deref())
    }
}

fn normalize_null(value: String) -> Cell {
    if NULL_TOKENS.contains(&value.as_str()) {
        None
    } else {
        Some(value)
    }
}

fn row_is_blank(row: &SheetRow) -> bool {
    row.cells
        .iter()
        .all(|c| c.as_deref().map_or(true, |s| s.trim().is_empty()))
}

/// Document written to `temp_downloads/<task>.json` when a file has no errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormatExport {
    pub id_formato: String,
    #[serde(rename = "Titulo")]
    pub titulo: String,
    #[serde(rename = "Nombre Corto")]
    pub nombre_corto: String,
    pub data: Vec<Map<String, Value>>,
}

/// What the validator concluded about a sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    /// Grouped error descriptions, in order of first appearance.
    Invalid {
        errors: Vec<String>,
        nombre_corto: String,
    },
    Valid {
        export: FormatExport,
        nombre_corto: String,
    },
}

impl ValidationOutcome {
    pub fn nombre_corto(&self) -> &str {
        match self {
            ValidationOutcome::Invalid { nombre_corto, .. } => nombre_corto,
            ValidationOutcome::Valid { nombre_corto, .. } => nombre_corto,
        }
    }

    pub fn error_count(&self) -> usize {
        match self {
            ValidationOutcome::Invalid { errors, .. } => errors.len(),
            ValidationOutcome::Valid { .. } => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_null_tokens_become_missing() {
        let sheet = Sheet::from_raw_rows(raw(&[&["a", "NULL", "nan", "0", "None"]]), 5, 1);
        let cells = &sheet.row(0).unwrap().cells;
        assert_eq!(cells[0].as_deref(), Some("a"));
        assert_eq!(cells[1], None);
        assert_eq!(cells[2], None);
        assert_eq!(cells[3].as_deref(), Some("0"));
        assert_eq!(cells[4].as_deref(), Some("None"));
    }

    #[test]
    fn test_blank_rows_dropped_and_lines_kept() {
        let sheet = Sheet::from_raw_rows(
            raw(&[&["a", "b"], &["", "  "], &["null", ""], &["c", ""]]),
            2,
            1,
        );
        assert_eq!(sheet.height(), 2);
        assert_eq!(sheet.row(0).unwrap().line, 1);
        assert_eq!(sheet.row(1).unwrap().line, 4);
        assert_eq!(sheet.value(1, 0), Some("c"));
        assert_eq!(sheet.value(1, 1), None);
    }

    #[test]
    fn test_rows_padded_and_truncated() {
        let sheet = Sheet::from_raw_rows(raw(&[&["a"], &["b", "c", "d"]]), 2, 1);
        assert_eq!(sheet.row(0).unwrap().cells.len(), 2);
        assert_eq!(sheet.row(1).unwrap().cells.len(), 2);
        assert_eq!(sheet.value(1, 1), Some("c"));
    }

    #[test]
    fn test_rows_from_past_end() {
        let sheet = Sheet::from_raw_rows(raw(&[&["a"]]), 1, 1);
        assert!(sheet.rows_from(7).is_empty());
    }
}
