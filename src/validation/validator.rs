//! Structural reading and cell validation of a SIPOT format sheet.
//!
//! Positions count kept (non-blank) rows from 0:
//! - row 0, column 0: format identifier
//! - row 2, column 0: title; row 2, column 3: short name
//! - row 3: rule codes, one per column
//! - row 6: column headers
//! - row 7 onwards: data

use serde_json::{Map, Value};

use super::cell_rules::{is_empty, CellRule};
use super::coordinates::column_letters;
use super::grouping::{group_errors, CellError};
use super::types::{FormatExport, Sheet, SheetRow, ValidationOutcome};

pub const FORMAT_ID_CELL: (usize, usize) = (0, 0);
pub const TITLE_CELL: (usize, usize) = (2, 0);
pub const SHORT_NAME_CELL: (usize, usize) = (2, 3);
pub const RULES_ROW: usize = 3;
pub const HEADER_ROW: usize = 6;
pub const DATA_START_ROW: usize = 7;

const NO_SHORT_NAME: &str = "N/D";
const NO_FORMAT_ID: &str = "Formato no encontrado";
const UNNAMED_HEADER: &str = "header_sin_nombre";

/// Validates every data cell under a named header and, when nothing fails, builds the
/// JSON export of the sheet.
pub fn validate(sheet: &Sheet) -> ValidationOutcome {
    let nombre_corto = short_name(sheet);
    let errors = check_cells(sheet);

    if errors.is_empty() {
        ValidationOutcome::Valid {
            export: build_export(sheet, &nombre_corto),
            nombre_corto,
        }
    } else {
        ValidationOutcome::Invalid {
            errors: group_errors(&errors),
            nombre_corto,
        }
    }
}

pub fn short_name(sheet: &Sheet) -> String {
    let (row, col) = SHORT_NAME_CELL;
    sheet
        .value(row, col)
        .map(str::to_string)
        .unwrap_or_else(|| NO_SHORT_NAME.to_string())
}

/// Headers as shown to the user: trimmed, missing ones empty. Empty headers switch off
/// validation for their column.
pub fn visible_headers(sheet: &Sheet) -> Vec<String> {
    sheet
        .row(HEADER_ROW)
        .map(|row| {
            row.cells
                .iter()
                .map(|c| c.as_deref().unwrap_or_default().trim().to_string())
                .collect()
        })
        .unwrap_or_default()
}

fn column_rules(sheet: &Sheet) -> Vec<Option<CellRule>> {
    sheet
        .row(RULES_ROW)
        .map(|row| {
            row.cells
                .iter()
                .map(|c| CellRule::from_code(c.as_deref()))
                .collect()
        })
        .unwrap_or_default()
}

/// Ungrouped errors in row-major order.
pub fn check_cells(sheet: &Sheet) -> Vec<CellError> {
    let headers = visible_headers(sheet);
    let rules = column_rules(sheet);
    let mut errors = Vec::new();

    for row in sheet.rows_from(DATA_START_ROW) {
        check_row(row, &headers, &rules, &mut errors);
    }
    errors
}

fn check_row(
    row: &SheetRow,
    headers: &[String],
    rules: &[Option<CellRule>],
    errors: &mut Vec<CellError>,
) {
    for (col, cell) in row.cells.iter().enumerate() {
        let Some(header) = headers.get(col) else {
            continue;
        };
        if header.is_empty() {
            continue;
        }
        let column = column_letters(col);
        let value = cell.as_deref();

        if is_empty(value) {
            errors.push(CellError {
                column,
                row: row.line,
                detail: format!("bajo '{}' vacía.", header),
            });
            continue;
        }

        let (Some(rule), Some(value)) = (rules.get(col).copied().flatten(), value) else {
            continue;
        };
        if !rule.accepts(value) {
            errors.push(CellError {
                column,
                row: row.line,
                detail: format!("('{}') inválida. Se esperaba: {}.", value, rule.expected()),
            });
        }
    }
}

/// JSON document for a sheet without errors.
///
/// Each data row becomes an object keyed by header, in column order. Missing headers are
/// named `header_sin_nombre` and missing values are exported as empty strings. Repeated
/// headers keep the right-most value.
pub fn build_export(sheet: &Sheet, nombre_corto: &str) -> FormatExport {
    let headers: Vec<String> = sheet
        .row(HEADER_ROW)
        .map(|row| {
            row.cells
                .iter()
                .map(|c| c.as_deref().unwrap_or(UNNAMED_HEADER).trim().to_string())
                .collect()
        })
        .unwrap_or_default();

    let data = sheet
        .rows_from(DATA_START_ROW)
        .iter()
        .map(|row| {
            let mut record = Map::new();
            for (header, cell) in headers.iter().zip(row.cells.iter()) {
                let value = cell.clone().unwrap_or_default();
                record.insert(header.clone(), Value::String(value));
            }
            record
        })
        .collect();

    let (id_row, id_col) = FORMAT_ID_CELL;
    let (title_row, title_col) = TITLE_CELL;
    FormatExport {
        id_formato: sheet
            .value(id_row, id_col)
            .unwrap_or(NO_FORMAT_ID)
            .to_string(),
        titulo: sheet
            .value(title_row, title_col)
            .unwrap_or_default()
            .trim()
            .to_string(),
        nombre_corto: nombre_corto.trim().to_string(),
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Seven structural rows followed by `data`.
    fn sheet_with(rules: &[&str], headers: &[&str], data: &[&[&str]]) -> Sheet {
        let width = headers.len().max(4);
        let mut raw: Vec<Vec<String>> = vec![
            vec!["FMT-70-I".into()],
            vec!["Sujeto obligado".into()],
            vec![
                " Título del formato ".into(),
                "".into(),
                "".into(),
                "LGT_ART70_FI".into(),
            ],
            rules.iter().map(|s| s.to_string()).collect(),
            vec!["Descripción".into()],
            vec!["Tabla campos".into()],
            headers.iter().map(|s| s.to_string()).collect(),
        ];
        raw.extend(
            data.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect::<Vec<_>>()),
        );
        Sheet::from_raw_rows(raw, width, 1)
    }

    #[test]
    fn test_valid_sheet_exports_records() {
        let sheet = sheet_with(
            &["3", "4", "7", "1"],
            &["Monto", "Fecha", "Liga", "Nota"],
            &[
                &["100.5", "2024-01-31", "https://a.mx", "ok"],
                &["0", "31/12/2024", "http://b.mx", "0"],
            ],
        );
        let outcome = validate(&sheet);
        let ValidationOutcome::Valid { export, nombre_corto } = outcome else {
            panic!("expected a valid outcome");
        };
        assert_eq!(nombre_corto, "LGT_ART70_FI");
        assert_eq!(export.id_formato, "FMT-70-I");
        assert_eq!(export.titulo, "Título del formato");
        assert_eq!(export.data.len(), 2);
        assert_eq!(export.data[0]["Monto"], Value::String("100.5".into()));
        assert_eq!(export.data[1]["Nota"], Value::String("0".into()));

        let keys: Vec<&String> = export.data[0].keys().collect();
        assert_eq!(keys, vec!["Monto", "Fecha", "Liga", "Nota"]);
    }

    #[test]
    fn test_empty_and_invalid_cells() {
        let sheet = sheet_with(
            &["3", "5", "12", "7"],
            &["Monto", "Hora", "Año", "Liga"],
            &[
                &["abc", "08:30", "2024", "https://a.mx"],
                &["", "8:30", "24", "www.a.mx"],
            ],
        );
        let ValidationOutcome::Invalid { errors, nombre_corto } = validate(&sheet) else {
            panic!("expected errors");
        };
        assert_eq!(nombre_corto, "LGT_ART70_FI");
        assert_eq!(
            errors,
            vec![
                "Celda A8 ('abc') inválida. Se esperaba: Número.",
                "Celda A9 bajo 'Monto' vacía.",
                "Celda B9 ('8:30') inválida. Se esperaba: Hora (HH:MM).",
                "Celda C9 ('24') inválida. Se esperaba: Año (4 dígitos).",
                "Celda D9 ('www.a.mx') inválida. Se esperaba: URL.",
            ]
        );
    }

    #[test]
    fn test_contiguous_empty_cells_grouped() {
        let sheet = sheet_with(
            &["1", "1", "", ""],
            &["Nombre", "Cargo", "", ""],
            &[&["Ana", ""], &["Luis", ""], &["Eva", ""], &["Sol", "Jefa"]],
        );
        let ValidationOutcome::Invalid { errors, .. } = validate(&sheet) else {
            panic!("expected errors");
        };
        assert_eq!(errors, vec!["Celda B8 hasta B10 bajo 'Cargo' vacía."]);
    }

    #[test]
    fn test_columns_without_header_are_skipped() {
        let sheet = sheet_with(
            &["3", "3", "", ""],
            &["Monto", "  ", "", ""],
            &[&["1", "no es número", "", ""]],
        );
        assert!(matches!(validate(&sheet), ValidationOutcome::Valid { .. }));
    }

    #[test]
    fn test_blank_rows_do_not_shift_coordinates() {
        let raw: Vec<Vec<String>> = vec![
            vec!["FMT".into()],
            vec!["".into()],
            vec!["x".into()],
            vec!["t".into(), "".into(), "".into(), "NC".into()],
            vec!["3".into()],
            vec!["d".into()],
            vec!["e".into()],
            vec!["Monto".into()],
            vec!["".into()],
            vec!["abc".into()],
        ];
        let sheet = Sheet::from_raw_rows(raw, 4, 1);
        let ValidationOutcome::Invalid { errors, .. } = validate(&sheet) else {
            panic!("expected errors");
        };
        assert_eq!(errors, vec!["Celda A10 ('abc') inválida. Se esperaba: Número."]);
    }

    #[test]
    fn test_short_sheet_is_valid_with_defaults() {
        let sheet = Sheet::from_raw_rows(vec![vec!["solo".into()]], 1, 1);
        let ValidationOutcome::Valid { export, nombre_corto } = validate(&sheet) else {
            panic!("expected a valid outcome");
        };
        assert_eq!(nombre_corto, "N/D");
        assert_eq!(export.id_formato, "solo");
        assert_eq!(export.titulo, "");
        assert!(export.data.is_empty());
    }

    #[test]
    fn test_export_names_missing_headers() {
        let sheet = sheet_with(&["1", "1", "1", "1"], &["A", "", "C", ""], &[&["1", "", "3", ""]]);
        let export = build_export(&sheet, "NC");
        assert_eq!(export.data[0]["header_sin_nombre"], Value::String("".into()));
        assert_eq!(export.data[0]["C"], Value::String("3".into()));
    }

    #[test]
    fn test_export_serialization_field_names() {
        let sheet = sheet_with(&["1", "1", "1", "1"], &["A", "", "", ""], &[&["1"]]);
        let json = serde_json::to_value(build_export(&sheet, " NC ")).unwrap();
        assert_eq!(json["Nombre Corto"], "NC");
        assert_eq!(json["Titulo"], "Título del formato");
        assert_eq!(json["id_formato"], "FMT-70-I");
        assert!(json["data"].is_array());
    }
}
