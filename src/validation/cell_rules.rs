//! Per-cell checks driven by the rule codes of the rules row.

use std::sync::OnceLock;

use regex::Regex;

use super::dates;

/// Type expected in a column, from the code written in the rules row.
///
/// | code    | rule     |
/// |---------|----------|
/// | 3       | Number   |
/// | 4, 13   | Date     |
/// | 5       | Time     |
/// | 6       | Currency |
/// | 7       | Url      |
/// | 12      | Year     |
///
/// Any other code leaves the column unchecked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellRule {
    Number,
    Date,
    Time,
    Currency,
    Url,
    Year,
}

impl CellRule {
    /// Resolves the rule of a column. Only the text before the first `.` is the code, so a
    /// workbook that stored `3` as `3.0` still maps to [`CellRule::Number`].
    pub fn from_code(raw: Option<&str>) -> Option<Self> {
        let code = raw?.split('.').next().unwrap_or_default();
        match code {
            "3" => Some(CellRule::Number),
            "4" | "13" => Some(CellRule::Date),
            "5" => Some(CellRule::Time),
            "6" => Some(CellRule::Currency),
            "7" => Some(CellRule::Url),
            "12" => Some(CellRule::Year),
            _ => None,
        }
    }

    /// Name shown to the user in error messages.
    pub fn expected(&self) -> &'static str {
        match self {
            CellRule::Number => "Número",
            CellRule::Date => "Fecha",
            CellRule::Time => "Hora (HH:MM)",
            CellRule::Currency => "Moneda",
            CellRule::Url => "URL",
            CellRule::Year => "Año (4 dígitos)",
        }
    }

    pub fn accepts(&self, value: &str) -> bool {
        match self {
            CellRule::Number | CellRule::Currency => is_number(value),
            CellRule::Date => dates::is_date(value),
            CellRule::Time => is_time(value),
            CellRule::Url => is_url(value),
            CellRule::Year => is_year(value),
        }
    }
}

pub fn is_number(value: &str) -> bool {
    value.trim().parse::<f64>().is_ok()
}

pub fn is_time(value: &str) -> bool {
    static TIME: OnceLock<Regex> = OnceLock::new();
    TIME.get_or_init(|| {
        Regex::new(r"^([01]\d|2[0-3]):([0-5]\d)(:([0-5]\d))?$").expect("valid time regex")
    })
    .is_match(value.trim())
}

pub fn is_url(value: &str) -> bool {
    let lower = value.trim().to_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Numeric and exactly four characters before the decimal point (untrimmed).
pub fn is_year(value: &str) -> bool {
    is_number(value) && value.split('.').next().unwrap_or_default().chars().count() == 4
}

/// Whether a cell counts as not filled in.
///
/// Missing cells, blank text and the words `nan`, `none` and `null` in any case are empty.
/// `0` and `0.0` are values.
pub fn is_empty(cell: Option<&str>) -> bool {
    let Some(value) = cell else {
        return true;
    };
    let trimmed = value.trim();
    if trimmed == "0" || trimmed == "0.0" {
        return false;
    }
    trimmed.is_empty() || matches!(trimmed.to_lowercase().as_str(), "nan" | "none" | "null")
}
