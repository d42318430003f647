//! Spreadsheet validation.
//!
//! - `sheet`: reading workbooks and CSV files into a [`Sheet`]
//! - `types`: the sheet model and validation outcomes
//! - `cell_rules`: per-column type checks and the emptiness test
//! - `dates`: lenient date recognition used by date columns
//! - `coordinates`: A1-style cell references
//! - `grouping`: collapsing per-cell errors into row ranges
//! - `validator`: structural reading, cell checks and JSON export

pub mod cell_rules;
pub mod coordinates;
pub mod dates;
pub mod grouping;
pub mod sheet;
pub mod types;
pub mod validator;

pub use sheet::load_sheet;
pub use types::{FormatExport, Sheet, ValidationOutcome};
pub use validator::validate;
