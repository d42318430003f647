use std::collections::HashMap;
use std::fmt;

/// A single failed cell before grouping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellError {
    /// Column letters, e.g. `AB`.
    pub column: String,
    /// 1-based source row.
    pub row: usize,
    /// Everything after the coordinate, e.g. `bajo 'Fecha' vacía.`.
    pub detail: String,
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Celda {}{} {}", self.column, self.row, self.detail)
    }
}

/// Collapses errors that share column and detail into contiguous row ranges.
///
/// Groups keep the order in which their first error was reported. Inside a group rows
/// are sorted, and each maximal run of consecutive rows becomes one entry
/// `Celda A8 hasta A12 <detail>`; an isolated row stays `Celda A8 <detail>`.
pub fn group_errors(errors: &[CellError]) -> Vec<String> {
    let mut order: Vec<(&str, &str)> = Vec::new();
    let mut rows: HashMap<(&str, &str), Vec<usize>> = HashMap::new();

    for error in errors {
        let key = (error.column.as_str(), error.detail.as_str());
        rows.entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(error.row);
    }

    let mut blocks = Vec::new();
    for key in order {
        let (column, detail) = key;
        let Some(group) = rows.get_mut(&key) else {
            continue;
        };
        group.sort_unstable();

        let mut iter = group.iter().copied();
        let Some(first) = iter.next() else {
            continue;
        };
        let (mut start, mut prev) = (first, first);
        for row in iter {
            if row == prev + 1 {
                prev = row;
                continue;
            }
            blocks.push(format_block(column, start, prev, detail));
            start = row;
            prev = row;
        }
        blocks.push(format_block(column, start, prev, detail));
    }
    blocks
}

fn format_block(column: &str, start: usize, end: usize, detail: &str) -> String {
    if start == end {
        format!("Celda {}{} {}", column, start, detail)
    } else {
        format!("Celda {}{} hasta {}{} {}", column, start, column, end, detail)
    }
}
