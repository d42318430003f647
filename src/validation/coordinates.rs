/// Spreadsheet column letters for a 0-based column index (`0 -> A`, `26 -> AA`).
pub fn column_letters(mut col: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (col % 26) as u8);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// A1-style reference for a 0-based column and a 1-based row.
pub fn cell_reference(col: usize, line: usize) -> String {
    format!("{}{}", column_letters(col), line)
}
