//! Delimited-text tokenizer for CSV imports.
//!
//! Parses comma-delimited UTF-8 text into header-keyed records that feed
//! straight into the record normalizer. The parser is deliberately
//! forgiving: malformed trailing content is flushed rather than dropped,
//! and rows whose every cell is blank are skipped.

use serde_json::Value;

use crate::normalize::RawRecord;

/// A parsed CSV document: one header row plus zero or more data rows.
///
/// Cells are stored positionally; [`CsvTable::records`] zips them with the
/// headers to produce the raw records the normalizer consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvTable {
    /// Trimmed header names, in file order.
    pub headers: Vec<String>,
    /// Trimmed cell values, row-major. Rows may be shorter than the header
    /// row; missing trailing cells read as empty.
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    /// Convert each data row into a header-keyed raw record.
    ///
    /// Rows shorter than the header list simply omit the trailing keys.
    /// Cells beyond the header count are discarded.
    #[must_use]
    pub fn records(&self) -> Vec<RawRecord> {
        self.rows
            .iter()
            .map(|row| {
                let mut record = RawRecord::new();
                for (header, cell) in self.headers.iter().zip(row.iter()) {
                    record.insert(header.clone(), Value::String(cell.clone()));
                }
                record
            })
            .collect()
    }
}

/// Parse comma-delimited text into a [`CsvTable`].
///
/// Contract:
/// - double-quote quoting; doubled quotes escape a literal quote;
/// - delimiters and newlines inside quotes are data;
/// - a byte-order-mark on the first header is stripped;
/// - rows whose every cell trims to empty are dropped;
/// - an unterminated quote at end of input flushes the pending field and
///   row instead of discarding them.
///
/// Returns `None` if the input has no header row (empty or all-blank text).
#[must_use]
pub fn parse(text: &str) -> Option<CsvTable> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut raw_rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
        } else {
            match c {
                '"' => in_quotes = true,
                ',' => {
                    row.push(std::mem::take(&mut field));
                }
                '\r' => {
                    // CRLF: let the '\n' terminate the row. Bare '\r' is
                    // treated as data by falling through on the next char.
                    if chars.peek() != Some(&'\n') {
                        field.push('\r');
                    }
                }
                '\n' => {
                    row.push(std::mem::take(&mut field));
                    raw_rows.push(std::mem::take(&mut row));
                }
                _ => field.push(c),
            }
        }
    }

    // Flush trailing content, including an unterminated quoted field.
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        raw_rows.push(row);
    }

    let mut rows_iter = raw_rows.into_iter().map(|row| {
        row.into_iter()
            .map(|cell| cell.trim().to_string())
            .collect::<Vec<_>>()
    });

    let headers = rows_iter.next()?;
    if headers.iter().all(String::is_empty) {
        return None;
    }

    let rows = rows_iter
        .filter(|row| row.iter().any(|cell| !cell.is_empty()))
        .collect();

    Some(CsvTable { headers, rows })
}

/// Serialize a table back to CSV text with the same quoting rules the
/// parser accepts. Cells are quoted only when they contain a delimiter,
/// a quote, or a newline.
#[must_use]
pub fn serialize(table: &CsvTable) -> String {
    let mut out = String::new();
    write_row(&mut out, &table.headers);
    for row in &table.rows {
        write_row(&mut out, row);
    }
    out
}

fn write_row(out: &mut String, cells: &[String]) {
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&escape(cell));
    }
    out.push('\n');
}

/// Escape a cell for CSV output.
fn escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
