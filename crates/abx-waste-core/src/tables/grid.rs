//! CSV text parsing into a position-addressed grid of string cells.
//!
//! The lookup sheets are exported from a spreadsheet, so cells may be quoted
//! and quoted cells may contain commas, doubled quotes, or line breaks.
//! Every cell is trimmed. Rows keep their physical position in the source,
//! blank lines included, because the impact sheet addresses its data by a
//! fixed row offset.

use csv::{ReaderBuilder, StringRecord, Trim};

/// A parsed table: rows of trimmed string cells.
///
/// Rows are not padded. Reading past the end of a short row yields `""`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    rows: Vec<Vec<String>>,
}

impl Grid {
    /// Parse CSV text.
    ///
    /// The reader drops blank lines, so each one is put back as an empty
    /// row in front of the record that follows it.
    pub fn parse(text: &str) -> Result<Self, csv::Error> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(text.as_bytes());

        let mut rows = Vec::new();
        let mut record = StringRecord::new();
        let mut record_end = 0;

        while reader.read_record(&mut record)? {
            let blank = blank_lines_at(text.as_bytes(), record_end);
            rows.extend(std::iter::repeat_with(Vec::new).take(blank));
            rows.push(record.iter().map(str::to_string).collect());
            record_end = usize::try_from(reader.position().byte()).unwrap_or(text.len());
        }

        Ok(Self { rows })
    }

    /// Number of physical rows, blank ones included.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the grid has no row with a non-empty cell.
    pub fn is_empty(&self) -> bool {
        self.rows
            .iter()
            .all(|row| row.iter().all(|cell| cell.is_empty()))
    }

    /// Cell at (row, col), or `""` when either index is out of range.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .map(|r| cell(r, col))
            .unwrap_or("")
    }

    /// Row at `idx`.
    pub fn row(&self, idx: usize) -> Option<&[String]> {
        self.rows.get(idx).map(|r| r.as_slice())
    }

    /// Rows from `offset` onward, paired with their physical index.
    pub fn data_rows(&self, offset: usize) -> impl Iterator<Item = (usize, &[String])> {
        self.rows
            .iter()
            .enumerate()
            .skip(offset)
            .map(|(idx, row)| (idx, row.as_slice()))
    }
}

/// Count the blank lines starting at `offset`, just past a record.
fn blank_lines_at(bytes: &[u8], offset: usize) -> usize {
    let mut idx = offset;
    // The reader stops between the two bytes of a CRLF terminator
    if idx > 0 && bytes.get(idx - 1) == Some(&b'\r') && bytes.get(idx) == Some(&b'\n') {
        idx += 1;
    }

    let mut count = 0;
    while let Some(&byte) = bytes.get(idx) {
        match byte {
            b'\n' => idx += 1,
            b'\r' if bytes.get(idx + 1) == Some(&b'\n') => idx += 2,
            b'\r' => idx += 1,
            _ => break,
        }
        count += 1;
    }
    count
}

/// Cell `idx` of a row, or `""` past the end.
pub fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(|s| s.as_str()).unwrap_or("")
}

/// Strict numeric parse of a trimmed cell. Blank, non-numeric and
/// non-finite values are `None`.
pub fn parse_number(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    value.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Numeric cell value with malformed input treated as zero.
pub fn number_or_zero(value: &str) -> f64 {
    parse_number(value).unwrap_or(0.0)
}

/// The longest numeric prefix of `value`, e.g. `500` for `"500mg/100mL"`.
///
/// Used to order dose labels, which mix a number with units.
pub fn leading_number(value: &str) -> Option<f64> {
    let value = value.trim_start();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;

    for (idx, c) in value.char_indices() {
        match c {
            '+' | '-' if idx == 0 => {}
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end = idx + c.len_utf8();
    }

    if !seen_digit {
        return None;
    }
    value[..end].parse::<f64>().ok()
}
