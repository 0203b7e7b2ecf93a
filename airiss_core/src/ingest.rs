//! Upload ingest: CSV and Excel workbooks into a [`Table`].

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use csv::ReaderBuilder;
use tracing::debug;

use crate::{CoreError, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Excel,
}

impl SourceFormat {
    /// Picks the format from the file extension, ignoring case.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let lower = file_name.to_ascii_lowercase();
        if lower.ends_with(".xlsx") || lower.ends_with(".xls") {
            Some(SourceFormat::Excel)
        } else if lower.ends_with(".csv") {
            Some(SourceFormat::Csv)
        } else {
            None
        }
    }
}

/// Parses an uploaded file. Nothing is stored; the caller decides what to do
/// with the table.
pub fn parse_upload(file_name: &str, bytes: &[u8]) -> Result<Table, CoreError> {
    let format = SourceFormat::from_file_name(file_name).ok_or_else(|| {
        CoreError::UnsupportedFormat {
            file_name: file_name.to_string(),
        }
    })?;

    let table = match format {
        SourceFormat::Csv => read_csv(file_name, bytes)?,
        SourceFormat::Excel => read_excel(file_name, bytes)?,
    };
    debug!(
        file_name,
        ?format,
        columns = table.headers.len(),
        rows = table.record_count(),
        "parsed upload"
    );
    Ok(table)
}

fn read_csv(file_name: &str, bytes: &[u8]) -> Result<Table, CoreError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| parse_error(file_name, e))?
        .iter()
        .map(str::to_string)
        .collect();
    let headers = normalize_headers(file_name, headers)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| parse_error(file_name, e))?;
        push_row(&mut rows, headers.len(), record.iter().map(normalize_cell));
    }
    Ok(Table::new(headers, rows))
}

/// Reads the first worksheet; its first row is the header.
fn read_excel(file_name: &str, bytes: &[u8]) -> Result<Table, CoreError> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes.to_vec())).map_err(|e| parse_error(file_name, e))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| CoreError::MissingHeader {
            file_name: file_name.to_string(),
        })?
        .map_err(|e| parse_error(file_name, e))?;

    let mut sheet_rows = range.rows();
    let headers = sheet_rows
        .next()
        .map(|row| row.iter().map(cell_text).collect())
        .unwrap_or_default();
    let headers = normalize_headers(file_name, headers)?;

    let mut rows = Vec::new();
    for row in sheet_rows {
        push_row(&mut rows, headers.len(), row.iter().map(cell_text));
    }
    Ok(Table::new(headers, rows))
}

fn parse_error(file_name: &str, err: impl std::fmt::Display) -> CoreError {
    CoreError::Parse {
        file_name: file_name.to_string(),
        message: err.to_string(),
    }
}

/// Trims headers and names blank ones `Unnamed: <index>`. Fails when the
/// header row is missing or entirely blank.
fn normalize_headers(file_name: &str, raw: Vec<String>) -> Result<Vec<String>, CoreError> {
    if raw.iter().all(|h| normalize_cell(h).is_empty()) {
        return Err(CoreError::MissingHeader {
            file_name: file_name.to_string(),
        });
    }
    Ok(raw
        .iter()
        .enumerate()
        .map(|(idx, h)| {
            let name = normalize_cell(h);
            if name.is_empty() {
                format!("Unnamed: {idx}")
            } else {
                name
            }
        })
        .collect())
}

fn normalize_cell(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').to_string()
}

/// Pads or truncates to `width` cells; rows with no content are dropped.
fn push_row(rows: &mut Vec<Vec<String>>, width: usize, cells: impl Iterator<Item = String>) {
    let mut row: Vec<String> = cells.take(width).collect();
    if row.iter().all(String::is_empty) {
        return;
    }
    row.resize(width, String::new());
    rows.push(row);
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => normalize_cell(s),
        // Whole numbers come back from Excel as floats; print them as integers.
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}
