use std::io::Write;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use rayon::prelude::*;

use crate::error::CsvResult;
use crate::table::{CsvColumn, CsvTable};

/// Rows rendered per parallel work unit.
const RENDER_CHUNK: usize = 1024;

/// Render a table to CSV bytes, optionally gzip-compressed.
pub fn to_bytes(table: &CsvTable, gzip: bool) -> CsvResult<Vec<u8>> {
    let text = render(table);
    if !gzip {
        return Ok(text.into_bytes());
    }
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes())?;
    Ok(encoder.finish()?)
}

/// Render a table straight to a file.
pub fn write_file(table: &CsvTable, path: &Path, gzip: bool) -> CsvResult<()> {
    let bytes = to_bytes(table, gzip)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

fn render(table: &CsvTable) -> String {
    let mut out = String::new();

    // Header: every name quoted; the row-name column gets an empty name.
    let mut first = true;
    if table.row_names.is_some() {
        out.push_str(&quote(""));
        first = false;
    }
    for name in &table.column_names {
        if !first {
            out.push(',');
        }
        out.push_str(&quote(name));
        first = false;
    }
    out.push('\n');

    let rows = table.row_count();
    let starts: Vec<usize> = (0..rows).step_by(RENDER_CHUNK).collect();
    let rendered: Vec<String> = starts
        .par_iter()
        .map(|&start| {
            let end = (start + RENDER_CHUNK).min(rows);
            let mut chunk = String::new();
            for row in start..end {
                render_row(table, row, &mut chunk);
            }
            chunk
        })
        .collect();
    for chunk in rendered {
        out.push_str(&chunk);
    }
    out
}

fn render_row(table: &CsvTable, row: usize, out: &mut String) {
    let mut first = true;
    if let Some(names) = &table.row_names {
        out.push_str(&quote(&names[row]));
        first = false;
    }
    for column in &table.columns {
        if !first {
            out.push(',');
        }
        out.push_str(&field(column, row));
        first = false;
    }
    out.push('\n');
}

fn field(column: &CsvColumn, row: usize) -> String {
    match column {
        CsvColumn::Integers(v) => match v[row] {
            None => "NA".to_string(),
            Some(x) => x.to_string(),
        },
        CsvColumn::Numbers(v) => match v[row] {
            None => "NA".to_string(),
            Some(x) => float_field(x),
        },
        CsvColumn::Booleans(v) => match v[row] {
            None => "NA".to_string(),
            Some(true) => "true".to_string(),
            Some(false) => "false".to_string(),
        },
        CsvColumn::Strings(v) => match &v[row] {
            None => "NA".to_string(),
            Some(s) => quote(s),
        },
    }
}

/// Shortest round-trip rendering, with fixed spellings for the specials.
fn float_field(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value == f64::INFINITY {
        "inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        value.to_string()
    }
}

/// Strings are always quoted; embedded quotes are doubled.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if c == '"' {
            out.push('"');
        }
        out.push(c);
    }
    out.push('"');
    out
}
