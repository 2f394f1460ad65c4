use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use rayon::prelude::*;
use selenite_types::LogicalType;

use crate::error::{CsvError, CsvResult};
use crate::table::{CsvColumn, CsvTable, TableSpec};

/// Records parsed per parallel work unit.
const PARSE_CHUNK: usize = 1024;

/// Parse a CSV file against a declared shape.
pub fn read_file(path: &Path, gzip: bool, spec: &TableSpec) -> CsvResult<CsvTable> {
    let bytes = std::fs::read(path)?;
    parse_bytes(&bytes, gzip, spec)
}

/// Parse CSV bytes, decompressing first when `gzip` is set.
pub fn parse_bytes(bytes: &[u8], gzip: bool, spec: &TableSpec) -> CsvResult<CsvTable> {
    if gzip {
        let mut decoder = GzDecoder::new(bytes);
        let mut raw = Vec::new();
        decoder.read_to_end(&mut raw)?;
        parse_utf8(&raw, spec)
    } else {
        parse_utf8(bytes, spec)
    }
}

fn parse_utf8(bytes: &[u8], spec: &TableSpec) -> CsvResult<CsvTable> {
    let text = std::str::from_utf8(bytes).map_err(|_| CsvError::Utf8)?;
    parse_text(text, spec)
}

/// Parse CSV text against a declared shape.
///
/// Record boundaries come from a single quote-parity scan; the records are
/// then typed in parallel chunks and reassembled in input order, so the
/// parallelism never shows in the result. Rows are numbered from 1 with
/// the header as row 1.
pub fn parse_text(text: &str, spec: &TableSpec) -> CsvResult<CsvTable> {
    let records = split_records(text)?;
    let Some((header, rows)) = records.split_first() else {
        return Err(CsvError::MissingHeader);
    };
    let column_names = parse_header(header, spec)?;

    let partials: Vec<Partial> = rows
        .par_chunks(PARSE_CHUNK)
        .enumerate()
        .map(|(chunk_index, chunk)| {
            parse_chunk(chunk, 2 + chunk_index * PARSE_CHUNK, spec, &column_names)
        })
        .collect::<CsvResult<Vec<Partial>>>()?;

    let mut row_names = spec.row_names.then(Vec::new);
    let mut columns: Vec<CsvColumn> = spec
        .columns
        .iter()
        .map(|t| CsvColumn::empty(*t))
        .collect();
    for partial in partials {
        if let (Some(all), Some(part)) = (row_names.as_mut(), partial.row_names) {
            all.extend(part);
        }
        for (column, part) in columns.iter_mut().zip(partial.columns) {
            column.append(part);
        }
    }
    CsvTable::new(column_names, columns, row_names)
}

/// Split into records at newlines that fall outside quoted fields.
fn split_records(text: &str) -> CsvResult<Vec<&str>> {
    let bytes = text.as_bytes();
    let mut records = Vec::new();
    let mut in_quotes = false;
    let mut quote_open = 0usize;
    let mut start = 0usize;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'"' => {
                if !in_quotes {
                    quote_open = i;
                }
                in_quotes = !in_quotes;
            }
            b'\n' if !in_quotes => {
                let mut end = i;
                if end > start && bytes[end - 1] == b'\r' {
                    end -= 1;
                }
                records.push(&text[start..end]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if in_quotes {
        return Err(CsvError::UnterminatedQuote { offset: quote_open });
    }
    if start < bytes.len() {
        records.push(&text[start..]);
    }
    Ok(records)
}

#[derive(Debug)]
struct RawField<'a> {
    text: &'a str,
    quoted: bool,
}

impl RawField<'_> {
    fn unescape(&self) -> String {
        if self.quoted && self.text.contains("\"\"") {
            self.text.replace("\"\"", "\"")
        } else {
            self.text.to_string()
        }
    }
}

/// Split one record into raw fields, enforcing the quoting rules.
fn split_fields<'a>(record: &'a str, row: usize) -> CsvResult<Vec<RawField<'a>>> {
    let malformed = |reason: &str| CsvError::Malformed {
        row,
        reason: reason.to_string(),
    };
    let bytes = record.as_bytes();
    let mut fields = Vec::new();
    let mut pos = 0usize;
    loop {
        if pos < bytes.len() && bytes[pos] == b'"' {
            let start = pos + 1;
            let mut i = start;
            let end = loop {
                if i >= bytes.len() {
                    return Err(malformed("unterminated quoted field"));
                }
                if bytes[i] == b'"' {
                    if i + 1 < bytes.len() && bytes[i + 1] == b'"' {
                        i += 2;
                        continue;
                    }
                    break i;
                }
                i += 1;
            };
            fields.push(RawField {
                text: &record[start..end],
                quoted: true,
            });
            pos = end + 1;
            if pos >= bytes.len() {
                break;
            }
            if bytes[pos] != b',' {
                return Err(malformed("unexpected character after closing quote"));
            }
            pos += 1;
            if pos == bytes.len() {
                fields.push(RawField {
                    text: "",
                    quoted: false,
                });
                break;
            }
        } else {
            let start = pos;
            while pos < bytes.len() && bytes[pos] != b',' {
                if bytes[pos] == b'"' {
                    return Err(malformed("quote inside unquoted field"));
                }
                pos += 1;
            }
            fields.push(RawField {
                text: &record[start..pos],
                quoted: false,
            });
            if pos >= bytes.len() {
                break;
            }
            pos += 1;
            if pos == bytes.len() {
                fields.push(RawField {
                    text: "",
                    quoted: false,
                });
                break;
            }
        }
    }
    Ok(fields)
}

fn parse_header(header: &str, spec: &TableSpec) -> CsvResult<Vec<String>> {
    let fields = split_fields(header, 1)?;
    for field in &fields {
        if !field.quoted {
            return Err(CsvError::Malformed {
                row: 1,
                reason: "header names must be quoted".to_string(),
            });
        }
    }
    let names: Vec<String> = fields
        .iter()
        .skip(usize::from(spec.row_names))
        .map(RawField::unescape)
        .collect();
    if fields.len() != spec.arity() {
        return Err(CsvError::HeaderArity {
            expected: spec.arity(),
            actual: fields.len(),
        });
    }
    Ok(names)
}

struct Partial {
    row_names: Option<Vec<String>>,
    columns: Vec<CsvColumn>,
}

fn parse_chunk(
    records: &[&str],
    first_row: usize,
    spec: &TableSpec,
    names: &[String],
) -> CsvResult<Partial> {
    let mut row_names = spec
        .row_names
        .then(|| Vec::with_capacity(records.len()));
    let mut columns: Vec<CsvColumn> = spec
        .columns
        .iter()
        .map(|t| CsvColumn::empty(*t))
        .collect();

    for (k, record) in records.iter().enumerate() {
        let row = first_row + k;
        let fields = split_fields(record, row)?;
        if fields.len() != spec.arity() {
            return Err(CsvError::RecordArity {
                row,
                expected: spec.arity(),
                actual: fields.len(),
            });
        }
        let mut fields = fields.into_iter();
        if let Some(collected) = row_names.as_mut() {
            match fields.next() {
                Some(f) if f.quoted => collected.push(f.unescape()),
                Some(_) => {
                    return Err(CsvError::Field {
                        row,
                        column: "<row names>".to_string(),
                        reason: "row names must be quoted strings".to_string(),
                    })
                }
                None => {
                    return Err(CsvError::RecordArity {
                        row,
                        expected: spec.arity(),
                        actual: 0,
                    })
                }
            }
        }
        for (column, name) in columns.iter_mut().zip(names) {
            let Some(field) = fields.next() else {
                return Err(CsvError::RecordArity {
                    row,
                    expected: spec.arity(),
                    actual: spec.arity() - 1,
                });
            };
            push_field(column, &field, row, name)?;
        }
    }

    Ok(Partial { row_names, columns })
}

fn push_field(
    column: &mut CsvColumn,
    field: &RawField<'_>,
    row: usize,
    name: &str,
) -> CsvResult<()> {
    let fail = |reason: String| CsvError::Field {
        row,
        column: name.to_string(),
        reason,
    };
    let missing = !field.quoted && field.text == "NA";
    match column {
        CsvColumn::Strings(v) => {
            if field.quoted {
                v.push(Some(field.unescape()));
            } else if missing {
                v.push(None);
            } else {
                return Err(fail(format!(
                    "expected a quoted string or NA, got '{}'",
                    field.text
                )));
            }
        }
        CsvColumn::Integers(v) => {
            if field.quoted {
                return Err(fail("integers must not be quoted".to_string()));
            }
            if missing {
                v.push(None);
            } else {
                let parsed = field.text.parse::<i32>().map_err(|_| {
                    fail(format!("expected an integer, got '{}'", field.text))
                })?;
                v.push(Some(parsed));
            }
        }
        CsvColumn::Numbers(v) => {
            if field.quoted {
                return Err(fail("numbers must not be quoted".to_string()));
            }
            if missing {
                v.push(None);
            } else {
                let parsed = field.text.parse::<f64>().map_err(|_| {
                    fail(format!("expected a number, got '{}'", field.text))
                })?;
                v.push(Some(parsed));
            }
        }
        CsvColumn::Booleans(v) => match field.text {
            _ if field.quoted => {
                return Err(fail("booleans must not be quoted".to_string()))
            }
            "NA" => v.push(None),
            "true" => v.push(Some(true)),
            "false" => v.push(Some(false)),
            other => {
                return Err(fail(format!("expected true, false or NA, got '{other}'")))
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(columns: Vec<LogicalType>) -> TableSpec {
        TableSpec::new(columns)
    }

    #[test]
    fn record_split_respects_quotes() {
        let records = split_records("\"a\nb\",1\n\"c\",2\n").unwrap();
        assert_eq!(records, vec!["\"a\nb\",1", "\"c\",2"]);
    }

    #[test]
    fn record_split_handles_crlf() {
        let records = split_records("\"x\"\r\n1\r\n").unwrap();
        assert_eq!(records, vec!["\"x\"", "1"]);
    }

    #[test]
    fn unterminated_quote_is_reported() {
        let err = split_records("\"abc\n1\n").unwrap_err();
        assert!(matches!(err, CsvError::UnterminatedQuote { offset: 0 }));
    }

    #[test]
    fn doubled_quotes_unescape() {
        let fields = split_fields(r#""say ""hi""",2"#, 1).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].unescape(), "say \"hi\"");
        assert_eq!(fields[1].text, "2");
    }

    #[test]
    fn trailing_comma_means_empty_field() {
        let fields = split_fields("1,", 1).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[1].text, "");
    }

    #[test]
    fn text_after_closing_quote_is_malformed() {
        let err = split_fields("\"a\"x,1", 3).unwrap_err();
        assert!(matches!(err, CsvError::Malformed { row: 3, .. }));
    }

    #[test]
    fn typed_parse_with_missing_values() {
        let text = "\"i\",\"n\",\"b\",\"s\"\n1,1.5,true,\"x\"\nNA,NA,NA,NA\n";
        let table = parse_text(
            text,
            &spec(vec![
                LogicalType::Integer,
                LogicalType::Number,
                LogicalType::Boolean,
                LogicalType::String,
            ]),
        )
        .unwrap();
        assert_eq!(table.columns[0], CsvColumn::Integers(vec![Some(1), None]));
        assert_eq!(table.columns[1], CsvColumn::Numbers(vec![Some(1.5), None]));
        assert_eq!(table.columns[2], CsvColumn::Booleans(vec![Some(true), None]));
        assert_eq!(
            table.columns[3],
            CsvColumn::Strings(vec![Some("x".to_string()), None])
        );
    }

    #[test]
    fn quoted_na_is_a_real_string() {
        let text = "\"s\"\n\"NA\"\n";
        let table = parse_text(text, &spec(vec![LogicalType::String])).unwrap();
        assert_eq!(
            table.columns[0],
            CsvColumn::Strings(vec![Some("NA".to_string())])
        );
    }

    #[test]
    fn wrong_arity_names_the_row() {
        let text = "\"a\",\"b\"\n1,2\n3\n";
        let err = parse_text(
            text,
            &spec(vec![LogicalType::Integer, LogicalType::Integer]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CsvError::RecordArity { row: 3, expected: 2, actual: 1 }
        ));
    }

    #[test]
    fn bad_field_names_row_and_column() {
        let text = "\"a\"\nx\n";
        let err = parse_text(text, &spec(vec![LogicalType::Integer])).unwrap_err();
        match err {
            CsvError::Field { row, column, .. } => {
                assert_eq!(row, 2);
                assert_eq!(column, "a");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn header_must_be_quoted() {
        let err = parse_text("a\n1\n", &spec(vec![LogicalType::Integer])).unwrap_err();
        assert!(matches!(err, CsvError::Malformed { row: 1, .. }));
    }

    #[test]
    fn row_names_come_back_separately() {
        let text = "\"\",\"x\"\n\"r1\",1\n\"r2\",2\n";
        let table = parse_text(
            text,
            &spec(vec![LogicalType::Integer]).with_row_names(),
        )
        .unwrap();
        assert_eq!(
            table.row_names,
            Some(vec!["r1".to_string(), "r2".to_string()])
        );
        assert_eq!(table.columns[0], CsvColumn::Integers(vec![Some(1), Some(2)]));
    }

    #[test]
    fn empty_payload_has_no_header() {
        let err = parse_text("", &spec(vec![])).unwrap_err();
        assert!(matches!(err, CsvError::MissingHeader));
    }
}
