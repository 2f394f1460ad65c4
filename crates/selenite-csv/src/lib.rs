//! Strict-escaping CSV payload codec.
//!
//! The dialect is deliberately narrow: UTF-8 only, every string quoted with
//! embedded quotes doubled, bare `NA` for missing, `true`/`false` booleans,
//! shortest round-trip floats with `inf`/`-inf`/`nan` spellings, and an
//! optional leading row-name column. Parsing is typed against a declared
//! [`TableSpec`] and chunk-parallel on the rayon pool; writing mirrors the
//! same chunking. Optional gzip on both sides.

pub mod error;
pub mod parse;
pub mod table;
pub mod write;

pub use error::{CsvError, CsvResult};
pub use parse::{parse_bytes, parse_text, read_file};
pub use table::{CsvColumn, CsvTable, TableSpec};
pub use write::{to_bytes, write_file};

#[cfg(test)]
mod tests {
    use super::*;
    use selenite_types::LogicalType;

    fn mixed_table(rows: usize) -> CsvTable {
        let ints = (0..rows)
            .map(|i| {
                if i % 7 == 0 {
                    None
                } else {
                    Some(i as i32 - 50)
                }
            })
            .collect();
        let numbers = (0..rows)
            .map(|i| match i % 5 {
                0 => None,
                1 => Some(f64::INFINITY),
                2 => Some(-0.125 * i as f64),
                _ => Some(i as f64 / 3.0),
            })
            .collect();
        let strings = (0..rows)
            .map(|i| match i % 4 {
                0 => None,
                1 => Some(format!("line\nbreak {i}")),
                2 => Some(format!("quote \"{i}\"")),
                _ => Some("NA".to_string()),
            })
            .collect();
        CsvTable::new(
            vec!["i".into(), "n".into(), "s".into()],
            vec![
                CsvColumn::Integers(ints),
                CsvColumn::Numbers(numbers),
                CsvColumn::Strings(strings),
            ],
            Some((0..rows).map(|i| format!("row{i}")).collect()),
        )
        .unwrap()
    }

    fn shape() -> TableSpec {
        TableSpec::new(vec![
            LogicalType::Integer,
            LogicalType::Number,
            LogicalType::String,
        ])
        .with_row_names()
    }

    #[test]
    fn roundtrip_small() {
        let table = mixed_table(9);
        let bytes = to_bytes(&table, false).unwrap();
        let back = parse_bytes(&bytes, false, &shape()).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn roundtrip_through_parallel_chunks() {
        // Over 2048 rows so at least three parse chunks are exercised.
        let table = mixed_table(3000);
        let bytes = to_bytes(&table, false).unwrap();
        let back = parse_bytes(&bytes, false, &shape()).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn roundtrip_gzip() {
        let table = mixed_table(40);
        let bytes = to_bytes(&table, true).unwrap();
        assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
        let back = parse_bytes(&bytes, true, &shape()).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.csv.gz");
        let table = mixed_table(25);
        write_file(&table, &path, true).unwrap();
        let back = read_file(&path, true, &shape()).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn nan_survives_as_its_spelling() {
        let table = CsvTable::new(
            vec!["n".into()],
            vec![CsvColumn::Numbers(vec![Some(f64::NAN), Some(1.0)])],
            None,
        )
        .unwrap();
        let text = String::from_utf8(to_bytes(&table, false).unwrap()).unwrap();
        assert!(text.contains("nan"));
        let back = parse_text(&text, &TableSpec::new(vec![LogicalType::Number])).unwrap();
        match &back.columns[0] {
            CsvColumn::Numbers(v) => {
                assert!(v[0].is_some_and(f64::is_nan));
                assert_eq!(v[1], Some(1.0));
            }
            other => panic!("unexpected column: {other:?}"),
        }
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let err = parse_bytes(&[0xFF, 0xFE, b'\n'], false, &TableSpec::new(vec![]))
            .unwrap_err();
        assert!(matches!(err, CsvError::Utf8));
    }

    #[test]
    fn header_arity_is_enforced() {
        let err = parse_text(
            "\"a\",\"b\"\n",
            &TableSpec::new(vec![LogicalType::Integer]),
        )
        .unwrap_err();
        assert!(matches!(err, CsvError::HeaderArity { expected: 1, actual: 2 }));
    }
}
