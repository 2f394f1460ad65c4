//! Legacy-era readers.
//!
//! Legacy documents carry a versioned `$schema`; readers are looked up by
//! schema prefix so point revisions keep working. The built-in set covers
//! the two payload schemas the staging format ever used for plain data:
//! `atomic_vector/v1` (single-column CSV) and `csv_data_frame/v1` (gzipped
//! CSV with typed columns plus nested children via `resource.path`).

use std::path::Path;
use std::sync::Arc;

use selenite_csv::{read_file, CsvColumn, TableSpec};
use selenite_types::{
    BooleanVector, DataFrame, IntegerVector, LogicalType, NumberVector, StringVector, Value,
};
use serde_json::Value as Json;

use crate::acquire::acquire_metadata;
use crate::document::MetadataDocument;
use crate::error::{StageError, StageResult};

/// Reconstructs a value from a legacy document. Receives the staging root,
/// the resolved document, and the reader set for recursing into children.
pub type LegacyReader =
    Arc<dyn Fn(&Path, &MetadataDocument, &LegacyReaders) -> StageResult<Value> + Send + Sync>;

/// An ordered schema-prefix registry of legacy readers.
pub struct LegacyReaders {
    by_prefix: Vec<(String, LegacyReader)>,
}

impl LegacyReaders {
    /// No readers at all; useful for registering a custom set from scratch.
    pub fn empty() -> Self {
        Self {
            by_prefix: Vec::new(),
        }
    }

    /// The built-in readers.
    pub fn builtin() -> Self {
        let mut readers = Self::empty();
        readers.register("atomic_vector/", Arc::new(read_atomic_vector));
        readers.register("csv_data_frame/", Arc::new(read_csv_data_frame));
        readers
    }

    /// Register a reader for every schema starting with `prefix`. Earlier
    /// registrations win on overlap.
    pub fn register(&mut self, prefix: &str, reader: LegacyReader) {
        self.by_prefix.push((prefix.to_string(), reader));
    }

    fn resolve(&self, schema: &str) -> Option<&LegacyReader> {
        self.by_prefix
            .iter()
            .find(|(prefix, _)| schema.starts_with(prefix))
            .map(|(_, reader)| reader)
    }

    /// Load the object at a logical path, following redirections.
    pub fn read(&self, root: &Path, path: &str) -> StageResult<Value> {
        let doc = acquire_metadata(root, path)?;
        self.read_document(root, &doc)
    }

    /// Load the object a resolved document describes.
    pub fn read_document(&self, root: &Path, doc: &MetadataDocument) -> StageResult<Value> {
        let Some(reader) = self.resolve(doc.schema()) else {
            return Err(StageError::UnknownSchema {
                path: doc.file().to_path_buf(),
                schema: doc.schema().to_string(),
            });
        };
        reader(root, doc, self)
    }
}

impl Default for LegacyReaders {
    fn default() -> Self {
        Self::builtin()
    }
}

fn bad(doc: &MetadataDocument, reason: impl Into<String>) -> StageError {
    StageError::BadDocument {
        path: doc.file().to_path_buf(),
        reason: reason.into(),
    }
}

fn section<'a>(doc: &'a MetadataDocument, name: &str) -> StageResult<&'a Json> {
    doc.body()
        .get(name)
        .ok_or_else(|| bad(doc, format!("missing '{name}' section")))
}

fn logical_type(doc: &MetadataDocument, section: &Json) -> StageResult<LogicalType> {
    let attr = section
        .get("type")
        .and_then(Json::as_str)
        .ok_or_else(|| bad(doc, "missing column 'type'"))?;
    LogicalType::from_attr(attr).ok_or_else(|| bad(doc, format!("unsupported value type '{attr}'")))
}

fn gzip_flag(section: &Json) -> bool {
    section.get("compression").and_then(Json::as_str) == Some("gzip")
}

fn column_to_value(column: CsvColumn) -> Value {
    match column {
        CsvColumn::Integers(v) => Value::Integer(IntegerVector::new(v)),
        CsvColumn::Numbers(v) => Value::Number(NumberVector::new(v)),
        CsvColumn::Booleans(v) => Value::Boolean(BooleanVector::new(v)),
        CsvColumn::Strings(v) => Value::String(StringVector::new(v)),
    }
}

// ---------------------------------------------------------------------------
// atomic_vector/v1
// ---------------------------------------------------------------------------

/// Payload: a CSV with a `values` column, preceded by a `names` column when
/// the metadata says the vector is named.
fn read_atomic_vector(
    root: &Path,
    doc: &MetadataDocument,
    _readers: &LegacyReaders,
) -> StageResult<Value> {
    let meta = section(doc, "atomic_vector")?;
    let value_type = logical_type(doc, meta)?;
    let named = meta.get("names").and_then(Json::as_bool).unwrap_or(false);
    let length = meta
        .get("length")
        .and_then(Json::as_u64)
        .ok_or_else(|| bad(doc, "missing 'length'"))?;

    let mut spec_types = Vec::new();
    if named {
        spec_types.push(LogicalType::String);
    }
    spec_types.push(value_type);
    let table = read_file(
        &root.join(doc.path()),
        gzip_flag(meta),
        &TableSpec::new(spec_types),
    )?;

    if table.row_count() as u64 != length {
        return Err(bad(
            doc,
            format!(
                "metadata declares {length} elements, payload has {}",
                table.row_count()
            ),
        ));
    }

    let mut columns = table.columns.into_iter();
    let names = if named {
        let Some(CsvColumn::Strings(raw)) = columns.next() else {
            return Err(bad(doc, "names column is not a string column"));
        };
        let names: Option<Vec<String>> = raw.into_iter().collect();
        Some(names.ok_or_else(|| bad(doc, "names column contains a missing value"))?)
    } else {
        None
    };
    let Some(column) = columns.next() else {
        return Err(bad(doc, "payload has no values column"));
    };

    let value = match (column_to_value(column), names) {
        (value, None) => value,
        (Value::Integer(v), Some(names)) => {
            Value::Integer(IntegerVector::with_names(v.values, names)?)
        }
        (Value::Number(v), Some(names)) => {
            Value::Number(NumberVector::with_names(v.values, names)?)
        }
        (Value::Boolean(v), Some(names)) => {
            Value::Boolean(BooleanVector::with_names(v.values, names)?)
        }
        (Value::String(v), Some(names)) => {
            Value::String(StringVector::with_names(v.values, names)?)
        }
        (other, Some(_)) => {
            return Err(bad(
                doc,
                format!("cannot attach names to a {}", other.type_tag()),
            ))
        }
    };
    Ok(value)
}

// ---------------------------------------------------------------------------
// csv_data_frame/v1
// ---------------------------------------------------------------------------

/// Payload: a (typically gzipped) CSV holding the simple columns in order;
/// complex columns are whole nested objects referenced by `resource.path`
/// and stitched back in at their declared position.
fn read_csv_data_frame(
    root: &Path,
    doc: &MetadataDocument,
    readers: &LegacyReaders,
) -> StageResult<Value> {
    let meta = section(doc, "csv_data_frame")?;
    let row_count = meta
        .get("row_count")
        .and_then(Json::as_u64)
        .ok_or_else(|| bad(doc, "missing 'row_count'"))? as usize;
    let has_row_names = meta
        .get("row_names")
        .and_then(Json::as_bool)
        .unwrap_or(false);
    let column_specs = meta
        .get("columns")
        .and_then(Json::as_array)
        .ok_or_else(|| bad(doc, "missing 'columns' array"))?;

    // Simple columns live in the CSV; the rest are children.
    let mut simple_types = Vec::new();
    for spec in column_specs {
        let kind = spec.get("type").and_then(Json::as_str);
        if kind != Some("other") {
            simple_types.push(logical_type(doc, spec)?);
        }
    }
    let mut table_spec = TableSpec::new(simple_types);
    if has_row_names {
        table_spec = table_spec.with_row_names();
    }
    let table = read_file(&root.join(doc.path()), gzip_flag(meta), &table_spec)?;
    if table.row_count() != row_count {
        return Err(bad(
            doc,
            format!(
                "metadata declares {row_count} rows, payload has {}",
                table.row_count()
            ),
        ));
    }

    let mut csv_columns = table.columns.into_iter();
    let mut csv_names = table.column_names.into_iter();
    let mut column_names = Vec::with_capacity(column_specs.len());
    let mut columns = Vec::with_capacity(column_specs.len());
    for spec in column_specs {
        let name = spec
            .get("name")
            .and_then(Json::as_str)
            .ok_or_else(|| bad(doc, "column without a 'name'"))?;
        column_names.push(name.to_string());

        if spec.get("type").and_then(Json::as_str) == Some("other") {
            let child = spec
                .get("resource")
                .and_then(|r| r.get("path"))
                .and_then(Json::as_str)
                .ok_or_else(|| bad(doc, format!("column '{name}' lacks a resource path")))?;
            let value = readers
                .read(root, child)
                .map_err(|err| err.context(format!("failed to load column '{name}'")))?;
            columns.push(value);
        } else {
            let header = csv_names.next();
            if header.as_deref() != Some(name) {
                return Err(bad(
                    doc,
                    format!(
                        "column '{name}' does not match payload header {:?}",
                        header.unwrap_or_default()
                    ),
                ));
            }
            let Some(column) = csv_columns.next() else {
                return Err(bad(doc, format!("payload is missing column '{name}'")));
            };
            columns.push(column_to_value(column));
        }
    }

    let mut frame = DataFrame::new(column_names, columns, row_count)?;
    if let Some(row_names) = table.row_names {
        frame = frame.with_row_names(row_names)?;
    }
    Ok(Value::Frame(frame))
}

#[cfg(test)]
mod tests {
    use super::*;
    use selenite_csv::{write_file, CsvTable};
    use serde_json::json;

    fn write_doc(root: &Path, path: &str, body: Json) {
        let file = root.join(format!("{path}.json"));
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(&file, serde_json::to_vec_pretty(&body).unwrap()).unwrap();
    }

    fn stage_named_vector(root: &Path) {
        let table = CsvTable::new(
            vec!["names".into(), "values".into()],
            vec![
                CsvColumn::Strings(vec![Some("a".into()), Some("b".into()), Some("c".into())]),
                CsvColumn::Integers(vec![Some(5), None, Some(-2)]),
            ],
            None,
        )
        .unwrap();
        std::fs::create_dir_all(root.join("vec")).unwrap();
        write_file(&table, &root.join("vec/simple.csv"), false).unwrap();
        write_doc(
            root,
            "vec/simple.csv",
            json!({
                "$schema": "atomic_vector/v1",
                "path": "vec/simple.csv",
                "is_child": false,
                "atomic_vector": {"type": "integer", "length": 3, "names": true},
            }),
        );
    }

    #[test]
    fn atomic_vector_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        stage_named_vector(dir.path());

        let value = LegacyReaders::builtin()
            .read(dir.path(), "vec/simple.csv")
            .unwrap();
        let expected = Value::Integer(
            IntegerVector::with_names(
                vec![Some(5), None, Some(-2)],
                vec!["a".into(), "b".into(), "c".into()],
            )
            .unwrap(),
        );
        assert_eq!(value, expected);
    }

    #[test]
    fn length_mismatch_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        stage_named_vector(dir.path());
        write_doc(
            dir.path(),
            "vec/simple.csv",
            json!({
                "$schema": "atomic_vector/v1",
                "path": "vec/simple.csv",
                "is_child": false,
                "atomic_vector": {"type": "integer", "length": 7, "names": true},
            }),
        );
        let err = LegacyReaders::builtin()
            .read(dir.path(), "vec/simple.csv")
            .unwrap_err();
        assert!(matches!(err, StageError::BadDocument { .. }));
    }

    #[test]
    fn data_frame_stitches_children_back_in() {
        let dir = tempfile::tempdir().unwrap();

        // The nested child column.
        let child = CsvTable::new(
            vec!["values".into()],
            vec![CsvColumn::Numbers(vec![Some(0.5), Some(1.5)])],
            None,
        )
        .unwrap();
        std::fs::create_dir_all(dir.path().join("df/column1")).unwrap();
        write_file(&child, &dir.path().join("df/column1/simple.csv"), false).unwrap();
        write_doc(
            dir.path(),
            "df/column1/simple.csv",
            json!({
                "$schema": "atomic_vector/v1",
                "path": "df/column1/simple.csv",
                "is_child": true,
                "atomic_vector": {"type": "number", "length": 2, "names": false},
            }),
        );

        // The frame's own simple columns, gzipped.
        let table = CsvTable::new(
            vec!["x".into(), "s".into()],
            vec![
                CsvColumn::Integers(vec![Some(1), Some(2)]),
                CsvColumn::Strings(vec![Some("p".into()), None]),
            ],
            Some(vec!["r1".into(), "r2".into()]),
        )
        .unwrap();
        write_file(&table, &dir.path().join("df/simple.csv.gz"), true).unwrap();
        write_doc(
            dir.path(),
            "df/simple.csv.gz",
            json!({
                "$schema": "csv_data_frame/v1",
                "path": "df/simple.csv.gz",
                "is_child": false,
                "csv_data_frame": {
                    "row_count": 2,
                    "row_names": true,
                    "compression": "gzip",
                    "columns": [
                        {"name": "x", "type": "integer"},
                        {"name": "y", "type": "other",
                         "resource": {"path": "df/column1/simple.csv"}},
                        {"name": "s", "type": "string"},
                    ],
                },
            }),
        );

        let value = LegacyReaders::builtin()
            .read(dir.path(), "df/simple.csv.gz")
            .unwrap();
        let Value::Frame(frame) = value else {
            panic!("expected a data frame");
        };
        assert_eq!(frame.column_names, vec!["x", "y", "s"]);
        assert_eq!(frame.row_names.as_deref().unwrap(), &["r1".to_string(), "r2".to_string()]);
        assert_eq!(
            frame.column("y"),
            Some(&Value::Number(NumberVector::from(vec![0.5, 1.5])))
        );
    }

    #[test]
    fn child_failures_carry_the_column_name() {
        let dir = tempfile::tempdir().unwrap();
        let table = CsvTable::new(
            vec!["x".into()],
            vec![CsvColumn::Integers(vec![Some(1)])],
            None,
        )
        .unwrap();
        std::fs::create_dir_all(dir.path().join("df")).unwrap();
        write_file(&table, &dir.path().join("df/simple.csv"), false).unwrap();
        write_doc(
            dir.path(),
            "df/simple.csv",
            json!({
                "$schema": "csv_data_frame/v1",
                "path": "df/simple.csv",
                "is_child": false,
                "csv_data_frame": {
                    "row_count": 1,
                    "row_names": false,
                    "columns": [
                        {"name": "x", "type": "integer"},
                        {"name": "gone", "type": "other",
                         "resource": {"path": "df/column1/simple.csv"}},
                    ],
                },
            }),
        );

        let err = LegacyReaders::builtin()
            .read(dir.path(), "df/simple.csv")
            .unwrap_err();
        let rendered = err.to_string();
        assert!(rendered.contains("failed to load column 'gone'"), "{rendered}");
    }

    #[test]
    fn unknown_schema_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        write_doc(
            dir.path(),
            "mystery",
            json!({"$schema": "hologram/v1", "path": "mystery", "is_child": false}),
        );
        let err = LegacyReaders::builtin()
            .read(dir.path(), "mystery")
            .unwrap_err();
        assert!(matches!(err, StageError::UnknownSchema { .. }));
    }
}
