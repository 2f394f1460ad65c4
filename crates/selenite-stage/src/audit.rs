//! Legacy-era staging directory audit.
//!
//! A full scan of every `*.json` metadata document, classified into
//! redirections, children, and non-children, followed by six referential
//! integrity checks in a fixed order:
//!
//! 1. no child referenced by more than one parent,
//! 2. every referenced child exists and is child-flagged,
//! 3. no child-flagged document lacks a referencing parent,
//! 4. no file on disk that no document describes,
//! 5. no non-child object nested inside another non-child's directory,
//! 6. no redirection target pointing at an unknown path.
//!
//! The audit fails fast: the first violation found is the one reported.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::document::MetadataDocument;
use crate::error::{StageError, StageResult};
use crate::readers::LegacyReaders;

/// Options for [`audit_directory`].
#[derive(Clone, Copy, Debug, Default)]
pub struct AuditOptions {
    /// After the structural checks, fully load every non-child object to
    /// catch payload-level corruption. Children are covered transitively
    /// by their parent's load.
    pub attempt_load: bool,
}

/// Audit a legacy staging directory with the built-in readers.
///
/// Returns the metadata file paths of the non-child objects, sorted by
/// their logical path.
pub fn audit_directory(root: &Path, options: AuditOptions) -> StageResult<Vec<PathBuf>> {
    audit_directory_with_readers(root, options, &LegacyReaders::builtin())
}

/// Audit with a caller-supplied reader set (only consulted for loads).
pub fn audit_directory_with_readers(
    root: &Path,
    options: AuditOptions,
    readers: &LegacyReaders,
) -> StageResult<Vec<PathBuf>> {
    let scan = scan_files(root)?;

    // Parse every document; key by its logical path. A document must live
    // at exactly `<path>.json` or the path-keyed bookkeeping below falls
    // apart, so that mismatch is refused up front.
    let mut documents: BTreeMap<String, MetadataDocument> = BTreeMap::new();
    for rel in &scan.json_files {
        let file = root.join(rel);
        let doc = MetadataDocument::from_file(&file)?;
        let Some(claimed) = rel.strip_suffix(".json") else {
            continue;
        };
        if doc.path() != claimed {
            return Err(StageError::BadDocument {
                path: file,
                reason: format!("document at '{rel}' claims path '{}'", doc.path()),
            });
        }
        documents.insert(doc.path().to_string(), doc);
    }

    // Check 1: collect child references, refusing duplicates.
    let mut referenced: BTreeMap<String, String> = BTreeMap::new();
    for (parent, doc) in &documents {
        for child in doc.child_references() {
            if let Some(first) = referenced.get(&child) {
                return Err(StageError::DuplicateChildReference {
                    path: child,
                    first_parent: first.clone(),
                    second_parent: parent.clone(),
                });
            }
            referenced.insert(child, parent.clone());
        }
    }

    // Check 2: every referenced child exists, child-flagged.
    for (child, parent) in &referenced {
        let exists = documents
            .get(child)
            .is_some_and(|doc| doc.is_child() && !doc.is_redirection());
        if !exists {
            return Err(StageError::MissingChild {
                path: child.clone(),
                parent: parent.clone(),
            });
        }
    }

    // Check 3: every child-flagged document is referenced by some parent.
    for (path, doc) in &documents {
        if doc.is_child() && !doc.is_redirection() && !referenced.contains_key(path) {
            return Err(StageError::OrphanChild { path: path.clone() });
        }
    }

    // Check 4: every non-metadata file belongs to some document.
    for rel in &scan.data_files {
        if !documents.contains_key(rel) {
            return Err(StageError::UnknownFile { path: rel.clone() });
        }
    }

    // Check 5: no non-child object directory nested inside another.
    // Directory names are sorted as plain strings and only adjacent pairs
    // are compared, faithfully reproducing the historical audit.
    let mut object_dirs: Vec<&str> = documents
        .values()
        .filter(|doc| !doc.is_child() && !doc.is_redirection())
        .map(|doc| dirname(doc.path()))
        .filter(|dir| !dir.is_empty())
        .collect();
    object_dirs.sort_unstable();
    for pair in object_dirs.windows(2) {
        let (outer, inner) = (pair[0], pair[1]);
        if inner.starts_with(outer) && inner.as_bytes().get(outer.len()) == Some(&b'/') {
            return Err(StageError::IllegalNesting {
                outer: outer.to_string(),
                inner: inner.to_string(),
            });
        }
    }

    // Check 6: every redirection target resolves to a known object path.
    for (path, doc) in &documents {
        if !doc.is_redirection() {
            continue;
        }
        for target in doc.redirection_targets()? {
            let known = documents
                .get(&target)
                .is_some_and(|found| !found.is_redirection());
            if !known {
                return Err(StageError::DanglingRedirect {
                    path: path.clone(),
                    target,
                });
            }
        }
    }

    let survivors: Vec<(&String, &MetadataDocument)> = documents
        .iter()
        .filter(|(_, doc)| !doc.is_child() && !doc.is_redirection())
        .collect();

    if options.attempt_load {
        for (path, doc) in &survivors {
            readers
                .read_document(root, doc)
                .map_err(|err| err.context(format!("failed to load '{path}'")))?;
        }
    }

    debug!(
        root = %root.display(),
        objects = survivors.len(),
        loaded = options.attempt_load,
        "legacy audit passed"
    );
    Ok(survivors
        .into_iter()
        .map(|(_, doc)| doc.file().to_path_buf())
        .collect())
}

struct ScannedFiles {
    json_files: Vec<String>,
    data_files: Vec<String>,
}

fn scan_files(root: &Path) -> StageResult<ScannedFiles> {
    let mut json_files = Vec::new();
    let mut data_files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        let rel = rel.to_string_lossy().into_owned();
        if rel.ends_with(".json") {
            json_files.push(rel);
        } else {
            data_files.push(rel);
        }
    }
    json_files.sort_unstable();
    data_files.sort_unstable();
    Ok(ScannedFiles {
        json_files,
        data_files,
    })
}

fn dirname(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use selenite_csv::{write_file, CsvColumn, CsvTable};
    use serde_json::json;

    fn write_doc(root: &Path, path: &str, body: serde_json::Value) {
        let file = root.join(format!("{path}.json"));
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(&file, serde_json::to_vec_pretty(&body).unwrap()).unwrap();
    }

    fn int_csv(root: &Path, rel: &str, values: Vec<Option<i32>>) {
        let table = CsvTable::new(
            vec!["values".into()],
            vec![CsvColumn::Integers(values)],
            None,
        )
        .unwrap();
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        write_file(&table, &path, false).unwrap();
    }

    /// A healthy staging area: one vector, one frame with a child column,
    /// one redirection.
    fn build_stage(root: &Path) {
        int_csv(root, "vec/simple.csv", vec![Some(1), None, Some(3)]);
        write_doc(
            root,
            "vec/simple.csv",
            json!({
                "$schema": "atomic_vector/v1",
                "path": "vec/simple.csv",
                "is_child": false,
                "atomic_vector": {"type": "integer", "length": 3, "names": false},
            }),
        );

        int_csv(root, "df/column1/simple.csv", vec![Some(4), Some(5)]);
        write_doc(
            root,
            "df/column1/simple.csv",
            json!({
                "$schema": "atomic_vector/v1",
                "path": "df/column1/simple.csv",
                "is_child": true,
                "atomic_vector": {"type": "integer", "length": 2, "names": false},
            }),
        );

        let table = CsvTable::new(
            vec!["x".into()],
            vec![CsvColumn::Integers(vec![Some(7), Some(8)])],
            None,
        )
        .unwrap();
        write_file(&table, &root.join("df/simple.csv"), false).unwrap();
        write_doc(
            root,
            "df/simple.csv",
            json!({
                "$schema": "csv_data_frame/v1",
                "path": "df/simple.csv",
                "is_child": false,
                "csv_data_frame": {
                    "row_count": 2,
                    "row_names": false,
                    "columns": [
                        {"name": "x", "type": "integer"},
                        {"name": "y", "type": "other",
                         "resource": {"path": "df/column1/simple.csv"}},
                    ],
                },
            }),
        );

        write_doc(
            root,
            "alias",
            json!({
                "$schema": "redirection/v1",
                "path": "alias",
                "is_child": false,
                "targets": [{"type": "local", "location": "vec/simple.csv"}],
            }),
        );
    }

    fn load_all() -> AuditOptions {
        AuditOptions { attempt_load: true }
    }

    #[test]
    fn healthy_stage_passes_with_loads() {
        let dir = tempfile::tempdir().unwrap();
        build_stage(dir.path());
        let validated = audit_directory(dir.path(), load_all()).unwrap();
        assert_eq!(validated.len(), 2);
        assert!(validated[0].ends_with("df/simple.csv.json"));
        assert!(validated[1].ends_with("vec/simple.csv.json"));
    }

    #[test]
    fn duplicate_child_reference_is_violation_one() {
        let dir = tempfile::tempdir().unwrap();
        build_stage(dir.path());
        int_csv(dir.path(), "df2/simple.csv", vec![Some(1), Some(2)]);
        write_doc(
            dir.path(),
            "df2/simple.csv",
            json!({
                "$schema": "csv_data_frame/v1",
                "path": "df2/simple.csv",
                "is_child": false,
                "csv_data_frame": {
                    "row_count": 2,
                    "row_names": false,
                    "columns": [
                        {"name": "x", "type": "integer"},
                        {"name": "stolen", "type": "other",
                         "resource": {"path": "df/column1/simple.csv"}},
                    ],
                },
            }),
        );

        let err = audit_directory(dir.path(), AuditOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            StageError::DuplicateChildReference { ref path, .. } if path == "df/column1/simple.csv"
        ));
    }

    #[test]
    fn deleted_child_is_a_missing_child_not_an_unknown_file() {
        let dir = tempfile::tempdir().unwrap();
        build_stage(dir.path());
        // Removing only the metadata leaves the payload behind; the missing
        // child must win over the now-undescribed payload file.
        std::fs::remove_file(dir.path().join("df/column1/simple.csv.json")).unwrap();

        let err = audit_directory(dir.path(), AuditOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            StageError::MissingChild { ref path, ref parent }
                if path == "df/column1/simple.csv" && parent == "df/simple.csv"
        ));
    }

    #[test]
    fn unreferenced_child_is_an_orphan() {
        let dir = tempfile::tempdir().unwrap();
        build_stage(dir.path());
        int_csv(dir.path(), "df/column9/simple.csv", vec![Some(0), Some(0)]);
        write_doc(
            dir.path(),
            "df/column9/simple.csv",
            json!({
                "$schema": "atomic_vector/v1",
                "path": "df/column9/simple.csv",
                "is_child": true,
                "atomic_vector": {"type": "integer", "length": 2, "names": false},
            }),
        );

        let err = audit_directory(dir.path(), AuditOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            StageError::OrphanChild { ref path } if path == "df/column9/simple.csv"
        ));
    }

    #[test]
    fn stray_file_is_unknown() {
        let dir = tempfile::tempdir().unwrap();
        build_stage(dir.path());
        std::fs::write(dir.path().join("vec/scratch.bin"), b"left behind").unwrap();

        let err = audit_directory(dir.path(), AuditOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            StageError::UnknownFile { ref path } if path == "vec/scratch.bin"
        ));
    }

    #[test]
    fn nested_non_child_is_illegal() {
        let dir = tempfile::tempdir().unwrap();
        build_stage(dir.path());
        int_csv(dir.path(), "df/sneaky/simple.csv", vec![Some(1)]);
        write_doc(
            dir.path(),
            "df/sneaky/simple.csv",
            json!({
                "$schema": "atomic_vector/v1",
                "path": "df/sneaky/simple.csv",
                "is_child": false,
                "atomic_vector": {"type": "integer", "length": 1, "names": false},
            }),
        );

        let err = audit_directory(dir.path(), AuditOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            StageError::IllegalNesting { ref outer, ref inner }
                if outer == "df" && inner == "df/sneaky"
        ));
    }

    #[test]
    fn dangling_redirection_target() {
        let dir = tempfile::tempdir().unwrap();
        build_stage(dir.path());
        write_doc(
            dir.path(),
            "ghost",
            json!({
                "$schema": "redirection/v1",
                "path": "ghost",
                "is_child": false,
                "targets": [{"type": "local", "location": "vanished/simple.csv"}],
            }),
        );

        let err = audit_directory(dir.path(), AuditOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            StageError::DanglingRedirect { ref target, .. } if target == "vanished/simple.csv"
        ));
    }

    #[test]
    fn attempt_load_catches_payload_corruption() {
        let dir = tempfile::tempdir().unwrap();
        build_stage(dir.path());
        // Structure is intact, payload is not: one row vanishes.
        int_csv(dir.path(), "df/column1/simple.csv", vec![Some(4)]);

        assert!(audit_directory(dir.path(), AuditOptions::default()).is_ok());
        let err = audit_directory(dir.path(), load_all()).unwrap_err();
        let rendered = err.to_string();
        assert!(rendered.contains("failed to load 'df/simple.csv'"), "{rendered}");
    }
}
