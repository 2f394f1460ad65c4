//! Metadata resolution and alias creation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde_json::json;
use tracing::debug;

use crate::document::MetadataDocument;
use crate::error::{StageError, StageResult};

/// Where the metadata document for a logical path lives.
pub fn metadata_file(root: &Path, path: &str) -> PathBuf {
    root.join(format!("{path}.json"))
}

/// Resolve the metadata document for `path`, following redirections until a
/// non-redirection document is found.
///
/// A redirection with several targets resolves through its first one; the
/// extra targets only matter to the audit. Cycles are detected and refused.
pub fn acquire_metadata(root: &Path, path: &str) -> StageResult<MetadataDocument> {
    let mut current = path.to_string();
    let mut visited = HashSet::new();
    loop {
        if !visited.insert(current.clone()) {
            return Err(StageError::RedirectionLoop {
                path: root.join(path),
            });
        }
        let file = metadata_file(root, &current);
        if !file.is_file() {
            return Err(StageError::MissingMetadata { path: file });
        }
        let doc = MetadataDocument::from_file(&file)?;
        if !doc.is_redirection() {
            return Ok(doc);
        }
        let targets = doc.redirection_targets()?;
        let Some(next) = targets.into_iter().next() else {
            return Err(StageError::BadDocument {
                path: file,
                reason: "redirection with no targets".to_string(),
            });
        };
        debug!(from = %current, to = %next, "following redirection");
        current = next;
    }
}

/// Create an alias: a `redirection/v1` document at `source` with one local
/// target pointing at `target`.
///
/// Fails when a real file or directory occupies `source`, or when a
/// non-redirection document already claims `source`'s metadata location.
/// An existing redirection is overwritten, which is how aliases get
/// re-pointed.
pub fn create_redirection(root: &Path, source: &str, target: &str) -> StageResult<()> {
    let file = metadata_file(root, source);
    if source.contains('\\') || target.contains('\\') {
        return Err(StageError::SourceOccupied {
            path: file,
            reason: "paths must use forward slashes".to_string(),
        });
    }
    if root.join(source).exists() {
        return Err(StageError::SourceOccupied {
            path: file,
            reason: format!("a real entry exists at {source}"),
        });
    }
    if file.is_file() {
        let existing = MetadataDocument::from_file(&file)?;
        if !existing.is_redirection() {
            return Err(StageError::SourceOccupied {
                path: file,
                reason: format!("a non-redirection document already describes {source}"),
            });
        }
    }

    if let Some(parent) = file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let body = json!({
        "$schema": "redirection/v1",
        "path": source,
        "is_child": false,
        "targets": [{"type": "local", "location": target}],
    });
    let doc = MetadataDocument::parse(&file, body)?;
    doc.write()?;
    debug!(source, target, "created redirection");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_doc(root: &Path, path: &str, body: serde_json::Value) {
        let file = metadata_file(root, path);
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(&file, serde_json::to_vec_pretty(&body).unwrap()).unwrap();
    }

    fn plain_doc(path: &str) -> serde_json::Value {
        json!({"$schema": "atomic_vector/v1", "path": path, "is_child": false})
    }

    #[test]
    fn redirection_resolves_like_the_real_path() {
        let dir = tempfile::tempdir().unwrap();
        write_doc(dir.path(), "b/real", plain_doc("b/real"));
        create_redirection(dir.path(), "a", "b/real").unwrap();

        let via_alias = acquire_metadata(dir.path(), "a").unwrap();
        let direct = acquire_metadata(dir.path(), "b/real").unwrap();
        assert_eq!(via_alias.path(), direct.path());
        assert_eq!(via_alias.schema(), direct.schema());
    }

    #[test]
    fn chained_redirections_resolve() {
        let dir = tempfile::tempdir().unwrap();
        write_doc(dir.path(), "real", plain_doc("real"));
        create_redirection(dir.path(), "hop", "real").unwrap();
        create_redirection(dir.path(), "start", "hop").unwrap();

        assert_eq!(acquire_metadata(dir.path(), "start").unwrap().path(), "real");
    }

    #[test]
    fn cycles_are_detected() {
        let dir = tempfile::tempdir().unwrap();
        create_redirection(dir.path(), "a", "b").unwrap();
        create_redirection(dir.path(), "b", "a").unwrap();
        let err = acquire_metadata(dir.path(), "a").unwrap_err();
        assert!(matches!(err, StageError::RedirectionLoop { .. }));
    }

    #[test]
    fn missing_document_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = acquire_metadata(dir.path(), "absent").unwrap_err();
        assert!(matches!(err, StageError::MissingMetadata { .. }));
    }

    #[test]
    fn occupied_source_is_refused() {
        let dir = tempfile::tempdir().unwrap();

        // A real file at the alias path.
        std::fs::write(dir.path().join("taken"), b"payload").unwrap();
        assert!(matches!(
            create_redirection(dir.path(), "taken", "elsewhere").unwrap_err(),
            StageError::SourceOccupied { .. }
        ));

        // A non-redirection document claiming the metadata location.
        write_doc(dir.path(), "claimed", plain_doc("claimed"));
        assert!(matches!(
            create_redirection(dir.path(), "claimed", "elsewhere").unwrap_err(),
            StageError::SourceOccupied { .. }
        ));

        // An existing redirection is re-pointed, not refused.
        create_redirection(dir.path(), "alias", "one").unwrap();
        create_redirection(dir.path(), "alias", "two").unwrap();
        let doc = MetadataDocument::from_file(&metadata_file(dir.path(), "alias")).unwrap();
        assert_eq!(doc.redirection_targets().unwrap(), vec!["two"]);
    }
}
