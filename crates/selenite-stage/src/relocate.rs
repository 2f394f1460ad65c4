//! Renaming legacy objects in place.

use std::fs;
use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::acquire::metadata_file;
use crate::document::MetadataDocument;
use crate::error::{StageError, StageResult};

/// Options for [`move_object`].
#[derive(Clone, Copy, Debug, Default)]
pub struct MoveOptions {
    /// Also rename redirection files that pointed at the moved object so
    /// their file name matches the new logical name. When several
    /// redirections pointed at the same object they collapse into one,
    /// clobbering with a warning.
    pub rename_redirections: bool,
}

/// Move a legacy object directory from `from` to `to`.
///
/// `from` may be a redirection alias, which is followed one hop to the
/// canonical directory. The directory is renamed, every metadata document
/// inside has its `path` and nested `resource.path` fields rewritten, and
/// redirections elsewhere in the staging area that targeted the old
/// location are re-pointed.
pub fn move_object(root: &Path, from: &str, to: &str, options: MoveOptions) -> StageResult<()> {
    check_separators(root, from)?;
    check_separators(root, to)?;

    let canonical = resolve_one_hop(root, from)?;
    ensure_not_child(root, &canonical)?;

    let source = root.join(&canonical);
    let dest = root.join(to);
    if dest.exists() {
        return Err(StageError::DestinationExists { path: dest });
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::rename(&source, &dest)?;
    debug!(from = %canonical, to, "renamed object directory");

    // Every document now under the new directory describes old paths.
    for file in json_files(&dest) {
        let mut doc = MetadataDocument::from_file(&file)?;
        if doc.rewrite_path_prefix(&canonical, to) {
            doc.write()?;
        }
    }

    retarget_redirections(root, &canonical, to, options)?;
    Ok(())
}

/// Delete a legacy object directory and clean up redirections pointing at
/// it. Single-target redirections are deleted outright; multi-target ones
/// just lose the dead target.
pub fn remove_object(root: &Path, path: &str) -> StageResult<()> {
    check_separators(root, path)?;
    ensure_not_child(root, path)?;

    fs::remove_dir_all(root.join(path))?;
    debug!(path, "removed object directory");

    for file in json_files(root) {
        let mut doc = MetadataDocument::from_file(&file)?;
        if !doc.is_redirection() {
            continue;
        }
        let before = doc.redirection_targets()?.len();
        let survivors = doc.prune_redirection_targets(path);
        if survivors == before {
            continue;
        }
        if survivors == 0 {
            debug!(file = %file.display(), "removing redirection with no surviving targets");
            fs::remove_file(&file)?;
        } else {
            doc.write()?;
        }
    }
    Ok(())
}

fn check_separators(root: &Path, path: &str) -> StageResult<()> {
    if path.contains('\\') {
        return Err(StageError::BadDocument {
            path: root.join(path),
            reason: "paths must use forward slashes".to_string(),
        });
    }
    Ok(())
}

/// Follow `from` through at most one redirection to the canonical object
/// directory.
fn resolve_one_hop(root: &Path, from: &str) -> StageResult<String> {
    let alias_file = metadata_file(root, from);
    if !alias_file.is_file() {
        return Ok(from.to_string());
    }
    let doc = MetadataDocument::from_file(&alias_file)?;
    if !doc.is_redirection() {
        return Ok(from.to_string());
    }
    let Some(target) = doc.redirection_targets()?.into_iter().next() else {
        return Err(StageError::BadDocument {
            path: alias_file,
            reason: "redirection with no targets".to_string(),
        });
    };
    // Targets address metadata paths; the object directory is the one
    // holding that document.
    Ok(parent_of(&target).to_string())
}

/// The directory component of a slash-separated logical path.
fn parent_of(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or(path)
}

/// The object's own document must exist directly in `dir` and not be
/// child-flagged.
fn ensure_not_child(root: &Path, dir: &str) -> StageResult<()> {
    let dir_abs = root.join(dir);
    if !dir_abs.is_dir() {
        return Err(StageError::MissingObjectDir { path: dir_abs });
    }
    let mut saw_document = false;
    for file in json_files(&dir_abs) {
        let doc = MetadataDocument::from_file(&file)?;
        if doc.is_redirection() {
            continue;
        }
        saw_document = true;
        if !doc.is_child() && parent_of(doc.path()) == dir {
            return Ok(());
        }
    }
    if saw_document {
        Err(StageError::IsChild { path: dir_abs })
    } else {
        Err(StageError::MissingObjectDir { path: dir_abs })
    }
}

fn retarget_redirections(
    root: &Path,
    from: &str,
    to: &str,
    options: MoveOptions,
) -> StageResult<()> {
    for file in json_files(root) {
        let mut doc = MetadataDocument::from_file(&file)?;
        if !doc.is_redirection() || !doc.retarget_redirection(from, to) {
            continue;
        }
        if options.rename_redirections {
            let renamed = metadata_file(root, to);
            if renamed != file {
                if renamed.exists() {
                    warn!(
                        file = %renamed.display(),
                        "clobbering existing redirection while renaming"
                    );
                }
                doc.set_path(to);
                doc.set_file(renamed);
                doc.write()?;
                fs::remove_file(&file)?;
                continue;
            }
        }
        doc.write()?;
    }
    Ok(())
}

/// Every `.json` file under `dir`, in walk order.
fn json_files(dir: &Path) -> Vec<std::path::PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| {
            entry.file_type().is_file()
                && entry.path().extension().is_some_and(|ext| ext == "json")
        })
        .map(|entry| entry.into_path())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquire::{acquire_metadata, create_redirection};
    use serde_json::json;

    fn stage_vector(root: &Path, dir: &str) {
        let data_dir = root.join(dir);
        std::fs::create_dir_all(&data_dir).unwrap();
        std::fs::write(data_dir.join("simple.csv"), "\"values\"\n1\n2\n").unwrap();
        let body = json!({
            "$schema": "atomic_vector/v1",
            "path": format!("{dir}/simple.csv"),
            "is_child": false,
            "atomic_vector": {"type": "integer", "length": 2, "names": false},
        });
        std::fs::write(
            data_dir.join("simple.csv.json"),
            serde_json::to_vec_pretty(&body).unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn move_rewrites_paths_and_redirections() {
        let dir = tempfile::tempdir().unwrap();
        stage_vector(dir.path(), "vec");
        create_redirection(dir.path(), "alias", "vec/simple.csv").unwrap();

        move_object(dir.path(), "vec", "vec2", MoveOptions::default()).unwrap();

        assert!(!dir.path().join("vec").exists());
        let doc = acquire_metadata(dir.path(), "vec2/simple.csv").unwrap();
        assert_eq!(doc.path(), "vec2/simple.csv");

        // The alias now resolves to the new location.
        let via_alias = acquire_metadata(dir.path(), "alias").unwrap();
        assert_eq!(via_alias.path(), "vec2/simple.csv");
    }

    #[test]
    fn move_follows_one_redirection_hop() {
        let dir = tempfile::tempdir().unwrap();
        stage_vector(dir.path(), "real");
        create_redirection(dir.path(), "front", "real/simple.csv").unwrap();

        move_object(dir.path(), "front", "moved", MoveOptions::default()).unwrap();
        assert!(dir.path().join("moved/simple.csv").is_file());
        assert_eq!(
            acquire_metadata(dir.path(), "front").unwrap().path(),
            "moved/simple.csv"
        );
    }

    #[test]
    fn rename_redirections_renames_the_alias_file() {
        let dir = tempfile::tempdir().unwrap();
        stage_vector(dir.path(), "vec");
        create_redirection(dir.path(), "alias", "vec/simple.csv").unwrap();

        let options = MoveOptions {
            rename_redirections: true,
        };
        move_object(dir.path(), "vec", "vec2", options).unwrap();

        assert!(!dir.path().join("alias.json").exists());
        assert!(dir.path().join("vec2.json").is_file());
        assert_eq!(
            acquire_metadata(dir.path(), "vec2").unwrap().path(),
            "vec2/simple.csv"
        );
    }

    #[test]
    fn children_cannot_be_moved_or_removed() {
        let dir = tempfile::tempdir().unwrap();
        let child_dir = dir.path().join("df/column1");
        std::fs::create_dir_all(&child_dir).unwrap();
        let body = json!({
            "$schema": "atomic_vector/v1",
            "path": "df/column1/simple.csv",
            "is_child": true,
        });
        std::fs::write(
            child_dir.join("simple.csv.json"),
            serde_json::to_vec_pretty(&body).unwrap(),
        )
        .unwrap();

        assert!(matches!(
            move_object(dir.path(), "df/column1", "elsewhere", MoveOptions::default()),
            Err(StageError::IsChild { .. })
        ));
        assert!(matches!(
            remove_object(dir.path(), "df/column1"),
            Err(StageError::IsChild { .. })
        ));
    }

    #[test]
    fn move_refuses_an_occupied_destination() {
        let dir = tempfile::tempdir().unwrap();
        stage_vector(dir.path(), "a");
        stage_vector(dir.path(), "b");
        assert!(matches!(
            move_object(dir.path(), "a", "b", MoveOptions::default()),
            Err(StageError::DestinationExists { .. })
        ));
    }

    #[test]
    fn remove_prunes_and_deletes_redirections() {
        let dir = tempfile::tempdir().unwrap();
        stage_vector(dir.path(), "gone");
        stage_vector(dir.path(), "kept");
        create_redirection(dir.path(), "only", "gone/simple.csv").unwrap();

        // A two-target redirection loses just the dead target.
        let both = json!({
            "$schema": "redirection/v1",
            "path": "both",
            "is_child": false,
            "targets": [
                {"type": "local", "location": "gone/simple.csv"},
                {"type": "local", "location": "kept/simple.csv"},
            ],
        });
        std::fs::write(
            dir.path().join("both.json"),
            serde_json::to_vec_pretty(&both).unwrap(),
        )
        .unwrap();

        remove_object(dir.path(), "gone").unwrap();

        assert!(!dir.path().join("gone").exists());
        assert!(!dir.path().join("only.json").exists());
        let survivor = MetadataDocument::from_file(&dir.path().join("both.json")).unwrap();
        assert_eq!(
            survivor.redirection_targets().unwrap(),
            vec!["kept/simple.csv"]
        );
    }
}
