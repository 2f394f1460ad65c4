use std::path::Path;

use crate::error::{CoreError, CoreResult};

/// Descriptor file present in every object directory.
pub const OBJECT_FILE: &str = "OBJECT";

/// Optional writer-environment snapshot beside the descriptor.
pub const ENVIRONMENT_FILE: &str = "_environment.json";

/// Names beginning with an underscore are reserved for framework metadata
/// and never belong to a handler's payload or children.
pub fn is_reserved_name(name: &str) -> bool {
    name.starts_with('_')
}

fn check_type_name(dir: &Path, name: &str) -> CoreResult<()> {
    if name.is_empty() {
        return Err(CoreError::BadTypeDescriptor {
            path: dir.to_path_buf(),
            reason: "empty type string".to_string(),
        });
    }
    if name
        .chars()
        .any(|c| c.is_whitespace() || c == '/' || c == '\\')
    {
        return Err(CoreError::BadTypeDescriptor {
            path: dir.to_path_buf(),
            reason: format!("type string '{name}' contains whitespace or separators"),
        });
    }
    Ok(())
}

/// Write the one-line `OBJECT` descriptor into an object directory.
pub fn write_object_type(dir: &Path, type_name: &str) -> CoreResult<()> {
    check_type_name(dir, type_name)?;
    std::fs::write(dir.join(OBJECT_FILE), format!("{type_name}\n"))?;
    Ok(())
}

/// Read the type string from a directory's `OBJECT` descriptor.
pub fn read_object_type(dir: &Path) -> CoreResult<String> {
    let path = dir.join(OBJECT_FILE);
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(CoreError::MissingObject {
                path: dir.to_path_buf(),
            })
        }
        Err(err) => return Err(err.into()),
    };
    let mut lines = raw.lines();
    let type_name = lines.next().unwrap_or("").trim().to_string();
    if lines.any(|line| !line.trim().is_empty()) {
        return Err(CoreError::BadTypeDescriptor {
            path: dir.to_path_buf(),
            reason: "more than one line".to_string(),
        });
    }
    check_type_name(dir, &type_name)?;
    Ok(type_name)
}

/// Whether a directory carries an `OBJECT` descriptor.
pub fn is_object_dir(dir: &Path) -> bool {
    dir.join(OBJECT_FILE).is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        write_object_type(dir.path(), "atomic_vector").unwrap();
        assert!(is_object_dir(dir.path()));
        assert_eq!(read_object_type(dir.path()).unwrap(), "atomic_vector");
    }

    #[test]
    fn missing_descriptor_is_its_own_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_object_type(dir.path()).unwrap_err();
        assert!(matches!(err, CoreError::MissingObject { .. }));
    }

    #[test]
    fn empty_or_spaced_types_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(write_object_type(dir.path(), "").is_err());
        assert!(write_object_type(dir.path(), "two words").is_err());
        assert!(write_object_type(dir.path(), "a/b").is_err());
    }

    #[test]
    fn trailing_newline_is_tolerated_on_read() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(OBJECT_FILE), "data_frame\n\n").unwrap();
        assert_eq!(read_object_type(dir.path()).unwrap(), "data_frame");
    }

    #[test]
    fn second_nonempty_line_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(OBJECT_FILE), "data_frame\nextra\n").unwrap();
        let err = read_object_type(dir.path()).unwrap_err();
        assert!(err.to_string().contains("more than one line"));
    }

    #[test]
    fn reserved_names() {
        assert!(is_reserved_name("_environment.json"));
        assert!(!is_reserved_name("contents.h5"));
    }
}
