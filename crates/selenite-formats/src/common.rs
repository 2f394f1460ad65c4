//! Helpers shared by the built-in format handlers.

use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use selenite_codec::{validate_date, validate_datetime};
use selenite_core::{CoreError, CoreResult};
use selenite_store::{vector, Group};
use selenite_types::StringFormat;
use serde_json::Value as Json;

/// Container file used by `atomic_vector` and `string_factor`.
pub const CONTENTS_FILE: &str = "contents.h5";

/// Container file used by `data_frame`.
pub const BASIC_COLUMNS_FILE: &str = "basic_columns.h5";

/// Gzipped JSON node tree used by `simple_list`.
pub const LIST_FILE: &str = "list_contents.json.gz";

/// Subdirectory holding a list's externally-saved elements.
pub const OTHER_CONTENTS_DIR: &str = "other_contents";

/// Subdirectory holding a frame's complex columns.
pub const OTHER_COLUMNS_DIR: &str = "other_columns";

/// Attribute naming the logical element type of a payload.
pub(crate) const TYPE_ATTR: &str = "type";

/// Attribute naming the string sub-kind (`date` or `date-time`).
pub(crate) const FORMAT_ATTR: &str = "format";

/// Validation failure naming the object directory.
pub(crate) fn invalid(dir: &Path, reason: impl Into<String>) -> CoreError {
    CoreError::Validation {
        path: dir.to_path_buf(),
        reason: reason.into(),
    }
}

pub(crate) fn write_gz_json(path: &Path, node: &Json) -> CoreResult<()> {
    let file = File::create(path)?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    serde_json::to_writer(&mut encoder, node)?;
    encoder.finish()?;
    Ok(())
}

pub(crate) fn read_gz_json(path: &Path) -> CoreResult<Json> {
    let file = File::open(path)?;
    let node = serde_json::from_reader(GzDecoder::new(file))?;
    Ok(node)
}

/// Optional `names` side-dataset.
pub(crate) fn read_names(group: &Group) -> CoreResult<Option<Vec<String>>> {
    if group.has_dataset("names") {
        Ok(Some(vector::read_plain_strings(group, "names")?))
    } else {
        Ok(None)
    }
}

pub(crate) fn check_names_len(dir: &Path, names: &[String], expected: usize) -> CoreResult<()> {
    if names.len() != expected {
        return Err(invalid(
            dir,
            format!(
                "names length {} does not match value length {expected}",
                names.len()
            ),
        ));
    }
    Ok(())
}

/// Every present element of a date or date-time vector must parse.
pub(crate) fn check_temporal(
    dir: &Path,
    values: &[Option<String>],
    format: StringFormat,
) -> CoreResult<()> {
    if format == StringFormat::Plain {
        return Ok(());
    }
    for (index, value) in values.iter().enumerate() {
        let Some(value) = value else { continue };
        let result = match format {
            StringFormat::Date => validate_date(value).map(|_| ()),
            StringFormat::DateTime => validate_datetime(value).map(|_| ()),
            StringFormat::Plain => Ok(()),
        };
        if let Err(err) = result {
            return Err(invalid(dir, format!("element {index}: {err}")));
        }
    }
    Ok(())
}

/// Children live as numbered directories under `dir/<sub>`. Verify that
/// exactly the declared indices exist and return their paths in order.
pub(crate) fn check_indexed_children(
    dir: &Path,
    sub: &str,
    expected: &BTreeSet<usize>,
) -> CoreResult<Vec<PathBuf>> {
    let parent = dir.join(sub);
    if !parent.is_dir() {
        if let Some(first) = expected.iter().next() {
            return Err(invalid(dir, format!("missing child directory {sub}/{first}")));
        }
        return Ok(Vec::new());
    }
    let mut seen = BTreeSet::new();
    for entry in std::fs::read_dir(&parent)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let Ok(index) = name.parse::<usize>() else {
            return Err(invalid(dir, format!("unexpected entry '{name}' under {sub}")));
        };
        if !expected.contains(&index) {
            return Err(invalid(dir, format!("stray child {sub}/{index}")));
        }
        if !entry.file_type()?.is_dir() {
            return Err(invalid(dir, format!("{sub}/{index} is not a directory")));
        }
        seen.insert(index);
    }
    if let Some(missing) = expected.difference(&seen).next() {
        return Err(invalid(
            dir,
            format!("missing child directory {sub}/{missing}"),
        ));
    }
    Ok(expected
        .iter()
        .map(|index| parent.join(index.to_string()))
        .collect())
}
