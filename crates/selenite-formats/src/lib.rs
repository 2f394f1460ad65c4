//! Built-in on-disk formats for the core value shapes.
//!
//! Four formats, one module each:
//!
//! - [`atomic_vector`]: the four vector kinds in a `contents.h5` container;
//! - [`string_factor`]: codes plus levels in the same container layout;
//! - [`simple_list`]: a gzipped JSON node tree with externally-saved
//!   children;
//! - [`data_frame`]: inline columns in `basic_columns.h5` plus complex
//!   columns as children.
//!
//! [`install`] wires them into the process-wide registries. Save handlers
//! are keyed by value tag (a single `atomic_vector` registration covers
//! the four vector kinds through the class chain); read and validate
//! handlers are keyed by the on-disk type string. Read handlers are
//! registered deferred, so the first read of each type exercises the
//! resolve-and-cache path.

use std::sync::Arc;

use selenite_core::{
    register_deferred_read_handler_with, register_save_handler_with,
    register_validate_handler_with, CoreResult, DuplicatePolicy, ReadHandler,
};
use tracing::debug;

pub mod atomic_vector;
mod common;
pub mod data_frame;
pub mod simple_list;
pub mod string_factor;

pub use common::{
    BASIC_COLUMNS_FILE, CONTENTS_FILE, LIST_FILE, OTHER_COLUMNS_DIR, OTHER_CONTENTS_DIR,
};

/// Register every built-in format. Idempotent; existing registrations,
/// including caller replacements, are left in place.
pub fn install() -> CoreResult<()> {
    use DuplicatePolicy::KeepExisting;

    register_save_handler_with(
        "atomic_vector",
        Arc::new(atomic_vector::save),
        KeepExisting,
    )?;
    // The in-memory tag is `factor`; only the directory says `string_factor`.
    register_save_handler_with("factor", Arc::new(string_factor::save), KeepExisting)?;
    register_save_handler_with("simple_list", Arc::new(simple_list::save), KeepExisting)?;
    register_save_handler_with("data_frame", Arc::new(data_frame::save), KeepExisting)?;

    register_deferred_read_handler_with(
        atomic_vector::TYPE_NAME,
        Arc::new(|| Ok(Arc::new(atomic_vector::read) as ReadHandler)),
        KeepExisting,
    )?;
    register_deferred_read_handler_with(
        string_factor::TYPE_NAME,
        Arc::new(|| Ok(Arc::new(string_factor::read) as ReadHandler)),
        KeepExisting,
    )?;
    register_deferred_read_handler_with(
        simple_list::TYPE_NAME,
        Arc::new(|| Ok(Arc::new(simple_list::read) as ReadHandler)),
        KeepExisting,
    )?;
    register_deferred_read_handler_with(
        data_frame::TYPE_NAME,
        Arc::new(|| Ok(Arc::new(data_frame::read) as ReadHandler)),
        KeepExisting,
    )?;

    register_validate_handler_with(
        atomic_vector::TYPE_NAME,
        Arc::new(atomic_vector::validate),
        KeepExisting,
    )?;
    register_validate_handler_with(
        string_factor::TYPE_NAME,
        Arc::new(string_factor::validate),
        KeepExisting,
    )?;
    register_validate_handler_with(
        simple_list::TYPE_NAME,
        Arc::new(simple_list::validate),
        KeepExisting,
    )?;
    register_validate_handler_with(
        data_frame::TYPE_NAME,
        Arc::new(data_frame::validate),
        KeepExisting,
    )?;

    debug!("built-in formats installed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use selenite_core::{read_object, save_object, validate_directory};
    use selenite_types::{
        DataFrame, Factor, IntegerVector, NumberVector, SimpleList, StringVector, Value,
    };

    #[test]
    fn install_twice_keeps_working() {
        install().unwrap();
        install().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("v");
        let original = Value::Integer(IntegerVector::from(vec![1, 2]));
        save_object(&original, &target).unwrap();
        assert_eq!(read_object(&target).unwrap(), original);
    }

    #[test]
    fn formats_nest_through_each_other() {
        install().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested");

        let inner_list = SimpleList::from_pairs(vec![
            (
                "grades",
                Value::Factor(Factor::from_strings(vec![Some("a"), Some("b")], true)),
            ),
            (
                "scores",
                Value::Number(NumberVector::from(vec![0.5, 1.5])),
            ),
        ]);
        let frame = DataFrame::from_pairs(vec![
            (
                "label",
                Value::String(StringVector::from(vec!["x", "y"])),
            ),
            ("bundle", Value::List(inner_list)),
        ])
        .unwrap();

        let original = Value::Frame(frame);
        save_object(&original, &target).unwrap();
        assert_eq!(read_object(&target).unwrap(), original);
    }

    #[test]
    fn validate_directory_sees_every_saved_object() {
        install().unwrap();
        let dir = tempfile::tempdir().unwrap();

        save_object(
            &Value::Integer(IntegerVector::from(vec![1])),
            &dir.path().join("one"),
        )
        .unwrap();
        save_object(
            &Value::Frame(
                DataFrame::from_pairs(vec![(
                    "x",
                    Value::Integer(IntegerVector::from(vec![1, 2])),
                )])
                .unwrap(),
            ),
            &dir.path().join("two"),
        )
        .unwrap();

        let validated = validate_directory(dir.path()).unwrap();
        assert_eq!(validated.len(), 2);
    }
}
