//! On-disk form of the four atomic vector kinds.
//!
//! A `contents.h5` container holds one group named `atomic_vector` with a
//! `type` attribute (`integer` | `number` | `boolean` | `string`), a
//! `values` dataset run through the placeholder codec, an optional plain
//! `names` dataset, and a `format` attribute for the date/date-time string
//! sub-kinds. One save handler registered under the shared `atomic_vector`
//! ancestor tag covers all four kinds.

use std::path::Path;

use selenite_core::object::write_object_type;
use selenite_core::{CoreError, CoreResult, ReadContext, SaveContext, ValidateContext};
use selenite_store::{vector, Container, Group};
use selenite_types::{
    BooleanVector, IntegerVector, LogicalType, NumberVector, StringFormat, StringVector, Value,
};

use crate::common::{
    check_names_len, check_temporal, invalid, read_names, CONTENTS_FILE, FORMAT_ATTR, TYPE_ATTR,
};

/// On-disk type string, also the container group name.
pub const TYPE_NAME: &str = "atomic_vector";

const VALUES: &str = "values";
const NAMES: &str = "names";

pub fn save(value: &Value, dir: &Path, ctx: &SaveContext) -> CoreResult<()> {
    let mut container = Container::new();
    let group = container.ensure_group(TYPE_NAME);
    match value {
        Value::Integer(v) => {
            group.set_attr(TYPE_ATTR, LogicalType::Integer.as_attr());
            vector::write_integers(group, VALUES, &v.values)?;
            write_names(group, v.names.as_deref());
        }
        Value::Number(v) => {
            group.set_attr(TYPE_ATTR, LogicalType::Number.as_attr());
            vector::write_numbers(
                group,
                VALUES,
                &v.values,
                ctx.options().preserve_nan_payloads,
            )?;
            write_names(group, v.names.as_deref());
        }
        Value::Boolean(v) => {
            group.set_attr(TYPE_ATTR, LogicalType::Boolean.as_attr());
            vector::write_booleans(group, VALUES, &v.values)?;
            write_names(group, v.names.as_deref());
        }
        Value::String(v) => {
            check_temporal(dir, &v.values, v.format)?;
            group.set_attr(TYPE_ATTR, LogicalType::String.as_attr());
            vector::write_strings(group, VALUES, &v.values)?;
            if let Some(tag) = v.format.as_attr() {
                group.set_attr(FORMAT_ATTR, tag);
            }
            write_names(group, v.names.as_deref());
        }
        other => {
            return Err(CoreError::NoSaveHandler {
                type_tag: other.type_tag().to_string(),
            })
        }
    }
    container.write(&dir.join(CONTENTS_FILE))?;
    write_object_type(dir, TYPE_NAME)
}

fn write_names(group: &mut Group, names: Option<&[String]>) {
    if let Some(names) = names {
        vector::write_plain_strings(group, NAMES, names);
    }
}

pub fn read(dir: &Path, _type_name: &str, ctx: &ReadContext) -> CoreResult<Value> {
    let container = Container::open(&dir.join(CONTENTS_FILE))?;
    let group = container.group(TYPE_NAME)?;
    let logical = logical_type(dir, group)?;
    let names = read_names(group)?;
    let value = match logical {
        LogicalType::Integer => {
            let values = vector::read_integers(group, VALUES)?;
            check_optional_names(dir, names.as_deref(), values.len())?;
            Value::Integer(IntegerVector { values, names })
        }
        LogicalType::Number => {
            let values =
                vector::read_numbers(group, VALUES, ctx.options().preserve_nan_payloads)?;
            check_optional_names(dir, names.as_deref(), values.len())?;
            Value::Number(NumberVector { values, names })
        }
        LogicalType::Boolean => {
            let values = vector::read_booleans(group, VALUES)?;
            check_optional_names(dir, names.as_deref(), values.len())?;
            Value::Boolean(BooleanVector { values, names })
        }
        LogicalType::String => {
            let values = vector::read_strings(group, VALUES)?;
            check_optional_names(dir, names.as_deref(), values.len())?;
            let format = string_format(dir, group)?;
            Value::String(StringVector {
                values,
                names,
                format,
            })
        }
    };
    Ok(value)
}

/// Re-derive every invariant from the files alone.
pub fn validate(dir: &Path, _type_name: &str, _ctx: &ValidateContext) -> CoreResult<()> {
    let container = Container::open(&dir.join(CONTENTS_FILE))?;
    let group = container.group(TYPE_NAME)?;
    let length = match logical_type(dir, group)? {
        LogicalType::Integer => vector::read_integers(group, VALUES)?.len(),
        LogicalType::Number => vector::read_numbers(group, VALUES, true)?.len(),
        LogicalType::Boolean => vector::read_booleans(group, VALUES)?.len(),
        LogicalType::String => {
            let values = vector::read_strings(group, VALUES)?;
            check_temporal(dir, &values, string_format(dir, group)?)?;
            values.len()
        }
    };
    if let Some(names) = read_names(group)? {
        check_names_len(dir, &names, length)?;
    }
    Ok(())
}

fn logical_type(dir: &Path, group: &Group) -> CoreResult<LogicalType> {
    let raw = group.require_str_attr(TYPE_ATTR)?;
    LogicalType::from_attr(raw).ok_or_else(|| invalid(dir, format!("unknown logical type '{raw}'")))
}

fn string_format(dir: &Path, group: &Group) -> CoreResult<StringFormat> {
    let raw = group.str_attr(FORMAT_ATTR)?;
    StringFormat::from_attr(raw).ok_or_else(|| {
        invalid(
            dir,
            format!("unknown string format '{}'", raw.unwrap_or_default()),
        )
    })
}

fn check_optional_names(dir: &Path, names: Option<&[String]>, expected: usize) -> CoreResult<()> {
    match names {
        Some(names) => check_names_len(dir, names, expected),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use selenite_core::{
        read_object, read_object_with, save_object, save_object_with, validate_object,
        ReadOptions, SaveOptions,
    };

    fn setup() -> tempfile::TempDir {
        crate::install().unwrap();
        tempfile::tempdir().unwrap()
    }

    #[test]
    fn named_integer_roundtrip() {
        let dir = setup();
        let target = dir.path().join("v");
        let original = Value::Integer(
            IntegerVector::with_names(
                vec![Some(1), None, Some(3)],
                vec!["a".into(), "b".into(), "c".into()],
            )
            .unwrap(),
        );

        save_object(&original, &target).unwrap();
        assert_eq!(read_object(&target).unwrap(), original);
    }

    #[test]
    fn respect_mode_keeps_nan_and_missing_apart() {
        let dir = setup();
        let target = dir.path().join("v");
        let original = Value::Number(NumberVector::new(vec![
            Some(1.5),
            Some(f64::NAN),
            None,
            Some(2.6),
        ]));

        let options = SaveOptions {
            preserve_nan_payloads: true,
            ..Default::default()
        };
        save_object_with(&original, &target, options).unwrap();

        let respecting = ReadOptions {
            preserve_nan_payloads: true,
            ..Default::default()
        };
        let Value::Number(v) = read_object_with(&target, respecting).unwrap() else {
            panic!("expected a number vector");
        };
        assert_eq!(v.values[0], Some(1.5));
        assert!(v.values[1].is_some_and(f64::is_nan));
        assert_eq!(v.values[2], None);

        // Default mode collapses the NaN payload into missing.
        let Value::Number(v) = read_object(&target).unwrap() else {
            panic!("expected a number vector");
        };
        assert_eq!(v.values, vec![Some(1.5), None, None, Some(2.6)]);
    }

    #[test]
    fn date_vectors_keep_their_format() {
        let dir = setup();
        let target = dir.path().join("v");
        let original = Value::String(StringVector::with_format(
            vec![Some("2021-09-30".into()), None],
            StringFormat::Date,
        ));

        save_object(&original, &target).unwrap();
        let Value::String(v) = read_object(&target).unwrap() else {
            panic!("expected a string vector");
        };
        assert_eq!(v.format, StringFormat::Date);
        assert_eq!(v.values[0].as_deref(), Some("2021-09-30"));
    }

    #[test]
    fn sloppy_dates_are_refused_at_save() {
        let dir = setup();
        let target = dir.path().join("v");
        let original = Value::String(StringVector::with_format(
            vec![Some("2021-1-1".into())],
            StringFormat::Date,
        ));

        let err = save_object(&original, &target).unwrap_err();
        assert!(err.to_string().contains("element 0"), "{err}");
    }

    #[test]
    fn validator_rejects_name_length_mismatch() {
        let dir = setup();
        let target = dir.path().join("v");
        std::fs::create_dir_all(&target).unwrap();

        let mut container = Container::new();
        let group = container.ensure_group(TYPE_NAME);
        group.set_attr(TYPE_ATTR, "integer");
        vector::write_integers(group, VALUES, &[Some(1), Some(2)]).unwrap();
        vector::write_plain_strings(group, NAMES, &["a".into(), "b".into(), "c".into()]);
        container.write(&target.join(CONTENTS_FILE)).unwrap();
        write_object_type(&target, TYPE_NAME).unwrap();

        let err = validate_object(&target).unwrap_err();
        assert!(err.to_string().contains("names length 3"), "{err}");
    }
}
