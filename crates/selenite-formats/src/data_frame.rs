//! On-disk form of data frames.
//!
//! A `basic_columns.h5` container holds one group named `data_frame`: a
//! `row-count` attribute, a plain `column_names` dataset, an optional
//! `row_names` dataset, and a `data` subgroup whose datasets are keyed by
//! column index. Unnamed atomic columns go inline with a per-dataset
//! `type` attribute (plus `format` for date/date-time strings); everything
//! else, named vectors included, is saved as a full child object under
//! `other_columns/<index>`. Loading stitches both sources back in column
//! order.

use std::collections::BTreeSet;
use std::path::Path;

use selenite_core::object::write_object_type;
use selenite_core::{CoreError, CoreResult, ReadContext, SaveContext, ValidateContext};
use selenite_store::{vector, Container, Group};
use selenite_types::{
    BooleanVector, DataFrame, IntegerVector, LogicalType, NumberVector, StringFormat,
    StringVector, Value,
};

use crate::common::{
    check_indexed_children, check_temporal, invalid, BASIC_COLUMNS_FILE, FORMAT_ATTR,
    OTHER_COLUMNS_DIR, TYPE_ATTR,
};

/// On-disk type string, also the container group name.
pub const TYPE_NAME: &str = "data_frame";

const ROW_COUNT_ATTR: &str = "row-count";
const COLUMN_NAMES: &str = "column_names";
const ROW_NAMES: &str = "row_names";
const DATA_GROUP: &str = "data";

pub fn save(value: &Value, dir: &Path, ctx: &SaveContext) -> CoreResult<()> {
    let Value::Frame(frame) = value else {
        return Err(CoreError::NoSaveHandler {
            type_tag: value.type_tag().to_string(),
        });
    };

    let mut container = Container::new();
    let group = container.ensure_group(TYPE_NAME);
    group.set_attr(ROW_COUNT_ATTR, frame.row_count as i64);
    vector::write_plain_strings(group, COLUMN_NAMES, &frame.column_names);
    if let Some(row_names) = &frame.row_names {
        vector::write_plain_strings(group, ROW_NAMES, row_names);
    }

    let data = group.ensure_group(DATA_GROUP);
    let mut complex: Vec<(usize, &Value)> = Vec::new();
    for (index, column) in frame.columns.iter().enumerate() {
        let key = index.to_string();
        match column {
            Value::Integer(v) if v.names.is_none() => {
                vector::write_integers(data, &key, &v.values)?;
                data.dataset_mut(&key)?
                    .set_attr(TYPE_ATTR, LogicalType::Integer.as_attr());
            }
            Value::Number(v) if v.names.is_none() => {
                vector::write_numbers(
                    data,
                    &key,
                    &v.values,
                    ctx.options().preserve_nan_payloads,
                )?;
                data.dataset_mut(&key)?
                    .set_attr(TYPE_ATTR, LogicalType::Number.as_attr());
            }
            Value::Boolean(v) if v.names.is_none() => {
                vector::write_booleans(data, &key, &v.values)?;
                data.dataset_mut(&key)?
                    .set_attr(TYPE_ATTR, LogicalType::Boolean.as_attr());
            }
            Value::String(v) if v.names.is_none() => {
                check_temporal(dir, &v.values, v.format)
                    .map_err(|err| column_context(err, &frame.column_names[index]))?;
                vector::write_strings(data, &key, &v.values)?;
                let dataset = data.dataset_mut(&key)?;
                dataset.set_attr(TYPE_ATTR, LogicalType::String.as_attr());
                if let Some(tag) = v.format.as_attr() {
                    dataset.set_attr(FORMAT_ATTR, tag);
                }
            }
            other => complex.push((index, other)),
        }
    }
    container.write(&dir.join(BASIC_COLUMNS_FILE))?;

    for (index, column) in complex {
        let child = dir.join(OTHER_COLUMNS_DIR).join(index.to_string());
        ctx.save_child(column, &child)
            .map_err(|err| column_context(err, &frame.column_names[index]))?;
    }
    write_object_type(dir, TYPE_NAME)
}

fn column_context(err: CoreError, name: &str) -> CoreError {
    err.context(format!("failed to save column '{name}'"))
}

pub fn read(dir: &Path, _type_name: &str, ctx: &ReadContext) -> CoreResult<Value> {
    let container = Container::open(&dir.join(BASIC_COLUMNS_FILE))?;
    let group = container.group(TYPE_NAME)?;
    let row_count = read_row_count(dir, group)?;
    let column_names = vector::read_plain_strings(group, COLUMN_NAMES)?;
    let data = group.group(DATA_GROUP)?;

    let mut columns = Vec::with_capacity(column_names.len());
    for (index, name) in column_names.iter().enumerate() {
        let key = index.to_string();
        let column = if data.has_dataset(&key) {
            read_inline_column(dir, data, &key, ctx)?
        } else {
            let child = dir.join(OTHER_COLUMNS_DIR).join(&key);
            ctx.read_child(&child)
                .map_err(|err| err.context(format!("failed to load column '{name}'")))?
        };
        columns.push(column);
    }

    // DataFrame::new re-checks every column length against the row count.
    let mut frame = DataFrame::new(column_names, columns, row_count)?;
    if group.has_dataset(ROW_NAMES) {
        frame = frame.with_row_names(vector::read_plain_strings(group, ROW_NAMES)?)?;
    }
    Ok(Value::Frame(frame))
}

fn read_inline_column(
    dir: &Path,
    data: &Group,
    key: &str,
    ctx: &ReadContext,
) -> CoreResult<Value> {
    Ok(match column_type(dir, data, key)? {
        LogicalType::Integer => {
            Value::Integer(IntegerVector::new(vector::read_integers(data, key)?))
        }
        LogicalType::Number => Value::Number(NumberVector::new(vector::read_numbers(
            data,
            key,
            ctx.options().preserve_nan_payloads,
        )?)),
        LogicalType::Boolean => {
            Value::Boolean(BooleanVector::new(vector::read_booleans(data, key)?))
        }
        LogicalType::String => {
            let values = vector::read_strings(data, key)?;
            let format = column_format(dir, data, key)?;
            Value::String(StringVector::with_format(values, format))
        }
    })
}

pub fn validate(dir: &Path, _type_name: &str, ctx: &ValidateContext) -> CoreResult<()> {
    let container = Container::open(&dir.join(BASIC_COLUMNS_FILE))?;
    let group = container.group(TYPE_NAME)?;
    let row_count = read_row_count(dir, group)?;
    let column_names = vector::read_plain_strings(group, COLUMN_NAMES)?;
    let data = group.group(DATA_GROUP)?;

    let mut complex = BTreeSet::new();
    for index in 0..column_names.len() {
        let key = index.to_string();
        if !data.has_dataset(&key) {
            complex.insert(index);
            continue;
        }
        let length = inline_column_length(dir, data, &key)?;
        if length != row_count {
            return Err(invalid(
                dir,
                format!("column {index} has {length} rows, expected {row_count}"),
            ));
        }
    }

    for name in data.dataset_names() {
        let known = name
            .parse::<usize>()
            .is_ok_and(|index| index < column_names.len());
        if !known {
            return Err(invalid(
                dir,
                format!("unexpected dataset '{name}' in the data group"),
            ));
        }
    }

    if group.has_dataset(ROW_NAMES) {
        let row_names = vector::read_plain_strings(group, ROW_NAMES)?;
        if row_names.len() != row_count {
            return Err(invalid(
                dir,
                format!(
                    "row names length {} does not match row count {row_count}",
                    row_names.len()
                ),
            ));
        }
    }

    for child in check_indexed_children(dir, OTHER_COLUMNS_DIR, &complex)? {
        ctx.validate_child(&child)?;
    }
    Ok(())
}

fn inline_column_length(dir: &Path, data: &Group, key: &str) -> CoreResult<usize> {
    Ok(match column_type(dir, data, key)? {
        LogicalType::Integer => vector::read_integers(data, key)?.len(),
        LogicalType::Number => vector::read_numbers(data, key, true)?.len(),
        LogicalType::Boolean => vector::read_booleans(data, key)?.len(),
        LogicalType::String => {
            let values = vector::read_strings(data, key)?;
            check_temporal(dir, &values, column_format(dir, data, key)?)?;
            values.len()
        }
    })
}

fn read_row_count(dir: &Path, group: &Group) -> CoreResult<usize> {
    let raw = group.require_int_attr(ROW_COUNT_ATTR)?;
    usize::try_from(raw).map_err(|_| invalid(dir, format!("negative row count {raw}")))
}

fn column_type(dir: &Path, data: &Group, key: &str) -> CoreResult<LogicalType> {
    let raw = data
        .dataset(key)?
        .str_attr(TYPE_ATTR)?
        .ok_or_else(|| invalid(dir, format!("column dataset '{key}' has no type attribute")))?;
    LogicalType::from_attr(raw).ok_or_else(|| invalid(dir, format!("unknown logical type '{raw}'")))
}

fn column_format(dir: &Path, data: &Group, key: &str) -> CoreResult<StringFormat> {
    let raw = data.dataset(key)?.str_attr(FORMAT_ATTR)?;
    StringFormat::from_attr(raw).ok_or_else(|| {
        invalid(
            dir,
            format!("unknown string format '{}'", raw.unwrap_or_default()),
        )
    })
}
