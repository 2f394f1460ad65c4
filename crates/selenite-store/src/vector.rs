//! Typed adapter between logical vectors and container datasets.
//!
//! Writers run the placeholder codec and record its choices as dataset
//! attributes; readers reverse the process. The attribute names here are
//! part of the on-disk contract.

use selenite_codec::{
    decode_booleans, decode_integers, decode_numbers, decode_numbers_respecting, decode_strings,
    ints_to_raw, raw_to_ints, transform_booleans, transform_integers, transform_numbers,
    transform_numbers_respecting, transform_strings, IntWidth, PlaceholderMeaning,
};

use crate::error::{StoreError, StoreResult};
use crate::model::{Dataset, Group, ScalarType};

/// Attribute naming the sentinel that encodes missing elements.
pub const PLACEHOLDER_ATTR: &str = "missing-value-placeholder";

/// Attribute saying what the float sentinel stands for (`na` or `nan`).
pub const PLACEHOLDER_MEANING_ATTR: &str = "placeholder-encodes";

fn width_to_scalar(width: IntWidth) -> ScalarType {
    match width {
        IntWidth::I8 => ScalarType::I8,
        IntWidth::U8 => ScalarType::U8,
        IntWidth::I16 => ScalarType::I16,
        IntWidth::U16 => ScalarType::U16,
        IntWidth::I32 => ScalarType::I32,
        IntWidth::U32 => ScalarType::U32,
        IntWidth::I64 => ScalarType::I64,
    }
}

/// Store a logical integer vector under `name`, narrowest width first.
pub fn write_integers(group: &mut Group, name: &str, values: &[Option<i32>]) -> StoreResult<()> {
    let raw = ints_to_raw(values);
    let (width, encoded, placeholder) = transform_integers(&raw)?;
    let mut dataset = Dataset::ints(width_to_scalar(width), encoded);
    if let Some(p) = placeholder {
        dataset.set_attr(PLACEHOLDER_ATTR, p);
    }
    group.put_dataset(name, dataset);
    Ok(())
}

/// Read a logical integer vector; values outside `i32` range are errors.
pub fn read_integers(group: &Group, name: &str) -> StoreResult<Vec<Option<i32>>> {
    let dataset = group.dataset(name)?;
    if !dataset.scalar_type().is_integral() {
        return Err(StoreError::WrongDatasetType {
            expected: "integer",
            actual: "floating-point",
        });
    }
    let placeholder = dataset.int_attr(PLACEHOLDER_ATTR)?;
    let decoded = decode_integers(dataset.as_ints()?, placeholder);
    Ok(raw_to_ints(decoded)?)
}

/// Store a logical float vector.
///
/// With `respect_payloads`, literal NaN data and true missing values are
/// kept apart; the sentinel's meaning is recorded only when it differs
/// from the default.
pub fn write_numbers(
    group: &mut Group,
    name: &str,
    values: &[Option<f64>],
    respect_payloads: bool,
) -> StoreResult<()> {
    let mut dataset;
    if respect_payloads {
        let (encoded, placeholder) = transform_numbers_respecting(values, None)?;
        dataset = Dataset::floats(encoded);
        if let Some((p, meaning)) = placeholder {
            dataset.set_attr(PLACEHOLDER_ATTR, p);
            if meaning == PlaceholderMeaning::NanPayload {
                dataset.set_attr(PLACEHOLDER_MEANING_ATTR, meaning.as_attr());
            }
        }
    } else {
        let (encoded, placeholder) = transform_numbers(values, None)?;
        dataset = Dataset::floats(encoded);
        if let Some(p) = placeholder {
            dataset.set_attr(PLACEHOLDER_ATTR, p);
        }
    }
    group.put_dataset(name, dataset);
    Ok(())
}

/// Read a logical float vector. Without `respect_payloads` every NaN bit
/// pattern collapses to missing.
pub fn read_numbers(
    group: &Group,
    name: &str,
    respect_payloads: bool,
) -> StoreResult<Vec<Option<f64>>> {
    let dataset = group.dataset(name)?;
    let values = dataset.as_floats()?;
    let placeholder = dataset.float_attr(PLACEHOLDER_ATTR)?;
    if !respect_payloads {
        return Ok(decode_numbers(values, placeholder));
    }
    let raw = dataset.str_attr(PLACEHOLDER_MEANING_ATTR)?;
    let meaning =
        PlaceholderMeaning::from_attr(raw).ok_or_else(|| StoreError::BadPlaceholderMeaning {
            value: raw.unwrap_or_default().to_string(),
        })?;
    Ok(decode_numbers_respecting(
        values,
        placeholder.map(|p| (p, meaning)),
    ))
}

/// Store a logical boolean vector as 0/1 bytes.
pub fn write_booleans(group: &mut Group, name: &str, values: &[Option<bool>]) -> StoreResult<()> {
    let (encoded, placeholder) = transform_booleans(values);
    let mut dataset = Dataset::ints(ScalarType::I8, encoded.iter().map(|v| *v as i64).collect());
    if let Some(p) = placeholder {
        dataset.set_attr(PLACEHOLDER_ATTR, p as i64);
    }
    group.put_dataset(name, dataset);
    Ok(())
}

/// Read a logical boolean vector; codes other than 0/1/sentinel are errors.
pub fn read_booleans(group: &Group, name: &str) -> StoreResult<Vec<Option<bool>>> {
    let dataset = group.dataset(name)?;
    let placeholder = dataset.int_attr(PLACEHOLDER_ATTR)?;
    Ok(decode_booleans(dataset.as_ints()?, placeholder)?)
}

/// Store a logical string vector.
pub fn write_strings(group: &mut Group, name: &str, values: &[Option<String>]) -> StoreResult<()> {
    let (encoded, placeholder) = transform_strings(values);
    let mut dataset = Dataset::strings(encoded);
    if let Some(p) = placeholder {
        dataset.set_attr(PLACEHOLDER_ATTR, p);
    }
    group.put_dataset(name, dataset);
    Ok(())
}

/// Read a logical string vector.
pub fn read_strings(group: &Group, name: &str) -> StoreResult<Vec<Option<String>>> {
    let dataset = group.dataset(name)?;
    let values = dataset.as_strings()?.to_vec();
    let placeholder = dataset.str_attr(PLACEHOLDER_ATTR)?.map(str::to_string);
    Ok(decode_strings(values, placeholder.as_deref()))
}

/// Store a plain string dataset with no missing-value handling (names,
/// levels, column names).
pub fn write_plain_strings(group: &mut Group, name: &str, values: &[String]) {
    group.put_dataset(name, Dataset::strings(values.to_vec()));
}

/// Read a plain string dataset.
pub fn read_plain_strings(group: &Group, name: &str) -> StoreResult<Vec<String>> {
    Ok(group.dataset(name)?.as_strings()?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AttrValue;

    #[test]
    fn integer_adapter_roundtrip() {
        let mut group = Group::new();
        let values = vec![Some(4), None, Some(-9)];
        write_integers(&mut group, "values", &values).unwrap();

        let dataset = group.dataset("values").unwrap();
        assert_eq!(dataset.scalar_type(), ScalarType::I8);
        assert_eq!(dataset.attr(PLACEHOLDER_ATTR), Some(&AttrValue::Int(-128)));

        assert_eq!(read_integers(&group, "values").unwrap(), values);
    }

    #[test]
    fn integer_adapter_rejects_wide_values() {
        let mut group = Group::new();
        group.put_dataset("values", Dataset::ints(ScalarType::I64, vec![i64::MAX]));
        let err = read_integers(&group, "values").unwrap_err();
        assert!(matches!(err, StoreError::Codec(_)));
    }

    #[test]
    fn number_adapter_default_mode() {
        let mut group = Group::new();
        let values = vec![Some(1.5), None, Some(2.5)];
        write_numbers(&mut group, "values", &values, false).unwrap();
        assert_eq!(read_numbers(&group, "values", false).unwrap(), values);
    }

    #[test]
    fn number_adapter_respects_nan_payloads() {
        let mut group = Group::new();
        let values = vec![Some(1.5), Some(f64::NAN), None];
        write_numbers(&mut group, "values", &values, true).unwrap();

        let decoded = read_numbers(&group, "values", true).unwrap();
        assert_eq!(decoded[0], Some(1.5));
        assert!(decoded[1].is_some_and(f64::is_nan));
        assert_eq!(decoded[2], None);

        // The default reader collapses the payload into missing.
        let collapsed = read_numbers(&group, "values", false).unwrap();
        assert_eq!(collapsed, vec![Some(1.5), None, None]);
    }

    #[test]
    fn boolean_adapter_roundtrip() {
        let mut group = Group::new();
        let values = vec![Some(true), None, Some(false)];
        write_booleans(&mut group, "values", &values).unwrap();

        let dataset = group.dataset("values").unwrap();
        assert_eq!(dataset.scalar_type(), ScalarType::I8);
        assert_eq!(read_booleans(&group, "values").unwrap(), values);
    }

    #[test]
    fn string_adapter_dodges_collisions() {
        let mut group = Group::new();
        let values = vec![Some("NA".to_string()), None];
        write_strings(&mut group, "values", &values).unwrap();

        let dataset = group.dataset("values").unwrap();
        assert_eq!(
            dataset.attr(PLACEHOLDER_ATTR),
            Some(&AttrValue::Str("_NA".to_string()))
        );
        assert_eq!(read_strings(&group, "values").unwrap(), values);
    }

    #[test]
    fn plain_strings_have_no_placeholder() {
        let mut group = Group::new();
        write_plain_strings(&mut group, "names", &["a".to_string(), "NA".to_string()]);
        assert_eq!(
            read_plain_strings(&group, "names").unwrap(),
            vec!["a".to_string(), "NA".to_string()]
        );
    }
}
