//! On-disk form of factors.
//!
//! A `contents.h5` container holds one group named `string_factor`: a
//! `codes` dataset of level indices (placeholder-backed missing), a plain
//! `levels` dataset, an `ordered` 0/1 attribute, and an optional `names`
//! dataset. The in-memory value tag is `factor`; the directory descriptor
//! says `string_factor`.

use std::collections::HashSet;
use std::path::Path;

use selenite_core::object::write_object_type;
use selenite_core::{CoreError, CoreResult, ReadContext, SaveContext, ValidateContext};
use selenite_store::{vector, Container};
use selenite_types::{Factor, Value};

use crate::common::{check_names_len, invalid, read_names, CONTENTS_FILE};

/// On-disk type string, also the container group name.
pub const TYPE_NAME: &str = "string_factor";

const CODES: &str = "codes";
const LEVELS: &str = "levels";
const NAMES: &str = "names";
const ORDERED_ATTR: &str = "ordered";

pub fn save(value: &Value, dir: &Path, _ctx: &SaveContext) -> CoreResult<()> {
    let Value::Factor(factor) = value else {
        return Err(CoreError::NoSaveHandler {
            type_tag: value.type_tag().to_string(),
        });
    };

    let mut codes = Vec::with_capacity(factor.codes.len());
    for code in &factor.codes {
        codes.push(match code {
            Some(code) => Some(i32::try_from(*code).map_err(|_| CoreError::Payload {
                what: "factor codes".to_string(),
                reason: format!("code {code} exceeds the storage range"),
            })?),
            None => None,
        });
    }

    let mut container = Container::new();
    let group = container.ensure_group(TYPE_NAME);
    vector::write_integers(group, CODES, &codes)?;
    vector::write_plain_strings(group, LEVELS, &factor.levels);
    group.set_attr(ORDERED_ATTR, factor.ordered as i64);
    if let Some(names) = &factor.names {
        vector::write_plain_strings(group, NAMES, names);
    }
    container.write(&dir.join(CONTENTS_FILE))?;
    write_object_type(dir, TYPE_NAME)
}

pub fn read(dir: &Path, _type_name: &str, _ctx: &ReadContext) -> CoreResult<Value> {
    let container = Container::open(&dir.join(CONTENTS_FILE))?;
    let group = container.group(TYPE_NAME)?;

    let levels = vector::read_plain_strings(group, LEVELS)?;
    let raw_codes = vector::read_integers(group, CODES)?;
    let mut codes = Vec::with_capacity(raw_codes.len());
    for code in raw_codes {
        codes.push(match code {
            Some(code) => Some(
                usize::try_from(code)
                    .map_err(|_| invalid(dir, format!("negative factor code {code}")))?,
            ),
            None => None,
        });
    }
    let ordered = group.require_int_attr(ORDERED_ATTR)? != 0;

    // Factor::new re-checks level uniqueness and code ranges.
    let mut factor = Factor::new(levels, codes, ordered)?;
    if let Some(names) = read_names(group)? {
        factor = factor.with_names(names)?;
    }
    Ok(Value::Factor(factor))
}

pub fn validate(dir: &Path, _type_name: &str, _ctx: &ValidateContext) -> CoreResult<()> {
    let container = Container::open(&dir.join(CONTENTS_FILE))?;
    let group = container.group(TYPE_NAME)?;

    let levels = vector::read_plain_strings(group, LEVELS)?;
    let mut seen = HashSet::with_capacity(levels.len());
    for level in &levels {
        if !seen.insert(level.as_str()) {
            return Err(invalid(dir, format!("duplicate level '{level}'")));
        }
    }

    let codes = vector::read_integers(group, CODES)?;
    for code in codes.iter().flatten() {
        let in_range = usize::try_from(*code).is_ok_and(|c| c < levels.len());
        if !in_range {
            return Err(invalid(
                dir,
                format!("code {code} out of range for {} levels", levels.len()),
            ));
        }
    }

    let ordered = group.require_int_attr(ORDERED_ATTR)?;
    if !matches!(ordered, 0 | 1) {
        return Err(invalid(
            dir,
            format!("ordered flag must be 0 or 1, found {ordered}"),
        ));
    }

    if let Some(names) = read_names(group)? {
        check_names_len(dir, &names, codes.len())?;
    }
    Ok(())
}
