//! On-disk form of heterogeneous lists.
//!
//! The whole list lives in `list_contents.json.gz` as one JSON node tree.
//! Node shapes:
//!
//! ```text
//! {"type":"list",    "values":[node...], "names":[...]? }
//! {"type":"integer", "values":[1,null], "names":[...]? }
//! {"type":"number",  "values":[1.5,"NaN","Inf","-Inf",null], ... }
//! {"type":"boolean", "values":[true,null], ... }
//! {"type":"string",  "values":["x",null], "format":"date"?, ... }
//! {"type":"factor",  "levels":[...], "codes":[0,null], "ordered":b, ... }
//! {"type":"external","index":k}
//! ```
//!
//! `null` in a `values` array is a missing element; the three tagged
//! strings carry the non-finite doubles JSON cannot. Values with no JSON
//! shape (frames, extension objects) are saved as real child objects under
//! `other_contents/<k>` and referenced by index.

use std::collections::BTreeSet;
use std::path::Path;

use selenite_core::object::write_object_type;
use selenite_core::{CoreError, CoreResult, ReadContext, SaveContext, ValidateContext};
use selenite_types::{
    BooleanVector, Factor, IntegerVector, NumberVector, SimpleList, StringFormat, StringVector,
    Value,
};
use serde_json::{json, Value as Json};

use crate::common::{
    check_indexed_children, check_names_len, check_temporal, invalid, read_gz_json, write_gz_json,
    FORMAT_ATTR, LIST_FILE, OTHER_CONTENTS_DIR, TYPE_ATTR,
};

/// On-disk type string.
pub const TYPE_NAME: &str = "simple_list";

// ---------------------------------------------------------------------------
// Save
// ---------------------------------------------------------------------------

pub fn save(value: &Value, dir: &Path, ctx: &SaveContext) -> CoreResult<()> {
    let Value::List(list) = value else {
        return Err(CoreError::NoSaveHandler {
            type_tag: value.type_tag().to_string(),
        });
    };
    let mut externals = ExternalSaves {
        dir,
        ctx,
        next: 0,
    };
    let node = encode_list(list, &mut externals)?;
    write_gz_json(&dir.join(LIST_FILE), &node)?;
    write_object_type(dir, TYPE_NAME)
}

/// Hands out `other_contents` indices; children are saved as they are
/// encountered, so indices follow depth-first element order.
struct ExternalSaves<'a> {
    dir: &'a Path,
    ctx: &'a SaveContext,
    next: usize,
}

impl ExternalSaves<'_> {
    fn save(&mut self, value: &Value) -> CoreResult<usize> {
        let index = self.next;
        self.next += 1;
        let child = self
            .dir
            .join(OTHER_CONTENTS_DIR)
            .join(index.to_string());
        self.ctx.save_child(value, &child)?;
        Ok(index)
    }
}

fn encode_list(list: &SimpleList, externals: &mut ExternalSaves) -> CoreResult<Json> {
    let mut values = Vec::with_capacity(list.elements.len());
    for element in &list.elements {
        values.push(match element {
            Some(value) => encode_value(value, externals)?,
            None => Json::Null,
        });
    }
    Ok(node("list", values, &list.names))
}

fn encode_value(value: &Value, externals: &mut ExternalSaves) -> CoreResult<Json> {
    Ok(match value {
        Value::Integer(v) => node(
            "integer",
            v.values.iter().map(|o| json!(o)).collect(),
            &v.names,
        ),
        Value::Number(v) => node(
            "number",
            v.values.iter().map(|o| encode_number(*o)).collect(),
            &v.names,
        ),
        Value::Boolean(v) => node(
            "boolean",
            v.values.iter().map(|o| json!(o)).collect(),
            &v.names,
        ),
        Value::String(v) => {
            check_temporal(externals.dir, &v.values, v.format)?;
            let mut encoded = node(
                "string",
                v.values.iter().map(|o| json!(o)).collect(),
                &v.names,
            );
            if let Some(tag) = v.format.as_attr() {
                encoded[FORMAT_ATTR] = json!(tag);
            }
            encoded
        }
        Value::Factor(f) => {
            let mut encoded = node(
                "factor",
                f.codes.iter().map(|o| json!(o)).collect(),
                &f.names,
            );
            encoded["levels"] = json!(f.levels);
            encoded["ordered"] = json!(f.ordered);
            encoded
        }
        Value::List(l) => encode_list(l, externals)?,
        Value::Frame(_) | Value::Other(_) => {
            let index = externals.save(value)?;
            json!({TYPE_ATTR: "external", "index": index})
        }
    })
}

fn encode_number(value: Option<f64>) -> Json {
    match value {
        None => Json::Null,
        Some(v) if v.is_nan() => json!("NaN"),
        Some(v) if v == f64::INFINITY => json!("Inf"),
        Some(v) if v == f64::NEG_INFINITY => json!("-Inf"),
        Some(v) => json!(v),
    }
}

fn node(kind: &str, values: Vec<Json>, names: &Option<Vec<String>>) -> Json {
    let mut map = serde_json::Map::new();
    map.insert(TYPE_ATTR.to_string(), json!(kind));
    map.insert("values".to_string(), Json::Array(values));
    if let Some(names) = names {
        map.insert("names".to_string(), json!(names));
    }
    Json::Object(map)
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

pub fn read(dir: &Path, _type_name: &str, ctx: &ReadContext) -> CoreResult<Value> {
    let tree = read_gz_json(&dir.join(LIST_FILE))?;
    if node_kind(&tree, dir)? != "list" {
        return Err(invalid(dir, "top-level node must be a list"));
    }
    decode_value(&tree, dir, ctx)
}

fn decode_value(node: &Json, dir: &Path, ctx: &ReadContext) -> CoreResult<Value> {
    let kind = node_kind(node, dir)?;
    match kind {
        "list" => {
            let raw = values_array(node, dir)?;
            let mut elements = Vec::with_capacity(raw.len());
            for item in raw {
                elements.push(match item {
                    Json::Null => None,
                    other => Some(decode_value(other, dir, ctx)?),
                });
            }
            let list = match node_names(node, dir)? {
                Some(names) => SimpleList::with_names(elements, names)?,
                None => SimpleList::new(elements),
            };
            Ok(Value::List(list))
        }
        "integer" => {
            let (values, names) = decode_vector(node, dir, decode_integer)?;
            Ok(Value::Integer(IntegerVector { values, names }))
        }
        "number" => {
            let (values, names) = decode_vector(node, dir, decode_number)?;
            Ok(Value::Number(NumberVector { values, names }))
        }
        "boolean" => {
            let (values, names) = decode_vector(node, dir, decode_boolean)?;
            Ok(Value::Boolean(BooleanVector { values, names }))
        }
        "string" => {
            let (values, names) = decode_vector(node, dir, decode_string)?;
            let format = node_format(node, dir)?;
            Ok(Value::String(StringVector {
                values,
                names,
                format,
            }))
        }
        "factor" => decode_factor(node, dir),
        "external" => {
            let index = node
                .get("index")
                .and_then(Json::as_u64)
                .ok_or_else(|| invalid(dir, "external node without an index"))?;
            ctx.read_child(
                &dir.join(OTHER_CONTENTS_DIR).join(index.to_string()),
            )
        }
        other => Err(invalid(dir, format!("unknown node type '{other}'"))),
    }
}

fn decode_vector<T>(
    node: &Json,
    dir: &Path,
    element: fn(&Json, &Path, usize) -> CoreResult<Option<T>>,
) -> CoreResult<(Vec<Option<T>>, Option<Vec<String>>)> {
    let raw = values_array(node, dir)?;
    let mut values = Vec::with_capacity(raw.len());
    for (index, item) in raw.iter().enumerate() {
        values.push(element(item, dir, index)?);
    }
    let names = node_names(node, dir)?;
    if let Some(names) = &names {
        check_names_len(dir, names, values.len())?;
    }
    Ok((values, names))
}

fn decode_integer(item: &Json, dir: &Path, index: usize) -> CoreResult<Option<i32>> {
    if item.is_null() {
        return Ok(None);
    }
    item.as_i64()
        .and_then(|v| i32::try_from(v).ok())
        .map(Some)
        .ok_or_else(|| invalid(dir, format!("element {index}: expected a 32-bit integer")))
}

fn decode_number(item: &Json, dir: &Path, index: usize) -> CoreResult<Option<f64>> {
    if item.is_null() {
        return Ok(None);
    }
    if let Some(v) = item.as_f64() {
        return Ok(Some(v));
    }
    match item.as_str() {
        Some("NaN") => Ok(Some(f64::NAN)),
        Some("Inf") => Ok(Some(f64::INFINITY)),
        Some("-Inf") => Ok(Some(f64::NEG_INFINITY)),
        _ => Err(invalid(dir, format!("element {index}: expected a number"))),
    }
}

fn decode_boolean(item: &Json, dir: &Path, index: usize) -> CoreResult<Option<bool>> {
    if item.is_null() {
        return Ok(None);
    }
    item.as_bool()
        .map(Some)
        .ok_or_else(|| invalid(dir, format!("element {index}: expected a boolean")))
}

fn decode_string(item: &Json, dir: &Path, index: usize) -> CoreResult<Option<String>> {
    if item.is_null() {
        return Ok(None);
    }
    item.as_str()
        .map(|s| Some(s.to_string()))
        .ok_or_else(|| invalid(dir, format!("element {index}: expected a string")))
}

fn decode_factor(node: &Json, dir: &Path) -> CoreResult<Value> {
    let levels = node
        .get("levels")
        .and_then(Json::as_array)
        .ok_or_else(|| invalid(dir, "factor node without levels"))?
        .iter()
        .map(|l| {
            l.as_str()
                .map(str::to_string)
                .ok_or_else(|| invalid(dir, "factor level must be a string"))
        })
        .collect::<CoreResult<Vec<_>>>()?;
    let (codes, names) = decode_vector(node, dir, decode_code)?;
    let ordered = node
        .get("ordered")
        .and_then(Json::as_bool)
        .ok_or_else(|| invalid(dir, "factor node without an ordered flag"))?;
    let mut factor = Factor::new(levels, codes, ordered)?;
    if let Some(names) = names {
        factor = factor.with_names(names)?;
    }
    Ok(Value::Factor(factor))
}

fn decode_code(item: &Json, dir: &Path, index: usize) -> CoreResult<Option<usize>> {
    if item.is_null() {
        return Ok(None);
    }
    item.as_u64()
        .map(|v| Some(v as usize))
        .ok_or_else(|| invalid(dir, format!("element {index}: expected a level code")))
}

fn node_kind<'a>(node: &'a Json, dir: &Path) -> CoreResult<&'a str> {
    node.get(TYPE_ATTR)
        .and_then(Json::as_str)
        .ok_or_else(|| invalid(dir, "node without a type tag"))
}

fn values_array<'a>(node: &'a Json, dir: &Path) -> CoreResult<&'a Vec<Json>> {
    node.get("values")
        .and_then(Json::as_array)
        .ok_or_else(|| invalid(dir, "node without a values array"))
}

fn node_names(node: &Json, dir: &Path) -> CoreResult<Option<Vec<String>>> {
    let Some(raw) = node.get("names") else {
        return Ok(None);
    };
    let names = raw
        .as_array()
        .ok_or_else(|| invalid(dir, "names must be an array"))?
        .iter()
        .map(|n| {
            n.as_str()
                .map(str::to_string)
                .ok_or_else(|| invalid(dir, "names must be strings"))
        })
        .collect::<CoreResult<Vec<_>>>()?;
    Ok(Some(names))
}

fn node_format(node: &Json, dir: &Path) -> CoreResult<StringFormat> {
    let raw = node.get(FORMAT_ATTR).map(|f| {
        f.as_str()
            .ok_or_else(|| invalid(dir, "format must be a string"))
    });
    let raw = raw.transpose()?;
    StringFormat::from_attr(raw).ok_or_else(|| {
        invalid(
            dir,
            format!("unknown string format '{}'", raw.unwrap_or_default()),
        )
    })
}

// ---------------------------------------------------------------------------
// Validate
// ---------------------------------------------------------------------------

pub fn validate(dir: &Path, _type_name: &str, ctx: &ValidateContext) -> CoreResult<()> {
    let tree = read_gz_json(&dir.join(LIST_FILE))?;
    if node_kind(&tree, dir)? != "list" {
        return Err(invalid(dir, "top-level node must be a list"));
    }
    let mut externals = BTreeSet::new();
    check_node(&tree, dir, &mut externals)?;
    for child in check_indexed_children(dir, OTHER_CONTENTS_DIR, &externals)? {
        ctx.validate_child(&child)?;
    }
    Ok(())
}

/// Structural pass over one node; collects external indices for the
/// directory cross-check.
fn check_node(node: &Json, dir: &Path, externals: &mut BTreeSet<usize>) -> CoreResult<()> {
    match node_kind(node, dir)? {
        "list" => {
            let raw = values_array(node, dir)?;
            for item in raw {
                if !item.is_null() {
                    check_node(item, dir, externals)?;
                }
            }
            if let Some(names) = node_names(node, dir)? {
                check_names_len(dir, &names, raw.len())?;
            }
            Ok(())
        }
        "integer" => check_elements(node, dir, decode_integer),
        "number" => check_elements(node, dir, decode_number),
        "boolean" => check_elements(node, dir, decode_boolean),
        "string" => {
            let (values, _) = decode_vector(node, dir, decode_string)?;
            check_temporal(dir, &values, node_format(node, dir)?)
        }
        "factor" => decode_factor(node, dir).map(|_| ()),
        "external" => {
            let index = node
                .get("index")
                .and_then(Json::as_u64)
                .ok_or_else(|| invalid(dir, "external node without an index"))?;
            if !externals.insert(index as usize) {
                return Err(invalid(dir, format!("duplicate external index {index}")));
            }
            Ok(())
        }
        other => Err(invalid(dir, format!("unknown node type '{other}'"))),
    }
}

fn check_elements<T>(
    node: &Json,
    dir: &Path,
    element: fn(&Json, &Path, usize) -> CoreResult<Option<T>>,
) -> CoreResult<()> {
    decode_vector(node, dir, element).map(|_| ())
}
