use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::reader;
use crate::writer;

/// Scalar storage type of a dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalarType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    F64,
    Str,
}

impl ScalarType {
    /// Whether this is one of the integer widths.
    pub fn is_integral(&self) -> bool {
        !matches!(self, Self::F64 | Self::Str)
    }

    /// Bytes per element for the fixed-width types (strings vary).
    pub fn element_bytes(&self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 => 4,
            Self::I64 | Self::F64 => 8,
            Self::Str => 0,
        }
    }

    /// Closed range of representable values for the integer widths.
    pub fn bounds(&self) -> Option<(i64, i64)> {
        match self {
            Self::I8 => Some((i8::MIN as i64, i8::MAX as i64)),
            Self::U8 => Some((0, u8::MAX as i64)),
            Self::I16 => Some((i16::MIN as i64, i16::MAX as i64)),
            Self::U16 => Some((0, u16::MAX as i64)),
            Self::I32 => Some((i32::MIN as i64, i32::MAX as i64)),
            Self::U32 => Some((0, u32::MAX as i64)),
            Self::I64 => Some((i64::MIN, i64::MAX)),
            Self::F64 | Self::Str => None,
        }
    }
}

/// An attribute value attached to a group or dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl AttrValue {
    fn kind(&self) -> &'static str {
        match self {
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
        }
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// In-memory dataset payload. Integer widths all decode to `i64`; the
/// stored width lives in [`Dataset::scalar_type`].
#[derive(Clone, Debug, PartialEq)]
pub enum DataBuffer {
    Ints(Vec<i64>),
    Floats(Vec<f64>),
    Strings(Vec<String>),
}

impl DataBuffer {
    fn kind(&self) -> &'static str {
        match self {
            Self::Ints(_) => "integer",
            Self::Floats(_) => "floating-point",
            Self::Strings(_) => "string",
        }
    }

    /// Element count.
    pub fn len(&self) -> usize {
        match self {
            Self::Ints(v) => v.len(),
            Self::Floats(v) => v.len(),
            Self::Strings(v) => v.len(),
        }
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A one-dimensional typed dataset with its own attributes.
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    scalar_type: ScalarType,
    data: DataBuffer,
    attrs: BTreeMap<String, AttrValue>,
}

impl Dataset {
    /// Integer dataset at the given storage width.
    pub fn ints(scalar_type: ScalarType, values: Vec<i64>) -> Self {
        debug_assert!(scalar_type.is_integral());
        Self {
            scalar_type,
            data: DataBuffer::Ints(values),
            attrs: BTreeMap::new(),
        }
    }

    /// Double-precision float dataset.
    pub fn floats(values: Vec<f64>) -> Self {
        Self {
            scalar_type: ScalarType::F64,
            data: DataBuffer::Floats(values),
            attrs: BTreeMap::new(),
        }
    }

    /// Variable-length string dataset.
    pub fn strings(values: Vec<String>) -> Self {
        Self {
            scalar_type: ScalarType::Str,
            data: DataBuffer::Strings(values),
            attrs: BTreeMap::new(),
        }
    }

    pub(crate) fn from_parts(
        scalar_type: ScalarType,
        data: DataBuffer,
        attrs: BTreeMap<String, AttrValue>,
    ) -> Self {
        Self {
            scalar_type,
            data,
            attrs,
        }
    }

    /// Storage type of the elements.
    pub fn scalar_type(&self) -> ScalarType {
        self.scalar_type
    }

    /// Raw payload.
    pub fn data(&self) -> &DataBuffer {
        &self.data
    }

    /// Element count.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Integer payload, or an error naming the actual kind.
    pub fn as_ints(&self) -> StoreResult<&[i64]> {
        match &self.data {
            DataBuffer::Ints(v) => Ok(v),
            other => Err(StoreError::WrongDatasetType {
                expected: "integer",
                actual: other.kind(),
            }),
        }
    }

    /// Float payload, or an error naming the actual kind.
    pub fn as_floats(&self) -> StoreResult<&[f64]> {
        match &self.data {
            DataBuffer::Floats(v) => Ok(v),
            other => Err(StoreError::WrongDatasetType {
                expected: "floating-point",
                actual: other.kind(),
            }),
        }
    }

    /// String payload, or an error naming the actual kind.
    pub fn as_strings(&self) -> StoreResult<&[String]> {
        match &self.data {
            DataBuffer::Strings(v) => Ok(v),
            other => Err(StoreError::WrongDatasetType {
                expected: "string",
                actual: other.kind(),
            }),
        }
    }

    /// Attach an attribute, replacing any previous value.
    pub fn set_attr(&mut self, name: &str, value: impl Into<AttrValue>) {
        self.attrs.insert(name.to_string(), value.into());
    }

    /// Look up an attribute.
    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    /// All attributes in name order.
    pub fn attrs(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Optional string attribute; present-but-wrong-kind is an error.
    pub fn str_attr(&self, name: &str) -> StoreResult<Option<&str>> {
        opt_str_attr(&self.attrs, name)
    }

    /// Optional integer attribute; present-but-wrong-kind is an error.
    pub fn int_attr(&self, name: &str) -> StoreResult<Option<i64>> {
        opt_int_attr(&self.attrs, name)
    }

    /// Optional float attribute; present-but-wrong-kind is an error.
    pub fn float_attr(&self, name: &str) -> StoreResult<Option<f64>> {
        opt_float_attr(&self.attrs, name)
    }

    pub(crate) fn attrs_map(&self) -> &BTreeMap<String, AttrValue> {
        &self.attrs
    }
}

/// A named scope holding attributes, datasets and nested groups.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Group {
    attrs: BTreeMap<String, AttrValue>,
    datasets: BTreeMap<String, Dataset>,
    groups: BTreeMap<String, Group>,
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an attribute, replacing any previous value.
    pub fn set_attr(&mut self, name: &str, value: impl Into<AttrValue>) {
        self.attrs.insert(name.to_string(), value.into());
    }

    /// Look up an attribute.
    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    /// Required string attribute.
    pub fn require_str_attr(&self, name: &str) -> StoreResult<&str> {
        opt_str_attr(&self.attrs, name)?.ok_or_else(|| StoreError::MissingAttribute {
            name: name.to_string(),
        })
    }

    /// Required integer attribute.
    pub fn require_int_attr(&self, name: &str) -> StoreResult<i64> {
        opt_int_attr(&self.attrs, name)?.ok_or_else(|| StoreError::MissingAttribute {
            name: name.to_string(),
        })
    }

    /// Optional string attribute; present-but-wrong-kind is an error.
    pub fn str_attr(&self, name: &str) -> StoreResult<Option<&str>> {
        opt_str_attr(&self.attrs, name)
    }

    /// Child group by name, created on demand.
    pub fn ensure_group(&mut self, name: &str) -> &mut Group {
        self.groups.entry(name.to_string()).or_default()
    }

    /// Child group by name.
    pub fn group(&self, name: &str) -> StoreResult<&Group> {
        self.groups.get(name).ok_or_else(|| StoreError::MissingGroup {
            name: name.to_string(),
        })
    }

    /// Whether a child group exists.
    pub fn has_group(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    /// Child group names in order.
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Insert a dataset, replacing any previous one of the same name.
    pub fn put_dataset(&mut self, name: &str, dataset: Dataset) {
        self.datasets.insert(name.to_string(), dataset);
    }

    /// Dataset by name.
    pub fn dataset(&self, name: &str) -> StoreResult<&Dataset> {
        self.datasets
            .get(name)
            .ok_or_else(|| StoreError::MissingDataset {
                name: name.to_string(),
            })
    }

    /// Mutable dataset by name, for attaching attributes after insertion.
    pub fn dataset_mut(&mut self, name: &str) -> StoreResult<&mut Dataset> {
        self.datasets
            .get_mut(name)
            .ok_or_else(|| StoreError::MissingDataset {
                name: name.to_string(),
            })
    }

    /// Whether a dataset exists.
    pub fn has_dataset(&self, name: &str) -> bool {
        self.datasets.contains_key(name)
    }

    /// Dataset names in order.
    pub fn dataset_names(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(String::as_str)
    }

    pub(crate) fn attrs_map(&self) -> &BTreeMap<String, AttrValue> {
        &self.attrs
    }

    pub(crate) fn datasets_map(&self) -> &BTreeMap<String, Dataset> {
        &self.datasets
    }

    pub(crate) fn groups_map(&self) -> &BTreeMap<String, Group> {
        &self.groups
    }

    pub(crate) fn from_parts(
        attrs: BTreeMap<String, AttrValue>,
        datasets: BTreeMap<String, Dataset>,
        groups: BTreeMap<String, Group>,
    ) -> Self {
        Self {
            attrs,
            datasets,
            groups,
        }
    }
}

fn opt_str_attr<'a>(
    attrs: &'a BTreeMap<String, AttrValue>,
    name: &str,
) -> StoreResult<Option<&'a str>> {
    match attrs.get(name) {
        None => Ok(None),
        Some(AttrValue::Str(s)) => Ok(Some(s)),
        Some(other) => Err(wrong_kind(name, "string", other)),
    }
}

fn opt_int_attr(attrs: &BTreeMap<String, AttrValue>, name: &str) -> StoreResult<Option<i64>> {
    match attrs.get(name) {
        None => Ok(None),
        Some(AttrValue::Int(v)) => Ok(Some(*v)),
        Some(other) => Err(wrong_kind(name, "integer", other)),
    }
}

fn opt_float_attr(attrs: &BTreeMap<String, AttrValue>, name: &str) -> StoreResult<Option<f64>> {
    match attrs.get(name) {
        None => Ok(None),
        Some(AttrValue::Float(v)) => Ok(Some(*v)),
        Some(other) => Err(wrong_kind(name, "float", other)),
    }
}

fn wrong_kind(name: &str, expected: &'static str, actual: &AttrValue) -> StoreError {
    StoreError::WrongAttributeKind {
        name: name.to_string(),
        expected,
        actual: actual.kind(),
    }
}

/// A whole container file: a tree of named groups under an anonymous root.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Container {
    root: Group,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_root(root: Group) -> Self {
        Self { root }
    }

    /// The anonymous root group.
    pub fn root(&self) -> &Group {
        &self.root
    }

    /// Mutable root group.
    pub fn root_mut(&mut self) -> &mut Group {
        &mut self.root
    }

    /// Top-level group by name, created on demand.
    pub fn ensure_group(&mut self, name: &str) -> &mut Group {
        self.root.ensure_group(name)
    }

    /// Top-level group by name.
    pub fn group(&self, name: &str) -> StoreResult<&Group> {
        self.root.group(name)
    }

    /// Serialize the tree to a container file.
    pub fn write(&self, path: &Path) -> StoreResult<()> {
        writer::write_container(self, path)
    }

    /// Read a container file back into memory, verifying every chunk.
    pub fn open(path: &Path) -> StoreResult<Self> {
        reader::read_container(path)
    }
}
