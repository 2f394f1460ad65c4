use std::fmt;

use crate::error::{TypesError, TypesResult};

/// The logical type of an atomic payload, as recorded in container metadata.
///
/// This is the small closed set of value types the on-disk format understands;
/// the storage width actually used for a given vector is chosen separately by
/// the codec.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LogicalType {
    Integer,
    Number,
    Boolean,
    String,
}

impl LogicalType {
    /// The attribute string written beside payloads (`type` attribute).
    pub fn as_attr(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::String => "string",
        }
    }

    /// Parse a `type` attribute string.
    pub fn from_attr(s: &str) -> Option<Self> {
        match s {
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            "string" => Some(Self::String),
            _ => None,
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_attr())
    }
}

/// Sub-kind of a string vector.
///
/// Dates and datetimes are stored as strings with a `format` attribute rather
/// than as numeric encodings, so the on-disk text stays human-readable and
/// timezone offsets survive untouched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StringFormat {
    /// Free-form text.
    #[default]
    Plain,
    /// Calendar date, `YYYY-MM-DD`.
    Date,
    /// RFC3339 datetime with a preserved UTC offset.
    DateTime,
}

impl StringFormat {
    /// Attribute value written beside string payloads; `None` for plain text.
    pub fn as_attr(&self) -> Option<&'static str> {
        match self {
            Self::Plain => None,
            Self::Date => Some("date"),
            Self::DateTime => Some("date-time"),
        }
    }

    /// Parse a `format` attribute value (absent means plain).
    pub fn from_attr(s: Option<&str>) -> Option<Self> {
        match s {
            None => Some(Self::Plain),
            Some("date") => Some(Self::Date),
            Some("date-time") => Some(Self::DateTime),
            Some(_) => None,
        }
    }
}

/// Validate an optional names sequence against the vector length.
fn check_names(len: usize, names: Option<Vec<String>>) -> TypesResult<Option<Vec<String>>> {
    if let Some(ref n) = names {
        if n.len() != len {
            return Err(TypesError::LengthMismatch {
                what: "names".into(),
                expected: len,
                actual: n.len(),
            });
        }
    }
    Ok(names)
}

// ---------------------------------------------------------------------------
// IntegerVector
// ---------------------------------------------------------------------------

/// A vector of 32-bit integers with optional missing elements and names.
#[derive(Clone, Debug, PartialEq)]
pub struct IntegerVector {
    /// Elements; `None` is a missing value.
    pub values: Vec<Option<i32>>,
    /// Optional element names, same length as `values`.
    pub names: Option<Vec<String>>,
}

impl IntegerVector {
    /// Create an unnamed vector.
    pub fn new(values: Vec<Option<i32>>) -> Self {
        Self {
            values,
            names: None,
        }
    }

    /// Create a named vector. Fails if the name count differs.
    pub fn with_names(values: Vec<Option<i32>>, names: Vec<String>) -> TypesResult<Self> {
        let names = check_names(values.len(), Some(names))?;
        Ok(Self { values, names })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<i32>> for IntegerVector {
    fn from(values: Vec<i32>) -> Self {
        Self::new(values.into_iter().map(Some).collect())
    }
}

// ---------------------------------------------------------------------------
// NumberVector
// ---------------------------------------------------------------------------

/// A vector of 64-bit floats with optional missing elements and names.
///
/// Equality is bitwise per element, except that every NaN payload compares
/// equal to every other NaN. This keeps `-0.0` distinct from `0.0` (both
/// survive a round trip) while letting logically-equivalent NaNs match, which
/// is what dedup and the round-trip contract need.
#[derive(Clone, Debug)]
pub struct NumberVector {
    /// Elements; `None` is a missing value, `Some(f64::NAN)` is a real NaN
    /// payload (distinct from missing where the respect-payload mode is used).
    pub values: Vec<Option<f64>>,
    /// Optional element names, same length as `values`.
    pub names: Option<Vec<String>>,
}

impl NumberVector {
    /// Create an unnamed vector.
    pub fn new(values: Vec<Option<f64>>) -> Self {
        Self {
            values,
            names: None,
        }
    }

    /// Create a named vector. Fails if the name count differs.
    pub fn with_names(values: Vec<Option<f64>>, names: Vec<String>) -> TypesResult<Self> {
        let names = check_names(values.len(), Some(names))?;
        Ok(Self { values, names })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<f64>> for NumberVector {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values.into_iter().map(Some).collect())
    }
}

/// Element equality: NaNs match as a class, everything else by bit pattern.
fn float_eq(a: Option<f64>, b: Option<f64>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => (x.is_nan() && y.is_nan()) || x.to_bits() == y.to_bits(),
        _ => false,
    }
}

impl PartialEq for NumberVector {
    fn eq(&self, other: &Self) -> bool {
        self.names == other.names
            && self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(&other.values)
                .all(|(a, b)| float_eq(*a, *b))
    }
}

// ---------------------------------------------------------------------------
// BooleanVector
// ---------------------------------------------------------------------------

/// A vector of booleans with optional missing elements and names.
#[derive(Clone, Debug, PartialEq)]
pub struct BooleanVector {
    /// Elements; `None` is a missing value.
    pub values: Vec<Option<bool>>,
    /// Optional element names, same length as `values`.
    pub names: Option<Vec<String>>,
}

impl BooleanVector {
    /// Create an unnamed vector.
    pub fn new(values: Vec<Option<bool>>) -> Self {
        Self {
            values,
            names: None,
        }
    }

    /// Create a named vector. Fails if the name count differs.
    pub fn with_names(values: Vec<Option<bool>>, names: Vec<String>) -> TypesResult<Self> {
        let names = check_names(values.len(), Some(names))?;
        Ok(Self { values, names })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<bool>> for BooleanVector {
    fn from(values: Vec<bool>) -> Self {
        Self::new(values.into_iter().map(Some).collect())
    }
}

// ---------------------------------------------------------------------------
// StringVector
// ---------------------------------------------------------------------------

/// A vector of strings with optional missing elements, names, and a format
/// sub-kind (plain, date, or datetime).
#[derive(Clone, Debug, PartialEq)]
pub struct StringVector {
    /// Elements; `None` is a missing value.
    pub values: Vec<Option<String>>,
    /// Optional element names, same length as `values`.
    pub names: Option<Vec<String>>,
    /// Sub-kind; dates and datetimes are validated at save time.
    pub format: StringFormat,
}

impl StringVector {
    /// Create an unnamed plain-text vector.
    pub fn new(values: Vec<Option<String>>) -> Self {
        Self {
            values,
            names: None,
            format: StringFormat::Plain,
        }
    }

    /// Create an unnamed vector with an explicit format.
    pub fn with_format(values: Vec<Option<String>>, format: StringFormat) -> Self {
        Self {
            values,
            names: None,
            format,
        }
    }

    /// Create a named vector. Fails if the name count differs.
    pub fn with_names(values: Vec<Option<String>>, names: Vec<String>) -> TypesResult<Self> {
        let names = check_names(values.len(), Some(names))?;
        Ok(Self {
            values,
            names,
            format: StringFormat::Plain,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over the present (non-missing) elements.
    pub fn present(&self) -> impl Iterator<Item = &str> {
        self.values.iter().flatten().map(String::as_str)
    }
}

impl From<Vec<&str>> for StringVector {
    fn from(values: Vec<&str>) -> Self {
        Self::new(values.into_iter().map(|s| Some(s.to_string())).collect())
    }
}
