use crate::error::{TypesError, TypesResult};
use crate::value::Value;

/// An ordered, possibly-named, heterogeneous list.
///
/// Elements are `Option<Value>`: `None` models an explicit "nothing" entry,
/// which round-trips as such rather than being dropped.
#[derive(Clone, Debug, PartialEq)]
pub struct SimpleList {
    /// Elements in order.
    pub elements: Vec<Option<Value>>,
    /// Optional element names, same length as `elements`.
    pub names: Option<Vec<String>>,
}

impl SimpleList {
    /// Create an unnamed list.
    pub fn new(elements: Vec<Option<Value>>) -> Self {
        Self {
            elements,
            names: None,
        }
    }

    /// Create a named list. Fails if the name count differs.
    pub fn with_names(elements: Vec<Option<Value>>, names: Vec<String>) -> TypesResult<Self> {
        if names.len() != elements.len() {
            return Err(TypesError::LengthMismatch {
                what: "list names".into(),
                expected: elements.len(),
                actual: names.len(),
            });
        }
        Ok(Self {
            elements,
            names: Some(names),
        })
    }

    /// Build a named list from (name, value) pairs.
    pub fn from_pairs(pairs: Vec<(&str, Value)>) -> Self {
        let names = pairs.iter().map(|(n, _)| n.to_string()).collect();
        let elements = pairs.into_iter().map(|(_, v)| Some(v)).collect();
        Self {
            elements,
            names: Some(names),
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Look up an element by name. Returns the first match.
    pub fn get(&self, name: &str) -> Option<&Option<Value>> {
        let names = self.names.as_ref()?;
        let index = names.iter().position(|n| n == name)?;
        self.elements.get(index)
    }
}
