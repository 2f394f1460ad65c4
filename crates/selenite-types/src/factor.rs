use std::collections::HashSet;

use crate::error::{TypesError, TypesResult};

/// A factor: integer codes indexing an ordered set of unique string levels.
///
/// Codes are zero-based. A missing code (`None`) is a missing element, which
/// is distinct from a code pointing at an empty-string level.
#[derive(Clone, Debug, PartialEq)]
pub struct Factor {
    /// The level strings, unique, in presentation order.
    pub levels: Vec<String>,
    /// Zero-based indices into `levels`; `None` is a missing element.
    pub codes: Vec<Option<usize>>,
    /// Whether the levels carry a meaningful order.
    pub ordered: bool,
    /// Optional element names, same length as `codes`.
    pub names: Option<Vec<String>>,
}

impl Factor {
    /// Create a factor, checking level uniqueness and code ranges.
    pub fn new(levels: Vec<String>, codes: Vec<Option<usize>>, ordered: bool) -> TypesResult<Self> {
        let mut seen = HashSet::new();
        for level in &levels {
            if !seen.insert(level.as_str()) {
                return Err(TypesError::DuplicateLevel {
                    level: level.clone(),
                });
            }
        }
        for (index, code) in codes.iter().enumerate() {
            if let Some(code) = code {
                if *code >= levels.len() {
                    return Err(TypesError::CodeOutOfRange {
                        index,
                        code: *code,
                        levels: levels.len(),
                    });
                }
            }
        }
        Ok(Self {
            levels,
            codes,
            ordered,
            names: None,
        })
    }

    /// Build a factor from string elements, deriving levels in first-seen order.
    pub fn from_strings(elements: Vec<Option<&str>>, ordered: bool) -> Self {
        let mut levels: Vec<String> = Vec::new();
        let mut codes = Vec::with_capacity(elements.len());
        for element in elements {
            match element {
                None => codes.push(None),
                Some(s) => {
                    let code = match levels.iter().position(|l| l == s) {
                        Some(found) => found,
                        None => {
                            levels.push(s.to_string());
                            levels.len() - 1
                        }
                    };
                    codes.push(Some(code));
                }
            }
        }
        Self {
            levels,
            codes,
            ordered,
            names: None,
        }
    }

    /// Attach element names. Fails if the name count differs.
    pub fn with_names(mut self, names: Vec<String>) -> TypesResult<Self> {
        if names.len() != self.codes.len() {
            return Err(TypesError::LengthMismatch {
                what: "factor names".into(),
                expected: self.codes.len(),
                actual: names.len(),
            });
        }
        self.names = Some(names);
        Ok(self)
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Resolve an element to its level string, or `None` if missing.
    pub fn level_of(&self, index: usize) -> Option<&str> {
        self.codes
            .get(index)
            .copied()
            .flatten()
            .map(|code| self.levels[code].as_str())
    }
}
