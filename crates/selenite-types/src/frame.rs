use crate::error::{TypesError, TypesResult};
use crate::value::Value;

/// A data frame: named columns of equal length plus an explicit row count.
///
/// The row count is explicit so that zero-column frames still know how many
/// rows they have. Columns may be atomic vectors, factors, or any nested
/// value whose length matches.
#[derive(Clone, Debug, PartialEq)]
pub struct DataFrame {
    /// Column names, in column order.
    pub column_names: Vec<String>,
    /// Column values, parallel to `column_names`.
    pub columns: Vec<Value>,
    /// Number of rows.
    pub row_count: usize,
    /// Optional row names, length `row_count`.
    pub row_names: Option<Vec<String>>,
}

impl DataFrame {
    /// Create a data frame, checking that every column matches `row_count`.
    pub fn new(
        column_names: Vec<String>,
        columns: Vec<Value>,
        row_count: usize,
    ) -> TypesResult<Self> {
        if column_names.len() != columns.len() {
            return Err(TypesError::LengthMismatch {
                what: "column names".into(),
                expected: columns.len(),
                actual: column_names.len(),
            });
        }
        for (name, column) in column_names.iter().zip(&columns) {
            let actual = column.len().ok_or_else(|| TypesError::NoLength {
                type_tag: column.type_tag().to_string(),
            })?;
            if actual != row_count {
                return Err(TypesError::ColumnLength {
                    name: name.clone(),
                    expected: row_count,
                    actual,
                });
            }
        }
        Ok(Self {
            column_names,
            columns,
            row_count,
            row_names: None,
        })
    }

    /// Build from (name, column) pairs, inferring the row count from the
    /// first column. An empty frame gets zero rows.
    pub fn from_pairs(pairs: Vec<(&str, Value)>) -> TypesResult<Self> {
        let row_count = match pairs.first() {
            Some((name, v)) => v.len().ok_or_else(|| TypesError::ColumnLength {
                name: name.to_string(),
                expected: 0,
                actual: 0,
            })?,
            None => 0,
        };
        let column_names = pairs.iter().map(|(n, _)| n.to_string()).collect();
        let columns = pairs.into_iter().map(|(_, v)| v).collect();
        Self::new(column_names, columns, row_count)
    }

    /// Attach row names. Fails if the count differs from `row_count`.
    pub fn with_row_names(mut self, row_names: Vec<String>) -> TypesResult<Self> {
        if row_names.len() != self.row_count {
            return Err(TypesError::LengthMismatch {
                what: "row names".into(),
                expected: self.row_count,
                actual: row_names.len(),
            });
        }
        self.row_names = Some(row_names);
        Ok(self)
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Look up a column by name. Returns the first match.
    pub fn column(&self, name: &str) -> Option<&Value> {
        let index = self.column_names.iter().position(|n| n == name)?;
        self.columns.get(index)
    }
}
