use selenite_types::LogicalType;

use crate::error::{CsvError, CsvResult};

/// A typed column of parsed CSV data.
#[derive(Clone, Debug, PartialEq)]
pub enum CsvColumn {
    Integers(Vec<Option<i32>>),
    Numbers(Vec<Option<f64>>),
    Booleans(Vec<Option<bool>>),
    Strings(Vec<Option<String>>),
}

impl CsvColumn {
    /// An empty column of the given logical type.
    pub fn empty(logical_type: LogicalType) -> Self {
        match logical_type {
            LogicalType::Integer => Self::Integers(Vec::new()),
            LogicalType::Number => Self::Numbers(Vec::new()),
            LogicalType::Boolean => Self::Booleans(Vec::new()),
            LogicalType::String => Self::Strings(Vec::new()),
        }
    }

    /// The logical type this column holds.
    pub fn logical_type(&self) -> LogicalType {
        match self {
            Self::Integers(_) => LogicalType::Integer,
            Self::Numbers(_) => LogicalType::Number,
            Self::Booleans(_) => LogicalType::Boolean,
            Self::Strings(_) => LogicalType::String,
        }
    }

    /// Row count.
    pub fn len(&self) -> usize {
        match self {
            Self::Integers(v) => v.len(),
            Self::Numbers(v) => v.len(),
            Self::Booleans(v) => v.len(),
            Self::Strings(v) => v.len(),
        }
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Move another column's rows onto the end of this one. Both sides must
    /// hold the same type; chunked parsing guarantees that.
    pub(crate) fn append(&mut self, other: CsvColumn) {
        match (self, other) {
            (Self::Integers(a), Self::Integers(b)) => a.extend(b),
            (Self::Numbers(a), Self::Numbers(b)) => a.extend(b),
            (Self::Booleans(a), Self::Booleans(b)) => a.extend(b),
            (Self::Strings(a), Self::Strings(b)) => a.extend(b),
            _ => debug_assert!(false, "mismatched column types in append"),
        }
    }
}

/// A parsed (or to-be-written) table: named typed columns plus optional
/// row names.
#[derive(Clone, Debug, PartialEq)]
pub struct CsvTable {
    pub column_names: Vec<String>,
    pub columns: Vec<CsvColumn>,
    pub row_names: Option<Vec<String>>,
}

impl CsvTable {
    /// Build a table, checking that every column (and the row names, when
    /// present) agrees on the row count.
    pub fn new(
        column_names: Vec<String>,
        columns: Vec<CsvColumn>,
        row_names: Option<Vec<String>>,
    ) -> CsvResult<Self> {
        if column_names.len() != columns.len() {
            return Err(CsvError::UnevenColumns {
                details: format!(
                    "{} names for {} columns",
                    column_names.len(),
                    columns.len()
                ),
            });
        }
        let rows = columns
            .first()
            .map(CsvColumn::len)
            .or_else(|| row_names.as_ref().map(Vec::len))
            .unwrap_or(0);
        for (name, column) in column_names.iter().zip(&columns) {
            if column.len() != rows {
                return Err(CsvError::UnevenColumns {
                    details: format!("column '{}' has {} rows, expected {rows}", name, column.len()),
                });
            }
        }
        if let Some(names) = &row_names {
            if names.len() != rows {
                return Err(CsvError::UnevenColumns {
                    details: format!("{} row names for {rows} rows", names.len()),
                });
            }
        }
        Ok(Self {
            column_names,
            columns,
            row_names,
        })
    }

    /// Row count.
    pub fn row_count(&self) -> usize {
        self.columns
            .first()
            .map(CsvColumn::len)
            .or_else(|| self.row_names.as_ref().map(Vec::len))
            .unwrap_or(0)
    }

    /// Column count (row names excluded).
    pub fn width(&self) -> usize {
        self.columns.len()
    }
}

/// Declared shape a parser enforces: column types in order, and whether a
/// leading row-name column is expected.
#[derive(Clone, Debug, Default)]
pub struct TableSpec {
    pub row_names: bool,
    pub columns: Vec<LogicalType>,
}

impl TableSpec {
    pub fn new(columns: Vec<LogicalType>) -> Self {
        Self {
            row_names: false,
            columns,
        }
    }

    pub fn with_row_names(mut self) -> Self {
        self.row_names = true;
        self
    }

    /// Fields per record, row-name column included.
    pub fn arity(&self) -> usize {
        self.columns.len() + usize::from(self.row_names)
    }
}
