/// Errors from constructing or combining values.
#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    /// Two parallel sequences disagree on length.
    #[error("{what}: expected length {expected}, got {actual}")]
    LengthMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    /// A factor code points outside the level set.
    #[error("factor code {code} at position {index} is out of range for {levels} levels")]
    CodeOutOfRange {
        index: usize,
        code: usize,
        levels: usize,
    },

    /// A factor level occurs more than once.
    #[error("duplicate factor level {level:?}")]
    DuplicateLevel { level: String },

    /// A data frame column does not match the frame's row count.
    #[error("column {name:?}: expected {expected} rows, got {actual}")]
    ColumnLength {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// A value with no defined length was used where one is required.
    #[error("value of type {type_tag:?} has no defined length")]
    NoLength { type_tag: String },
}

/// Result alias for value-model operations.
pub type TypesResult<T> = Result<T, TypesError>;
