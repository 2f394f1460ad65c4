/// Errors from placeholder selection, encoding, or coercion.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Every integer width had both extremes occupied by real data.
    #[error("no integer storage width has a free extreme for a missing-value placeholder")]
    NoIntegerPlaceholder,

    /// Every float sentinel candidate already occurs in the data and no
    /// fallback produced one.
    #[error("no float missing-value placeholder available: NaN, infinities and finite extremes all occur in the data")]
    NoFloatPlaceholder,

    /// A stored boolean code was neither 0, 1, nor the placeholder.
    #[error("invalid boolean code {code} at position {index}")]
    InvalidBooleanCode { index: usize, code: i64 },

    /// A stored integer does not fit the requested logical type.
    #[error("integer {value} at position {index} does not fit a 32-bit integer")]
    IntegerOutOfRange { index: usize, value: i64 },

    /// A date string is not a valid `YYYY-MM-DD` calendar date.
    #[error("invalid date string {value:?}: expected YYYY-MM-DD")]
    BadDate { value: String },

    /// A datetime string is not valid RFC3339.
    #[error("invalid datetime string {value:?}: {reason}")]
    BadDateTime { value: String, reason: String },
}

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
