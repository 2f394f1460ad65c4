use thiserror::Error;

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("CSV payload is not valid UTF-8")]
    Utf8,

    #[error("CSV payload has no header row")]
    MissingHeader,

    #[error("header has {actual} columns, expected {expected}")]
    HeaderArity { expected: usize, actual: usize },

    #[error("row {row} has {actual} fields, expected {expected}")]
    RecordArity {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("row {row}, column '{column}': {reason}")]
    Field {
        row: usize,
        column: String,
        reason: String,
    },

    #[error("row {row}: {reason}")]
    Malformed { row: usize, reason: String },

    #[error("unterminated quoted field starting near byte {offset}")]
    UnterminatedQuote { offset: usize },

    #[error("table columns have uneven lengths: {details}")]
    UnevenColumns { details: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CsvResult<T> = Result<T, CsvError>;
