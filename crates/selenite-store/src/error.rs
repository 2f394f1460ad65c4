use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid container magic: expected {expected}, got {actual}")]
    InvalidMagic { expected: String, actual: String },

    #[error("unsupported container version: {0}")]
    UnsupportedVersion(u32),

    #[error("corrupt container data at offset {offset}: {reason}")]
    Corrupt { offset: u64, reason: String },

    #[error("chunk CRC32 mismatch at offset {offset}")]
    CrcMismatch { offset: u64 },

    #[error("compression failed: {0}")]
    CompressionFailed(String),

    #[error("decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("structural index corrupted: {0}")]
    IndexCorrupted(String),

    #[error("group not found: {name}")]
    MissingGroup { name: String },

    #[error("dataset not found: {name}")]
    MissingDataset { name: String },

    #[error("attribute not found: {name}")]
    MissingAttribute { name: String },

    #[error("attribute {name} has kind {actual}, expected {expected}")]
    WrongAttributeKind {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("dataset holds {actual} data, expected {expected}")]
    WrongDatasetType {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("value {value} at index {index} does not fit the storage width")]
    ValueOutsideWidth { index: usize, value: i64 },

    #[error("unrecognized placeholder-encodes value: {value}")]
    BadPlaceholderMeaning { value: String },

    #[error(transparent)]
    Codec(#[from] selenite_codec::CodecError),

    #[error(transparent)]
    Types(#[from] selenite_types::TypesError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("index serialization error: {0}")]
    Serialization(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
