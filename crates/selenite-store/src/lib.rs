//! Chunked binary container for selenite payloads.
//!
//! A container file holds a tree of named groups, each carrying attributes,
//! nested groups and one-dimensional typed datasets. Dataset payloads are
//! zstd-compressed in CRC-checked chunks; the structural index travels as
//! bincode between the payload region and the footer.
//!
//! # Architecture
//!
//! - **Model** ([`Container`], [`Group`], [`Dataset`]): the in-memory tree
//! - **Writer/reader**: the `SLT5` framing with per-chunk integrity checks
//! - **Vector adapter** ([`vector`]): logical vectors in, placeholder
//!   attributes out, and the reverse

pub mod error;
pub mod layout;
pub mod model;
pub mod reader;
pub mod vector;
pub mod writer;

pub use error::{StoreError, StoreResult};
pub use layout::{StrEncoding, CHUNK_SIZE, MAGIC, VERSION};
pub use model::{AttrValue, Container, DataBuffer, Dataset, Group, ScalarType};
pub use vector::{PLACEHOLDER_ATTR, PLACEHOLDER_MEANING_ATTR};
