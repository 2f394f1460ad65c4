//! Placeholder-based missing-value encoding and logical-type coercion.
//!
//! Binary payloads cannot natively say "no value" for fixed-width types, so a
//! sentinel ("placeholder") of the same storage type stands in for missing
//! elements, chosen so it never collides with real data. This crate picks
//! placeholders, rewrites logical vectors into sentinel-encoded buffers, and
//! reverses the transformation on read.
//!
//! The rules are deliberately boring and exhaustively tested:
//!
//! - booleans become `i8` 0/1 with a fixed `-1` sentinel;
//! - integers pick the narrowest storage width that both contains the data
//!   and has a free extreme to serve as the sentinel;
//! - floats prefer NaN, then the infinities, then the finite extremes, with a
//!   caller-supplied fallback after that;
//! - strings use `"NA"`, prefixed with underscores until it is unused.
//!
//! [`temporal`] holds the RFC3339/date canonicalization helpers used for the
//! string sub-kinds.

pub mod coerce;
pub mod error;
pub mod placeholder;
pub mod temporal;

pub use coerce::{ints_to_raw, raw_to_ints};
pub use error::{CodecError, CodecResult};
pub use placeholder::{
    choose_float_placeholder, choose_integer_width, choose_string_placeholder, decode_booleans,
    decode_integers, decode_numbers, decode_numbers_respecting, decode_strings,
    transform_booleans, transform_integers, transform_numbers, transform_numbers_respecting,
    transform_strings, FloatFallback, IntWidth, PlaceholderMeaning, BOOLEAN_PLACEHOLDER,
};
pub use temporal::{canonicalize_datetime, validate_date, validate_datetime};
