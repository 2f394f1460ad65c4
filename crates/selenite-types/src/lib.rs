//! Value model for the selenite serialization framework.
//!
//! Every value that selenite can persist is a [`Value`]: a typed vector with
//! optional names and missing elements, a [`Factor`], a heterogeneous
//! [`SimpleList`], a [`DataFrame`], or an application-defined extension object
//! behind the [`CustomValue`] trait.
//!
//! # Missing values
//!
//! Missingness is first-class: vector elements are `Option<T>`, and `None`
//! survives a save/load round trip exactly. How `None` is encoded on disk is
//! the business of `selenite-codec`; this crate only models the logical shape.
//!
//! # Equality
//!
//! [`Value`] implements deep structural equality, which is what the dedup
//! machinery and the round-trip test contract use. Floating-point elements are
//! compared by bit pattern, except that all NaN payloads compare equal as a
//! class (see [`NumberVector`]).

pub mod error;
pub mod factor;
pub mod frame;
pub mod list;
pub mod value;
pub mod vector;

pub use error::{TypesError, TypesResult};
pub use factor::Factor;
pub use frame::DataFrame;
pub use list::SimpleList;
pub use value::{CustomValue, Value};
pub use vector::{
    BooleanVector, IntegerVector, LogicalType, NumberVector, StringFormat, StringVector,
};
