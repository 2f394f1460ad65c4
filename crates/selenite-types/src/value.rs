use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::factor::Factor;
use crate::frame::DataFrame;
use crate::list::SimpleList;
use crate::vector::{BooleanVector, IntegerVector, NumberVector, StringVector};

/// An application-defined value that selenite can persist once a handler for
/// its type tag (or one of its ancestor tags) is registered.
///
/// Implementations live outside the core; the registries dispatch on
/// [`CustomValue::type_tag`] and fall back along [`CustomValue::class_chain`].
pub trait CustomValue: fmt::Debug + Send + Sync + 'static {
    /// The most specific runtime type tag (the registry key).
    fn type_tag(&self) -> &str;

    /// Type tags from most to least specific, starting with `type_tag`.
    ///
    /// Dispatch walks this chain when no handler matches the exact tag,
    /// mirroring ancestor/capability lookup in an open class hierarchy.
    fn class_chain(&self) -> Vec<String> {
        vec![self.type_tag().to_string()]
    }

    /// Element count, when the value has a meaningful length (required for
    /// values used as data frame columns).
    fn length(&self) -> Option<usize> {
        None
    }

    /// Deep structural equality against another extension value.
    fn deep_eq(&self, other: &dyn CustomValue) -> bool;

    /// Downcasting support.
    fn as_any(&self) -> &dyn Any;
}

/// Any value the framework can serialize.
///
/// The built-in shapes cover the statistical core (vectors, factors, lists,
/// frames); `Other` carries extension objects whose handlers are registered at
/// runtime.
#[derive(Clone, Debug)]
pub enum Value {
    Integer(IntegerVector),
    Number(NumberVector),
    Boolean(BooleanVector),
    String(StringVector),
    Factor(Factor),
    List(SimpleList),
    Frame(DataFrame),
    Other(Arc<dyn CustomValue>),
}

impl Value {
    /// The most specific runtime type tag, used as the save-registry key.
    pub fn type_tag(&self) -> &str {
        match self {
            Self::Integer(_) => "integer_vector",
            Self::Number(_) => "number_vector",
            Self::Boolean(_) => "boolean_vector",
            Self::String(_) => "string_vector",
            Self::Factor(_) => "factor",
            Self::List(_) => "simple_list",
            Self::Frame(_) => "data_frame",
            Self::Other(v) => v.type_tag(),
        }
    }

    /// Type tags from most to least specific.
    ///
    /// The four atomic vector kinds share the `atomic_vector` ancestor, so a
    /// single handler registered under that tag covers all of them.
    pub fn class_chain(&self) -> Vec<String> {
        match self {
            Self::Integer(_) | Self::Number(_) | Self::Boolean(_) | Self::String(_) => {
                vec![self.type_tag().to_string(), "atomic_vector".to_string()]
            }
            Self::Factor(_) | Self::List(_) | Self::Frame(_) => {
                vec![self.type_tag().to_string()]
            }
            Self::Other(v) => v.class_chain(),
        }
    }

    /// Element count, where defined. Frames report their row count.
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::Integer(v) => Some(v.len()),
            Self::Number(v) => Some(v.len()),
            Self::Boolean(v) => Some(v.len()),
            Self::String(v) => Some(v.len()),
            Self::Factor(v) => Some(v.len()),
            Self::List(v) => Some(v.len()),
            Self::Frame(v) => Some(v.row_count),
            Self::Other(v) => v.length(),
        }
    }

    /// True when `len()` reports zero.
    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Factor(a), Self::Factor(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Frame(a), Self::Frame(b)) => a == b,
            (Self::Other(a), Self::Other(b)) => a.deep_eq(b.as_ref()),
            _ => false,
        }
    }
}

impl From<IntegerVector> for Value {
    fn from(v: IntegerVector) -> Self {
        Self::Integer(v)
    }
}

impl From<NumberVector> for Value {
    fn from(v: NumberVector) -> Self {
        Self::Number(v)
    }
}

impl From<BooleanVector> for Value {
    fn from(v: BooleanVector) -> Self {
        Self::Boolean(v)
    }
}

impl From<StringVector> for Value {
    fn from(v: StringVector) -> Self {
        Self::String(v)
    }
}

impl From<Factor> for Value {
    fn from(v: Factor) -> Self {
        Self::Factor(v)
    }
}

impl From<SimpleList> for Value {
    fn from(v: SimpleList) -> Self {
        Self::List(v)
    }
}

impl From<DataFrame> for Value {
    fn from(v: DataFrame) -> Self {
        Self::Frame(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Token {
        word: String,
    }

    impl CustomValue for Token {
        fn type_tag(&self) -> &str {
            "token"
        }

        fn class_chain(&self) -> Vec<String> {
            vec!["token".to_string(), "string_like".to_string()]
        }

        fn deep_eq(&self, other: &dyn CustomValue) -> bool {
            other
                .as_any()
                .downcast_ref::<Token>()
                .is_some_and(|t| t.word == self.word)
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn atomic_vectors_share_an_ancestor_tag() {
        let v = Value::Integer(IntegerVector::from(vec![1]));
        assert_eq!(v.type_tag(), "integer_vector");
        assert_eq!(v.class_chain(), vec!["integer_vector", "atomic_vector"]);
    }

    #[test]
    fn cross_kind_values_are_unequal() {
        let a = Value::Integer(IntegerVector::from(vec![1]));
        let b = Value::Number(NumberVector::from(vec![1.0]));
        assert_ne!(a, b);
    }

    #[test]
    fn extension_values_use_deep_eq() {
        let a = Value::Other(Arc::new(Token { word: "hi".into() }));
        let b = Value::Other(Arc::new(Token { word: "hi".into() }));
        let c = Value::Other(Arc::new(Token { word: "bye".into() }));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn extension_chain_is_caller_defined() {
        let v = Value::Other(Arc::new(Token { word: "hi".into() }));
        assert_eq!(v.class_chain(), vec!["token", "string_like"]);
    }

    #[test]
    fn frame_length_is_row_count() {
        let df = DataFrame::new(vec![], vec![], 7).unwrap();
        assert_eq!(Value::Frame(df).len(), Some(7));
    }
}
