use std::collections::HashSet;

use crate::error::{CodecError, CodecResult};

/// Integer storage widths, narrowest first.
///
/// The order here is the search order: a vector is stored in the first width
/// that spans its data (and, when missing values are present, still has a
/// free extreme left over for the placeholder).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IntWidth {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
}

/// All widths in search order.
pub const INT_WIDTHS: [IntWidth; 7] = [
    IntWidth::I8,
    IntWidth::U8,
    IntWidth::I16,
    IntWidth::U16,
    IntWidth::I32,
    IntWidth::U32,
    IntWidth::I64,
];

impl IntWidth {
    /// Lowest representable value.
    pub fn min(&self) -> i64 {
        match self {
            Self::I8 => i8::MIN as i64,
            Self::U8 | Self::U16 | Self::U32 => 0,
            Self::I16 => i16::MIN as i64,
            Self::I32 => i32::MIN as i64,
            Self::I64 => i64::MIN,
        }
    }

    /// Highest representable value.
    pub fn max(&self) -> i64 {
        match self {
            Self::I8 => i8::MAX as i64,
            Self::U8 => u8::MAX as i64,
            Self::I16 => i16::MAX as i64,
            Self::U16 => u16::MAX as i64,
            Self::I32 => i32::MAX as i64,
            Self::U32 => u32::MAX as i64,
            Self::I64 => i64::MAX,
        }
    }

    /// Storage size in bytes.
    pub fn bytes(&self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 => 4,
            Self::I64 => 8,
        }
    }

    /// Whether the closed range `[lo, hi]` fits this width.
    pub fn spans(&self, lo: i64, hi: i64) -> bool {
        lo >= self.min() && hi <= self.max()
    }
}

// ---------------------------------------------------------------------------
// Integers
// ---------------------------------------------------------------------------

/// Pick the storage width and optional placeholder for an integer vector.
///
/// Without missing values: the narrowest width spanning the data, no
/// placeholder reserved. With missing values: the narrowest spanning width
/// whose minimum (preferred) or maximum is not itself present in the data;
/// that free extreme becomes the placeholder.
pub fn choose_integer_width(values: &[Option<i64>]) -> CodecResult<(IntWidth, Option<i64>)> {
    let mut lo = i64::MAX;
    let mut hi = i64::MIN;
    let mut present = 0usize;
    for v in values.iter().flatten() {
        lo = lo.min(*v);
        hi = hi.max(*v);
        present += 1;
    }
    let has_missing = present != values.len();
    if present == 0 {
        // All-missing (or empty) vectors fit anywhere.
        return Ok(if has_missing {
            (IntWidth::I8, Some(IntWidth::I8.min()))
        } else {
            (IntWidth::I8, None)
        });
    }

    if !has_missing {
        for width in INT_WIDTHS {
            if width.spans(lo, hi) {
                return Ok((width, None));
            }
        }
        unreachable!("I64 spans every i64 range");
    }

    let used: HashSet<i64> = values.iter().flatten().copied().collect();
    for width in INT_WIDTHS {
        if !width.spans(lo, hi) {
            continue;
        }
        if !used.contains(&width.min()) {
            return Ok((width, Some(width.min())));
        }
        if !used.contains(&width.max()) {
            return Ok((width, Some(width.max())));
        }
    }
    Err(CodecError::NoIntegerPlaceholder)
}

/// Encode an integer vector: missing elements become the placeholder.
///
/// Returns the chosen width, the sentinel-encoded buffer, and the placeholder
/// (present only when the vector actually had missing elements).
pub fn transform_integers(
    values: &[Option<i64>],
) -> CodecResult<(IntWidth, Vec<i64>, Option<i64>)> {
    let (width, placeholder) = choose_integer_width(values)?;
    let encoded = match placeholder {
        Some(p) => values.iter().map(|v| v.unwrap_or(p)).collect(),
        None => values.iter().map(|v| v.unwrap_or_default()).collect(),
    };
    Ok((width, encoded, placeholder))
}

/// Decode a sentinel-encoded integer buffer back into a logical vector.
pub fn decode_integers(encoded: &[i64], placeholder: Option<i64>) -> Vec<Option<i64>> {
    encoded
        .iter()
        .map(|v| match placeholder {
            Some(p) if *v == p => None,
            _ => Some(*v),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Booleans
// ---------------------------------------------------------------------------

/// Fixed out-of-range code for a missing boolean.
pub const BOOLEAN_PLACEHOLDER: i8 = -1;

/// Encode a boolean vector as small integers (0/1, placeholder for missing).
pub fn transform_booleans(values: &[Option<bool>]) -> (Vec<i8>, Option<i8>) {
    let has_missing = values.iter().any(Option::is_none);
    let encoded = values
        .iter()
        .map(|v| match v {
            None => BOOLEAN_PLACEHOLDER,
            Some(false) => 0,
            Some(true) => 1,
        })
        .collect();
    (encoded, has_missing.then_some(BOOLEAN_PLACEHOLDER))
}

/// Decode stored boolean codes; anything but 0, 1 or the placeholder fails.
pub fn decode_booleans(codes: &[i64], placeholder: Option<i64>) -> CodecResult<Vec<Option<bool>>> {
    codes
        .iter()
        .enumerate()
        .map(|(index, code)| match (placeholder, *code) {
            (Some(p), c) if c == p => Ok(None),
            (_, 0) => Ok(Some(false)),
            (_, 1) => Ok(Some(true)),
            (_, c) => Err(CodecError::InvalidBooleanCode { index, code: c }),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Floats
// ---------------------------------------------------------------------------

/// Caller-supplied last-resort placeholder strategy for float vectors.
pub type FloatFallback<'a> = Option<&'a dyn Fn(&[f64]) -> Option<f64>>;

/// What a float placeholder stands for when true missing values and literal
/// NaN payloads co-occur and must be kept apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaceholderMeaning {
    /// The placeholder encodes logically-missing elements (the usual case).
    Missing,
    /// The placeholder encodes literal NaN payloads; raw NaN bits encode
    /// missing. Chosen when NaN payloads are rarer than missing values.
    NanPayload,
}

impl PlaceholderMeaning {
    /// Attribute value recorded beside the placeholder.
    pub fn as_attr(&self) -> &'static str {
        match self {
            Self::Missing => "na",
            Self::NanPayload => "nan",
        }
    }

    /// Parse the attribute value (absent means [`Self::Missing`]).
    pub fn from_attr(s: Option<&str>) -> Option<Self> {
        match s {
            None | Some("na") => Some(Self::Missing),
            Some("nan") => Some(Self::NanPayload),
            Some(_) => None,
        }
    }
}

/// True when `candidate` already occurs in `used` (NaN matching as a class).
fn float_present(candidate: f64, used: &HashSet<u64>, has_nan: bool) -> bool {
    if candidate.is_nan() {
        has_nan
    } else {
        used.contains(&candidate.to_bits())
    }
}

/// Pick a placeholder for a float vector, given its present (non-missing)
/// values.
///
/// Preference order: NaN, positive infinity, negative infinity, the most
/// negative finite value, the most positive finite value, then whatever the
/// fallback proposes. Fails only when everything collides.
pub fn choose_float_placeholder(present: &[f64], fallback: FloatFallback) -> CodecResult<f64> {
    let used: HashSet<u64> = present.iter().map(|v| v.to_bits()).collect();
    let has_nan = present.iter().any(|v| v.is_nan());
    let candidates = [
        f64::NAN,
        f64::INFINITY,
        f64::NEG_INFINITY,
        f64::MIN,
        f64::MAX,
    ];
    for candidate in candidates {
        if !float_present(candidate, &used, has_nan) {
            return Ok(candidate);
        }
    }
    if let Some(f) = fallback {
        if let Some(candidate) = f(present) {
            if !float_present(candidate, &used, has_nan) {
                return Ok(candidate);
            }
        }
    }
    Err(CodecError::NoFloatPlaceholder)
}

/// Encode a float vector for storage (default mode).
///
/// The placeholder is always chosen collision-free, but the default *decode*
/// collapses every NaN payload into missing; use the respecting variant when
/// NaN payloads must survive a round trip.
pub fn transform_numbers(
    values: &[Option<f64>],
    fallback: FloatFallback,
) -> CodecResult<(Vec<f64>, Option<f64>)> {
    if values.iter().all(Option::is_some) {
        return Ok((values.iter().map(|v| v.unwrap_or_default()).collect(), None));
    }
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let placeholder = choose_float_placeholder(&present, fallback)?;
    let encoded = values.iter().map(|v| v.unwrap_or(placeholder)).collect();
    Ok((encoded, Some(placeholder)))
}

/// Encode a float vector, preserving the NA-versus-NaN distinction.
///
/// When both occur, the rarer class is rewritten to the placeholder and the
/// returned [`PlaceholderMeaning`] says which class that was; the commoner
/// class keeps its natural NaN bits. Decoding with the same meaning restores
/// both exactly.
pub fn transform_numbers_respecting(
    values: &[Option<f64>],
    fallback: FloatFallback,
) -> CodecResult<(Vec<f64>, Option<(f64, PlaceholderMeaning)>)> {
    let missing = values.iter().filter(|v| v.is_none()).count();
    let nans = values
        .iter()
        .filter(|v| v.is_some_and(f64::is_nan))
        .count();

    if missing == 0 {
        // NaN payloads (if any) keep their own bits; nothing to encode.
        return Ok((values.iter().map(|v| v.unwrap_or_default()).collect(), None));
    }

    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if nans == 0 {
        let placeholder = choose_float_placeholder(&present, fallback)?;
        let encoded = values.iter().map(|v| v.unwrap_or(placeholder)).collect();
        return Ok((encoded, Some((placeholder, PlaceholderMeaning::Missing))));
    }

    // Both classes occur. NaN is taken, so the placeholder is non-NaN; the
    // rarer class gets rewritten to it.
    let placeholder = choose_float_placeholder(&present, fallback)?;
    if missing <= nans {
        let encoded = values.iter().map(|v| v.unwrap_or(placeholder)).collect();
        Ok((encoded, Some((placeholder, PlaceholderMeaning::Missing))))
    } else {
        let encoded = values
            .iter()
            .map(|v| match v {
                None => f64::NAN,
                Some(x) if x.is_nan() => placeholder,
                Some(x) => *x,
            })
            .collect();
        Ok((encoded, Some((placeholder, PlaceholderMeaning::NanPayload))))
    }
}

/// Loose sentinel match: NaN placeholders match every NaN bit pattern.
fn matches_placeholder(value: f64, placeholder: f64) -> bool {
    if placeholder.is_nan() {
        value.is_nan()
    } else {
        value.to_bits() == placeholder.to_bits()
    }
}

/// Decode a stored float buffer (default mode).
///
/// Placeholder-equal values and *all* NaN payloads collapse to missing.
pub fn decode_numbers(encoded: &[f64], placeholder: Option<f64>) -> Vec<Option<f64>> {
    encoded
        .iter()
        .map(|v| {
            if v.is_nan() || placeholder.is_some_and(|p| matches_placeholder(*v, p)) {
                None
            } else {
                Some(*v)
            }
        })
        .collect()
}

/// Decode a stored float buffer, respecting NaN payloads.
pub fn decode_numbers_respecting(
    encoded: &[f64],
    placeholder: Option<(f64, PlaceholderMeaning)>,
) -> Vec<Option<f64>> {
    encoded
        .iter()
        .map(|v| match placeholder {
            Some((p, PlaceholderMeaning::Missing)) if matches_placeholder(*v, p) => None,
            Some((p, PlaceholderMeaning::NanPayload)) => {
                if matches_placeholder(*v, p) {
                    Some(f64::NAN)
                } else if v.is_nan() {
                    None
                } else {
                    Some(*v)
                }
            }
            _ => Some(*v),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Strings
// ---------------------------------------------------------------------------

/// Pick the missing-value string: `"NA"`, underscore-prefixed until unused.
pub fn choose_string_placeholder<'a, I>(present: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let used: HashSet<&str> = present.into_iter().collect();
    let mut candidate = String::from("NA");
    while used.contains(candidate.as_str()) {
        candidate.insert(0, '_');
    }
    candidate
}

/// Encode a string vector: missing elements become the placeholder.
pub fn transform_strings(values: &[Option<String>]) -> (Vec<String>, Option<String>) {
    let has_missing = values.iter().any(Option::is_none);
    if !has_missing {
        return (
            values.iter().map(|v| v.clone().unwrap_or_default()).collect(),
            None,
        );
    }
    let placeholder = choose_string_placeholder(values.iter().flatten().map(String::as_str));
    let encoded = values
        .iter()
        .map(|v| v.clone().unwrap_or_else(|| placeholder.clone()))
        .collect();
    (encoded, Some(placeholder))
}

/// Decode a stored string buffer: placeholder-equal entries become missing.
pub fn decode_strings(encoded: Vec<String>, placeholder: Option<&str>) -> Vec<Option<String>> {
    encoded
        .into_iter()
        .map(|v| match placeholder {
            Some(p) if v == p => None,
            _ => Some(v),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn small_data_picks_i8_min() {
        let (width, placeholder) = choose_integer_width(&[Some(1), None, Some(3)]).unwrap();
        assert_eq!(width, IntWidth::I8);
        assert_eq!(placeholder, Some(-128));
    }

    #[test]
    fn no_missing_reserves_no_placeholder() {
        let (width, placeholder) = choose_integer_width(&[Some(-128), Some(127)]).unwrap();
        assert_eq!(width, IntWidth::I8);
        assert_eq!(placeholder, None);
    }

    #[test]
    fn occupied_min_falls_back_to_max() {
        let (width, placeholder) =
            choose_integer_width(&[Some(-128), Some(0), None]).unwrap();
        assert_eq!(width, IntWidth::I8);
        assert_eq!(placeholder, Some(127));
    }

    #[test]
    fn both_extremes_occupied_widens() {
        let (width, placeholder) =
            choose_integer_width(&[Some(-128), Some(127), None]).unwrap();
        assert_eq!(width, IntWidth::I16);
        assert_eq!(placeholder, Some(i16::MIN as i64));
    }

    #[test]
    fn unsigned_width_used_for_byte_range() {
        let (width, placeholder) = choose_integer_width(&[Some(0), Some(200), None]).unwrap();
        assert_eq!(width, IntWidth::U8);
        // 0 occupies the minimum of U8, so the maximum serves as sentinel.
        assert_eq!(placeholder, Some(255));
    }

    #[test]
    fn full_i64_range_with_missing_has_no_placeholder() {
        let err =
            choose_integer_width(&[Some(i64::MIN), Some(i64::MAX), None]).unwrap_err();
        assert!(matches!(err, CodecError::NoIntegerPlaceholder));
    }

    #[test]
    fn all_missing_vector_uses_narrowest_width() {
        let (width, placeholder) = choose_integer_width(&[None, None]).unwrap();
        assert_eq!(width, IntWidth::I8);
        assert_eq!(placeholder, Some(-128));
    }

    #[test]
    fn integer_roundtrip() {
        let values = vec![Some(5), None, Some(-2), None];
        let (_, encoded, placeholder) = transform_integers(&values).unwrap();
        assert_eq!(decode_integers(&encoded, placeholder), values);
    }

    #[test]
    fn boolean_roundtrip() {
        let values = vec![Some(true), None, Some(false)];
        let (encoded, placeholder) = transform_booleans(&values);
        assert_eq!(encoded, vec![1, -1, 0]);
        let codes: Vec<i64> = encoded.iter().map(|v| *v as i64).collect();
        let decoded = decode_booleans(&codes, placeholder.map(|p| p as i64)).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn boolean_rejects_stray_codes() {
        let err = decode_booleans(&[0, 7], None).unwrap_err();
        assert!(matches!(err, CodecError::InvalidBooleanCode { index: 1, code: 7 }));
    }

    #[test]
    fn float_prefers_nan() {
        let placeholder = choose_float_placeholder(&[1.0, 2.0], None).unwrap();
        assert!(placeholder.is_nan());
    }

    #[test]
    fn float_avoids_present_nan() {
        let placeholder = choose_float_placeholder(&[1.0, f64::NAN], None).unwrap();
        assert_eq!(placeholder, f64::INFINITY);
    }

    #[test]
    fn float_walks_the_preference_order() {
        let placeholder =
            choose_float_placeholder(&[f64::NAN, f64::INFINITY, f64::NEG_INFINITY], None)
                .unwrap();
        assert_eq!(placeholder, f64::MIN);
    }

    #[test]
    fn float_fallback_is_consulted_last() {
        let data = [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, f64::MIN, f64::MAX];
        let fallback = |_: &[f64]| Some(123.25);
        let placeholder = choose_float_placeholder(&data, Some(&fallback)).unwrap();
        assert_eq!(placeholder, 123.25);
    }

    #[test]
    fn float_exhaustion_is_an_error() {
        let data = [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, f64::MIN, f64::MAX];
        let err = choose_float_placeholder(&data, None).unwrap_err();
        assert!(matches!(err, CodecError::NoFloatPlaceholder));
    }

    #[test]
    fn default_decode_collapses_nan_payloads() {
        let values = vec![Some(1.5), Some(f64::NAN), None, Some(2.6)];
        let (encoded, placeholder) = transform_numbers(&values, None).unwrap();
        // NaN occurs as data, so the sentinel must be something else.
        assert!(!placeholder.unwrap().is_nan());
        let decoded = decode_numbers(&encoded, placeholder);
        assert_eq!(decoded, vec![Some(1.5), None, None, Some(2.6)]);
    }

    #[test]
    fn respecting_mode_keeps_nan_and_missing_apart() {
        let values = vec![Some(1.5), Some(f64::NAN), None, Some(2.6)];
        let (encoded, placeholder) = transform_numbers_respecting(&values, None).unwrap();
        let (p, meaning) = placeholder.unwrap();
        assert!(!p.is_nan());
        assert_eq!(meaning, PlaceholderMeaning::Missing);
        let decoded = decode_numbers_respecting(&encoded, placeholder);
        assert_eq!(decoded.len(), 4);
        assert_eq!(decoded[0], Some(1.5));
        assert!(decoded[1].is_some_and(f64::is_nan));
        assert_eq!(decoded[2], None);
        assert_eq!(decoded[3], Some(2.6));
    }

    #[test]
    fn respecting_mode_swaps_when_nan_is_rarer() {
        // Two missing, one NaN payload: the NaN payload is rewritten.
        let values = vec![None, None, Some(f64::NAN), Some(9.0)];
        let (encoded, placeholder) = transform_numbers_respecting(&values, None).unwrap();
        let (p, meaning) = placeholder.unwrap();
        assert_eq!(meaning, PlaceholderMeaning::NanPayload);
        // Missing elements are stored as raw NaN, the payload as the sentinel.
        assert!(encoded[0].is_nan());
        assert!(encoded[1].is_nan());
        assert_eq!(encoded[2].to_bits(), p.to_bits());
        let decoded = decode_numbers_respecting(&encoded, placeholder);
        assert_eq!(decoded[0], None);
        assert_eq!(decoded[1], None);
        assert!(decoded[2].is_some_and(f64::is_nan));
        assert_eq!(decoded[3], Some(9.0));
    }

    #[test]
    fn string_placeholder_grows_underscores() {
        assert_eq!(choose_string_placeholder(["x", "y"]), "NA");
        assert_eq!(choose_string_placeholder(["NA"]), "_NA");
        assert_eq!(choose_string_placeholder(["NA", "_NA"]), "__NA");
    }

    #[test]
    fn string_roundtrip_with_collision() {
        let values = vec![Some("NA".to_string()), None, Some("x".to_string())];
        let (encoded, placeholder) = transform_strings(&values);
        assert_eq!(placeholder.as_deref(), Some("_NA"));
        let decoded = decode_strings(encoded, placeholder.as_deref());
        assert_eq!(decoded, values);
    }

    proptest! {
        #[test]
        fn integer_placeholder_never_collides(values in proptest::collection::vec(
            proptest::option::of(-5000i64..5000), 0..64
        )) {
            let (width, placeholder) = choose_integer_width(&values).unwrap();
            for v in values.iter().flatten() {
                prop_assert!(width.spans(*v, *v));
                if let Some(p) = placeholder {
                    prop_assert_ne!(*v, p);
                }
            }
        }

        #[test]
        fn integer_transform_roundtrips(values in proptest::collection::vec(
            proptest::option::of(any::<i32>().prop_map(i64::from)), 0..64
        )) {
            let (_, encoded, placeholder) = transform_integers(&values).unwrap();
            prop_assert_eq!(decode_integers(&encoded, placeholder), values);
        }

        #[test]
        fn string_placeholder_never_collides(values in proptest::collection::vec(
            proptest::option::of("[A-Za-z_]{0,6}"), 0..32
        )) {
            let (encoded, placeholder) = transform_strings(&values);
            if let Some(p) = &placeholder {
                for v in values.iter().flatten() {
                    prop_assert_ne!(v, p);
                }
            }
            prop_assert_eq!(decode_strings(encoded, placeholder.as_deref()), values);
        }

        #[test]
        fn finite_float_transform_roundtrips(values in proptest::collection::vec(
            proptest::option::of(-1e12f64..1e12), 0..64
        )) {
            let (encoded, placeholder) = transform_numbers(&values, None).unwrap();
            prop_assert_eq!(decode_numbers(&encoded, placeholder), values);
        }
    }
}
