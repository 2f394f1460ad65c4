use crate::error::{CodecError, CodecResult};

/// Widen logical 32-bit integers to the storage representation.
pub fn ints_to_raw(values: &[Option<i32>]) -> Vec<Option<i64>> {
    values.iter().map(|v| v.map(i64::from)).collect()
}

/// Narrow stored integers back to the logical 32-bit type.
///
/// A stored value outside `i32` range is a coercion failure, not a silent
/// widen and not a new missing value.
pub fn raw_to_ints(values: Vec<Option<i64>>) -> CodecResult<Vec<Option<i32>>> {
    values
        .into_iter()
        .enumerate()
        .map(|(index, v)| match v {
            None => Ok(None),
            Some(x) => i32::try_from(x)
                .map(Some)
                .map_err(|_| CodecError::IntegerOutOfRange { index, value: x }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widen_and_narrow_are_inverse() {
        let logical = vec![Some(1), None, Some(-7), Some(i32::MAX)];
        let raw = ints_to_raw(&logical);
        assert_eq!(raw_to_ints(raw).unwrap(), logical);
    }

    #[test]
    fn narrowing_rejects_out_of_range() {
        let err = raw_to_ints(vec![Some(0), Some(i32::MAX as i64 + 1)]).unwrap_err();
        assert!(matches!(
            err,
            CodecError::IntegerOutOfRange { index: 1, value } if value == i32::MAX as i64 + 1
        ));
    }
}
