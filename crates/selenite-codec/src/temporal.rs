use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat};

use crate::error::{CodecError, CodecResult};

/// Parse a calendar date in strict `YYYY-MM-DD` form.
///
/// Re-formats after parsing so lenient inputs such as `2021-1-1` are
/// rejected along with impossible dates.
pub fn validate_date(value: &str) -> CodecResult<NaiveDate> {
    let parsed = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| CodecError::BadDate {
        value: value.to_string(),
    })?;
    if parsed.format("%Y-%m-%d").to_string() != value {
        return Err(CodecError::BadDate {
            value: value.to_string(),
        });
    }
    Ok(parsed)
}

/// Parse an Internet-format (RFC 3339) timestamp, offset included.
pub fn validate_datetime(value: &str) -> CodecResult<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value).map_err(|err| CodecError::BadDateTime {
        value: value.to_string(),
        reason: err.to_string(),
    })
}

/// Normalize a timestamp to its canonical RFC 3339 rendering.
///
/// The instant and its offset are preserved, never converted; `Z` is
/// rewritten to the equivalent `+00:00`, the separator is an uppercase `T`,
/// and fractional seconds take the shortest exact form.
pub fn canonicalize_datetime(value: &str) -> CodecResult<String> {
    let parsed = validate_datetime(value)?;
    Ok(parsed.to_rfc3339_opts(SecondsFormat::AutoSi, false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_dates() {
        assert!(validate_date("2021-09-30").is_ok());
        assert!(validate_date("1999-01-01").is_ok());
    }

    #[test]
    fn rejects_sloppy_dates() {
        assert!(validate_date("2021-1-1").is_err());
        assert!(validate_date("2021-02-30").is_err());
        assert!(validate_date("not a date").is_err());
        assert!(validate_date("2021-09-30T00:00:00Z").is_err());
    }

    #[test]
    fn accepts_offsets_and_utc() {
        assert!(validate_datetime("2021-09-30T12:00:00Z").is_ok());
        assert!(validate_datetime("2021-09-30T12:00:00+05:30").is_ok());
        assert!(validate_datetime("2021-09-30T12:00:00.125-08:00").is_ok());
    }

    #[test]
    fn rejects_offsetless_timestamps() {
        assert!(validate_datetime("2021-09-30T12:00:00").is_err());
        assert!(validate_datetime("2021-09-30").is_err());
    }

    #[test]
    fn canonical_form_spells_out_utc() {
        assert_eq!(
            canonicalize_datetime("2021-09-30T12:00:00Z").unwrap(),
            "2021-09-30T12:00:00+00:00"
        );
    }

    #[test]
    fn canonical_form_keeps_nonzero_offsets() {
        assert_eq!(
            canonicalize_datetime("2021-09-30T12:00:00+05:30").unwrap(),
            "2021-09-30T12:00:00+05:30"
        );
    }
}
