//! Timestamp helpers for the store layer.

use chrono::{DateTime, FixedOffset, Utc};

/// Current instant as a UTC `DateTime<FixedOffset>`, the type SeaORM maps
/// `TIMESTAMP WITH TIME ZONE` columns to.
pub fn now_fixed() -> DateTime<FixedOffset> {
    utc_to_fixed_offset(&Utc::now())
}

pub fn utc_to_fixed_offset(utc_dt: &DateTime<Utc>) -> DateTime<FixedOffset> {
    utc_dt.fixed_offset()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_utc_to_fixed_offset_keeps_instant() {
        let utc = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

        let fixed = utc_to_fixed_offset(&utc);

        assert_eq!(fixed.offset().local_minus_utc(), 0);
        assert_eq!(fixed.timestamp(), 1_700_000_000);
    }
}
