//! Local-time helpers
//!
//! Day boundaries and leaderboard periods are computed in Asia/Shanghai,
//! never in UTC calendar dates. Shanghai has no daylight saving, so a fixed
//! +08:00 offset is exact.

use chrono::{DateTime, Datelike, FixedOffset, TimeZone, Utc};

/// IANA name of the platform's local timezone.
pub const LOCAL_TZ_NAME: &str = "Asia/Shanghai";

const LOCAL_OFFSET_SECS: i32 = 8 * 3600;

/// The fixed local offset (+08:00).
pub fn local_offset() -> FixedOffset {
    FixedOffset::east_opt(LOCAL_OFFSET_SECS).expect("+08:00 is a valid offset")
}

/// `[local midnight, local midnight + 24h)` containing `now`, as UTC
/// instants. This is the daily-limit window.
pub fn local_day_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let local = now.with_timezone(&local_offset());
    let start_local = local_offset()
        .with_ymd_and_hms(local.year(), local.month(), local.day(), 0, 0, 0)
        .single()
        .expect("local midnight exists for a fixed offset");
    let start = start_local.with_timezone(&Utc);
    (start, start + chrono::Duration::days(1))
}

/// The local calendar date of `now` as a `yyyymmdd` number, used to key the
/// per-payer-per-day advisory lock.
pub fn local_date_number(now: DateTime<Utc>) -> i64 {
    let local = now.with_timezone(&local_offset());
    local.year() as i64 * 10_000 + local.month() as i64 * 100 + local.day() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_day_bounds_cross_midnight() {
        // 2026-08-01 20:00 UTC is 2026-08-02 04:00 in Shanghai
        let (start, end) = local_day_bounds(utc(2026, 8, 1, 20, 0));
        assert_eq!(start, utc(2026, 8, 1, 16, 0));
        assert_eq!(end, utc(2026, 8, 2, 16, 0));
    }

    #[test]
    fn test_day_bounds_same_date() {
        let (start, end) = local_day_bounds(utc(2026, 8, 2, 3, 30));
        assert_eq!(start, utc(2026, 8, 1, 16, 0));
        assert_eq!(end - start, chrono::Duration::days(1));
    }

    #[test]
    fn test_local_date_number() {
        // still Aug 1 in UTC, already Aug 2 locally
        assert_eq!(local_date_number(utc(2026, 8, 1, 20, 0)), 2026_08_02);
        assert_eq!(local_date_number(utc(2026, 8, 2, 3, 0)), 2026_08_02);
    }

    #[test]
    fn test_local_date_matches_chrono() {
        let now = utc(2026, 2, 28, 17, 0); // Mar 1 locally
        let local_date = now.with_timezone(&local_offset()).date_naive();
        assert_eq!(local_date, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        assert_eq!(local_date_number(now), 2026_03_01);
    }
}
