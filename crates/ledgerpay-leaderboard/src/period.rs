//! Leaderboard period computation
//!
//! A period is a half-open `[start, end)` window of local-midnight
//! boundaries (except `all_time`, whose end runs a year past now). The
//! value object carries real datetimes; string dates only appear at the
//! serialisation edge.

use chrono::{DateTime, Datelike, Days, FixedOffset, Months, NaiveDate, Utc};

use ledgerpay_core::time::local_offset;
use ledgerpay_core::PeriodType;

/// Epoch of the `all_time` window.
const ALL_TIME_START: (i32, u32, u32) = (2020, 1, 1);

/// A concrete leaderboard window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaderboardPeriod {
    pub period_type: PeriodType,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

fn local_midnight(date: NaiveDate) -> DateTime<FixedOffset> {
    date.and_hms_opt(0, 0, 0)
        .and_then(|dt| dt.and_local_timezone(local_offset()).single())
        .expect("midnight exists for a fixed offset")
}

impl LeaderboardPeriod {
    /// The window containing the current instant.
    pub fn current(period_type: PeriodType) -> Self {
        Self::at(period_type, Utc::now())
    }

    /// The window containing `now`.
    pub fn at(period_type: PeriodType, now: DateTime<Utc>) -> Self {
        let local = now.with_timezone(&local_offset());
        let today = local.date_naive();

        let (start, end) = match period_type {
            PeriodType::Day => {
                let start = local_midnight(today);
                (start, start + chrono::Duration::days(1))
            }
            PeriodType::Week => {
                // ISO week, Monday first
                let days_from_monday = today.weekday().num_days_from_monday() as u64;
                let monday = today - Days::new(days_from_monday);
                let start = local_midnight(monday);
                (start, start + chrono::Duration::days(7))
            }
            PeriodType::Month => {
                let first = today.with_day(1).expect("day 1 exists in every month");
                let start = local_midnight(first);
                let next = first + Months::new(1);
                (start, local_midnight(next))
            }
            PeriodType::AllTime => {
                let (y, m, d) = ALL_TIME_START;
                let epoch = NaiveDate::from_ymd_opt(y, m, d).expect("valid epoch date");
                (local_midnight(epoch), local + Months::new(12))
            }
        };

        Self {
            period_type,
            start,
            end,
        }
    }

    pub fn start_utc(&self) -> DateTime<Utc> {
        self.start.with_timezone(&Utc)
    }

    pub fn end_utc(&self) -> DateTime<Utc> {
        self.end.with_timezone(&Utc)
    }

    /// Local calendar date of the period start, the aggregate/snapshot key.
    pub fn start_date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    /// Period start as `yyyymmdd`, used in cache keys.
    pub fn start_compact(&self) -> String {
        self.start.format("%Y%m%d").to_string()
    }

    /// Period start as `yyyy-mm-dd` for responses.
    pub fn start_string(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    /// Period end as `yyyy-mm-dd` for responses.
    pub fn end_string(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(period_type: PeriodType, y: i32, mo: u32, d: u32, h: u32) -> LeaderboardPeriod {
        LeaderboardPeriod::at(
            period_type,
            Utc.with_ymd_and_hms(y, mo, d, h, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_day_period() {
        // 2026-08-01 20:00 UTC is already Aug 2 in Shanghai
        let period = at(PeriodType::Day, 2026, 8, 1, 20);
        assert_eq!(period.start_string(), "2026-08-02");
        assert_eq!(period.end_string(), "2026-08-03");
        assert_eq!(period.start_compact(), "20260802");
        assert_eq!(period.end_utc() - period.start_utc(), chrono::Duration::days(1));
    }

    #[test]
    fn test_week_starts_monday() {
        // 2026-07-30 is a Thursday
        let period = at(PeriodType::Week, 2026, 7, 30, 10);
        assert_eq!(period.start_string(), "2026-07-27");
        assert_eq!(period.end_string(), "2026-08-03");
    }

    #[test]
    fn test_week_on_sunday_belongs_to_previous_monday() {
        // 2026-08-02 is a Sunday; the ISO week began on 07-27
        let period = at(PeriodType::Week, 2026, 8, 2, 4);
        assert_eq!(period.start_string(), "2026-07-27");
    }

    #[test]
    fn test_month_period() {
        let period = at(PeriodType::Month, 2026, 8, 15, 10);
        assert_eq!(period.start_string(), "2026-08-01");
        assert_eq!(period.end_string(), "2026-09-01");

        // December rolls into the next year
        let december = at(PeriodType::Month, 2026, 12, 5, 10);
        assert_eq!(december.start_string(), "2026-12-01");
        assert_eq!(december.end_string(), "2027-01-01");
    }

    #[test]
    fn test_all_time_period() {
        let period = at(PeriodType::AllTime, 2026, 8, 2, 10);
        assert_eq!(period.start_string(), "2020-01-01");
        // end runs a year past now
        assert_eq!(period.end.year(), 2027);
    }

    #[test]
    fn test_periods_are_half_open_and_contain_now() {
        let now = Utc.with_ymd_and_hms(2026, 8, 2, 10, 0, 0).unwrap();
        for period_type in PeriodType::ALL {
            let period = LeaderboardPeriod::at(period_type, now);
            assert!(period.start_utc() <= now, "{period_type}: start after now");
            assert!(now < period.end_utc(), "{period_type}: end not after now");
        }
    }
}
