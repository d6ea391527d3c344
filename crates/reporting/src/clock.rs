use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

/// The fixed UTC offset applied to order timestamps before truncating to a
/// calendar date for grouping.
///
/// The system this replaces baked `+07:00` into its aggregation query; here
/// the offset is explicit configuration (`REPORT_UTC_OFFSET` at the binary
/// edge) with the same default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportClock {
    offset: FixedOffset,
}

impl ReportClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Parse an offset of the form `+07:00` / `-03:30`.
    pub fn parse(s: &str) -> Option<Self> {
        s.parse::<FixedOffset>().ok().map(Self::new)
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// The report-local calendar date of a UTC instant.
    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }
}

impl Default for ReportClock {
    fn default() -> Self {
        // +07:00, matching the fixed offset of the original reports.
        Self::new(FixedOffset::east_opt(7 * 3600).expect("static offset is in range"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn default_is_plus_seven() {
        let clock = ReportClock::default();
        assert_eq!(clock.offset().local_minus_utc(), 7 * 3600);
    }

    #[test]
    fn late_utc_evening_rolls_into_next_local_day() {
        let clock = ReportClock::default();
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 18, 30, 0).unwrap();
        assert_eq!(
            clock.local_date(at),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
    }

    #[test]
    fn parse_accepts_signed_offsets() {
        assert_eq!(
            ReportClock::parse("+07:00"),
            Some(ReportClock::default())
        );
        let minus = ReportClock::parse("-03:30").unwrap();
        assert_eq!(minus.offset().local_minus_utc(), -(3 * 3600 + 1800));
        assert_eq!(ReportClock::parse("evening"), None);
    }
}
