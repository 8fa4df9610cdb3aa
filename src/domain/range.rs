// Inclusive calendar date range driving day enumeration
use chrono::{Days, NaiveDate, Utc};

/// An inclusive pair of calendar days. Construction enforces
/// `start <= end`; time-of-day never enters the picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        if start <= end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// The range ending today and starting `days - 1` calendar days
    /// earlier, i.e. the dashboard's default last-week view for
    /// `days = 7`.
    pub fn trailing_days(days: u64) -> Self {
        let end = Utc::now().date_naive();
        let start = end
            .checked_sub_days(Days::new(days.saturating_sub(1)))
            .unwrap_or(end);
        Self { start, end }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Every calendar day from start to end, inclusive.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(|day| *day <= self.end)
    }

    /// Number of calendar days covered, inclusive of both ends.
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_enumerates_inclusive_days() {
        let range = DateRange::new(date(2024, 1, 30), date(2024, 2, 2)).unwrap();
        let days: Vec<NaiveDate> = range.days().collect();
        assert_eq!(
            days,
            vec![
                date(2024, 1, 30),
                date(2024, 1, 31),
                date(2024, 2, 1),
                date(2024, 2, 2),
            ]
        );
        assert_eq!(range.span_days(), 4);
    }

    #[test]
    fn test_single_day_range() {
        let range = DateRange::new(date(2024, 6, 15), date(2024, 6, 15)).unwrap();
        assert_eq!(range.days().count(), 1);
        assert_eq!(range.span_days(), 1);
    }

    #[test]
    fn test_rejects_reversed_bounds() {
        assert!(DateRange::new(date(2024, 6, 16), date(2024, 6, 15)).is_none());
    }

    #[test]
    fn test_trailing_days_spans_requested_count() {
        let range = DateRange::trailing_days(7);
        assert_eq!(range.span_days(), 7);
        assert_eq!(range.end(), Utc::now().date_naive());
    }
}
