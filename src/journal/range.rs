use crate::errors::{JournalError, JournalResult};
use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};

/// Inclusive calendar-day range on trade entry time. A missing bound is
/// unbounded on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> JournalResult<Self> {
        if let (Some(f), Some(t)) = (from, to) {
            if f > t {
                return Err(JournalError::Validation(format!(
                    "dateFrom ({f}) is after dateTo ({t})"
                )));
            }
        }
        Ok(Self { from, to })
    }

    pub fn year(year: i32) -> JournalResult<Self> {
        let from = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| JournalError::Validation(format!("invalid year: {year}")))?;
        let to = NaiveDate::from_ymd_opt(year, 12, 31)
            .ok_or_else(|| JournalError::Validation(format!("invalid year: {year}")))?;
        Ok(Self { from: Some(from), to: Some(to) })
    }

    pub fn current_year() -> Self {
        let year = Utc::now().year();
        // Jan 1 / Dec 31 of the current year always exist
        Self::year(year).unwrap_or_default()
    }

    /// Half-open instant bounds `[start, end)`: midnight UTC of `from`, and
    /// midnight UTC of the day after `to`.
    pub fn bounds(&self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        let start = self.from.map(midnight);
        let end = self
            .to
            .and_then(|d| d.checked_add_days(Days::new(1)))
            .map(midnight);
        (start, end)
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let (start, end) = self.bounds();
        start.map_or(true, |s| at >= s) && end.map_or(true, |e| at < e)
    }
}

fn midnight(d: NaiveDate) -> DateTime<Utc> {
    d.and_time(chrono::NaiveTime::MIN).and_utc()
}
