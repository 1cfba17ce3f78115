//! calendar.rs
//!
//! Date handling for the yearly report:
//!   • the report period (target year plus the instant it is computed at)
//!   • the fixed Monday-first weekday order used by every histogram
//!   • unfolding GitHub's weekly commit buckets into calendar dates
//!
//! Everything is interpreted in UTC. GitHub's commit-activity weeks start on
//! Sunday 00:00 UTC and list one count per day, Sunday first.

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, TimeZone, Utc, Weekday};

/// Histogram order, Monday first.
pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Length of the trailing window used when listing issue comments.
const COMMENT_WINDOW_DAYS: i64 = 365;

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// The year being reported on, and the instant the report is computed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportPeriod {
    year: i32,
    as_of: DateTime<Utc>,
}

impl ReportPeriod {
    pub fn new(year: i32, as_of: DateTime<Utc>) -> Self {
        Self { year, as_of }
    }

    /// The current UTC year, as of now.
    pub fn current() -> Self {
        let now = Utc::now();
        Self::new(now.year(), now)
    }

    /// A whole year seen from its last second. Returns `None` for years chrono
    /// cannot represent.
    pub fn for_year(year: i32) -> Option<Self> {
        let as_of = Utc.with_ymd_and_hms(year, 12, 31, 23, 59, 59).single()?;
        Some(Self::new(year, as_of))
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn as_of(&self) -> DateTime<Utc> {
        self.as_of
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year
    }

    /// Lower bound for the issue-comment listing.
    pub fn comments_since(&self) -> DateTime<Utc> {
        self.as_of - Duration::days(COMMENT_WINDOW_DAYS)
    }
}

/// Calendar date of day `day_index` (0 = Sunday) in the week starting at
/// `week_start` seconds since the epoch.
pub fn week_day_date(week_start: i64, day_index: usize) -> Option<NaiveDate> {
    let start = DateTime::from_timestamp(week_start, 0)?.date_naive();
    start.checked_add_days(Days::new(day_index as u64))
}

/// Event counts per weekday. Always holds all seven days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DailyBucket([u64; 7]);

impl DailyBucket {
    pub fn record(&mut self, day: Weekday, count: u64) {
        let slot = &mut self.0[day.num_days_from_monday() as usize];
        *slot = slot.saturating_add(count);
    }

    pub fn record_date(&mut self, date: NaiveDate, count: u64) {
        self.record(date.weekday(), count);
    }

    pub fn get(&self, day: Weekday) -> u64 {
        self.0[day.num_days_from_monday() as usize]
    }

    pub fn merge(&mut self, other: &DailyBucket) {
        for day in WEEKDAYS {
            self.record(day, other.get(day));
        }
    }

    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }

    /// Days in histogram order, zero days included.
    pub fn iter(&self) -> impl Iterator<Item = (Weekday, u64)> + '_ {
        WEEKDAYS.iter().map(move |day| (*day, self.get(*day)))
    }
}
