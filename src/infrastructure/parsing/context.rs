//! Parsing context objects.
//!
//! All state a parse call needs arrives through one of these; the parsers
//! themselves keep nothing between calls.

use chrono::NaiveDate;

/// Context for parsing one class timetable page.
#[derive(Debug, Clone)]
pub struct TimetableContext {
    /// Class code in timetable format (`2d`), used for log attribution.
    pub class: String,
}

impl TimetableContext {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
        }
    }
}

/// Context for parsing one substitutions bulletin page.
#[derive(Debug, Clone)]
pub struct PostContext {
    /// Where the document came from, used for log attribution.
    pub source: String,

    /// Reference date supplying the year for day-month date headers.
    pub today: NaiveDate,
}

impl PostContext {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            today: chrono::Local::now().date_naive(),
        }
    }

    /// Pin the reference date (tests, replayed snapshots).
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }
}
