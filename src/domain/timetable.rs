//! Timetable data model.
//!
//! The standing weekly schedule of one class: weekday columns holding an
//! ordered sequence of period slots, each slot a list of lessons running in
//! parallel for different class groups, plus the two administrative columns
//! (period index and time window) the source page prints alongside them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// School weekday, in the column order of the source page.
///
/// Serialized with the Polish header names so cached snapshots use the page
/// vocabulary. The derived `Ord` follows document order, which keeps
/// `BTreeMap<Weekday, _>` iteration aligned with the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Weekday {
    #[serde(rename = "poniedziałek")]
    Monday,
    #[serde(rename = "wtorek")]
    Tuesday,
    #[serde(rename = "środa")]
    Wednesday,
    #[serde(rename = "czwartek")]
    Thursday,
    #[serde(rename = "piątek")]
    Friday,
}

impl Weekday {
    pub const ALL: [Self; 5] = [
        Self::Monday,
        Self::Tuesday,
        Self::Wednesday,
        Self::Thursday,
        Self::Friday,
    ];

    /// Match a scraped column header against the known weekday names.
    pub fn from_header(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "poniedziałek" => Some(Self::Monday),
            "wtorek" => Some(Self::Tuesday),
            "środa" => Some(Self::Wednesday),
            "czwartek" => Some(Self::Thursday),
            "piątek" => Some(Self::Friday),
            _ => None,
        }
    }

    /// Weekday of a calendar date. Weekend dates clamp to Monday; the source
    /// documents only ever describe school days.
    pub fn from_date(date: chrono::NaiveDate) -> Self {
        use chrono::Datelike;
        match date.weekday() {
            chrono::Weekday::Mon => Self::Monday,
            chrono::Weekday::Tue => Self::Tuesday,
            chrono::Weekday::Wed => Self::Wednesday,
            chrono::Weekday::Thu => Self::Thursday,
            chrono::Weekday::Fri => Self::Friday,
            chrono::Weekday::Sat | chrono::Weekday::Sun => Self::Monday,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Monday => "poniedziałek",
            Self::Tuesday => "wtorek",
            Self::Wednesday => "środa",
            Self::Thursday => "czwartek",
            Self::Friday => "piątek",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Wall-clock time of a period boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonTime {
    pub hour: u8,
    pub minute: u8,
}

impl LessonTime {
    pub const fn new(hour: u8, minute: u8) -> Self {
        Self { hour, minute }
    }
}

impl fmt::Display for LessonTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}", self.hour, self.minute)
    }
}

/// Start and end of one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSpan {
    pub start: LessonTime,
    pub end: LessonTime,
}

impl TimeSpan {
    pub const fn new(start: LessonTime, end: LessonTime) -> Self {
        Self { start, end }
    }
}

impl fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Which part of the class a lesson applies to.
///
/// Serialized as a plain string: the whole-class sentinel `wszyscy`, or a
/// specific group code (`r-biol`, `religia`, a `#`-tag code, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Group {
    /// The whole class attends.
    WholeClass,
    /// A named subgroup: an elective split, a language group, religion.
    Code(String),
}

impl Group {
    /// Sentinel string the whole-class variant serializes to.
    pub const WHOLE_CLASS: &'static str = "wszyscy";

    /// Group code assigned to religion lessons.
    pub const RELIGION: &'static str = "religia";

    pub fn from_code(code: impl Into<String>) -> Self {
        let code = code.into();
        if code == Self::WHOLE_CLASS {
            Self::WholeClass
        } else {
            Self::Code(code)
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::WholeClass => Self::WHOLE_CLASS,
            Self::Code(code) => code,
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Serialize for Group {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for Group {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::from_code(String::deserialize(deserializer)?))
    }
}

/// One lesson occupying a (weekday, period) slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    /// Normalized subject code.
    pub name: String,
    /// Subgroup the lesson applies to.
    pub group: Group,
    /// Room identifier as printed on the page.
    pub room_id: String,
    /// Short teacher code, when the cell carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub teacher: Option<String>,
}

impl Lesson {
    pub fn new(name: impl Into<String>, group: Group, room_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group,
            room_id: room_id.into(),
            teacher: None,
        }
    }

    pub fn with_teacher(mut self, teacher: impl Into<String>) -> Self {
        self.teacher = Some(teacher.into());
        self
    }
}

/// The standing weekly schedule of one class.
///
/// Rebuilt wholesale on every scrape and consumed read-only afterwards.
/// Invariant (after assembly): `hours.len() == periods.len()` and every
/// weekday column holds exactly `periods.len()` slots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timetable {
    /// Period indices from the administrative "Nr" column.
    pub periods: Vec<u32>,
    /// Period time windows from the administrative "Godz" column.
    pub hours: Vec<TimeSpan>,
    /// Weekday columns, each an ordered sequence of period slots.
    pub weekdays: BTreeMap<Weekday, Vec<Vec<Lesson>>>,
}

impl Timetable {
    /// True when parsing found no usable grid on the page.
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty() && self.weekdays.is_empty()
    }

    /// Lessons scheduled for a weekday and period.
    ///
    /// An absent weekday or period slot means "no data" and yields an empty
    /// slice, never an error.
    pub fn lessons_at(&self, weekday: Weekday, period: u32) -> &[Lesson] {
        let Some(pos) = self.periods.iter().position(|&p| p == period) else {
            return &[];
        };
        self.weekdays
            .get(&weekday)
            .and_then(|slots| slots.get(pos))
            .map_or(&[], Vec::as_slice)
    }
}
