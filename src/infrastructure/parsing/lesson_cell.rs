//! Timetable cell extractor.
//!
//! Classifies one grid cell into its typed value: the `&nbsp;` idle marker,
//! a period index, a time range, or a list of parallel lesson records.

use regex::{Captures, Regex};
use tracing::warn;

use super::error::{ParseError, ParseResult};
use super::text::{clean_cell_text, normalize_subject};
use crate::domain::timetable::{Group, Lesson, LessonTime, TimeSpan};

/// Elective split codes for the five-way extension classes, indexed by the
/// 1-based group number printed in the cell.
const ELECTIVE_CODES: [&str; 5] = ["r-biol", "r-chem", "r-hist", "r-geo", "r-fiz"];

/// Corrected bell times for the post-noon periods.
///
/// The source page still prints minutes from before the bell-schedule
/// revision (breaks shortened from 10 to 5 minutes), so scraped values for
/// start hours 12-15 cannot be trusted and are replaced wholesale.
const TIME_CORRECTIONS: [(u8, TimeSpan); 4] = [
    (12, TimeSpan::new(LessonTime::new(12, 40), LessonTime::new(13, 25))),
    (13, TimeSpan::new(LessonTime::new(13, 35), LessonTime::new(14, 20))),
    (14, TimeSpan::new(LessonTime::new(14, 30), LessonTime::new(15, 15))),
    (15, TimeSpan::new(LessonTime::new(15, 25), LessonTime::new(16, 10))),
];

/// Typed value of one grid cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// The idle-slot placeholder: no lesson this period.
    Empty,
    /// Trailing integer from the period-index column.
    PeriodIndex(u32),
    /// Start/end pair from the time column.
    Hours(TimeSpan),
    /// Parallel lesson records from a weekday column.
    Lessons(Vec<Lesson>),
}

/// Extracts typed values from timetable grid cells.
pub struct CellExtractor {
    period_pattern: Regex,
    time_pattern: Regex,
    lesson_pattern: Regex,
}

impl CellExtractor {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            period_pattern: Regex::new(r"(\d+)\s*$")?,
            time_pattern: Regex::new(r"(\d{1,2})[.:](\d{2})\s*[-–]\s*(\d{1,2})[.:](\d{2})")?,
            lesson_pattern: Regex::new(
                r"(?P<subject>[\p{L}][\p{L}0-9._-]*?)(?:-(?P<idx>\d+)/(?P<card>\d+))?(?:\s+#(?P<code>\w+))?(?:\s+(?P<teacher>\p{Lu}{2}))?\s+(?P<room>\d{1,3}[a-z]?)",
            )?,
        })
    }

    /// Cell from the period-index column.
    pub fn period_index(&self, raw: &str) -> ParseResult<CellValue> {
        let text = clean_cell_text(raw);
        if text.is_empty() {
            return Ok(CellValue::Empty);
        }
        let caps = self
            .period_pattern
            .captures(&text)
            .ok_or_else(|| ParseError::anomaly("period-index cell", format!("'{text}'")))?;
        let index = caps[1]
            .parse::<u32>()
            .map_err(|e| ParseError::anomaly("period-index cell", format!("'{text}': {e}")))?;
        Ok(CellValue::PeriodIndex(index))
    }

    /// Cell from the time column, with the post-noon correction applied.
    pub fn hours(&self, raw: &str) -> ParseResult<CellValue> {
        let text = clean_cell_text(raw);
        if text.is_empty() {
            return Ok(CellValue::Empty);
        }
        let caps = self
            .time_pattern
            .captures(&text)
            .ok_or_else(|| ParseError::anomaly("time cell", format!("'{text}'")))?;
        let span = TimeSpan::new(
            LessonTime::new(time_component(&caps, 1)?, time_component(&caps, 2)?),
            LessonTime::new(time_component(&caps, 3)?, time_component(&caps, 4)?),
        );
        Ok(CellValue::Hours(correct_post_noon(span)))
    }

    /// Cell from a weekday column: zero or more parallel lesson records.
    pub fn lessons(&self, raw: &str) -> ParseResult<CellValue> {
        let text = clean_cell_text(raw);
        if text.is_empty() {
            return Ok(CellValue::Empty);
        }
        let mut records = Vec::new();
        for caps in self.lesson_pattern.captures_iter(&text) {
            let subject = normalize_subject(&caps["subject"]);
            let group = resolve_group(&caps, &subject);
            let mut lesson = Lesson::new(subject, group, &caps["room"]);
            if let Some(teacher) = caps.name("teacher") {
                lesson = lesson.with_teacher(teacher.as_str());
            }
            records.push(lesson);
        }
        if records.is_empty() {
            return Err(ParseError::anomaly(
                "lesson cell",
                format!("no lesson records in '{text}'"),
            ));
        }
        Ok(CellValue::Lessons(records))
    }
}

fn time_component(caps: &Captures<'_>, index: usize) -> ParseResult<u8> {
    caps[index]
        .parse::<u8>()
        .map_err(|e| ParseError::anomaly("time cell", format!("'{}': {e}", &caps[index])))
}

fn correct_post_noon(span: TimeSpan) -> TimeSpan {
    if span.start.hour < 12 {
        return span;
    }
    match TIME_CORRECTIONS
        .iter()
        .find(|(hour, _)| *hour == span.start.hour)
    {
        Some((_, fixed)) => *fixed,
        None => {
            warn!(
                "No corrected bell times for post-noon start hour {}, keeping scraped {}",
                span.start.hour, span
            );
            span
        }
    }
}

/// Group resolution, first matching rule wins: five-way elective split by
/// group index, explicit `#` tag, religion by subject, whole class.
fn resolve_group(caps: &Captures<'_>, subject: &str) -> Group {
    if let (Some(idx), Some(card)) = (caps.name("idx"), caps.name("card")) {
        if card.as_str() == "5" {
            let code = idx
                .as_str()
                .parse::<usize>()
                .ok()
                .and_then(|i| i.checked_sub(1))
                .and_then(|i| ELECTIVE_CODES.get(i));
            if let Some(code) = code {
                return Group::Code((*code).to_string());
            }
        }
    }
    if let Some(code) = caps.name("code") {
        return Group::Code(code.as_str().to_string());
    }
    if subject == Group::RELIGION {
        return Group::Code(Group::RELIGION.to_string());
    }
    Group::WholeClass
}
