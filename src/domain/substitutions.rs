//! Substitutions bulletin data model.
//!
//! One parsed bulletin post: the date header, absent-teacher list, event and
//! informational lines, cancellation notices, embedded event tables, and the
//! per-period substitution records cross-referenced against the timetable.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::timetable::Lesson;

/// Ad hoc school-event table embedded in the bulletin.
///
/// Column-oriented: `columns.len() == headings.len()` and every column holds
/// one value per table row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventTable {
    pub title: String,
    pub headings: Vec<String>,
    pub columns: Vec<Vec<String>>,
}

impl EventTable {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// One substitution notice applying to a class within a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Substitution {
    /// Free-text detail of the substitution.
    pub details: String,
    /// Named sub-groups the notice is scoped to, when the line carries any.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub groups: Option<Vec<String>>,
}

/// Substitution information for one class within one period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassSubstitutions {
    /// Lessons the class would normally have in this period, looked up from
    /// its timetable; empty when the class has no known timetable.
    pub substituted_lessons: Vec<Lesson>,
    pub substitutions: Vec<Substitution>,
}

/// Structured payload recorded when the bulletin's shape deviates from the
/// known layout and the walk stops early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeError {
    pub kind: String,
    pub message: String,
}

impl ShapeError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// One parsed substitutions bulletin post.
///
/// Collector vectors keep document order; `lessons` is keyed by period
/// (ascending, stringified by the JSON layer) then by class name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubstitutionsPost {
    /// HTML attributes of the post container element.
    pub attributes: BTreeMap<String, String>,
    /// Date the bulletin applies to, taken from the date header.
    pub date: Option<NaiveDate>,
    /// Absent teachers named by the teacher-list header.
    pub teachers: Vec<String>,
    /// School events announced after the teacher list.
    pub events: Vec<String>,
    /// Informational lines that fit no other collector.
    pub misc: Vec<String>,
    /// Cancellation notices.
    pub cancelled: Vec<String>,
    /// Event tables, each with the title discovered before it.
    pub tables: Vec<EventTable>,
    /// period → class name → substitution record.
    pub lessons: BTreeMap<u32, BTreeMap<String, ClassSubstitutions>>,
    /// Set when the document shape deviated and the walk stopped early; the
    /// other fields then hold whatever was collected up to that point.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub error: Option<ShapeError>,
}

impl SubstitutionsPost {
    /// Record for a (period, class) pair, created on first use.
    pub fn class_entry(&mut self, period: u32, class: &str) -> &mut ClassSubstitutions {
        self.lessons
            .entry(period)
            .or_default()
            .entry(class.to_string())
            .or_default()
    }

    /// True when the walk stopped early and only partial data is present.
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}
