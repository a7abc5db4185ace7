//! Read-only timetable lookup consumed by the substitution line parser.

use std::collections::HashMap;

use thiserror::Error;

use crate::domain::timetable::{Lesson, Timetable, Weekday};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// No timetable is known for the class.
    #[error("unknown class '{class}'")]
    UnknownClass { class: String },
}

/// Read-only view over the per-class timetables collected by the service.
///
/// The substitution line parser degrades to an empty lesson list when a
/// class is unknown; implementations must therefore report missing classes
/// through [`LookupError::UnknownClass`] rather than panicking.
pub trait TimetableLookup {
    /// Lessons normally scheduled for `class` on `weekday` in `period`.
    fn lookup(&self, class: &str, weekday: Weekday, period: u32)
    -> Result<Vec<Lesson>, LookupError>;
}

/// Lookup with no timetables behind it; every class is unknown.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTimetables;

impl TimetableLookup for NoTimetables {
    fn lookup(
        &self,
        class: &str,
        _weekday: Weekday,
        _period: u32,
    ) -> Result<Vec<Lesson>, LookupError> {
        Err(LookupError::UnknownClass {
            class: class.to_string(),
        })
    }
}

/// In-memory map of parsed timetables, as the scrape service maintains it.
impl TimetableLookup for HashMap<String, Timetable> {
    fn lookup(
        &self,
        class: &str,
        weekday: Weekday,
        period: u32,
    ) -> Result<Vec<Lesson>, LookupError> {
        let table = self.get(class).ok_or_else(|| LookupError::UnknownClass {
            class: class.to_string(),
        })?;
        Ok(table.lessons_at(weekday, period).to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::timetable::{Group, LessonTime, TimeSpan};

    #[test]
    fn map_lookup_reports_unknown_class() {
        let tables: HashMap<String, Timetable> = HashMap::new();
        let err = tables.lookup("2d", Weekday::Friday, 5).unwrap_err();
        assert_eq!(err, LookupError::UnknownClass { class: "2d".into() });
    }

    #[test]
    fn map_lookup_returns_scheduled_lessons() {
        let mut table = Timetable::default();
        table.periods = vec![5];
        table.hours = vec![TimeSpan::new(LessonTime::new(11, 35), LessonTime::new(12, 20))];
        table.weekdays.insert(
            Weekday::Friday,
            vec![vec![Lesson::new("j.angielski", Group::Code("A1".into()), "204")]],
        );
        let mut tables = HashMap::new();
        tables.insert("2d".to_string(), table);

        let lessons = tables.lookup("2d", Weekday::Friday, 5).unwrap();
        assert_eq!(lessons.len(), 1);
        assert_eq!(lessons[0].name, "j.angielski");
        assert!(tables.lookup("2d", Weekday::Monday, 5).unwrap().is_empty());
    }
}
