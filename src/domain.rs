//! Domain module - Core school-data entities and rules
//!
//! This module contains the typed records the parsers produce (timetables,
//! substitution posts) together with the pure rules that operate on them:
//! class code formatting and timetable lookup.
//!
//! Modern Rust module organization (Rust 2018+ style):
//! - Each module is its own file in the domain/ directory
//! - Public exports are defined here for convenience

pub mod class_code;
pub mod lookup;
pub mod substitutions;
pub mod timetable;

// Re-export commonly used items for convenience
// Note: Be specific about re-exports to avoid ambiguous glob warnings
pub use class_code::{format_class, format_class_reverse};
pub use lookup::{LookupError, NoTimetables, TimetableLookup};
pub use substitutions::{
    ClassSubstitutions, EventTable, ShapeError, Substitution, SubstitutionsPost,
};
pub use timetable::{Group, Lesson, LessonTime, TimeSpan, Timetable, Weekday};
