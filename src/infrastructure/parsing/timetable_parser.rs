//! Timetable grid parser.
//!
//! The timetable page carries the lesson grid as the 3rd `<table>` in
//! document order. That ordinal is a fixed assumption about the source
//! layout, not detected semantically; a page without it parses to an empty
//! timetable rather than an error.

use std::collections::BTreeMap;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::context::TimetableContext;
use super::error::ParseResult;
use super::lesson_cell::{CellExtractor, CellValue};
use super::text::clean_cell_text;
use super::{compile_selector, DocumentParser};
use crate::domain::timetable::{Lesson, LessonTime, TimeSpan, Timetable, Weekday};

/// Document-order index of the lesson grid on the timetable page.
const GRID_TABLE_INDEX: usize = 2;

/// The school runs one final period the page does not list.
const FINAL_PERIOD_HOURS: TimeSpan = TimeSpan::new(LessonTime::new(16, 15), LessonTime::new(17, 0));

/// Role of one grid column, read off the header row.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ColumnKind {
    PeriodIndex,
    Hours,
    Weekday(Weekday),
    Skipped,
}

/// Parser for the weekly lesson grid of one class.
pub struct TimetableParser {
    table_selector: Selector,
    row_selector: Selector,
    cell_selector: Selector,
    extractor: CellExtractor,
}

impl TimetableParser {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            table_selector: compile_selector("table")?,
            row_selector: compile_selector("tr")?,
            cell_selector: compile_selector("th, td")?,
            extractor: CellExtractor::new()?,
        })
    }

    /// Header cells name the columns: `Nr`, a `Godz...` time column, and
    /// the weekday names. Anything else is skipped with a warning, as is a
    /// repeated weekday.
    fn classify_headers(
        &self,
        header_row: &ElementRef<'_>,
        context: &TimetableContext,
    ) -> Vec<ColumnKind> {
        let mut columns = Vec::new();
        let mut seen_days: Vec<Weekday> = Vec::new();
        for cell in header_row.select(&self.cell_selector) {
            let text = clean_cell_text(&cell_text(&cell));
            let lowered = text.to_lowercase();
            let kind = if lowered == "nr" {
                ColumnKind::PeriodIndex
            } else if lowered.starts_with("godz") {
                ColumnKind::Hours
            } else if let Some(day) = Weekday::from_header(&text) {
                if seen_days.contains(&day) {
                    warn!(
                        "Duplicate {} column in the timetable header for {}, skipping the repeat",
                        day, context.class
                    );
                    ColumnKind::Skipped
                } else {
                    seen_days.push(day);
                    ColumnKind::Weekday(day)
                }
            } else {
                warn!(
                    "Unrecognized timetable column '{}' for {}, skipping it",
                    text, context.class
                );
                ColumnKind::Skipped
            };
            columns.push(kind);
        }
        columns
    }

    /// Fold one period row into the timetable. Damaged cells degrade
    /// locally: a bad weekday cell leaves that slot empty, a missing period
    /// index continues the sequence, and a row without a usable time cell
    /// is dropped whole.
    fn fold_row(
        &self,
        timetable: &mut Timetable,
        columns: &[ColumnKind],
        row_index: usize,
        row: &ElementRef<'_>,
        context: &TimetableContext,
    ) {
        let cells: Vec<ElementRef<'_>> = row.select(&self.cell_selector).collect();
        if cells.len() > columns.len() {
            debug!(
                "Row {} for {} has {} surplus cells, ignoring them",
                row_index,
                context.class,
                cells.len() - columns.len()
            );
        } else if cells.len() < columns.len() {
            debug!(
                "Row {} for {} is short: {} cells for {} columns",
                row_index,
                context.class,
                cells.len(),
                columns.len()
            );
        }

        let mut period: Option<u32> = None;
        let mut span: Option<TimeSpan> = None;
        let mut by_day: BTreeMap<Weekday, Vec<Lesson>> = BTreeMap::new();

        for (kind, cell) in columns.iter().zip(cells.iter()) {
            let raw = cell_text(cell);
            match kind {
                ColumnKind::PeriodIndex => match self.extractor.period_index(&raw) {
                    Ok(CellValue::PeriodIndex(index)) => period = Some(index),
                    Ok(_) => {}
                    Err(e) => warn!(
                        "Unusable period index in row {} for {}: {}",
                        row_index, context.class, e
                    ),
                },
                ColumnKind::Hours => match self.extractor.hours(&raw) {
                    Ok(CellValue::Hours(hours)) => span = Some(hours),
                    Ok(_) => {}
                    Err(e) => warn!(
                        "Unusable time cell in row {} for {}: {}",
                        row_index, context.class, e
                    ),
                },
                ColumnKind::Weekday(day) => match self.extractor.lessons(&raw) {
                    Ok(CellValue::Lessons(lessons)) => {
                        by_day.insert(*day, lessons);
                    }
                    Ok(_) => {}
                    Err(e) => warn!(
                        "Leaving {} slot of row {} for {} empty: {}",
                        day, row_index, context.class, e
                    ),
                },
                ColumnKind::Skipped => {}
            }
        }

        let Some(span) = span else {
            warn!(
                "Dropping row {} for {}: no usable time cell",
                row_index, context.class
            );
            return;
        };
        let period = period.unwrap_or_else(|| {
            let next = timetable.periods.last().copied().unwrap_or(0) + 1;
            warn!(
                "Row {} for {} has no usable period index, continuing with {}",
                row_index, context.class, next
            );
            next
        });

        timetable.periods.push(period);
        timetable.hours.push(span);
        for kind in columns {
            if let ColumnKind::Weekday(day) = kind {
                let slot = by_day.remove(day).unwrap_or_default();
                if let Some(slots) = timetable.weekdays.get_mut(day) {
                    slots.push(slot);
                }
            }
        }
    }
}

impl DocumentParser for TimetableParser {
    type Output = Timetable;
    type Context = TimetableContext;

    fn parse_with_context(
        &self,
        html: &Html,
        context: &TimetableContext,
    ) -> ParseResult<Timetable> {
        let tables: Vec<ElementRef<'_>> = html.select(&self.table_selector).collect();
        let Some(grid) = tables.get(GRID_TABLE_INDEX) else {
            warn!(
                "Timetable page for {} has {} tables, the grid is expected as table {}; returning an empty timetable",
                context.class,
                tables.len(),
                GRID_TABLE_INDEX + 1
            );
            return Ok(Timetable::default());
        };

        let mut rows = grid.select(&self.row_selector);
        let Some(header_row) = rows.next() else {
            warn!(
                "Timetable grid for {} has no rows; returning an empty timetable",
                context.class
            );
            return Ok(Timetable::default());
        };

        let columns = self.classify_headers(&header_row, context);
        if !columns
            .iter()
            .any(|kind| matches!(kind, ColumnKind::Weekday(_)))
        {
            warn!(
                "Timetable grid for {} has no recognizable weekday columns; returning an empty timetable",
                context.class
            );
            return Ok(Timetable::default());
        }

        let mut timetable = Timetable::default();
        for kind in &columns {
            if let ColumnKind::Weekday(day) = kind {
                timetable.weekdays.entry(*day).or_default();
            }
        }

        for (row_index, row) in rows.enumerate() {
            self.fold_row(&mut timetable, &columns, row_index, &row, context);
        }

        if timetable.periods.is_empty() {
            warn!(
                "Timetable grid for {} has a header but no period rows",
                context.class
            );
            return Ok(Timetable::default());
        }

        append_final_period(&mut timetable);
        debug!(
            "Parsed timetable for {}: {} periods across {} weekdays",
            context.class,
            timetable.periods.len(),
            timetable.weekdays.len()
        );
        Ok(timetable)
    }
}

/// Append the unlisted final school period: the next free index with its
/// fixed window, plus one idle slot per weekday to keep columns equal.
fn append_final_period(timetable: &mut Timetable) {
    let next = timetable.periods.iter().max().copied().unwrap_or(0) + 1;
    timetable.periods.push(next);
    timetable.hours.push(FINAL_PERIOD_HOURS);
    for slots in timetable.weekdays.values_mut() {
        slots.push(Vec::new());
    }
}

/// Flattened cell text. Text nodes split by `<br>` inside a cell must stay
/// whitespace-separated or adjacent lesson records would fuse.
fn cell_text(cell: &ElementRef<'_>) -> String {
    cell.text().collect::<Vec<_>>().join(" ")
}
