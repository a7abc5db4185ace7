//! Substitutions bulletin parser.
//!
//! The bulletin is a sequence of loosely-structured paragraphs and tables
//! inside one post container. The walker visits the container's direct
//! children in document order with one-sibling lookahead, classifies each
//! into a [`NodeKind`], and routes it to the matching collector. A node the
//! layout does not account for stops the walk; the partial result is
//! returned with its `error` field set instead of crashing service mode.

use chrono::{Datelike, NaiveDate};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::context::PostContext;
use super::error::{ParseError, ParseResult};
use super::substitution_line::{LineOutcome, SubstitutionLine, SubstitutionLineParser};
use super::text::{clean_cell_text, is_all_uppercase};
use super::{compile_selectors, DocumentParser};
use crate::domain::lookup::{LookupError, TimetableLookup};
use crate::domain::substitutions::{EventTable, Substitution, SubstitutionsPost};
use crate::domain::timetable::Weekday;

/// Cancellation notice spellings used by the site.
const CANCELLED_PREFIX: &str = "Odwołane lekcje";
const CANCELLED_PHRASE: &str = "są odwołane";

/// Prefix of the bulletin's date header.
const DATE_HEADER_PREFIX: &str = "Zastępstwa";

/// Title for a table that appears without any preceding title paragraph.
const NO_TABLE_HEADER: &str = "[no table header]";

/// Container selectors tried in order when none are configured.
pub const DEFAULT_CONTAINER_SELECTORS: [&str; 2] = ["div.post-content", "div.entry-content"];

/// Classification of one direct child of the post container.
#[derive(Debug, Clone)]
enum NodeKind<'a> {
    DateHeader(NaiveDate),
    TeacherList(Vec<String>),
    Event(String),
    Misc(String),
    TableTitle(String),
    Table(ElementRef<'a>),
    Cancellation(String),
    Line(String),
    Blank,
}

/// Mutable walk state threaded through classification and routing.
#[derive(Debug, Default)]
struct WalkState {
    /// A teacher-list header was already routed; later plain centered
    /// headers are school events.
    teachers_seen: bool,
    /// Index into `post.tables` of a title still waiting for its table.
    open_table: Option<usize>,
}

/// Parser for the substitutions bulletin post.
///
/// Holds a read-only view of the per-class timetables so substitution lines
/// can be cross-referenced against the regular schedule.
pub struct SubstitutionsParser<'t> {
    container_selectors: Vec<Selector>,
    row_selector: Selector,
    cell_selector: Selector,
    line_parser: SubstitutionLineParser,
    lookup: &'t dyn TimetableLookup,
}

impl<'t> SubstitutionsParser<'t> {
    pub fn new(lookup: &'t dyn TimetableLookup) -> anyhow::Result<Self> {
        let defaults: Vec<String> = DEFAULT_CONTAINER_SELECTORS
            .iter()
            .map(|s| (*s).to_string())
            .collect();
        Self::with_selectors(&defaults, lookup)
    }

    /// Build with configured container selectors (fallbacks tried in order).
    pub fn with_selectors(
        selectors: &[String],
        lookup: &'t dyn TimetableLookup,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            container_selectors: compile_selectors(selectors)?,
            row_selector: super::compile_selector("tr")?,
            cell_selector: super::compile_selector("th, td")?,
            line_parser: SubstitutionLineParser::new()?,
            lookup,
        })
    }

    /// Service-mode entry point: never propagates. A shape mismatch is
    /// embedded into the result's `error` field next to the partial data.
    pub fn parse_post(&self, html: &Html, context: &PostContext) -> SubstitutionsPost {
        match self.walk(html, context) {
            (post, None) => post,
            (mut post, Some(err)) => {
                warn!(
                    "Bulletin walk for {} stopped early: {}; returning partial data",
                    context.source, err
                );
                post.error = Some(err.to_shape_error());
                post
            }
        }
    }

    /// Strict entry point for interactive and debug use.
    pub fn try_parse_post(
        &self,
        html: &Html,
        context: &PostContext,
    ) -> ParseResult<SubstitutionsPost> {
        match self.walk(html, context) {
            (post, None) => Ok(post),
            (_, Some(err)) => Err(err),
        }
    }

    fn walk(&self, html: &Html, context: &PostContext) -> (SubstitutionsPost, Option<ParseError>) {
        let mut post = SubstitutionsPost::default();
        let Some(container) = self.find_container(html) else {
            return (
                post,
                Some(ParseError::shape(
                    "missing-container",
                    format!("no post container found in {}", context.source),
                )),
            );
        };
        for (name, value) in container.value().attrs() {
            post.attributes.insert(name.to_string(), value.to_string());
        }

        let mut state = WalkState::default();
        for child in container.children() {
            let Some(element) = ElementRef::wrap(child) else {
                continue;
            };
            let kind = match self.classify(&element, &state, context) {
                Ok(kind) => kind,
                Err(err) => return (post, Some(err)),
            };
            if let Err(err) = self.route(kind, &mut post, &mut state, context) {
                if err.is_recoverable() {
                    warn!("Skipping bulletin line for {}: {}", context.source, err);
                } else {
                    return (post, Some(err));
                }
            }
        }
        (post, None)
    }

    fn find_container<'a>(&self, html: &'a Html) -> Option<ElementRef<'a>> {
        self.container_selectors
            .iter()
            .find_map(|selector| html.select(selector).next())
    }

    fn classify<'a>(
        &self,
        element: &ElementRef<'a>,
        state: &WalkState,
        context: &PostContext,
    ) -> ParseResult<NodeKind<'a>> {
        match element.value().name() {
            "p" => self.classify_paragraph(element, state, context),
            "table" => Ok(NodeKind::Table(*element)),
            "br" | "hr" => Ok(NodeKind::Blank),
            other => Err(ParseError::shape(
                "unexpected-node",
                format!("unsupported <{other}> element in the post body"),
            )),
        }
    }

    fn classify_paragraph<'a>(
        &self,
        element: &ElementRef<'a>,
        state: &WalkState,
        context: &PostContext,
    ) -> ParseResult<NodeKind<'a>> {
        let children: Vec<ElementRef<'a>> =
            element.children().filter_map(ElementRef::wrap).collect();
        let text = clean_cell_text(&flatten_text(element));

        if children.is_empty() {
            return Ok(classify_text_line(element, text));
        }
        if !children
            .iter()
            .all(|child| matches!(child.value().name(), "strong" | "b"))
        {
            return Err(ParseError::shape(
                "unexpected-node",
                "paragraph with children that are not all bold".to_string(),
            ));
        }
        if text.is_empty() {
            return Ok(NodeKind::Blank);
        }

        if is_centered(element) {
            if let Some(date) = parse_date_header(&text, context.today) {
                return Ok(NodeKind::DateHeader(date));
            }
            if is_all_uppercase(&text) {
                return Ok(NodeKind::Misc(text));
            }
            if state.teachers_seen {
                return Ok(NodeKind::Event(text));
            }
            let teachers = text
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
            return Ok(NodeKind::TeacherList(teachers));
        }
        Ok(NodeKind::TableTitle(text))
    }

    fn route(
        &self,
        kind: NodeKind<'_>,
        post: &mut SubstitutionsPost,
        state: &mut WalkState,
        context: &PostContext,
    ) -> ParseResult<()> {
        match kind {
            NodeKind::Blank => {}
            NodeKind::DateHeader(date) => {
                debug!("Bulletin {} dated {}", context.source, date);
                post.date = Some(date);
            }
            NodeKind::TeacherList(teachers) => {
                state.teachers_seen = true;
                post.teachers = teachers;
            }
            NodeKind::Event(text) => post.events.push(text),
            NodeKind::Misc(text) => post.misc.push(text),
            NodeKind::Cancellation(text) => post.cancelled.push(text),
            NodeKind::TableTitle(title) => {
                post.tables.push(EventTable::titled(title));
                state.open_table = Some(post.tables.len() - 1);
            }
            NodeKind::Table(element) => {
                let index = match state.open_table.take() {
                    Some(index) => index,
                    None => {
                        post.tables.push(EventTable::titled(NO_TABLE_HEADER));
                        post.tables.len() - 1
                    }
                };
                self.fill_table(&element, &mut post.tables[index]);
            }
            NodeKind::Line(text) => match self.line_parser.parse_line(&text)? {
                LineOutcome::Misc(line) => post.misc.push(line),
                LineOutcome::Substitution(line) => self.apply_substitution(post, &line),
            },
        }
        Ok(())
    }

    /// First row is the heading row; later rows append one value per
    /// column. Surplus cells are clipped, missing ones filled empty so the
    /// columns stay equal length.
    fn fill_table(&self, table: &ElementRef<'_>, record: &mut EventTable) {
        let mut rows = table.select(&self.row_selector);
        let Some(header_row) = rows.next() else {
            return;
        };
        record.headings = header_row
            .select(&self.cell_selector)
            .map(|cell| table_cell_value(&cell))
            .collect();
        record.columns = vec![Vec::new(); record.headings.len()];
        for row in rows {
            let cells: Vec<ElementRef<'_>> = row.select(&self.cell_selector).collect();
            for (index, column) in record.columns.iter_mut().enumerate() {
                let value = cells.get(index).map(table_cell_value).unwrap_or_default();
                column.push(value);
            }
        }
    }

    /// Cross-reference one parsed line against the timetables and append
    /// its substitution record for every (period, class) pair.
    fn apply_substitution(&self, post: &mut SubstitutionsPost, line: &SubstitutionLine) {
        let weekday = match post.date {
            Some(date) => Weekday::from_date(date),
            None => {
                warn!("Substitution line arrived before any date header, assuming Monday");
                Weekday::Monday
            }
        };
        for &period in &line.periods {
            for class in &line.classes {
                let lessons = match self.lookup.lookup(class, weekday, period) {
                    Ok(lessons) => lessons,
                    Err(LookupError::UnknownClass { .. }) => {
                        debug!(
                            "No timetable for class {}, leaving its substituted lessons empty",
                            class
                        );
                        Vec::new()
                    }
                };
                let entry = post.class_entry(period, class);
                entry.substituted_lessons = lessons;
                entry.substitutions.push(Substitution {
                    details: line.details.clone(),
                    groups: line.groups.clone(),
                });
            }
        }
    }
}

impl<'t> DocumentParser for SubstitutionsParser<'t> {
    type Output = SubstitutionsPost;
    type Context = PostContext;

    /// Trait entry point follows service-mode semantics: shape mismatches
    /// degrade into the result instead of erroring.
    fn parse_with_context(
        &self,
        html: &Html,
        context: &PostContext,
    ) -> ParseResult<SubstitutionsPost> {
        Ok(self.parse_post(html, context))
    }
}

/// Childless paragraphs, in priority order: cancellation notices, the title
/// of an immediately following table, otherwise a substitution line.
fn classify_text_line<'a>(element: &ElementRef<'a>, text: String) -> NodeKind<'a> {
    if text.is_empty() {
        return NodeKind::Blank;
    }
    if text.starts_with(CANCELLED_PREFIX) {
        return NodeKind::Cancellation(text);
    }
    if text.contains(CANCELLED_PHRASE) {
        let text = if text.ends_with('.') {
            text
        } else {
            format!("{text}.")
        };
        return NodeKind::Cancellation(text);
    }
    if next_element_is_table(element) {
        return NodeKind::TableTitle(text);
    }
    NodeKind::Line(text)
}

fn next_element_is_table(element: &ElementRef<'_>) -> bool {
    element
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .next()
        .is_some_and(|next| next.value().name() == "table")
}

fn is_centered(element: &ElementRef<'_>) -> bool {
    element
        .value()
        .attr("style")
        .is_some_and(|style| style.replace(' ', "").contains("text-align:center"))
}

/// `Zastępstwa <date>` headers carry either a full `d.m.Y` date or a bare
/// `d.m`, which borrows its year from the reference date.
fn parse_date_header(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let rest = text.strip_prefix(DATE_HEADER_PREFIX)?.trim();
    if let Ok(date) = NaiveDate::parse_from_str(rest, "%d.%m.%Y") {
        return Some(date);
    }
    let (day, month) = rest.split_once('.')?;
    let day: u32 = day.trim().parse().ok()?;
    let month: u32 = month.trim().trim_end_matches('.').parse().ok()?;
    NaiveDate::from_ymd_opt(today.year(), month, day)
}

fn flatten_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ")
}

/// A cell's value is the text of its first child element when it has one
/// (the site wraps values in `strong`/`p`), else the cell's own text.
fn table_cell_value(cell: &ElementRef<'_>) -> String {
    let value = match cell.children().filter_map(ElementRef::wrap).next() {
        Some(inner) => flatten_text(&inner),
        None => flatten_text(cell),
    };
    clean_cell_text(&value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lookup::NoTimetables;
    use crate::domain::timetable::{Group, Lesson, LessonTime, TimeSpan, Timetable};
    use std::collections::HashMap;

    const BULLETIN: &str = r#"<html><body>
<div class="post-content" id="post-77">
  <p style="text-align: center;"><strong>Zastępstwa 22.03.2024</strong></p>
  <p style="text-align: center;"><strong>A. Kowalska, B. Nowak</strong></p>
  <p style="text-align: center;"><strong>DZIEŃ OTWARTY SZKOŁY</strong></p>
  <p style="text-align: center;"><strong>Wyjście klas trzecich do teatru</strong></p>
  <p>Odwołane lekcje klasy IID po godzinie 14</p>
  <p>Lekcje w sali 100 są odwołane</p>
  <p>5,6 – IID gr. 2 p. Wiśniewski praca własna</p>
  <p>Wydarzenie szkolne: apel</p>
  <p><strong>Dyżury podczas próbnej matury</strong></p>
  <table>
    <tr><th>Godzina</th><th>Sala</th></tr>
    <tr><td>8:00</td><td><strong>113</strong></td></tr>
    <tr><td>9:00</td><td>114</td></tr>
  </table>
  <p>Harmonogram apelu</p>
  <table>
    <tr><th>Klasa</th><th>Kolejność</th></tr>
    <tr><td>IA</td><td>1</td></tr>
  </table>
</div>
</body></html>"#;

    fn context() -> PostContext {
        PostContext::new("fixture").with_today(NaiveDate::from_ymd_opt(2024, 3, 18).unwrap())
    }

    #[test]
    fn full_bulletin_routes_every_node_kind() {
        let parser = SubstitutionsParser::new(&NoTimetables).unwrap();
        let html = Html::parse_document(BULLETIN);
        let post = parser.parse_post(&html, &context());

        assert!(post.error.is_none(), "unexpected error: {:?}", post.error);
        assert_eq!(post.date, NaiveDate::from_ymd_opt(2024, 3, 22));
        assert_eq!(post.teachers, vec!["A. Kowalska", "B. Nowak"]);
        assert_eq!(post.misc, vec!["DZIEŃ OTWARTY SZKOŁY", "Wydarzenie szkolne: apel"]);
        assert_eq!(post.events, vec!["Wyjście klas trzecich do teatru"]);
        assert_eq!(
            post.cancelled,
            vec![
                "Odwołane lekcje klasy IID po godzinie 14",
                "Lekcje w sali 100 są odwołane."
            ]
        );

        assert_eq!(post.attributes.get("class").map(String::as_str), Some("post-content"));
        assert_eq!(post.attributes.get("id").map(String::as_str), Some("post-77"));

        let record = &post.lessons[&5]["2d"];
        assert!(record.substituted_lessons.is_empty());
        assert_eq!(record.substitutions.len(), 1);
        assert_eq!(record.substitutions[0].details, "p. Wiśniewski praca własna");
        assert_eq!(
            record.substitutions[0].groups.as_deref(),
            Some(&["Wiśniewski".to_string()][..])
        );
        assert!(post.lessons[&6].contains_key("2d"));

        assert_eq!(post.tables.len(), 2);
        assert_eq!(post.tables[0].title, "Dyżury podczas próbnej matury");
        assert_eq!(post.tables[0].headings, vec!["Godzina", "Sala"]);
        assert_eq!(post.tables[0].columns, vec![
            vec!["8:00".to_string(), "9:00".to_string()],
            vec!["113".to_string(), "114".to_string()],
        ]);
        assert_eq!(post.tables[1].title, "Harmonogram apelu");
        assert_eq!(post.tables[1].columns[0], vec!["IA".to_string()]);
    }

    #[test]
    fn substituted_lessons_come_from_the_timetable() {
        let mut timetable = Timetable::default();
        timetable.periods = vec![5, 6];
        timetable.hours = vec![
            TimeSpan::new(LessonTime::new(11, 35), LessonTime::new(12, 20)),
            TimeSpan::new(LessonTime::new(12, 40), LessonTime::new(13, 25)),
        ];
        timetable.weekdays.insert(
            Weekday::Friday,
            vec![
                vec![Lesson::new("matematyka", Group::WholeClass, "204")],
                vec![Lesson::new("wf", Group::Code("CH1".into()), "3")],
            ],
        );
        let mut tables = HashMap::new();
        tables.insert("2d".to_string(), timetable);

        let parser = SubstitutionsParser::new(&tables).unwrap();
        let html = Html::parse_document(BULLETIN);
        let post = parser.parse_post(&html, &context());

        // 2024-03-22 is a Friday
        let record = &post.lessons[&5]["2d"];
        assert_eq!(record.substituted_lessons.len(), 1);
        assert_eq!(record.substituted_lessons[0].name, "matematyka");
        assert_eq!(post.lessons[&6]["2d"].substituted_lessons[0].name, "wf");
    }

    #[test]
    fn missing_container_degrades_with_an_error_payload() {
        let parser = SubstitutionsParser::new(&NoTimetables).unwrap();
        let html = Html::parse_document("<html><body><main>nic</main></body></html>");
        let post = parser.parse_post(&html, &context());

        assert_eq!(post.error.as_ref().map(|e| e.kind.as_str()), Some("missing-container"));
        assert!(post.lessons.is_empty());
        assert!(post.tables.is_empty());
        assert!(post.date.is_none());

        let err = parser.try_parse_post(&html, &context()).unwrap_err();
        assert!(!err.is_recoverable());
    }

    #[test]
    fn unknown_tag_stops_the_walk_and_keeps_partial_data() {
        let html = Html::parse_document(
            r#"<div class="post-content">
                 <p style="text-align: center;"><strong>Zastępstwa 05.11.2024</strong></p>
                 <div>nieznany blok</div>
                 <p>1 – IA praca własna</p>
               </div>"#,
        );
        let parser = SubstitutionsParser::new(&NoTimetables).unwrap();
        let post = parser.parse_post(&html, &context());

        assert_eq!(post.date, NaiveDate::from_ymd_opt(2024, 11, 5));
        assert_eq!(post.error.as_ref().map(|e| e.kind.as_str()), Some("unexpected-node"));
        assert!(post.lessons.is_empty(), "nodes after the stop must not be routed");
    }

    #[test]
    fn bare_table_gets_the_placeholder_title() {
        let html = Html::parse_document(
            r#"<div class="post-content">
                 <table><tr><th>Klasa</th></tr><tr><td>IIB</td></tr></table>
               </div>"#,
        );
        let parser = SubstitutionsParser::new(&NoTimetables).unwrap();
        let post = parser.parse_post(&html, &context());

        assert_eq!(post.tables.len(), 1);
        assert_eq!(post.tables[0].title, NO_TABLE_HEADER);
        assert_eq!(post.tables[0].columns[0], vec!["IIB".to_string()]);
    }

    #[test]
    fn day_month_header_borrows_the_reference_year() {
        let html = Html::parse_document(
            r#"<div class="post-content">
                 <p style="text-align: center;"><strong>Zastępstwa 22.03</strong></p>
               </div>"#,
        );
        let parser = SubstitutionsParser::new(&NoTimetables).unwrap();
        let post = parser.parse_post(&html, &context());
        assert_eq!(post.date, NaiveDate::from_ymd_opt(2024, 3, 22));
    }

    #[test]
    fn malformed_line_is_skipped_but_the_walk_continues() {
        let html = Html::parse_document(
            r#"<div class="post-content">
                 <p style="text-align: center;"><strong>Zastępstwa 22.03.2024</strong></p>
                 <p>raz – IID niepoprawny zapis</p>
                 <p>2 – IIB praca własna</p>
               </div>"#,
        );
        let parser = SubstitutionsParser::new(&NoTimetables).unwrap();
        let post = parser.parse_post(&html, &context());

        assert!(post.error.is_none());
        assert!(post.lessons[&2].contains_key("2b"));
        assert_eq!(post.lessons.len(), 1);
    }
}
