//! End-to-end bulletin pipeline tests: a timetable is parsed first, then a
//! substitutions post is walked against it and cross-referenced.

use std::collections::HashMap;

use chrono::NaiveDate;
use scraper::Html;

use tablica::domain::{NoTimetables, SubstitutionsPost, Timetable};
use tablica::infrastructure::parsing::{
    DocumentParser, PostContext, SubstitutionsParser, TimetableContext, TimetableParser,
};

// 21.03.2024 is a Thursday
const TIMETABLE_PAGE: &str = r#"<html><body>
<table><tr><td>nawigacja</td></tr></table>
<table><tr><td>legenda</td></tr></table>
<table>
  <tr><th>Nr</th><th>Godz</th><th>Czwartek</th></tr>
  <tr><td>1</td><td>8:00- 8:45</td><td>mat AB 204</td></tr>
  <tr><td>2</td><td>8:50- 9:35</td><td>wf-1/2 #CH1 CD 3</td></tr>
</table>
</body></html>"#;

const BULLETIN_PAGE: &str = r#"<html><body>
<div class="post-content" id="post-123">
  <p style="text-align: center;"><strong>Zastępstwa 21.03.2024</strong></p>
  <p style="text-align: center;"><strong>A. Kowalska</strong></p>
  <p>1-2 – IID gr. 1 p. Nowak przejmuje zajęcia</p>
  <p>Wydarzenie szkolne: apel</p>
</div>
</body></html>"#;

fn context() -> PostContext {
    PostContext::new("fixture").with_today(NaiveDate::from_ymd_opt(2024, 3, 18).unwrap())
}

fn tables_for_2d() -> HashMap<String, Timetable> {
    let parser = TimetableParser::new().unwrap();
    let html = Html::parse_document(TIMETABLE_PAGE);
    let table = parser
        .parse_with_context(&html, &TimetableContext::new("2d"))
        .unwrap();
    HashMap::from([("2d".to_string(), table)])
}

#[test]
fn substitution_lines_cross_reference_the_parsed_timetable() {
    let tables = tables_for_2d();
    let parser = SubstitutionsParser::new(&tables).unwrap();
    let post = parser.parse_post(&Html::parse_document(BULLETIN_PAGE), &context());

    assert!(post.error.is_none(), "unexpected error: {:?}", post.error);
    assert_eq!(post.date, NaiveDate::from_ymd_opt(2024, 3, 21));
    assert_eq!(post.teachers, vec!["A. Kowalska"]);

    // the 1-2 range touches both periods of the Thursday column
    let first = &post.lessons[&1]["2d"];
    assert_eq!(first.substituted_lessons.len(), 1);
    assert_eq!(first.substituted_lessons[0].name, "matematyka");
    assert_eq!(first.substitutions[0].details, "p. Nowak przejmuje zajęcia");
    assert_eq!(
        first.substitutions[0].groups.as_deref(),
        Some(&["Nowak".to_string()][..])
    );

    let second = &post.lessons[&2]["2d"];
    assert_eq!(second.substituted_lessons[0].name, "wf");

    // the dash-less line stays announcement text
    assert_eq!(post.misc, vec!["Wydarzenie szkolne: apel"]);
}

#[test]
fn unknown_classes_degrade_to_empty_substituted_lessons() {
    let parser = SubstitutionsParser::new(&NoTimetables).unwrap();
    let post = parser.parse_post(&Html::parse_document(BULLETIN_PAGE), &context());

    assert!(post.error.is_none());
    let record = &post.lessons[&1]["2d"];
    assert!(record.substituted_lessons.is_empty());
    assert_eq!(record.substitutions.len(), 1);
}

#[test]
fn missing_post_container_yields_only_the_error_field() {
    let parser = SubstitutionsParser::new(&NoTimetables).unwrap();
    let html = Html::parse_document("<html><body><article>inny motyw</article></body></html>");
    let post = parser.parse_post(&html, &context());

    assert_eq!(
        post.error.as_ref().map(|e| e.kind.as_str()),
        Some("missing-container")
    );
    assert!(post.date.is_none());
    assert!(post.teachers.is_empty());
    assert!(post.lessons.is_empty());
    assert!(post.tables.is_empty());

    // the error payload itself survives the snapshot round trip
    let json = serde_json::to_string(&post).unwrap();
    let back: SubstitutionsPost = serde_json::from_str(&json).unwrap();
    assert_eq!(back, post);
}

#[test]
fn bulletin_snapshot_round_trips_with_stringified_period_keys() {
    let tables = tables_for_2d();
    let parser = SubstitutionsParser::new(&tables).unwrap();
    let post = parser.parse_post(&Html::parse_document(BULLETIN_PAGE), &context());

    let json = serde_json::to_value(&post).unwrap();
    let periods: Vec<&String> = json["lessons"].as_object().unwrap().keys().collect();
    assert_eq!(periods, vec!["1", "2"]);

    let back: SubstitutionsPost = serde_json::from_value(json).unwrap();
    assert_eq!(back, post);
}
