//! End-to-end timetable pipeline tests over a synthetic page fixture.
//!
//! The fixture mirrors the real page layout: two navigation/legend tables
//! ahead of the lesson grid, `&nbsp;` idle cells, parallel group records
//! inside one cell and stale post-noon bell times.

use scraper::Html;

use tablica::domain::{format_class, format_class_reverse, Group, Timetable, Weekday};
use tablica::infrastructure::parsing::{DocumentParser, TimetableContext, TimetableParser};

const PAGE: &str = r#"<html><body>
<table><tr><td>nawigacja</td></tr></table>
<table><tr><td>legenda</td></tr></table>
<table>
  <tr><th>Nr</th><th>Godz</th><th>Poniedziałek</th><th>Wtorek</th></tr>
  <tr><td>1</td><td>8:00- 8:45</td><td>mat AB 204</td><td>j. ang-1/3 #J1 CD 113</td></tr>
  <tr><td>2</td><td>8:50- 9:35</td><td>&nbsp;</td><td>religia EW 12</td></tr>
  <tr><td>3</td><td>12:30-13:15</td><td>r_biol-1/5 FG 31 r_chem-2/5 HI 32</td><td>&nbsp;</td></tr>
</table>
</body></html>"#;

fn parse_fixture() -> Timetable {
    let parser = TimetableParser::new().unwrap();
    let html = Html::parse_document(PAGE);
    parser
        .parse_with_context(&html, &TimetableContext::new("2d"))
        .unwrap()
}

#[test]
fn three_period_rows_become_four_slots_after_the_synthetic_append() {
    let table = parse_fixture();

    assert_eq!(table.periods, vec![1, 2, 3, 4]);
    assert_eq!(table.hours.len(), table.periods.len());
    for (day, slots) in &table.weekdays {
        assert_eq!(slots.len(), table.periods.len(), "column {day} out of step");
    }

    // synthetic final period carries the fixed window and no lessons
    let last = table.hours.last().unwrap();
    assert_eq!((last.start.hour, last.start.minute), (16, 15));
    assert_eq!((last.end.hour, last.end.minute), (17, 0));
    assert!(table.lessons_at(Weekday::Monday, 4).is_empty());
}

#[test]
fn scraped_post_noon_minutes_never_reach_the_output() {
    let table = parse_fixture();

    // row three lists 12:30-13:15 on the page; the corrected bell times win
    let span = table.hours[2];
    assert_eq!((span.start.hour, span.start.minute), (12, 40));
    assert_eq!((span.end.hour, span.end.minute), (13, 25));
}

#[test]
fn cell_extraction_covers_subjects_groups_and_rooms() {
    let table = parse_fixture();

    let monday_first = table.lessons_at(Weekday::Monday, 1);
    assert_eq!(monday_first.len(), 1);
    assert_eq!(monday_first[0].name, "matematyka");
    assert_eq!(monday_first[0].group, Group::WholeClass);
    assert_eq!(monday_first[0].teacher.as_deref(), Some("AB"));
    assert_eq!(monday_first[0].room_id, "204");

    // three-way language split takes the #-tag, not the elective list
    let tuesday_first = table.lessons_at(Weekday::Tuesday, 1);
    assert_eq!(tuesday_first[0].name, "j.angielski");
    assert_eq!(tuesday_first[0].group, Group::Code("J1".into()));

    assert_eq!(
        table.lessons_at(Weekday::Tuesday, 2)[0].group,
        Group::Code("religia".into())
    );

    // parallel five-way electives share one cell
    let monday_third = table.lessons_at(Weekday::Monday, 3);
    assert_eq!(monday_third.len(), 2);
    assert_eq!(monday_third[0].group, Group::Code("r-biol".into()));
    assert_eq!(monday_third[1].group, Group::Code("r-chem".into()));

    // idle &nbsp; cell is an empty slot, not missing data
    assert!(table.lessons_at(Weekday::Monday, 2).is_empty());
}

#[test]
fn timetable_json_round_trip_is_idempotent() {
    let table = parse_fixture();

    let json = serde_json::to_string_pretty(&table).unwrap();
    let back: Timetable = serde_json::from_str(&json).unwrap();
    assert_eq!(back, table);

    let again = serde_json::to_string_pretty(&back).unwrap();
    assert_eq!(again, json);
}

#[test]
fn weekday_keys_serialize_with_the_polish_page_names() {
    let table = parse_fixture();
    let json = serde_json::to_value(&table).unwrap();
    let weekdays = json["weekdays"].as_object().unwrap();
    let keys: Vec<&String> = weekdays.keys().collect();
    assert_eq!(keys, vec!["poniedziałek", "wtorek"]);
}

#[test]
fn class_code_transform_round_trips() {
    assert_eq!(format_class("2d").as_deref(), Some("IID"));
    assert_eq!(format_class_reverse("IID").as_deref(), Some("2d"));
    assert_eq!(format_class("1a").as_deref(), Some("IA"));
    assert_eq!(format_class_reverse("IIIF").as_deref(), Some("3f"));
}

#[test]
fn pages_without_the_grid_parse_to_an_empty_timetable() {
    let parser = TimetableParser::new().unwrap();
    let html = Html::parse_document("<html><body><p>plan w przygotowaniu</p></body></html>");
    let table = parser
        .parse_with_context(&html, &TimetableContext::new("2d"))
        .unwrap();
    assert!(table.is_empty());
}
