//! Text cleanup shared by the timetable and bulletin parsers.
//!
//! The site fills idle cells with `&nbsp;` and is inconsistent about subject
//! spelling, so every extracted string passes through here before matching.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

/// Canonical spellings for subject abbreviations seen on the site.
static SUBJECT_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("mat", "matematyka"),
        ("matem", "matematyka"),
        ("j.ang", "j.angielski"),
        ("wych.fiz", "wf"),
        ("inf", "informatyka"),
    ])
});

static SPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("space run pattern"));

/// Flattened cell text, NBSP-free, runs of whitespace collapsed, trimmed.
///
/// An empty result is the page's "no lesson this period" placeholder.
pub fn clean_cell_text(raw: &str) -> String {
    let despaced = raw.replace('\u{a0}', " ");
    despaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonical subject code for a raw subject capture.
///
/// Substitutions run in a fixed order: the bilingual `-dw` suffix goes,
/// the `j. ` language prefix tightens to `j.`, underscores and space runs
/// become hyphens. The alias table then unifies known abbreviations and the
/// result is lower-cased.
pub fn normalize_subject(raw: &str) -> String {
    let mut name = raw.trim().to_string();
    if let Some(stripped) = name
        .strip_suffix("-dw")
        .or_else(|| name.strip_suffix("-DW"))
    {
        name = stripped.to_string();
    }
    if let Some(rest) = name.strip_prefix("j. ").or_else(|| name.strip_prefix("J. ")) {
        name = format!("j.{rest}");
    }
    name = name.replace('_', "-");
    name = SPACE_RUN.replace_all(&name, "-").into_owned();
    let key = name.to_lowercase();
    match SUBJECT_ALIASES.get(key.as_str()) {
        Some(canonical) => (*canonical).to_string(),
        None => key,
    }
}

/// True when every alphabetic character in `text` is upper-case.
pub fn is_all_uppercase(text: &str) -> bool {
    let mut saw_letter = false;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            saw_letter = true;
            if ch.is_lowercase() {
                return false;
            }
        }
    }
    saw_letter
}
