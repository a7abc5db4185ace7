//! Substitution line parser.
//!
//! A substitution line reads "periods – class and details", with the site
//! alternating between an en-dash and a hyphen-minus as the separator. A
//! line without a separator is plain announcement text, not an error.

use std::collections::BTreeSet;

use regex::Regex;

use super::error::{ParseError, ParseResult};
use crate::domain::class_code::format_class_reverse;

/// What one bulletin text line turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    /// No separator: miscellaneous announcement text.
    Misc(String),
    /// A parsed substitution record.
    Substitution(SubstitutionLine),
}

/// Extracted content of one substitution line.
#[derive(Debug, Clone, PartialEq)]
pub struct SubstitutionLine {
    /// Affected periods, expanded from ranges, ascending.
    pub periods: BTreeSet<u32>,
    /// Affected classes in timetable format (`2d`), one per class letter.
    pub classes: Vec<String>,
    /// Free-text substitution detail.
    pub details: String,
    /// `p. NAME` sub-clauses named anywhere in the info segment.
    pub groups: Option<Vec<String>>,
}

/// Parser for the free-text substitution lines of the bulletin.
pub struct SubstitutionLineParser {
    info_pattern: Regex,
    groups_pattern: Regex,
}

impl SubstitutionLineParser {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            info_pattern: Regex::new(
                r"^(?P<year>[IVX]+)\s*(?P<letters>[A-Z]+)(?P<suffix>[a-z])?(?P<clauses>(?:\s+(?:gr\.\s*\S+|i\s+\S+))*)\s*(?P<details>.*)$",
            )?,
            groups_pattern: Regex::new(r"p\.\s*([\p{L}0-9/]+)")?,
        })
    }

    /// Classify and extract one bulletin text line.
    pub fn parse_line(&self, line: &str) -> ParseResult<LineOutcome> {
        let Some((periods_segment, info_segment)) = split_on_dash(line) else {
            return Ok(LineOutcome::Misc(line.trim().to_string()));
        };
        let periods = parse_periods(periods_segment)?;
        let (classes, details, groups) = self.parse_info(info_segment)?;
        Ok(LineOutcome::Substitution(SubstitutionLine {
            periods,
            classes,
            details,
            groups,
        }))
    }

    /// The info segment names the classes first: a roman year marker, one
    /// class letter per affected class, an optional class-type suffix
    /// letter, then `gr./i` clauses, then the free-text detail.
    fn parse_info(&self, info: &str) -> ParseResult<(Vec<String>, String, Option<Vec<String>>)> {
        let info = info.trim();
        let caps = self.info_pattern.captures(info).ok_or_else(|| {
            ParseError::anomaly(
                "substitution line",
                format!("info segment '{info}' does not name a class"),
            )
        })?;

        let year = &caps["year"];
        if year.chars().any(|c| c != 'I') {
            return Err(ParseError::anomaly(
                "substitution line",
                format!("unsupported year marker '{year}' in '{info}'"),
            ));
        }
        let suffix = caps.name("suffix").map_or("", |m| m.as_str());

        let mut classes = Vec::new();
        for letter in caps["letters"].chars() {
            let bulletin_code = format!("{year}{letter}{suffix}");
            let class = format_class_reverse(&bulletin_code).ok_or_else(|| {
                ParseError::anomaly(
                    "substitution line",
                    format!("unmappable class code '{bulletin_code}' in '{info}'"),
                )
            })?;
            classes.push(class);
        }

        let details = caps["details"].trim().to_string();
        let groups: Vec<String> = self
            .groups_pattern
            .captures_iter(info)
            .map(|c| c[1].to_string())
            .collect();
        let groups = if groups.is_empty() {
            None
        } else {
            Some(groups)
        };
        Ok((classes, details, groups))
    }
}

/// Split at the first of the two separator spellings, whichever comes
/// earlier. Hyphens inside period ranges carry no surrounding spaces, so
/// they never split here.
fn split_on_dash(line: &str) -> Option<(&str, &str)> {
    [" – ", " - "]
        .iter()
        .filter_map(|sep| line.find(sep).map(|pos| (pos, sep.len())))
        .min_by_key(|(pos, _)| *pos)
        .map(|(pos, len)| (&line[..pos], &line[pos + len..]))
}

/// Periods segment: an optional trailing `l` marker, tokens split on `i` or
/// `,`, inclusive `a-b` ranges expanded.
fn parse_periods(segment: &str) -> ParseResult<BTreeSet<u32>> {
    let trimmed = segment.trim();
    let trimmed = trimmed.strip_suffix('l').unwrap_or(trimmed);
    let mut periods = BTreeSet::new();
    for token in trimmed.split(['i', ',']) {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if let Some((lo, hi)) = token.split_once('-') {
            let lo = parse_period(lo.trim(), segment)?;
            let hi = parse_period(hi.trim(), segment)?;
            if lo > hi {
                return Err(ParseError::anomaly(
                    "substitution line",
                    format!("inverted period range '{token}' in '{segment}'"),
                ));
            }
            periods.extend(lo..=hi);
        } else {
            periods.insert(parse_period(token, segment)?);
        }
    }
    if periods.is_empty() {
        return Err(ParseError::anomaly(
            "substitution line",
            format!("no periods in segment '{segment}'"),
        ));
    }
    Ok(periods)
}

fn parse_period(token: &str, segment: &str) -> ParseResult<u32> {
    token.parse::<u32>().map_err(|_| {
        ParseError::anomaly(
            "substitution line",
            format!("unparsable period '{token}' in '{segment}'"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parser() -> SubstitutionLineParser {
        SubstitutionLineParser::new().unwrap()
    }

    fn parsed(line: &str) -> SubstitutionLine {
        match parser().parse_line(line).unwrap() {
            LineOutcome::Substitution(sub) => sub,
            other => panic!("expected a substitution, got {other:?}"),
        }
    }

    #[rstest]
    #[case("1,4-6 – IID praca własna", &[1, 4, 5, 6])]
    #[case("6l – IID praca własna", &[6])]
    #[case("5 i 6 – IID praca własna", &[5, 6])]
    fn period_sets_expand_ranges_and_markers(#[case] line: &str, #[case] expected: &[u32]) {
        let sub = parsed(line);
        assert_eq!(sub.periods.iter().copied().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn each_class_letter_is_its_own_class() {
        let sub = parsed("3 - IIIAG wyjście do kina");
        assert_eq!(sub.classes, vec!["3a", "3g"]);
        assert_eq!(sub.details, "wyjście do kina");
    }

    #[test]
    fn lowercase_suffix_extends_every_class_letter() {
        let sub = parsed("1 – IIAb lekcja w sali 100");
        assert_eq!(sub.classes, vec!["2ab"]);
    }

    #[test]
    fn group_clauses_are_absorbed_and_collected() {
        let sub = parsed("5,6 – IIID gr. 2 p. Nowak przejmuje zajęcia");
        assert_eq!(sub.classes, vec!["3d"]);
        assert_eq!(sub.details, "p. Nowak przejmuje zajęcia");
        assert_eq!(sub.groups.as_deref(), Some(&["Nowak".to_string()][..]));
    }

    #[test]
    fn dashless_line_is_miscellaneous_text() {
        let outcome = parser().parse_line("Wydarzenie szkolne: apel").unwrap();
        assert_eq!(
            outcome,
            LineOutcome::Misc("Wydarzenie szkolne: apel".to_string())
        );
    }

    #[test]
    fn hyphen_minus_separator_works_like_the_en_dash() {
        let sub = parsed("2 - IA zajęcia odwołane");
        assert_eq!(sub.classes, vec!["1a"]);
        assert_eq!(sub.periods.iter().copied().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn non_repetition_year_markers_are_anomalies() {
        let err = parser().parse_line("2 – IVB cokolwiek").unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn unparsable_period_token_is_an_anomaly() {
        assert!(parser().parse_line("raz – IID cokolwiek").is_err());
        assert!(parser().parse_line("7-5 – IID cokolwiek").is_err());
    }

    #[test]
    fn details_may_contain_further_dashes() {
        let sub = parsed("4 – IID wyjście – kino Helios");
        assert_eq!(sub.details, "wyjście – kino Helios");
    }
}
