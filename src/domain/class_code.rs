//! Class code conversion between the two source-document formats.
//!
//! The timetable pages name classes like `2d`; the substitutions bulletin
//! writes the same class as `IID`. The transform is reversible: the year
//! digit maps to that many repeated `I` characters and the letter tail flips
//! case. (The bulletin's roman markers are repetition-only; `4` is `IIII`.)

/// Timetable format to bulletin format: `"2d"` → `"IID"`.
///
/// Returns `None` for codes without a leading non-zero digit or without a
/// letter tail.
pub fn format_class(timetable_code: &str) -> Option<String> {
    let mut chars = timetable_code.trim().chars();
    let year = chars.next()?.to_digit(10)? as usize;
    let tail = chars.as_str();
    if year == 0 || tail.is_empty() {
        return None;
    }
    Some(format!("{}{}", "I".repeat(year), tail.to_uppercase()))
}

/// Bulletin format back to timetable format: `"IID"` → `"2d"`.
///
/// Returns `None` without a leading run of `I` characters or without a
/// letter tail after it.
pub fn format_class_reverse(bulletin_code: &str) -> Option<String> {
    let code = bulletin_code.trim();
    let year = code.chars().take_while(|&c| c == 'I').count();
    let tail = &code[year..];
    if year == 0 || tail.is_empty() {
        return None;
    }
    Some(format!("{year}{}", tail.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("2d", "IID")]
    #[case("1a", "IA")]
    #[case("3f", "IIIF")]
    #[case("4b", "IIIIB")]
    #[case("3ag", "IIIAG")]
    fn formats_round_trip(#[case] timetable: &str, #[case] bulletin: &str) {
        assert_eq!(format_class(timetable).as_deref(), Some(bulletin));
        assert_eq!(format_class_reverse(bulletin).as_deref(), Some(timetable));
    }

    #[test]
    fn rejects_codes_without_year_or_tail() {
        assert_eq!(format_class("d2"), None);
        assert_eq!(format_class("0a"), None);
        assert_eq!(format_class("2"), None);
        assert_eq!(format_class_reverse("2d"), None);
        assert_eq!(format_class_reverse("II"), None);
    }
}
