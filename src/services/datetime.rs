//! Date and time recognition for free-text messages.
//!
//! Everything here is pure: relative words are resolved against a `today`
//! supplied by the caller, so results are deterministic under test.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;

static ISO_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").unwrap());
static SLASH_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{2,4})\b").unwrap());
static RELATIVE_DAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(day after tomorrow|today|tomorrow)\b").unwrap());
static WEEKDAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(next\s+)?(monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b")
        .unwrap()
});
static ON_PHRASE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bon\s+(.+)").unwrap());
static NUMERIC_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,4})[./-](\d{1,2})[./-](\d{1,4})$").unwrap());
static TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})(?:[:.](\d{2}))?\s*(a\.m\.|p\.m\.|am|pm)?").unwrap()
});
static DOTTED_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{1,2}\.\d{1,2}\.\d{2,4}\b").unwrap());
static SEPARATOR_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[.:]\d").unwrap());
static AT_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bat\s*$").unwrap());
static NOON: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(noon|midday|midnight)\b").unwrap());

/// Words that end a free-text date phrase.
const PHRASE_STOP_WORDS: &[&str] = &["at", "for", "with", "to", "from", "and", "instead"];

/// Finds the first recognizable date in a message.
///
/// Recognizes `today`/`tomorrow`, ISO `YYYY-MM-DD`, day-first `D/M/YYYY`,
/// weekday names and a free-text phrase after "on ". A two-digit year is
/// ambiguous and yields `None`, as if no date was given.
pub fn extract_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    if let Some(caps) = ISO_DATE.captures(text) {
        return ymd(&caps[1], &caps[2], &caps[3]);
    }

    if let Some(caps) = SLASH_DATE.captures(text) {
        if caps[3].len() != 4 {
            return None;
        }
        return ymd(&caps[3], &caps[2], &caps[1]);
    }

    if let Some(caps) = RELATIVE_DAY.captures(text) {
        return relative_day(&caps[1].to_lowercase(), today);
    }

    for caps in ON_PHRASE.captures_iter(text) {
        let phrase = cut_phrase(&caps[1]);
        if phrase.is_empty() {
            continue;
        }
        if let Some(date) = parse_flexible_date(&phrase, today) {
            return Some(date);
        }
    }

    if let Some(caps) = WEEKDAY.captures(text) {
        return next_weekday(&caps[2].to_lowercase(), caps.get(1).is_some(), today);
    }

    None
}

/// A clock time as written in a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clock {
    Absent,
    Valid(NaiveTime),
    /// Written like a time but out of range, e.g. "25:00" or "at 9.5".
    Invalid,
}

/// Finds the first clock time in a message, normalized to 24-hour.
///
/// Accepts `H:MM`, `H.MM`, `H am/pm` and `H:MM am/pm` anywhere; a bare hour
/// only counts when it follows "at". Digits that belong to dates are ignored.
/// A time that is written out but invalid yields `None`.
pub fn extract_time(text: &str) -> Option<NaiveTime> {
    match scan_time(text) {
        Clock::Valid(time) => Some(time),
        Clock::Absent | Clock::Invalid => None,
    }
}

/// True when the message writes a clock time that cannot be read.
pub fn has_invalid_time(text: &str) -> bool {
    scan_time(text) == Clock::Invalid
}

fn scan_time(text: &str) -> Clock {
    let scrubbed = scrub_dates(text);

    for caps in TIME.captures_iter(&scrubbed) {
        let Some(whole) = caps.get(0) else { continue };
        let minute = caps.get(2).map(|m| m.as_str());
        let meridiem = caps.get(3).map(|m| m.as_str().to_lowercase());

        if meridiem.is_none() {
            let rest = &scrubbed[whole.end()..];
            if rest.chars().next().is_some_and(|c| c.is_ascii_alphanumeric()) {
                continue;
            }
            if minute.is_none() {
                if !AT_SUFFIX.is_match(&scrubbed[..whole.start()]) {
                    continue;
                }
                if SEPARATOR_DIGIT.is_match(rest) {
                    return Clock::Invalid;
                }
            }
        }

        return match to_time(&caps[1], minute, meridiem.as_deref()) {
            Some(time) => Clock::Valid(time),
            None => Clock::Invalid,
        };
    }

    let noon = NOON.captures(&scrubbed).and_then(|caps| match caps[1].to_lowercase().as_str() {
        "midnight" => NaiveTime::from_hms_opt(0, 0, 0),
        _ => NaiveTime::from_hms_opt(12, 0, 0),
    });
    noon.map_or(Clock::Absent, Clock::Valid)
}

/// Resolves a date and/or time named in `text`.
///
/// Relative words resolve against `today`; whichever half the text leaves
/// out is taken from `fallback`. Returns `None` when the text names neither,
/// or when it writes a time that cannot be read.
pub fn parse_flexible_datetime(
    text: &str,
    today: NaiveDate,
    fallback: NaiveDateTime,
) -> Option<NaiveDateTime> {
    let date = extract_date(text, today);
    let time = match scan_time(text) {
        Clock::Invalid => return None,
        Clock::Valid(time) => Some(time),
        Clock::Absent => None,
    };
    if date.is_none() && time.is_none() {
        return None;
    }
    Some(NaiveDateTime::new(
        date.unwrap_or(fallback.date()),
        time.unwrap_or(fallback.time()),
    ))
}

/// Permissive day-first parser for phrases like "June 1st", "1 June 2025",
/// "the 3rd of march", "1.6.2025" or "next friday".
pub fn parse_flexible_date(phrase: &str, today: NaiveDate) -> Option<NaiveDate> {
    let cleaned = phrase.to_lowercase().replace(',', " ");
    let cleaned = cleaned.trim();

    if let Some(date) = relative_day(cleaned, today) {
        return Some(date);
    }
    if let Some(caps) = WEEKDAY.captures(cleaned) {
        return next_weekday(&caps[2], caps.get(1).is_some(), today);
    }
    if let Some(caps) = NUMERIC_DATE.captures(cleaned) {
        return if caps[1].len() == 4 {
            ymd(&caps[1], &caps[2], &caps[3])
        } else if caps[3].len() == 4 {
            ymd(&caps[3], &caps[2], &caps[1])
        } else {
            None
        };
    }

    let mut day: Option<u32> = None;
    let mut month: Option<u32> = None;
    let mut year: Option<i32> = None;

    for token in cleaned.split_whitespace() {
        let token = token.trim_matches('.');
        if let Some(m) = month_from_name(token) {
            month.get_or_insert(m);
            continue;
        }
        let digits = strip_ordinal(token);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        match digits.len() {
            4 => year = digits.parse().ok(),
            1 | 2 if day.is_none() => day = digits.parse().ok(),
            // a second short number reads as a two-digit year
            1 | 2 => return None,
            _ => {}
        }
    }

    NaiveDate::from_ymd_opt(year.unwrap_or(today.year()), month?, day?)
}

fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

fn relative_day(word: &str, today: NaiveDate) -> Option<NaiveDate> {
    match word {
        "today" => Some(today),
        "tomorrow" => Some(today + Duration::days(1)),
        "day after tomorrow" => Some(today + Duration::days(2)),
        _ => None,
    }
}

fn next_weekday(name: &str, force_next_week: bool, today: NaiveDate) -> Option<NaiveDate> {
    let target: Weekday = name.parse().ok()?;
    let mut ahead = (7 + target.num_days_from_monday() as i64
        - today.weekday().num_days_from_monday() as i64)
        % 7;
    if ahead == 0 && force_next_week {
        ahead = 7;
    }
    Some(today + Duration::days(ahead))
}

fn month_from_name(token: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "january", "february", "march", "april", "may", "june", "july", "august", "september",
        "october", "november", "december",
    ];
    if token.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|m| m.starts_with(token))
        .map(|i| i as u32 + 1)
}

fn strip_ordinal(token: &str) -> &str {
    ["st", "nd", "rd", "th"]
        .iter()
        .find_map(|suffix| token.strip_suffix(suffix))
        .unwrap_or(token)
}

fn cut_phrase(raw: &str) -> String {
    raw.split_whitespace()
        .take_while(|w| {
            let w = w.trim_matches(|c: char| c == ',' || c == '.').to_lowercase();
            !PHRASE_STOP_WORDS.contains(&w.as_str())
        })
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(['.', ',', '!', '?'])
        .to_string()
}

fn blank(caps: &regex::Captures<'_>) -> String {
    " ".repeat(caps[0].len())
}

fn scrub_dates(text: &str) -> String {
    let without_iso = ISO_DATE.replace_all(text, blank);
    let without_slash = SLASH_DATE.replace_all(&without_iso, blank);
    DOTTED_DATE.replace_all(&without_slash, blank).into_owned()
}

fn to_time(hour: &str, minute: Option<&str>, meridiem: Option<&str>) -> Option<NaiveTime> {
    let mut hour: u32 = hour.parse().ok()?;
    let minute: u32 = minute.map_or(Some(0), |m| m.parse().ok())?;

    match meridiem.map(|m| m.starts_with('p')) {
        Some(is_pm) => {
            if hour == 0 || hour > 12 {
                return None;
            }
            if is_pm && hour < 12 {
                hour += 12;
            } else if !is_pm && hour == 12 {
                hour = 0;
            }
        }
        None if hour > 23 => return None,
        None => {}
    }

    NaiveTime::from_hms_opt(hour, minute, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    // 2025-05-28 is a Wednesday
    fn today() -> NaiveDate {
        d(2025, 5, 28)
    }

    #[test]
    fn test_keyword_dates() {
        assert_eq!(extract_date("see me today", today()), Some(today()));
        assert_eq!(extract_date("book for Tomorrow", today()), Some(d(2025, 5, 29)));
        assert_eq!(
            extract_date("the day after tomorrow works", today()),
            Some(d(2025, 5, 30))
        );
    }

    #[test]
    fn test_numeric_dates_are_day_first() {
        assert_eq!(extract_date("on 2025-06-01 at 10", today()), Some(d(2025, 6, 1)));
        assert_eq!(extract_date("on 1/6/2025", today()), Some(d(2025, 6, 1)));
        assert_eq!(extract_date("on 13/12/2025", today()), Some(d(2025, 12, 13)));
    }

    #[test]
    fn test_two_digit_year_means_no_date() {
        assert_eq!(extract_date("on 1/6/25 at 3pm", today()), None);
        assert_eq!(parse_flexible_date("June 1 25", today()), None);
    }

    #[test]
    fn test_free_text_dates_after_on() {
        assert_eq!(extract_date("on June 3rd at 4pm", today()), Some(d(2025, 6, 3)));
        assert_eq!(extract_date("on the 3rd of march 2026", today()), Some(d(2026, 3, 3)));
        assert_eq!(extract_date("on 14 Aug, for a checkup", today()), Some(d(2025, 8, 14)));
        assert_eq!(extract_date("on 1.6.2025", today()), Some(d(2025, 6, 1)));
        assert_eq!(extract_date("depends on nothing", today()), None);
    }

    #[test]
    fn test_weekdays() {
        assert_eq!(extract_date("on friday", today()), Some(d(2025, 5, 30)));
        assert_eq!(extract_date("wednesday please", today()), Some(today()));
        assert_eq!(extract_date("next wednesday", today()), Some(d(2025, 6, 4)));
    }

    #[test]
    fn test_twelve_hour_normalization() {
        assert_eq!(extract_time("at 2pm"), Some(t(14, 0)));
        assert_eq!(extract_time("at 12am"), Some(t(0, 0)));
        assert_eq!(extract_time("at 12 pm"), Some(t(12, 0)));
        assert_eq!(extract_time("at 9:15 a.m."), Some(t(9, 15)));
        assert_eq!(extract_time("11am"), Some(t(11, 0)));
        assert_eq!(extract_time("13pm"), None);
    }

    #[test]
    fn test_time_ignores_date_digits_and_bare_numbers() {
        assert_eq!(extract_time("on 2025-06-01 at 10:00"), Some(t(10, 0)));
        assert_eq!(extract_time("on 1/6/2025"), None);
        assert_eq!(extract_time("appointment 12 please"), None);
        assert_eq!(extract_time("on the 3rd"), None);
        assert_eq!(extract_time("at 17"), Some(t(17, 0)));
        assert_eq!(extract_time("around noon"), Some(t(12, 0)));
    }

    #[test]
    fn test_dotted_minutes() {
        assert_eq!(extract_time("at 9.30am"), Some(t(9, 30)));
        assert_eq!(extract_time("at 14.45"), Some(t(14, 45)));
        assert_eq!(extract_time("on 14.06.2025 at 9am"), Some(t(9, 0)));
        assert_eq!(extract_time("on 14.06.2025"), None);
    }

    #[test]
    fn test_out_of_range_time_is_not_skipped() {
        assert_eq!(extract_time("2025-06-02 25:00"), None);
        assert!(has_invalid_time("2025-06-02 25:00"));
        assert!(has_invalid_time("at 10:75"));
        assert!(has_invalid_time("at 9.5am"));
        assert!(!has_invalid_time("tomorrow at 3pm"));
        assert!(!has_invalid_time("appointment 12 please"));

        let existing = d(2025, 6, 1).and_hms_opt(10, 0, 0).unwrap();
        assert_eq!(parse_flexible_datetime("2025-06-02 25:00", today(), existing), None);
    }

    #[test]
    fn test_parse_flexible_datetime_inherits_missing_half() {
        let existing = d(2025, 6, 1).and_hms_opt(10, 0, 0).unwrap();
        assert_eq!(
            parse_flexible_datetime("3pm", today(), existing),
            Some(d(2025, 6, 1).and_hms_opt(15, 0, 0).unwrap())
        );
        assert_eq!(
            parse_flexible_datetime("tomorrow", today(), existing),
            Some(d(2025, 5, 29).and_hms_opt(10, 0, 0).unwrap())
        );
        assert_eq!(parse_flexible_datetime("whenever", today(), existing), None);
    }
}
