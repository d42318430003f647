//! Lenient date recognition for date-typed columns.
//!
//! Accepts what people usually type in a spreadsheet: ISO dates and timestamps,
//! `m/d/y` and `d/m/y` with `/`, `-` or `.` separators (month first when ambiguous),
//! compact `YYYYMMDD`, English month names, a bare year or day, and a time of day with or
//! without a date. Missing parts are taken from the current year.

use std::sync::OnceLock;

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

const MONTHS: &[(&str, u32)] = &[
    ("jan", 1),
    ("january", 1),
    ("feb", 2),
    ("february", 2),
    ("mar", 3),
    ("march", 3),
    ("apr", 4),
    ("april", 4),
    ("may", 5),
    ("jun", 6),
    ("june", 6),
    ("jul", 7),
    ("july", 7),
    ("aug", 8),
    ("august", 8),
    ("sep", 9),
    ("september", 9),
    ("oct", 10),
    ("october", 10),
    ("nov", 11),
    ("november", 11),
    ("dec", 12),
    ("december", 12),
    ("sept", 9),
];

// Words that may appear around a date without changing it
const FILLER_WORDS: &[&str] = &[
    "at", "on", "and", "ad", "m", "t", "of", "st", "nd", "rd", "th", "am", "pm", "utc", "gmt",
    "z", "mon", "monday", "tue", "tues", "tuesday", "wed", "wednesday", "thu", "thur", "thurs",
    "thursday", "fri", "friday", "sat", "saturday", "sun", "sunday",
];

pub fn is_date(value: &str) -> bool {
    parse_date(value, Local::now().year()).is_some()
}

/// Parses `value`, filling a missing year with `default_year`.
pub fn parse_date(value: &str, default_year: i32) -> Option<NaiveDateTime> {
    let lowered = value.trim().to_lowercase();
    if lowered.is_empty() {
        return None;
    }
    let text = date_time_separator().replace_all(&lowered, "$1 $2");
    let (rest, time) = extract_time(&text)?;
    let (numbers, month) = tokenize(&rest)?;

    if numbers.is_empty() && month.is_none() {
        // Only a time of day: today's date
        return time.map(|t| Local::now().date_naive().and_time(t));
    }

    let date = resolve(&numbers, month, default_year)?;
    Some(date.and_time(time.unwrap_or(NaiveTime::MIN)))
}

fn date_time_separator() -> &'static Regex {
    static SEP: OnceLock<Regex> = OnceLock::new();
    SEP.get_or_init(|| Regex::new(r"(\d)t(\d)").expect("valid separator regex"))
}

fn time_pattern() -> &'static Regex {
    static TIME: OnceLock<Regex> = OnceLock::new();
    TIME.get_or_init(|| {
        Regex::new(
            r"(\d{1,2}):(\d{2})(?::(\d{2})(?:\.\d+)?)?(?:\s*([ap])\.?m\.?)?(?:\s*(?:z|[+-]\d{2}(?::?\d{2})?))?",
        )
        .expect("valid time regex")
    })
}

/// Removes at most one time of day from `text`. `None` means the text cannot be a date.
fn extract_time(text: &str) -> Option<(String, Option<NaiveTime>)> {
    let Some(caps) = time_pattern().captures(text) else {
        return Some((text.to_string(), None));
    };
    let whole = caps.get(0)?;
    let before = text[..whole.start()].chars().last();
    let after = text[whole.end()..].chars().next();
    if before.map_or(false, |c| c.is_ascii_digit() || c == ':')
        || after.map_or(false, |c| c.is_ascii_digit() || c == ':')
    {
        return None;
    }

    let mut hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute: u32 = caps.get(2)?.as_str().parse().ok()?;
    let second: u32 = match caps.get(3) {
        Some(s) => s.as_str().parse().ok()?,
        None => 0,
    };
    if let Some(meridiem) = caps.get(4) {
        if !(1..=12).contains(&hour) {
            return None;
        }
        hour %= 12;
        if meridiem.as_str() == "p" {
            hour += 12;
        }
    }
    let time = NaiveTime::from_hms_opt(hour, minute, second)?;

    let rest = format!("{} {}", &text[..whole.start()], &text[whole.end()..]);
    if rest.contains(':') {
        return None;
    }
    Some((rest, Some(time)))
}

/// Splits the remaining text into numbers and at most one month name.
fn tokenize(text: &str) -> Option<(Vec<String>, Option<u32>)> {
    let mut numbers = Vec::new();
    let mut month = None;
    let mut current = String::new();

    let mut flush = |token: &mut String| -> Option<()> {
        if token.is_empty() {
            return Some(());
        }
        if token.chars().all(|c| c.is_ascii_digit()) {
            numbers.push(token.clone());
        } else if let Some((_, m)) = MONTHS.iter().find(|(name, _)| *name == token.as_str()) {
            if month.replace(*m).is_some() {
                return None;
            }
        } else if !FILLER_WORDS.contains(&token.as_str()) {
            return None;
        }
        token.clear();
        Some(())
    };

    for c in text.chars() {
        let same_kind = current
            .chars()
            .last()
            .map_or(true, |last| last.is_ascii_digit() == c.is_ascii_digit());
        if c.is_ascii_digit() || c.is_alphabetic() {
            if !same_kind {
                flush(&mut current)?;
            }
            current.push(c);
        } else if c.is_whitespace() || matches!(c, ',' | '/' | '-' | '.' | ';' | '\'') {
            flush(&mut current)?;
        } else {
            return None;
        }
    }
    flush(&mut current)?;

    Some((numbers, month))
}

fn resolve(numbers: &[String], month: Option<u32>, default_year: i32) -> Option<NaiveDate> {
    let n: Vec<(u32, usize)> = numbers
        .iter()
        .map(|s| s.parse::<u32>().ok().map(|v| (v, s.len())))
        .collect::<Option<_>>()?;
    let year = |v: u32, len: usize| expand_year(v, len, default_year);

    match (month, n.as_slice()) {
        (Some(m), []) => ymd(default_year, m, 1),
        (Some(m), [(v, len)]) => {
            if *len <= 2 && (1..=31).contains(v) {
                ymd(default_year, m, *v)
            } else {
                ymd(year(*v, *len), m, 1)
            }
        }
        (Some(m), [(a, la), (b, lb)]) => {
            ymd(year(*b, *lb), m, *a).or_else(|| ymd(year(*a, *la), m, *b))
        }
        (Some(_), _) => None,

        (None, [(v, len)]) => match *len {
            8 => ymd(*v as i32 / 10_000, v / 100 % 100, v % 100),
            6 => ymd(year(v / 10_000, 2), v / 100 % 100, v % 100),
            4 | 3 => ymd(*v as i32, 1, 1),
            1 | 2 if (1..=31).contains(v) => ymd(default_year, 1, *v),
            // A lone number too large for a day is a two-digit year
            1 | 2 => ymd(year(*v, *len), 1, 1),
            _ => None,
        },
        (None, [(a, la), (b, lb)]) => {
            if *la == 4 {
                ymd(*a as i32, *b, 1)
            } else if *lb == 4 {
                ymd(*b as i32, *a, 1)
            } else if *la <= 2 && *lb <= 2 {
                ymd(default_year, *a, *b).or_else(|| ymd(default_year, *b, *a))
            } else {
                None
            }
        }
        (None, [(a, la), (b, _), (c, lc)]) => {
            if *la >= 3 {
                // Year first is always year-month-day
                ymd(*a as i32, *b, *c)
            } else {
                let y = year(*c, *lc);
                ymd(y, *a, *b).or_else(|| ymd(y, *b, *a))
            }
        }
        _ => None,
    }
}

fn expand_year(value: u32, len: usize, default_year: i32) -> i32 {
    let value = value as i32;
    if len > 2 {
        return value;
    }
    let mut year = default_year / 100 * 100 + value;
    if year > default_year + 50 {
        year -= 100;
    } else if year < default_year - 50 {
        year += 100;
    }
    year
}

fn ymd(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    if year < 1 {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}
