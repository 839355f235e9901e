//! Token patterns for timetable text: weekday names, time ranges, rooms and
//! class types.

use std::sync::LazyLock;

use chrono::Weekday;
use regex::{Match, Regex};

use crate::calendar::{format_time_range, parse_time_range, parse_weekday};

static WEEKDAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(monday|tuesday|wednesday|thursday|friday|saturday|sunday|mon|tues|tue|wed|thurs|thur|thu|fri|sat|sun)\b",
    )
    .expect("weekday pattern")
});

static TIME_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b\d{1,2}(?:[:.]\d{2})?\s*(?:[ap]\.?m\b\.?)?\s*(?:-|–|—|\bto\b)\s*\d{1,2}(?:[:.]\d{2})?(?:\s*[ap]\.?m\b\.?)?",
    )
    .expect("time range pattern")
});

static ROOM_LABELLED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:room|rm|hall|venue)\.?\s*[:#-]?\s*[A-Z]*-?\d+[A-Z]?\b")
        .expect("labelled room pattern")
});

static ROOM_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s)\(?([A-Z]{1,3}-?\d{1,4}[A-Z]?)\)?\s*$").expect("room code pattern")
});

static CLASS_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)[(\[]?\b(lecture|lect|lec|tutorial|tut|practical|prac|laboratory|lab|seminar)\b\.?[)\]]?",
    )
    .expect("class type pattern")
});

/// Words that mark headers and page furniture rather than subjects.
const NON_SUBJECT_WORDS: [&str; 11] = [
    "time", "day", "days", "timetable", "schedule", "semester", "week", "page", "room", "venue",
    "break",
];

/// A cell split into its subject and the room/class type found in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellParts {
    pub subject: String,
    pub room: Option<String>,
    pub class_type: Option<String>,
}

pub fn find_weekday(text: &str) -> Option<(Weekday, Match<'_>)> {
    WEEKDAY
        .find_iter(text)
        .find_map(|m| parse_weekday(m.as_str()).map(|day| (day, m)))
}

pub fn weekday_matches(text: &str) -> impl Iterator<Item = (Weekday, Match<'_>)> {
    WEEKDAY
        .find_iter(text)
        .filter_map(|m| parse_weekday(m.as_str()).map(|day| (day, m)))
}

/// Finds the first parseable time range, returned in canonical form with its match.
pub fn find_time_range(text: &str) -> Option<(String, Match<'_>)> {
    TIME_RANGE.find_iter(text).find_map(|m| {
        parse_time_range(m.as_str()).map(|(start, end)| (format_time_range(start, end), m))
    })
}

/// Canonical label for a class type token; `Lab` stays short as on timetables.
pub fn class_type_label(token: &str) -> Option<&'static str> {
    match token.trim_end_matches('.').to_ascii_lowercase().as_str() {
        "lecture" | "lect" | "lec" => Some("Lecture"),
        "tutorial" | "tut" => Some("Tutorial"),
        "practical" | "prac" => Some("Practical"),
        "laboratory" | "lab" => Some("Lab"),
        "seminar" => Some("Seminar"),
        _ => None,
    }
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn clean_subject(text: &str) -> String {
    let collapsed = collapse_whitespace(&text.replace("()", " ").replace("[]", " "));
    collapsed
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, '-' | ',' | '|' | '/' | ':' | ';' | '(' | ')' | '[' | ']'))
        .to_string()
}

/// Splits a cell such as `Physics Lab B12` into subject, class type and room.
/// Returns `None` when nothing resembling a subject remains.
pub fn split_cell(text: &str) -> Option<CellParts> {
    let mut rest = collapse_whitespace(text);

    let room_match = ROOM_LABELLED
        .find(&rest)
        .map(|m| (m.range(), collapse_whitespace(m.as_str())))
        .or_else(|| {
            let caps = ROOM_CODE.captures(&rest)?;
            Some((caps.get(0)?.range(), caps.get(1)?.as_str().to_string()))
        });
    let room = room_match.map(|(range, room)| {
        rest.replace_range(range, " ");
        room
    });

    let type_match = CLASS_TYPE.captures(&rest).and_then(|caps| {
        let label = class_type_label(caps.get(1)?.as_str())?;
        Some((caps.get(0)?.range(), label.to_string()))
    });
    let class_type = type_match.map(|(range, label)| {
        rest.replace_range(range, " ");
        label
    });

    let subject = clean_subject(&rest);
    if !subject.chars().any(|c| c.is_alphabetic()) {
        return None;
    }
    Some(CellParts {
        subject,
        room,
        class_type,
    })
}

/// Length and character heuristics for lines that could name a subject.
pub fn looks_like_subject(line: &str) -> bool {
    let trimmed = line.trim();
    let len = trimmed.chars().count();
    if !(3..=60).contains(&len) {
        return false;
    }
    let letters = trimmed.chars().filter(|c| c.is_alphabetic()).count();
    if letters < 3 || letters * 2 < len {
        return false;
    }
    if find_time_range(trimmed).is_some() || trimmed.contains('@') || trimmed.contains("http") {
        return false;
    }
    let is_noise_word = |word: &str| {
        let lowered = word.to_ascii_lowercase();
        NON_SUBJECT_WORDS.contains(&lowered.as_str()) || parse_weekday(&lowered).is_some()
    };
    !trimmed
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .any(is_noise_word)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(subject: &str, class_type: Option<&str>, room: Option<&str>) -> CellParts {
        CellParts {
            subject: subject.to_string(),
            room: room.map(str::to_string),
            class_type: class_type.map(str::to_string),
        }
    }

    #[test]
    fn strips_trailing_room_code_and_type() {
        assert_eq!(split_cell("Physics Lab B12"), Some(parts("Physics", Some("Lab"), Some("B12"))));
    }

    #[test]
    fn labelled_rooms_and_parenthesised_types() {
        assert_eq!(
            split_cell("Maths (Tut) Room 101"),
            Some(parts("Maths", Some("Tutorial"), Some("Room 101")))
        );
        assert_eq!(
            split_cell("Organic Chemistry Prac. Hall 2"),
            Some(parts("Organic Chemistry", Some("Practical"), Some("Hall 2")))
        );
        assert_eq!(split_cell("History"), Some(parts("History", None, None)));
    }

    #[test]
    fn empty_cells_are_rejected() {
        assert_eq!(split_cell("  - "), None);
        assert_eq!(split_cell("B12"), None);
    }

    #[test]
    fn time_ranges_in_text() {
        let (time, m) = find_time_range("Mon 9:00 AM - 10:30 AM Physics").unwrap();
        assert_eq!(time, "09:00 - 10:30");
        assert_eq!(m.as_str(), "9:00 AM - 10:30 AM");
        assert_eq!(find_time_range("Tue 2-3 Maths").unwrap().0, "14:00 - 15:00");
        assert!(find_time_range("Room B12-3").is_none());
    }

    #[test]
    fn subject_heuristics() {
        assert!(looks_like_subject("Introduction to Algorithms"));
        assert!(!looks_like_subject("Monday"));
        assert!(!looks_like_subject("Time Table 2024"));
        assert!(!looks_like_subject("09:00 - 10:00"));
        assert!(!looks_like_subject("ab"));
        assert!(!looks_like_subject("12345 67 x"));
    }
}
