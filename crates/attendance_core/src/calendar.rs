//! crates/attendance_core/src/calendar.rs
//!
//! Weekday and clock-time parsing shared by schedule creation, the backfill
//! and the timetable extractor.

use chrono::{NaiveDate, NaiveTime, Weekday};

/// Monday to Sunday, in calendar order.
pub const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Hours written without am/pm below this value are read as afternoon times.
const AFTERNOON_CUTOFF_HOUR: u32 = 7;

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Parses full weekday names and the usual timetable abbreviations.
pub fn parse_weekday(value: &str) -> Option<Weekday> {
    let lowered = value.trim().trim_end_matches(['.', ',', ':']).to_ascii_lowercase();
    let day = match lowered.as_str() {
        "monday" | "mon" => Weekday::Mon,
        "tuesday" | "tue" | "tues" => Weekday::Tue,
        "wednesday" | "wed" => Weekday::Wed,
        "thursday" | "thu" | "thur" | "thurs" => Weekday::Thu,
        "friday" | "fri" => Weekday::Fri,
        "saturday" | "sat" => Weekday::Sat,
        "sunday" | "sun" => Weekday::Sun,
        _ => return None,
    };
    Some(day)
}

/// Every date from `start` to `end`, both inclusive.
pub fn days_inclusive(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |day| *day <= end)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Meridiem {
    Am,
    Pm,
}

#[derive(Debug, Clone, Copy)]
struct ClockParts {
    hour: u32,
    minute: u32,
    meridiem: Option<Meridiem>,
}

impl ClockParts {
    fn parse(value: &str) -> Option<Self> {
        let lowered = value.trim().to_ascii_lowercase().replace('.', ":");
        let compact: String = lowered.chars().filter(|c| !c.is_whitespace()).collect();
        let (digits, meridiem) = if let Some(rest) = compact
            .strip_suffix("a:m:")
            .or_else(|| compact.strip_suffix("a:m"))
            .or_else(|| compact.strip_suffix("am"))
        {
            (rest, Some(Meridiem::Am))
        } else if let Some(rest) = compact
            .strip_suffix("p:m:")
            .or_else(|| compact.strip_suffix("p:m"))
            .or_else(|| compact.strip_suffix("pm"))
        {
            (rest, Some(Meridiem::Pm))
        } else {
            (compact.as_str(), None)
        };
        let digits = digits.trim_end_matches(':');

        let (hour, minute) = match digits.split_once(':') {
            Some((h, m)) => (h.parse::<u32>().ok()?, m.parse::<u32>().ok()?),
            None => (digits.parse::<u32>().ok()?, 0),
        };
        if minute > 59 {
            return None;
        }
        match meridiem {
            Some(_) if hour == 0 || hour > 12 => None,
            None if hour > 23 => None,
            _ => Some(Self {
                hour,
                minute,
                meridiem,
            }),
        }
    }

    fn to_time(self, meridiem: Option<Meridiem>) -> Option<NaiveTime> {
        let hour = match meridiem {
            Some(Meridiem::Am) => self.hour % 12,
            Some(Meridiem::Pm) => self.hour % 12 + 12,
            None => self.hour,
        };
        NaiveTime::from_hms_opt(hour, self.minute, 0)
    }

    fn guessed_time(self) -> Option<NaiveTime> {
        if self.meridiem.is_none() && self.hour > 0 && self.hour < AFTERNOON_CUTOFF_HOUR {
            return self.to_time(Some(Meridiem::Pm));
        }
        self.to_time(self.meridiem)
    }
}

/// Parses a single clock time such as `9:30`, `09.30`, `9:30 PM` or `9am`.
pub fn parse_clock(value: &str) -> Option<NaiveTime> {
    let parts = ClockParts::parse(value)?;
    parts.to_time(parts.meridiem)
}

/// Parses a time range such as `09:00-10:00`, `9:00 AM - 10:30 AM`, `9-10`
/// or `2.00 to 3.00`. The start must be before the end.
pub fn parse_time_range(value: &str) -> Option<(NaiveTime, NaiveTime)> {
    let lowered = value.to_ascii_lowercase();
    let (start, end) = lowered
        .split_once(" to ")
        .or_else(|| lowered.split_once('–'))
        .or_else(|| lowered.split_once('—'))
        .or_else(|| lowered.split_once('-'))?;
    let start = ClockParts::parse(start)?;
    let end = ClockParts::parse(end)?;

    let end_time = end.guessed_time()?;
    let start_time = match (start.meridiem, end.meridiem) {
        (None, Some(shared)) => match start.to_time(Some(shared)) {
            Some(candidate) if candidate < end_time => candidate,
            _ => start.guessed_time()?,
        },
        _ => start.guessed_time()?,
    };

    (start_time < end_time).then_some((start_time, end_time))
}

/// Formats a range in the canonical `HH:MM - HH:MM` form.
pub fn format_time_range(start: NaiveTime, end: NaiveTime) -> String {
    format!("{} - {}", start.format("%H:%M"), end.format("%H:%M"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn weekday_abbreviations() {
        assert_eq!(parse_weekday("Thurs."), Some(Weekday::Thu));
        assert_eq!(parse_weekday("MONDAY"), Some(Weekday::Mon));
        assert_eq!(parse_weekday("Tues"), Some(Weekday::Tue));
        assert_eq!(parse_weekday("Someday"), None);
    }

    #[test]
    fn clock_formats() {
        assert_eq!(parse_clock("9:30"), Some(t(9, 30)));
        assert_eq!(parse_clock("09.15"), Some(t(9, 15)));
        assert_eq!(parse_clock("9:30 PM"), Some(t(21, 30)));
        assert_eq!(parse_clock("12 am"), Some(t(0, 0)));
        assert_eq!(parse_clock("25:00"), None);
        assert_eq!(parse_clock("13:00 pm"), None);
    }

    #[test]
    fn time_ranges() {
        assert_eq!(parse_time_range("09:00 - 10:00"), Some((t(9, 0), t(10, 0))));
        assert_eq!(parse_time_range("9:00 AM-10:30 AM"), Some((t(9, 0), t(10, 30))));
        assert_eq!(parse_time_range("11 - 1"), Some((t(11, 0), t(13, 0))));
        assert_eq!(parse_time_range("2.00 to 3.00"), Some((t(14, 0), t(15, 0))));
        assert_eq!(parse_time_range("11:00 - 12:30 PM"), Some((t(11, 0), t(12, 30))));
        assert_eq!(parse_time_range("10:00 - 09:00"), None);
    }

    #[test]
    fn inclusive_day_walk() {
        let start = NaiveDate::from_ymd_opt(2024, 2, 27).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let days: Vec<_> = days_inclusive(start, end).collect();
        assert_eq!(days.len(), 4);
        assert_eq!(days.last(), Some(&end));
    }
}
