//! The extraction strategies, in the order the default extractor tries them.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::Weekday;
use regex::Regex;

use super::cells::{find_time_range, find_weekday, looks_like_subject, split_cell};
use super::grid::{self, Cell};
use super::{ExtractionStrategy, PdfContent, ScheduleItem, StrategyError, TextElement};

/// Elements whose baselines differ by at most this much share a row.
const ROW_TOLERANCE: f64 = 3.0;
/// Approximate width of one character of body text, in PDF units.
const CHAR_WIDTH: f64 = 5.0;
/// Coordinates beyond this are not on any real page.
const MAX_COORDINATE: f64 = 100_000.0;
/// Widest line `rows_as_text` will pad out to.
const MAX_COLUMN: usize = 2_000;
const MAX_FALLBACK_SUBJECTS: usize = 20;
const FALLBACK_DAYS: [Weekday; 5] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
];
const FALLBACK_SLOTS: [&str; 4] = [
    "09:00 - 10:00",
    "10:00 - 11:00",
    "11:00 - 12:00",
    "14:00 - 15:00",
];

static SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+(?: \S+)*").expect("segment pattern"));

fn non_empty(items: Vec<ScheduleItem>) -> Option<Vec<ScheduleItem>> {
    (!items.is_empty()).then_some(items)
}

//=========================================================================================
// Row Grouping
//=========================================================================================

/// Groups elements into rows, top of the first page first, each row ordered by x.
fn group_rows(elements: &[TextElement]) -> Result<Vec<Vec<&TextElement>>, StrategyError> {
    let out_of_range = |v: f64| !v.is_finite() || v.abs() > MAX_COORDINATE;
    if elements.iter().any(|e| out_of_range(e.x) || out_of_range(e.y)) {
        return Err(StrategyError(
            "text element with invalid coordinates".to_string(),
        ));
    }

    let mut sorted: Vec<&TextElement> = elements
        .iter()
        .filter(|e| !e.text.trim().is_empty())
        .collect();
    sorted.sort_by(|a, b| {
        a.page
            .cmp(&b.page)
            .then(b.y.total_cmp(&a.y))
            .then(a.x.total_cmp(&b.x))
    });

    let mut rows: Vec<Vec<&TextElement>> = Vec::new();
    let mut anchor: Option<(u32, f64)> = None;
    for element in sorted {
        let same_row = matches!(
            anchor,
            Some((page, y)) if page == element.page && (y - element.y).abs() <= ROW_TOLERANCE
        );
        match rows.last_mut() {
            Some(row) if same_row => row.push(element),
            _ => {
                anchor = Some((element.page, element.y));
                rows.push(vec![element]);
            }
        }
    }
    for row in &mut rows {
        row.sort_by(|a, b| a.x.total_cmp(&b.x));
    }
    Ok(rows)
}

/// Lays rows out as text lines, keeping horizontal positions as character
/// columns so the offset-based strategy can still see the grid.
pub(crate) fn rows_as_text(elements: &[TextElement]) -> String {
    let Ok(rows) = group_rows(elements) else {
        return elements
            .iter()
            .map(|e| e.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
    };

    let mut lines = Vec::new();
    let mut last_page = None;
    for row in rows {
        let page = row.first().map(|e| e.page);
        if last_page.is_some() && page != last_page {
            lines.push(String::new());
        }
        last_page = page;

        let mut line = String::new();
        for element in row {
            let column = ((element.x.max(0.0) / CHAR_WIDTH).round() as usize).min(MAX_COLUMN);
            let used = line.chars().count();
            let pad = if used == 0 {
                column
            } else {
                column.saturating_sub(used).max(2)
            };
            line.push_str(&" ".repeat(pad));
            line.push_str(element.text.trim());
        }
        lines.push(line.trim_end().to_string());
    }
    lines.join("\n")
}

//=========================================================================================
// 1. Position-aware Table Extraction
//=========================================================================================

/// Reads the table from element coordinates: the header row fixes the day
/// columns, every later row with a time range fills them by x-distance.
pub struct PositionalStrategy;

impl ExtractionStrategy for PositionalStrategy {
    fn name(&self) -> &'static str {
        "positional"
    }

    fn try_extract(&self, content: &PdfContent) -> Result<Option<Vec<ScheduleItem>>, StrategyError> {
        if content.elements.is_empty() {
            return Ok(None);
        }
        let rows: Vec<Vec<Cell>> = group_rows(&content.elements)?
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|e| Cell {
                        pos: e.x,
                        char_width: e.width / e.text.chars().count().max(1) as f64,
                        text: e.text.clone(),
                    })
                    .collect()
            })
            .collect();
        Ok(non_empty(grid::assemble(&rows)))
    }
}

//=========================================================================================
// 2. Table by Character Offsets
//=========================================================================================

/// The same table reading over plain text lines, using character offsets as
/// positions and runs of two or more spaces as cell boundaries.
pub struct ColumnOffsetStrategy;

impl ExtractionStrategy for ColumnOffsetStrategy {
    fn name(&self) -> &'static str {
        "column-offset"
    }

    fn try_extract(&self, content: &PdfContent) -> Result<Option<Vec<ScheduleItem>>, StrategyError> {
        let rows: Vec<Vec<Cell>> = content
            .text
            .lines()
            .map(|line| {
                let line = line.replace('\t', "    ");
                SEGMENT
                    .find_iter(&line)
                    .map(|m| Cell {
                        pos: line[..m.start()].chars().count() as f64,
                        char_width: 1.0,
                        text: m.as_str().to_string(),
                    })
                    .collect()
            })
            .collect();
        Ok(non_empty(grid::assemble(&rows)))
    }
}

//=========================================================================================
// 3. Day/Time Line Scan
//=========================================================================================

/// Lines of the form `Monday 09:00-10:00 Physics`. A line holding only a day
/// name applies to the time-led lines after it.
pub struct DayTimeScanStrategy;

impl ExtractionStrategy for DayTimeScanStrategy {
    fn name(&self) -> &'static str {
        "day-time-scan"
    }

    fn try_extract(&self, content: &PdfContent) -> Result<Option<Vec<ScheduleItem>>, StrategyError> {
        let mut items = Vec::new();
        let mut current_day: Option<Weekday> = None;

        for line in content.text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let day = find_weekday(line);
            let time = find_time_range(line);

            let (day, time, rest) = match (day, time) {
                (Some((day, d)), Some((time, t))) if d.end() <= t.start() => {
                    let rest = format!("{} {}", &line[d.end()..t.start()], &line[t.end()..]);
                    (day, time, rest)
                }
                (Some((day, d)), None) => {
                    let mut residual = line.to_string();
                    residual.replace_range(d.range(), "");
                    if !residual.chars().any(|c| c.is_alphanumeric()) {
                        current_day = Some(day);
                    }
                    continue;
                }
                (None, Some((time, t))) => match current_day {
                    Some(day) => {
                        let rest = format!("{} {}", &line[..t.start()], &line[t.end()..]);
                        (day, time, rest)
                    }
                    None => continue,
                },
                _ => continue,
            };

            current_day = Some(day);
            if let Some(parts) = split_cell(&rest) {
                items.push(ScheduleItem {
                    day,
                    time,
                    subject: parts.subject,
                    room: parts.room,
                    class_type: parts.class_type,
                    is_fallback: false,
                });
            }
        }
        Ok(non_empty(items))
    }
}

//=========================================================================================
// 4. Paragraph Blocks
//=========================================================================================

/// Blank-line separated blocks that mention a day and a time; the first
/// subject-like line after the time is the subject.
pub struct BlockStrategy;

impl ExtractionStrategy for BlockStrategy {
    fn name(&self) -> &'static str {
        "paragraph-block"
    }

    fn try_extract(&self, content: &PdfContent) -> Result<Option<Vec<ScheduleItem>>, StrategyError> {
        let mut items = Vec::new();
        let mut block: Vec<&str> = Vec::new();

        for line in content.text.lines().chain(std::iter::once("")) {
            let line = line.trim();
            if !line.is_empty() {
                block.push(line);
                continue;
            }
            if let Some(item) = read_block(&block) {
                items.push(item);
            }
            block.clear();
        }
        Ok(non_empty(items))
    }
}

fn read_block(block: &[&str]) -> Option<ScheduleItem> {
    let day = block.iter().find_map(|line| find_weekday(line).map(|(day, _)| day))?;
    let (time_line, time) = block
        .iter()
        .enumerate()
        .find_map(|(idx, line)| find_time_range(line).map(|(time, _)| (idx, time)))?;
    let parts = block[time_line + 1..]
        .iter()
        .filter(|line| looks_like_subject(line))
        .find_map(|line| split_cell(line))?;

    Some(ScheduleItem {
        day,
        time,
        subject: parts.subject,
        room: parts.room,
        class_type: parts.class_type,
        is_fallback: false,
    })
}

//=========================================================================================
// 5. Synthetic Fallback
//=========================================================================================

/// Spreads anything that looks like a subject name over the working week.
/// Every item is flagged so clients can show it as a guess.
pub struct FallbackStrategy;

impl ExtractionStrategy for FallbackStrategy {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn try_extract(&self, content: &PdfContent) -> Result<Option<Vec<ScheduleItem>>, StrategyError> {
        let mut seen = HashSet::new();
        let subjects: Vec<_> = content
            .text
            .lines()
            .filter(|line| looks_like_subject(line))
            .filter_map(split_cell)
            .filter(|parts| seen.insert(parts.subject.to_lowercase()))
            .take(MAX_FALLBACK_SUBJECTS)
            .collect();

        let items = subjects
            .into_iter()
            .enumerate()
            .map(|(idx, parts)| ScheduleItem {
                day: FALLBACK_DAYS[idx % FALLBACK_DAYS.len()],
                time: FALLBACK_SLOTS[(idx / FALLBACK_DAYS.len()) % FALLBACK_SLOTS.len()]
                    .to_string(),
                subject: parts.subject,
                room: parts.room,
                class_type: parts.class_type,
                is_fallback: true,
            })
            .collect();
        Ok(non_empty(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(text: &str) -> PdfContent {
        PdfContent {
            elements: Vec::new(),
            text: text.to_string(),
        }
    }

    #[test]
    fn positional_reads_the_synthetic_table() {
        let elements = vec![
            TextElement::new(1, 20.0, 700.0, "Time"),
            TextElement::new(1, 100.0, 700.0, "Monday"),
            TextElement::new(1, 200.0, 700.0, "Tuesday"),
            TextElement::new(1, 300.0, 700.0, "Wednesday"),
            TextElement::new(1, 20.0, 680.0, "09:00 - 10:00"),
            TextElement::new(1, 100.0, 681.0, "Physics Lab B12"),
        ];
        let items = PositionalStrategy
            .try_extract(&PdfContent::from_elements(elements))
            .unwrap()
            .unwrap();
        assert_eq!(
            items,
            vec![ScheduleItem {
                day: Weekday::Mon,
                time: "09:00 - 10:00".to_string(),
                subject: "Physics".to_string(),
                room: Some("B12".to_string()),
                class_type: Some("Lab".to_string()),
                is_fallback: false,
            }]
        );
    }

    #[test]
    fn positional_assigns_cells_by_nearest_column() {
        let elements = vec![
            TextElement::new(1, 100.0, 700.0, "Mon"),
            TextElement::new(1, 200.0, 700.0, "Tue"),
            TextElement::new(1, 300.0, 700.0, "Wed"),
            TextElement::new(1, 10.0, 650.0, "11:00-12:00"),
            TextElement::new(1, 215.0, 650.0, "Maths"),
            TextElement::new(1, 290.0, 650.0, "History"),
            TextElement::new(1, 290.0, 640.0, "Room 4"),
        ];
        let items = PositionalStrategy
            .try_extract(&PdfContent::from_elements(elements))
            .unwrap()
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!((items[0].day, items[0].subject.as_str()), (Weekday::Tue, "Maths"));
        assert_eq!(items[1].day, Weekday::Wed);
        assert_eq!(items[1].room.as_deref(), Some("Room 4"));
    }

    #[test]
    fn positional_rejects_invalid_coordinates() {
        let content = PdfContent {
            elements: vec![TextElement::new(1, f64::NAN, 10.0, "Monday")],
            text: "Monday".to_string(),
        };
        assert!(PositionalStrategy.try_extract(&content).is_err());
    }

    #[test]
    fn far_off_page_coordinates_do_not_blow_up_the_layout() {
        let content = PdfContent::from_elements(vec![
            TextElement::new(1, 0.0, 700.0, "Monday"),
            TextElement::new(1, 1.0e18, 700.0, "Tuesday"),
        ]);
        assert_eq!(content.text, "Monday\nTuesday");
        assert!(PositionalStrategy.try_extract(&content).is_err());
    }

    #[test]
    fn layout_columns_are_capped() {
        let text = rows_as_text(&[
            TextElement::new(1, 0.0, 700.0, "Monday"),
            TextElement::new(1, 90_000.0, 700.0, "Tuesday"),
        ]);
        assert_eq!(text.len(), MAX_COLUMN + "Tuesday".len());
        assert!(text.starts_with("Monday "));
    }

    #[test]
    fn column_offsets_follow_the_header() {
        let content = text(
            "Time          Monday        Tuesday       Wednesday\n\
             09:00-10:00   Physics       Chemistry Tut\n\
             10:00-11:00                 Biology",
        );
        let items = ColumnOffsetStrategy.try_extract(&content).unwrap().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!((items[0].day, items[0].subject.as_str()), (Weekday::Mon, "Physics"));
        assert_eq!(items[1].class_type.as_deref(), Some("Tutorial"));
        assert_eq!((items[2].day, items[2].time.as_str()), (Weekday::Tue, "10:00 - 11:00"));
    }

    #[test]
    fn column_offsets_need_three_days() {
        let content = text("Monday   Tuesday\n09:00-10:00  Physics");
        assert!(ColumnOffsetStrategy.try_extract(&content).unwrap().is_none());
    }

    #[test]
    fn day_time_lines_and_day_headings() {
        let content = text(
            "Mon 9:00 AM - 10:00 AM Physics Lecture Room 12\n\
             Tuesday\n\
             14.00-15.30 Chemistry Lab\n\
             random text",
        );
        let items = DayTimeScanStrategy.try_extract(&content).unwrap().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].time, "09:00 - 10:00");
        assert_eq!(items[0].room.as_deref(), Some("Room 12"));
        assert_eq!(items[0].class_type.as_deref(), Some("Lecture"));
        assert_eq!(items[1].day, Weekday::Tue);
        assert_eq!(items[1].time, "14:00 - 15:30");
        assert_eq!(items[1].subject, "Chemistry");
    }

    #[test]
    fn blocks_take_the_line_after_the_time() {
        let content = text(
            "Wednesday\n10:00 - 11:00\nLinear Algebra Tut\n\nFriday\n13:00-14:00\n\nnotes",
        );
        let items = BlockStrategy.try_extract(&content).unwrap().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].day, Weekday::Wed);
        assert_eq!(items[0].subject, "Linear Algebra");
        assert_eq!(items[0].class_type.as_deref(), Some("Tutorial"));
    }

    #[test]
    fn fallback_spreads_subjects_round_robin() {
        let lines: Vec<String> = ["A", "B", "C", "D", "E", "F", "G"]
            .iter()
            .map(|suffix| format!("Subject Number {suffix}"))
            .collect();
        let content = text(&format!("Timetable\n{}\nSubject Number A", lines.join("\n")));
        let items = FallbackStrategy.try_extract(&content).unwrap().unwrap();
        assert_eq!(items.len(), 7);
        assert!(items.iter().all(|i| i.is_fallback));
        assert_eq!((items[0].day, items[0].time.as_str()), (Weekday::Mon, "09:00 - 10:00"));
        assert_eq!((items[4].day, items[4].time.as_str()), (Weekday::Fri, "09:00 - 10:00"));
        assert_eq!((items[5].day, items[5].time.as_str()), (Weekday::Mon, "10:00 - 11:00"));
    }

    #[test]
    fn rows_keep_their_horizontal_layout() {
        let elements = vec![
            TextElement::new(1, 0.0, 700.0, "Time"),
            TextElement::new(1, 100.0, 700.0, "Monday"),
            TextElement::new(2, 0.0, 700.0, "next page"),
        ];
        let text = rows_as_text(&elements);
        let first = text.lines().next().unwrap();
        assert_eq!(first.find("Monday"), Some(20));
        assert!(text.contains("\n\nnext page"));
    }
}
