//! Turns rows of positioned cells into schedule items. Shared by the
//! coordinate-based and the character-offset table strategies; they differ
//! only in how they cut a page into rows and cells.

use std::collections::{BTreeMap, HashSet};

use chrono::Weekday;

use super::cells::{find_time_range, split_cell, weekday_matches};
use super::ScheduleItem;

/// A piece of text with its horizontal start position.
#[derive(Debug, Clone)]
pub(crate) struct Cell {
    pub pos: f64,
    /// Horizontal advance of one character, used to place day names that
    /// share a cell.
    pub char_width: f64,
    pub text: String,
}

struct PendingRow {
    time: String,
    cells: BTreeMap<usize, String>,
}

pub(crate) fn assemble(rows: &[Vec<Cell>]) -> Vec<ScheduleItem> {
    let mut columns: Vec<(Weekday, f64)> = Vec::new();
    let mut pending: Option<PendingRow> = None;
    let mut items = Vec::new();

    for row in rows {
        if let Some(header) = header_columns(row) {
            flush(pending.take(), &columns, &mut items);
            columns = header;
            continue;
        }
        if columns.is_empty() {
            continue;
        }

        let label_limit = columns[0].1 - half_gap(&columns);
        let (label, mut body): (Vec<&Cell>, Vec<&Cell>) =
            row.iter().partition(|cell| cell.pos < label_limit);

        let label_text = label
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let mut time = find_time_range(&label_text).map(|(t, _)| t);
        if time.is_none() {
            // A time cell that sits inside the grid on its own.
            if let Some(idx) = body.iter().position(|c| is_time_only(&c.text)) {
                time = find_time_range(&body[idx].text).map(|(t, _)| t);
                body.remove(idx);
            }
        }

        match time {
            Some(time) => {
                flush(pending.take(), &columns, &mut items);
                let mut cells = BTreeMap::new();
                place(&body, &columns, &mut cells);
                pending = Some(PendingRow { time, cells });
            }
            None => {
                if let Some(open) = pending.as_mut() {
                    place(&body, &columns, &mut open.cells);
                }
            }
        }
    }
    flush(pending, &columns, &mut items);
    items
}

/// Day columns of a header row: at least three distinct weekdays, each in a
/// cell that holds nothing but day names.
fn header_columns(row: &[Cell]) -> Option<Vec<(Weekday, f64)>> {
    let mut columns: Vec<(Weekday, f64)> = Vec::new();
    for cell in row {
        let matches: Vec<_> = weekday_matches(&cell.text).collect();
        if matches.is_empty() {
            continue;
        }
        let mut residual = cell.text.clone();
        for (_, m) in matches.iter().rev() {
            residual.replace_range(m.range(), "");
        }
        if residual.chars().any(|c| c.is_alphanumeric()) {
            continue;
        }
        for (day, m) in &matches {
            let offset = cell.text[..m.start()].chars().count() as f64;
            columns.push((*day, cell.pos + offset * cell.char_width));
        }
    }

    let mut seen = HashSet::new();
    columns.retain(|(day, _)| seen.insert(*day));
    if columns.len() < 3 {
        return None;
    }
    columns.sort_by(|a, b| a.1.total_cmp(&b.1));
    Some(columns)
}

fn half_gap(columns: &[(Weekday, f64)]) -> f64 {
    columns
        .windows(2)
        .map(|w| w[1].1 - w[0].1)
        .filter(|gap| *gap > 0.0)
        .fold(f64::INFINITY, f64::min)
        .min(1.0e6)
        / 2.0
}

fn is_time_only(text: &str) -> bool {
    match find_time_range(text) {
        Some((_, m)) => {
            let mut rest = text.to_string();
            rest.replace_range(m.range(), "");
            !rest.chars().any(|c| c.is_alphanumeric())
        }
        None => false,
    }
}

fn nearest_column(columns: &[(Weekday, f64)], pos: f64) -> usize {
    columns
        .iter()
        .enumerate()
        .min_by(|a, b| (a.1 .1 - pos).abs().total_cmp(&(b.1 .1 - pos).abs()))
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn place(body: &[&Cell], columns: &[(Weekday, f64)], cells: &mut BTreeMap<usize, String>) {
    for cell in body {
        let text = cell.text.trim();
        if text.is_empty() {
            continue;
        }
        let slot = cells.entry(nearest_column(columns, cell.pos)).or_default();
        if !slot.is_empty() {
            slot.push(' ');
        }
        slot.push_str(text);
    }
}

fn flush(row: Option<PendingRow>, columns: &[(Weekday, f64)], items: &mut Vec<ScheduleItem>) {
    let Some(row) = row else {
        return;
    };
    for (idx, text) in row.cells {
        let Some(parts) = split_cell(&text) else {
            continue;
        };
        items.push(ScheduleItem {
            day: columns[idx].0,
            time: row.time.clone(),
            subject: parts.subject,
            room: parts.room,
            class_type: parts.class_type,
            is_fallback: false,
        });
    }
}
