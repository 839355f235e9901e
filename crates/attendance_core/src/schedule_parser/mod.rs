//! crates/attendance_core/src/schedule_parser/mod.rs
//!
//! Heuristic timetable extraction from PDF text.
//!
//! Reading the PDF itself happens in an adapter; this module only sees the
//! positioned text elements and the plain text of the document. Extraction is
//! an ordered list of [`ExtractionStrategy`] implementations tried in turn
//! until one recognises at least one class.

mod cells;
mod grid;
mod strategies;

use std::collections::HashSet;

use chrono::Weekday;
use tracing::{debug, info, warn};

pub use strategies::{
    BlockStrategy, ColumnOffsetStrategy, DayTimeScanStrategy, FallbackStrategy,
    PositionalStrategy,
};

//=========================================================================================
// Input and Output Types
//=========================================================================================

/// A run of text drawn at a point of a page, in PDF user space (origin at
/// the bottom left, so larger `y` is higher on the page).
#[derive(Debug, Clone, PartialEq)]
pub struct TextElement {
    pub page: u32,
    pub x: f64,
    pub y: f64,
    /// Estimated rendered width.
    pub width: f64,
    pub text: String,
}

impl TextElement {
    /// Builds an element with a width estimated for 10pt text.
    pub fn new(page: u32, x: f64, y: f64, text: impl Into<String>) -> Self {
        let text = text.into();
        let width = text.chars().count() as f64 * 5.0;
        Self {
            page,
            x,
            y,
            width,
            text,
        }
    }
}

/// Everything the strategies get to look at.
#[derive(Debug, Clone, Default)]
pub struct PdfContent {
    pub elements: Vec<TextElement>,
    pub text: String,
}

impl PdfContent {
    /// Builds the plain text from positioned elements, one line per row and
    /// cells separated by wide gaps.
    pub fn from_elements(elements: Vec<TextElement>) -> Self {
        let text = strategies::rows_as_text(&elements);
        Self { elements, text }
    }

    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty() || self.elements.iter().any(|e| !e.text.trim().is_empty())
    }
}

/// One recognised class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleItem {
    pub day: Weekday,
    /// Canonical `HH:MM - HH:MM`.
    pub time: String,
    pub subject: String,
    pub room: Option<String>,
    pub class_type: Option<String>,
    /// Set on guessed entries from the synthetic fallback.
    pub is_fallback: bool,
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub items: Vec<ScheduleItem>,
    pub strategy: &'static str,
}

#[derive(Debug, thiserror::Error)]
pub enum ScheduleParseError {
    #[error("Schedule file not found: {0}")]
    FileNotFound(String),
    #[error("The PDF has no extractable text")]
    NoExtractableText,
    #[error("Schedule parsing failed: {0}")]
    ParsingFailed(String),
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct StrategyError(pub String);

//=========================================================================================
// Strategy Chain
//=========================================================================================

pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(None)` means the strategy found nothing it recognises.
    fn try_extract(&self, content: &PdfContent) -> Result<Option<Vec<ScheduleItem>>, StrategyError>;
}

pub struct ScheduleExtractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl Default for ScheduleExtractor {
    fn default() -> Self {
        Self::new(vec![
            Box::new(PositionalStrategy),
            Box::new(ColumnOffsetStrategy),
            Box::new(DayTimeScanStrategy),
            Box::new(BlockStrategy),
            Box::new(FallbackStrategy),
        ])
    }
}

impl ScheduleExtractor {
    pub fn new(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Runs the strategies in order and returns the first non-empty result.
    pub fn extract(&self, content: &PdfContent) -> Result<Extraction, ScheduleParseError> {
        if !content.has_text() {
            return Err(ScheduleParseError::NoExtractableText);
        }

        let mut last_error = None;
        for strategy in &self.strategies {
            match strategy.try_extract(content) {
                Ok(Some(items)) if !items.is_empty() => {
                    let items = dedup(items);
                    info!(
                        "Extracted {} schedule items with the {} strategy",
                        items.len(),
                        strategy.name()
                    );
                    return Ok(Extraction {
                        items,
                        strategy: strategy.name(),
                    });
                }
                Ok(_) => {
                    debug!("Strategy {} found nothing", strategy.name());
                    last_error = None;
                }
                Err(e) => {
                    warn!("Strategy {} failed: {}", strategy.name(), e);
                    last_error = Some(format!("{}: {}", strategy.name(), e));
                }
            }
        }

        Err(ScheduleParseError::ParsingFailed(last_error.unwrap_or_else(|| {
            "no schedule entries could be recognised".to_string()
        })))
    }
}

fn dedup(items: Vec<ScheduleItem>) -> Vec<ScheduleItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert((item.day, item.time.clone(), item.subject.to_lowercase())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;
    impl ExtractionStrategy for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn try_extract(&self, _: &PdfContent) -> Result<Option<Vec<ScheduleItem>>, StrategyError> {
            Err(StrategyError("boom".to_string()))
        }
    }

    fn text(text: &str) -> PdfContent {
        PdfContent {
            elements: Vec::new(),
            text: text.to_string(),
        }
    }

    #[test]
    fn default_order_is_fixed() {
        assert_eq!(
            ScheduleExtractor::default().strategy_names(),
            vec!["positional", "column-offset", "day-time-scan", "paragraph-block", "fallback"]
        );
    }

    #[test]
    fn empty_content_reports_no_text() {
        let err = ScheduleExtractor::default().extract(&text("  \n ")).unwrap_err();
        assert!(matches!(err, ScheduleParseError::NoExtractableText));
        assert!(err.to_string().contains("no extractable text"));
    }

    #[test]
    fn a_failing_strategy_falls_through() {
        let extractor = ScheduleExtractor::new(vec![Box::new(Failing), Box::new(DayTimeScanStrategy)]);
        let extraction = extractor.extract(&text("Monday 09:00-10:00 Physics")).unwrap();
        assert_eq!(extraction.strategy, "day-time-scan");
        assert_eq!(extraction.items[0].subject, "Physics");
    }

    #[test]
    fn final_failure_is_reported() {
        let extractor = ScheduleExtractor::new(vec![Box::new(DayTimeScanStrategy), Box::new(Failing)]);
        let err = extractor.extract(&text("nothing useful")).unwrap_err();
        match err {
            ScheduleParseError::ParsingFailed(msg) => assert!(msg.contains("boom")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn nothing_recognised_is_a_parse_failure() {
        let extractor = ScheduleExtractor::new(vec![Box::new(DayTimeScanStrategy)]);
        assert!(matches!(
            extractor.extract(&text("12 34")),
            Err(ScheduleParseError::ParsingFailed(_))
        ));
    }
}
