// File: ./src/model/extractor.rs
//! Line-oriented event extraction from OCR / AI generated text.
//!
//! The extractor is a fold over the non-blank lines of the input. Every line
//! is first classified by [`classify`] against the ordered [`RULES`] table
//! (first match wins), then [`ExtractorState::step`] applies the resulting
//! [`LineKind`] to the state. Nothing here touches a clock: the instant used
//! for the fallback record is passed in by the caller.
use crate::model::dates::{self, DateOrder};
use crate::model::event::{CalendarEventRecord, DraftEvent, UNTITLED_EVENT};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

// Numeric D/D/YY[YY] dates, slash or dash separated.
static DATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9]{1,2}[-/][0-9]{1,2}[-/][0-9]{2,4}")
        .expect("DATE_PATTERN should compile")
});

static TIME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]{1,2}:[0-9]{2}").expect("TIME_PATTERN should compile"));

/// The semantic role assigned to one line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// Title marker; carries the (possibly defaulted) title.
    Title(String),
    /// Date marker or date-like text; carries the first matching token, if any.
    Date(Option<String>),
    /// Time marker or time-like text; carries the first matching token, if any.
    Time(Option<String>),
    Description(String),
    /// No rule matched. Carries the trimmed line.
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRule {
    Title,
    Date,
    Time,
    Description,
}

/// Classification precedence. Only the first rule that applies to a line is used.
pub const RULES: [LineRule; 4] = [
    LineRule::Title,
    LineRule::Date,
    LineRule::Time,
    LineRule::Description,
];

fn contains_any(lower: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| lower.contains(m))
}

fn after_first_colon(line: &str) -> &str {
    line.split_once(':').map(|(_, rest)| rest.trim()).unwrap_or("")
}

impl LineRule {
    pub fn markers(self) -> &'static [&'static str] {
        match self {
            LineRule::Title => &["title:", "event:"],
            LineRule::Date => &["date:"],
            LineRule::Time => &["time:"],
            LineRule::Description => &["description:", "details:"],
        }
    }

    /// Returns the line's kind if this rule applies to it.
    /// `lower` is the lowercased `line`.
    pub fn apply(self, line: &str, lower: &str) -> Option<LineKind> {
        let marked = contains_any(lower, self.markers());
        match self {
            LineRule::Title if marked => {
                let title = after_first_colon(line);
                let title = if title.is_empty() { UNTITLED_EVENT } else { title };
                Some(LineKind::Title(title.to_string()))
            }
            LineRule::Date if marked || DATE_PATTERN.is_match(line) => Some(LineKind::Date(
                DATE_PATTERN.find(line).map(|m| m.as_str().to_string()),
            )),
            LineRule::Time if marked || TIME_PATTERN.is_match(line) => Some(LineKind::Time(
                TIME_PATTERN.find(line).map(|m| m.as_str().to_string()),
            )),
            LineRule::Description if marked => {
                Some(LineKind::Description(after_first_colon(line).to_string()))
            }
            _ => None,
        }
    }
}

/// Classifies a single line. Marker matching is case-insensitive.
pub fn classify(line: &str) -> LineKind {
    let lower = line.to_lowercase();
    RULES
        .iter()
        .find_map(|rule| rule.apply(line, &lower))
        .unwrap_or_else(|| LineKind::Text(line.trim().to_string()))
}

/// Fold state of one extraction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractorState {
    pub current: Option<DraftEvent>,
    pub output: Vec<CalendarEventRecord>,
}

impl ExtractorState {
    fn draft(&mut self) -> &mut DraftEvent {
        self.current.get_or_insert_with(DraftEvent::default)
    }

    /// Applies one classified line.
    pub fn step(mut self, kind: LineKind, order: DateOrder) -> Self {
        match kind {
            LineKind::Title(title) => {
                // A complete draft is superseded; an incomplete one just gets renamed.
                if self.current.as_ref().is_some_and(DraftEvent::is_complete)
                    && let Some(record) = self.current.take().and_then(DraftEvent::finish)
                {
                    self.output.push(record);
                }
                self.draft().title = Some(title);
            }
            LineKind::Date(Some(token)) => match dates::normalize_numeric_date(&token, order) {
                Some(iso) => self.draft().date = Some(iso),
                None => log::debug!("Ignoring unparseable date token '{}'", token),
            },
            LineKind::Time(Some(time)) => self.draft().time = Some(time),
            LineKind::Date(None) | LineKind::Time(None) => {}
            LineKind::Description(description) => {
                if !description.is_empty() {
                    self.draft().description = Some(description);
                }
            }
            LineKind::Text(text) => match self.current.as_mut() {
                Some(draft) if draft.title.is_some() && draft.description.is_none() => {
                    draft.description = Some(text);
                }
                // Lines past an existing description are lost.
                _ => log::trace!("Dropping unclassified line '{}'", text),
            },
        }
        self
    }

    /// Flushes the last draft and applies the fallback if nothing was found.
    pub fn finish(mut self, text: &str, now: DateTime<Utc>) -> Vec<CalendarEventRecord> {
        if let Some(record) = self.current.take().and_then(DraftEvent::finish) {
            self.output.push(record);
        }
        if self.output.is_empty() {
            self.output.push(CalendarEventRecord::fallback(text, now));
        }
        self.output
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EventExtractor {
    pub date_order: DateOrder,
}

impl EventExtractor {
    pub fn new(date_order: DateOrder) -> Self {
        Self { date_order }
    }

    /// Extracts events from `text`. Always returns at least one record.
    pub fn extract(&self, text: &str, now: DateTime<Utc>) -> Vec<CalendarEventRecord> {
        let mut line_count = 0usize;
        let state = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .inspect(|_| line_count += 1)
            .map(classify)
            .fold(ExtractorState::default(), |state, kind| {
                state.step(kind, self.date_order)
            });

        let events = state.finish(text, now);
        log::debug!(
            "Extracted {} event(s) from {} line(s)",
            events.len(),
            line_count
        );
        events
    }
}

/// Extracts events reading numeric dates month first.
pub fn extract_events(text: &str, now: DateTime<Utc>) -> Vec<CalendarEventRecord> {
    EventExtractor::default().extract(text, now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_precedence() {
        assert_eq!(
            classify("Event: Doors 10/04/2025 7:30"),
            LineKind::Title("Doors 10/04/2025 7:30".to_string()),
            "Title marker wins over date and time patterns"
        );
        assert_eq!(
            classify("Starts 04/10/2025 at 14:30"),
            LineKind::Date(Some("04/10/2025".to_string())),
            "Date pattern wins over time pattern"
        );
        assert_eq!(
            classify("Details: doors at 7:30"),
            LineKind::Time(Some("7:30".to_string())),
            "Time pattern outranks the description marker"
        );
        assert_eq!(
            classify("DETAILS: bring snacks"),
            LineKind::Description("bring snacks".to_string())
        );
        assert_eq!(
            classify("   Just words   "),
            LineKind::Text("Just words".to_string())
        );
    }

    #[test]
    fn test_markers_without_values() {
        assert_eq!(classify("Title:"), LineKind::Title(UNTITLED_EVENT.to_string()));
        assert_eq!(classify("Date: next friday"), LineKind::Date(None));
        assert_eq!(classify("Time: evening"), LineKind::Time(None));
    }

    #[test]
    fn test_first_match_only() {
        assert_eq!(
            classify("1/2/2025 or 3/4/2025"),
            LineKind::Date(Some("1/2/2025".to_string()))
        );
        assert_eq!(
            classify("9:00 - 17:00"),
            LineKind::Time(Some("9:00".to_string()))
        );
    }

    #[test]
    fn test_partial_dash_dates_are_plain_text() {
        assert_eq!(
            classify("Released 2025-4-1"),
            LineKind::Text("Released 2025-4-1".to_string())
        );
    }

    #[test]
    fn test_step_renames_incomplete_draft() {
        let order = DateOrder::MonthFirst;
        let state = ExtractorState::default()
            .step(LineKind::Title("First".into()), order)
            .step(LineKind::Time(Some("9:00".into())), order)
            .step(LineKind::Title("Second".into()), order);

        assert!(state.output.is_empty());
        let draft = state.current.unwrap();
        assert_eq!(draft.title.as_deref(), Some("Second"));
        assert_eq!(draft.time.as_deref(), Some("9:00"), "Other fields survive");
    }

    #[test]
    fn test_step_emits_complete_draft_on_new_title() {
        let order = DateOrder::MonthFirst;
        let state = ExtractorState::default()
            .step(LineKind::Title("First".into()), order)
            .step(LineKind::Date(Some("1/2/2025".into())), order)
            .step(LineKind::Title("Second".into()), order);

        assert_eq!(state.output.len(), 1);
        assert_eq!(state.output[0].title, "First");
        let draft = state.current.unwrap();
        assert_eq!(draft.title.as_deref(), Some("Second"));
        assert!(draft.date.is_none());
    }

    #[test]
    fn test_step_bad_date_keeps_previous() {
        let order = DateOrder::MonthFirst;
        let state = ExtractorState::default()
            .step(LineKind::Date(Some("1/2/2025".into())), order)
            .step(LineKind::Date(Some("13/45/2025".into())), order);
        assert_eq!(
            state.current.unwrap().date.as_deref(),
            Some("2025-01-02T00:00:00.000Z")
        );
    }

    #[test]
    fn test_step_text_needs_title() {
        let order = DateOrder::MonthFirst;
        let state = ExtractorState::default().step(LineKind::Text("orphan".into()), order);
        assert!(state.current.is_none());

        let state = ExtractorState::default()
            .step(LineKind::Title("T".into()), order)
            .step(LineKind::Text("first".into()), order)
            .step(LineKind::Text("second".into()), order);
        assert_eq!(
            state.current.unwrap().description.as_deref(),
            Some("first"),
            "Lines after the description are dropped"
        );
    }

    #[test]
    fn test_empty_description_marker_leaves_slot_open() {
        let order = DateOrder::MonthFirst;
        let state = ExtractorState::default()
            .step(LineKind::Title("T".into()), order)
            .step(LineKind::Description(String::new()), order)
            .step(LineKind::Text("filled later".into()), order);
        assert_eq!(
            state.current.unwrap().description.as_deref(),
            Some("filled later")
        );
    }
}
