// File: ./src/model/event.rs
use crate::model::dates;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const UNTITLED_EVENT: &str = "Untitled Event";
pub const FALLBACK_TITLE: &str = "Extracted Event";

/// A calendar event as produced by the extractor and accepted by storage.
///
/// `date` is an ISO-8601 string rather than a `DateTime` because records
/// also arrive from collaborators that may hand us garbage; those are
/// repaired with [`dates::repair_date`] before they are stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEventRecord {
    pub title: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CalendarEventRecord {
    pub fn new(title: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            date: dates::to_iso(date),
            time: None,
            description: None,
        }
    }

    pub fn with_time(mut self, time: impl Into<String>) -> Self {
        self.time = Some(time.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The single record emitted when nothing structured could be found.
    pub fn fallback(text: &str, now: DateTime<Utc>) -> Self {
        Self::new(FALLBACK_TITLE, now).with_description(text.trim())
    }

    pub fn parsed_date(&self) -> Option<DateTime<Utc>> {
        dates::parse_iso(&self.date)
    }
}

/// Partially-populated event under construction during one parse pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftEvent {
    pub title: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub description: Option<String>,
}

impl DraftEvent {
    pub fn is_complete(&self) -> bool {
        self.title.is_some() && self.date.is_some()
    }

    /// Freezes the draft into a record. Returns `None` unless both title and date are set.
    pub fn finish(self) -> Option<CalendarEventRecord> {
        match (self.title, self.date) {
            (Some(title), Some(date)) => Some(CalendarEventRecord {
                title,
                date,
                time: self.time,
                description: self.description,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_draft_finish_requires_title_and_date() {
        let draft = DraftEvent {
            title: Some("Gig".to_string()),
            ..Default::default()
        };
        assert!(!draft.is_complete());
        assert!(draft.finish().is_none());

        let draft = DraftEvent {
            title: Some("Gig".to_string()),
            date: Some("2025-04-10T00:00:00.000Z".to_string()),
            time: Some("20:00".to_string()),
            description: None,
        };
        let record = draft.finish().unwrap();
        assert_eq!(record.title, "Gig");
        assert_eq!(record.time.as_deref(), Some("20:00"));
    }

    #[test]
    fn test_json_omits_missing_fields() {
        let now = Utc.with_ymd_and_hms(2025, 4, 10, 0, 0, 0).unwrap();
        let record = CalendarEventRecord::new("Gig", now);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"title":"Gig","date":"2025-04-10T00:00:00.000Z"}"#
        );

        let back: CalendarEventRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
        assert_eq!(back.parsed_date(), Some(now));
    }

    #[test]
    fn test_fallback_trims_input() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let record = CalendarEventRecord::fallback("  some flyer text \n", now);
        assert_eq!(record.title, FALLBACK_TITLE);
        assert_eq!(record.description.as_deref(), Some("some flyer text"));
        assert_eq!(record.date, "2025-01-01T12:00:00.000Z");
    }
}
