// File: ./src/pipeline.rs
//! Upload-to-calendar flow: identify the user, recognize text, extract
//! events, save them.
use crate::identity::{IdentityProvider, UserId};
use crate::inference::{EncodedImage, TextRecognizer, placeholder_events};
use crate::model::{CalendarEventRecord, EventExtractor};
use crate::storage::{EventStore, StoredEvent};
use chrono::{DateTime, Utc};
use thiserror::Error;

pub const NO_TEXT_NOTICE: &str = "No text was detected in the image. Showing sample events instead.";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("not signed in")]
    Unauthenticated,
    #[error("could not save events: {0:#}")]
    Storage(anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSource {
    Extracted,
    Placeholder,
}

#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub events: Vec<StoredEvent>,
    pub source: EventSource,
    /// Set when placeholder events were substituted.
    pub notice: Option<String>,
}

pub struct ScanPipeline<R, S> {
    recognizer: R,
    store: S,
    extractor: EventExtractor,
}

impl<R: TextRecognizer, S: EventStore> ScanPipeline<R, S> {
    pub fn new(recognizer: R, store: S, extractor: EventExtractor) -> Self {
        Self {
            recognizer,
            store,
            extractor,
        }
    }

    fn require_user(identity: &dyn IdentityProvider) -> Result<UserId, PipelineError> {
        identity.current_user().ok_or(PipelineError::Unauthenticated)
    }

    /// Runs recognition on `image` and saves whatever comes out.
    /// Recognition failures degrade to placeholder events rather than errors.
    pub fn scan(
        &self,
        identity: &dyn IdentityProvider,
        image: &EncodedImage,
        now: DateTime<Utc>,
    ) -> Result<ScanOutcome, PipelineError> {
        let user = Self::require_user(identity)?;

        match self.recognizer.recognize(image) {
            Ok(text) => self.process_text(&user, &text, now),
            Err(e) => {
                log::warn!("Recognition failed for {}: {}", image.file_name, e);
                self.save(
                    &user,
                    placeholder_events(now),
                    now,
                    EventSource::Placeholder,
                    Some(e.user_message().to_string()),
                )
            }
        }
    }

    /// Same as `scan` for text that was already recognized.
    pub fn scan_text(
        &self,
        identity: &dyn IdentityProvider,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<ScanOutcome, PipelineError> {
        let user = Self::require_user(identity)?;
        self.process_text(&user, text, now)
    }

    fn process_text(
        &self,
        user: &UserId,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<ScanOutcome, PipelineError> {
        if text.trim().is_empty() {
            log::info!("Recognizer returned no text, using placeholder events");
            return self.save(
                user,
                placeholder_events(now),
                now,
                EventSource::Placeholder,
                Some(NO_TEXT_NOTICE.to_string()),
            );
        }
        let records = self.extractor.extract(text, now);
        self.save(user, records, now, EventSource::Extracted, None)
    }

    fn save(
        &self,
        user: &UserId,
        records: Vec<CalendarEventRecord>,
        now: DateTime<Utc>,
        source: EventSource,
        notice: Option<String>,
    ) -> Result<ScanOutcome, PipelineError> {
        let events = self
            .store
            .insert(user, &records, now)
            .map_err(PipelineError::Storage)?;
        Ok(ScanOutcome {
            events,
            source,
            notice,
        })
    }
}
