// File: ./src/model/mod.rs
pub mod dates;
pub mod event;
pub mod extractor;

pub use dates::DateOrder;
pub use event::{CalendarEventRecord, DraftEvent};
pub use extractor::{EventExtractor, extract_events};
