// File: ./src/export.rs
// iCalendar export of saved events.
use crate::storage::StoredEvent;
use chrono::NaiveTime;
use icalendar::{Calendar, CalendarDateTime, Component, Event, EventLike};

fn parse_event_time(time: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(time.trim(), "%H:%M").ok()
}

fn to_vevent(stored: &StoredEvent) -> Option<Event> {
    let Some(date) = stored.record.parsed_date().map(|d| d.date_naive()) else {
        log::warn!(
            "Skipping event {} with unreadable date '{}'",
            stored.id,
            stored.record.date
        );
        return None;
    };

    let mut event = Event::new();
    event.uid(&stored.id);
    event.summary(&stored.record.title);
    event.timestamp(stored.created_at);
    if let Some(desc) = &stored.record.description {
        event.description(desc);
    }

    // Untimed or unreadable times export as all-day events.
    match stored.record.time.as_deref().and_then(parse_event_time) {
        Some(time) => {
            let start = date.and_time(time);
            event.starts(CalendarDateTime::Floating(start));
            event.add_property("DURATION", "PT1H");
        }
        None => {
            event.all_day(date);
        }
    }
    Some(event.done())
}

/// One VCALENDAR with a VEVENT per event.
pub fn to_ics_string(events: &[StoredEvent], calendar_name: &str) -> String {
    let mut calendar = Calendar::new();
    calendar.name(calendar_name);
    for event in events.iter().filter_map(to_vevent) {
        calendar.push(event);
    }
    calendar.to_string()
}
