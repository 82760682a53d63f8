use calchat_core::{EventRecord, EventTime};
use google_calendar::types::{Event, EventDateTime};

fn event_time(time: Option<&EventDateTime>) -> Option<EventTime> {
    time.and_then(|t| EventTime::from_parts(t.date_time, t.date))
}

/// Normalize a Google event. Cancelled events, events without an id and
/// events without a start are dropped.
pub fn to_record(event: Event) -> Option<EventRecord> {
    if event.id.is_empty() || event.status == "cancelled" {
        return None;
    }

    let start = event_time(event.start.as_ref())?;
    let end = event_time(event.end.as_ref()).unwrap_or(start);

    Some(
        EventRecord::new(event.id, &event.summary, start, end)
            .with_description(event.description)
            .with_location(event.location),
    )
}

/// Normalize, order by start and cap at `max_results`.
pub fn to_records(events: Vec<Event>, max_results: u32) -> Vec<EventRecord> {
    let mut records: Vec<EventRecord> = events.into_iter().filter_map(to_record).collect();
    calchat_core::event::sort_by_start(&mut records);
    records.truncate(max_results as usize);
    records
}
