//! Normalized event records returned to the model.
//!
//! Providers convert their API responses into `EventRecord`s. Start and end
//! are serialized as plain strings: RFC 3339 for timed events, `YYYY-MM-DD`
//! for all-day events.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Summary used when the provider has no title for an event.
pub const UNTITLED_SUMMARY: &str = "No title";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTime {
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
}

impl EventTime {
    /// Pick the precise timestamp when the source has one, else the date.
    pub fn from_parts(date_time: Option<DateTime<Utc>>, date: Option<NaiveDate>) -> Option<Self> {
        match (date_time, date) {
            (Some(dt), _) => Some(EventTime::DateTime(dt)),
            (None, Some(d)) => Some(EventTime::Date(d)),
            (None, None) => None,
        }
    }

    /// Instant used for ordering. All-day events sort as midnight UTC.
    pub fn sort_key(&self) -> DateTime<Utc> {
        match self {
            EventTime::DateTime(dt) => *dt,
            EventTime::Date(d) => d.and_time(NaiveTime::default()).and_utc(),
        }
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTime::DateTime(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::Secs, true)),
            EventTime::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl FromStr for EventTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(EventTime::DateTime(dt.with_timezone(&Utc)));
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(EventTime::Date)
            .map_err(|_| format!("Invalid event time '{}'. Expected RFC 3339 or YYYY-MM-DD", s))
    }
}

impl Serialize for EventTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EventTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A calendar event as handed to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub summary: String,
    pub start: EventTime,
    pub end: EventTime,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    pub id: String,
}

impl EventRecord {
    pub fn new(id: impl Into<String>, summary: &str, start: EventTime, end: EventTime) -> Self {
        let summary = if summary.trim().is_empty() {
            UNTITLED_SUMMARY.to_string()
        } else {
            summary.to_string()
        };

        EventRecord {
            summary,
            start,
            end,
            description: String::new(),
            location: String::new(),
            id: id.into(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }
}

/// Stable sort ascending by start time.
pub fn sort_by_start(events: &mut [EventRecord]) {
    events.sort_by_key(|e| e.start.sort_key());
}
