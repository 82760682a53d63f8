use anyhow::{Context, Result};
use async_trait::async_trait;
use calchat_core::{BackendError, CalendarBackend, EventRecord};
use chrono::{DateTime, SecondsFormat, Utc};
use google_calendar::types::{Event, OrderBy};
use tokio::sync::Mutex;
use tracing::debug;

use crate::convert;
use crate::session::BackendSession;

/// Google Calendar as a `CalendarBackend`.
///
/// Holds the session behind an async mutex so a refresh during one call is
/// seen by the next.
pub struct GoogleCalendar {
    session: Mutex<BackendSession>,
}

/// One page of `events.list`: expanded recurrences, ordered by start.
#[derive(Debug, PartialEq, Eq)]
struct EventQuery<'a> {
    calendar_id: &'a str,
    query: &'a str,
    time_min: String,
    max_results: u32,
}

impl<'a> EventQuery<'a> {
    /// From `now` on, with no upper bound.
    fn upcoming(calendar_id: &'a str, max_results: u32, now: DateTime<Utc>) -> Self {
        EventQuery {
            calendar_id,
            query: "",
            time_min: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            max_results,
        }
    }

    /// Full-text search over the whole calendar.
    fn search(calendar_id: &'a str, query: &'a str, max_results: u32) -> Self {
        EventQuery {
            calendar_id,
            query,
            time_min: String::new(),
            max_results,
        }
    }
}

impl GoogleCalendar {
    pub fn new(session: BackendSession) -> Self {
        GoogleCalendar {
            session: Mutex::new(session),
        }
    }

    /// Persist the session tokens. The backend stays usable.
    pub async fn release(&self) -> Result<()> {
        self.session.lock().await.persist()
    }

    async fn list(&self, params: EventQuery<'_>) -> Result<Vec<Event>> {
        let client = {
            let mut session = self.session.lock().await;
            session.ensure_fresh().await?;
            session.client()
        };

        debug!(
            calendar_id = params.calendar_id,
            query = params.query,
            time_min = %params.time_min,
            max_results = params.max_results,
            "Listing Google events"
        );

        let response = client
            .events()
            .list(
                params.calendar_id,
                "",                            // i_cal_uid
                0,                             // max_attendees
                i64::from(params.max_results), // max_results
                OrderBy::StartTime,            // order_by
                "",                            // page_token
                &[],                           // private_extended_property
                params.query,
                &[],                           // shared_extended_property
                false,                         // show_deleted
                false,                         // show_hidden_invitations
                true,                          // single_events, required for StartTime
                "",                            // time_max
                &params.time_min,
                "",                            // time_zone
                "",                            // updated_min
            )
            .await
            .with_context(|| {
                format!("Failed to fetch events from calendar {}", params.calendar_id)
            })?;

        Ok(response.body)
    }
}

fn backend_error(e: anyhow::Error) -> BackendError {
    BackendError::new(format!("An error occurred: {:#}", e))
}

#[async_trait]
impl CalendarBackend for GoogleCalendar {
    async fn fetch_upcoming(
        &self,
        calendar_id: &str,
        max_results: u32,
    ) -> Result<Vec<EventRecord>, BackendError> {
        let events = self
            .list(EventQuery::upcoming(calendar_id, max_results, Utc::now()))
            .await
            .map_err(backend_error)?;

        Ok(convert::to_records(events, max_results))
    }

    async fn search_events(
        &self,
        calendar_id: &str,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<EventRecord>, BackendError> {
        let events = self
            .list(EventQuery::search(calendar_id, query, max_results))
            .await
            .map_err(backend_error)?;

        Ok(convert::to_records(events, max_results))
    }
}
