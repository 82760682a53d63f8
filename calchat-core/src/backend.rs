use async_trait::async_trait;

use crate::error::BackendError;
use crate::event::EventRecord;

/// Read-only access to a calendar provider.
///
/// Implementations return events ascending by start time and report every
/// failure as a `BackendError`; they must not panic.
#[async_trait]
pub trait CalendarBackend: Send + Sync {
    /// Events starting from now, at most `max_results` of them.
    async fn fetch_upcoming(
        &self,
        calendar_id: &str,
        max_results: u32,
    ) -> Result<Vec<EventRecord>, BackendError>;

    /// Full-text search over event fields.
    async fn search_events(
        &self,
        calendar_id: &str,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<EventRecord>, BackendError>;
}
