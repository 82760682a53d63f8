//! Google Calendar backend for calchat.
//!
//! OAuth client credentials and tokens live under
//! `~/.config/calchat/google/`. Run the consent flow once with
//! [`auth::authenticate`], then build a [`GoogleCalendar`] from the stored
//! [`BackendSession`].

pub mod auth;
pub mod calendar;
mod convert;
pub mod credentials;
pub mod session;

pub use calendar::GoogleCalendar;
pub use credentials::Credentials;
pub use session::{BackendSession, SessionData, SessionStore};
