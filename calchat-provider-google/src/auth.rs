//! Installed-app OAuth consent flow.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;

use anyhow::{Context, Result};
use tracing::info;

use crate::session::{BackendSession, REDIRECT_URI, SessionData, SessionStore};

pub const REDIRECT_PORT: u16 = 8085;
pub const SCOPES: &[&str] = &["https://www.googleapis.com/auth/calendar.readonly"];

/// Pull `code` and `state` out of the callback's request target.
fn parse_callback(request_line: &str) -> Result<(String, String)> {
    let target = request_line
        .split_whitespace()
        .nth(1)
        .context("Invalid request")?;

    let url = url::Url::parse(&format!("http://localhost{}", target))?;
    let param = |name: &str| {
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.to_string())
    };

    if let Some(error) = param("error") {
        anyhow::bail!("Authorization was denied: {}", error);
    }

    let code = param("code").context("No code in callback")?;
    let state = param("state").context("No state in callback")?;

    Ok((code, state))
}

/// Serve one request on the loopback redirect address.
fn wait_for_callback() -> Result<(String, String)> {
    let listener = TcpListener::bind(format!("127.0.0.1:{}", REDIRECT_PORT))
        .with_context(|| format!("Failed to bind to port {}", REDIRECT_PORT))?;

    eprintln!("Waiting for OAuth callback on port {}...", REDIRECT_PORT);

    let (mut stream, _) = listener.accept().context("Failed to accept connection")?;

    let mut request_line = String::new();
    BufReader::new(&stream).read_line(&mut request_line)?;

    let result = parse_callback(&request_line);

    let body = match &result {
        Ok(_) => "<h1>calchat is connected to Google Calendar.</h1>\
            <p>You can close this window and return to the terminal.</p>",
        Err(_) => "<h1>Authentication failed.</h1>\
            <p>Return to the terminal for details.</p>",
    };
    let response = format!(
        "HTTP/1.1 200 OK\r\n\
        Content-Type: text/html\r\n\
        Connection: close\r\n\r\n\
        <html><body>{}</body></html>",
        body
    );

    stream.write_all(response.as_bytes())?;
    stream.flush()?;

    result
}

/// Run the consent flow, persist the tokens and return the live session.
pub async fn authenticate(store: SessionStore) -> Result<BackendSession> {
    let credentials = store.credentials()?;
    let mut client = google_calendar::Client::new(
        credentials.client_id.clone(),
        credentials.client_secret.clone(),
        REDIRECT_URI.to_string(),
        String::new(),
        String::new(),
    );

    let scopes: Vec<String> = SCOPES.iter().map(|s| s.to_string()).collect();
    let auth_url = client.user_consent_url(&scopes);

    eprintln!("\nOpen this URL in your browser to authenticate:\n");
    eprintln!("{}\n", auth_url);

    if open::that(&auth_url).is_err() {
        eprintln!("(Could not open browser automatically, please copy the URL above)");
    }

    let (code, state) = wait_for_callback()?;

    eprintln!("\nReceived authorization code, exchanging for tokens...");

    let tokens = client
        .get_access_token(&code, &state)
        .await
        .context("Failed to exchange code for tokens")?;

    let data = SessionData::from(&tokens);
    store.save(&data)?;
    info!(path = %store.session_path().display(), "Saved Google session");

    Ok(BackendSession::new(store, credentials, data))
}
