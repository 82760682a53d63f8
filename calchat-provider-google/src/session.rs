//! Owns the Google OAuth tokens for one account.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use calchat_core::AppConfig;
use chrono::{DateTime, Duration, Utc};
use google_calendar::{AccessToken, Client};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::credentials::Credentials;

pub const REDIRECT_URI: &str = "http://localhost:8085/callback";

/// Refresh this long before the token actually expires.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Directory holding credentials and the persisted session.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        SessionStore { dir: dir.into() }
    }

    /// `~/.config/calchat/google`
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(AppConfig::config_dir()?.join("google")))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn session_path(&self) -> PathBuf {
        self.dir.join("session.toml")
    }

    pub fn credentials(&self) -> Result<Credentials> {
        Credentials::load(&self.dir)
    }

    pub fn load(&self) -> Result<Option<SessionData>> {
        let path = self.session_path();

        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path).with_context(|| {
            format!("Failed to read Google OAuth session from {}", path.display())
        })?;

        let data = toml::from_str(&contents).with_context(|| {
            format!("Failed to parse Google OAuth session from {}", path.display())
        })?;

        Ok(Some(data))
    }

    pub fn save(&self, data: &SessionData) -> Result<()> {
        let contents = toml::to_string_pretty(data).context("Failed to serialize session")?;

        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create directory {}", self.dir.display()))?;

        let path = self.session_path();
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write session to {}", path.display()))?;

        // Owner-only (0600): the file holds OAuth tokens
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionData {
    pub fn from_tokens(access_token: String, refresh_token: String, expires_in: i64) -> Self {
        SessionData {
            access_token,
            refresh_token,
            expires_at: Utc::now() + Duration::seconds(expires_in),
        }
    }

    pub fn needs_refresh_at(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_SKEW_SECS) >= self.expires_at
    }
}

impl From<&AccessToken> for SessionData {
    fn from(tokens: &AccessToken) -> Self {
        SessionData::from_tokens(
            tokens.access_token.clone(),
            tokens.refresh_token.clone(),
            tokens.expires_in,
        )
    }
}

/// Live OAuth state for the calendar backend: acquire once, keep fresh,
/// release at shutdown.
pub struct BackendSession {
    store: SessionStore,
    credentials: Credentials,
    data: SessionData,
}

impl BackendSession {
    pub fn new(store: SessionStore, credentials: Credentials, data: SessionData) -> Self {
        BackendSession {
            store,
            credentials,
            data,
        }
    }

    /// Load credentials and persisted tokens from `store`.
    pub fn acquire(store: SessionStore) -> Result<Self> {
        let credentials = store.credentials()?;
        let data = store.load()?.with_context(|| {
            format!(
                "No Google session found at {}. Run `calchat auth` first.",
                store.session_path().display()
            )
        })?;

        debug!(path = %store.session_path().display(), "Loaded Google session");
        Ok(Self::new(store, credentials, data))
    }

    pub fn data(&self) -> &SessionData {
        &self.data
    }

    pub fn needs_refresh(&self) -> bool {
        self.data.needs_refresh_at(Utc::now())
    }

    /// Refresh the access token if it is expired or about to be.
    pub async fn ensure_fresh(&mut self) -> Result<()> {
        if !self.needs_refresh() {
            return Ok(());
        }

        info!("Google access token expired, refreshing");

        let tokens = self
            .client()
            .refresh_access_token()
            .await
            .context("Failed to refresh token")?;

        self.apply_refresh(SessionData::from(&tokens));
        self.store.save(&self.data)
    }

    /// Google usually omits the refresh token on refresh; keep the old one.
    fn apply_refresh(&mut self, mut data: SessionData) {
        if data.refresh_token.is_empty() {
            data.refresh_token = self.data.refresh_token.clone();
        }
        self.data = data;
    }

    pub fn client(&self) -> Client {
        Client::new(
            self.credentials.client_id.clone(),
            self.credentials.client_secret.clone(),
            REDIRECT_URI.to_string(),
            self.data.access_token.clone(),
            self.data.refresh_token.clone(),
        )
    }

    pub fn persist(&self) -> Result<()> {
        self.store.save(&self.data)
    }

    /// Persist the current tokens and drop the session.
    pub fn release(self) -> Result<()> {
        self.persist()
    }
}
