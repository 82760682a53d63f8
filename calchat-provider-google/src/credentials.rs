//! User-provided OAuth client credentials.
//!
//! Read from `credentials.toml`, or from the `credentials.json` file the
//! Google Cloud console downloads for a desktop app.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Shape of the console download: the client sits under `installed` or `web`.
#[derive(Deserialize)]
struct ConsoleDownload {
    installed: Option<Credentials>,
    web: Option<Credentials>,
}

impl Credentials {
    pub fn load(dir: &Path) -> Result<Self> {
        let toml_path = dir.join("credentials.toml");
        if toml_path.exists() {
            let path = toml_path.display();
            let contents = std::fs::read_to_string(&toml_path)
                .with_context(|| format!("Failed to read credentials from {}", path))?;
            return toml::from_str(&contents)
                .with_context(|| format!("Failed to parse credentials from {}", path));
        }

        let json_path = dir.join("credentials.json");
        if json_path.exists() {
            let path = json_path.display();
            let contents = std::fs::read_to_string(&json_path)
                .with_context(|| format!("Failed to read credentials from {}", path))?;
            let download: ConsoleDownload = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse credentials from {}", path))?;
            return download
                .installed
                .or(download.web)
                .with_context(|| format!("No 'installed' or 'web' client in {}", path));
        }

        anyhow::bail!(
            "Google credentials not found.\n\n\
            Create {} with:\n\n\
            client_id = \"your-client-id.apps.googleusercontent.com\"\n\
            client_secret = \"your-client-secret\"\n\n\
            or place the credentials.json downloaded from\n\
            https://console.cloud.google.com/apis/credentials in {}",
            toml_path.display(),
            dir.display()
        );
    }
}
