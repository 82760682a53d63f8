use anyhow::Result;
use calchat_provider_google::{SessionStore, auth};

pub async fn run() -> Result<()> {
    let store = SessionStore::default_location()?;

    println!("Authenticating with Google Calendar...");

    let session = auth::authenticate(store.clone()).await?;
    session.release()?;

    println!("\nSaved session to {}", store.session_path().display());
    println!("\nRun `calchat` to start asking about your calendar.");

    Ok(())
}
