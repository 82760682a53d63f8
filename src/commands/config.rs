use anyhow::Result;
use calchat_core::AppConfig;
use calchat_core::config::create_default_config;
use calchat_provider_google::SessionStore;
use owo_colors::OwoColorize;

pub fn init() -> Result<()> {
    let path = AppConfig::config_path()?;
    create_default_config(&path)?;

    println!("Created {}", path.display());
    Ok(())
}

pub fn show(config: &AppConfig) -> Result<()> {
    let config_path = AppConfig::config_path()?;
    let store = SessionStore::default_location()?;

    println!("{}", "Paths".bold());
    println!("  Config:       {}", config_path.display());
    println!("  Credentials:  {}", store.dir().join("credentials.toml").display());
    println!("  Session:      {}", store.session_path().display());
    println!();
    println!("{}", "Settings".bold());
    println!("  model:                {}", config.model);
    println!("  base_url:             {}", config.base_url);
    println!("  max_tool_hops:        {}", config.max_tool_hops);
    println!("  model_timeout_secs:   {}", config.model_timeout_secs);
    println!("  backend_timeout_secs: {}", config.backend_timeout_secs);
    println!(
        "  system_prompt:        {}",
        if config.system_prompt.is_some() { "custom" } else { "default" }
    );

    Ok(())
}
