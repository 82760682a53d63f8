mod app;
mod commands;
mod render;
mod utils;

use anyhow::Result;
use calchat_core::AppConfig;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "calchat")]
#[command(about = "Ask questions about your Google Calendar in plain language")]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Chat model to use (overrides config and MODEL)
    #[arg(long, global = true)]
    model: Option<String>,

    /// Rounds of tool calls allowed per question (at least 1)
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..))]
    max_tool_hops: Option<u32>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat (default)
    Chat,
    /// Ask a single question and exit
    Ask {
        /// e.g. "What are my upcoming events?"
        #[arg(required = true)]
        question: Vec<String>,
    },
    /// Connect calchat to your Google account
    Auth,
    /// List the calendar tools offered to the model
    Tools {
        /// Print the tool definitions as sent to the model
        #[arg(long)]
        json: bool,
    },
    /// Show or create the configuration file
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a commented default config.toml
    Init,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Config file, then environment, then command-line flags.
fn resolve_config(model: Option<String>, max_tool_hops: Option<u32>) -> Result<AppConfig> {
    let mut config = AppConfig::load()?;
    config.apply_env(|key| std::env::var(key).ok());

    if let Some(model) = model {
        config.model = model;
    }
    if let Some(hops) = max_tool_hops {
        config.max_tool_hops = hops;
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let Cli {
        verbose,
        model,
        max_tool_hops,
        command,
    } = Cli::parse();

    init_tracing(verbose);

    match command.unwrap_or(Commands::Chat) {
        Commands::Chat => commands::chat::run(resolve_config(model, max_tool_hops)?).await,
        Commands::Ask { question } => {
            commands::ask::run(resolve_config(model, max_tool_hops)?, &question.join(" ")).await
        }
        Commands::Auth => commands::auth::run().await,
        Commands::Tools { json } => commands::tools::run(json),
        Commands::Config { action } => match action {
            Some(ConfigAction::Init) => commands::config::init(),
            None => commands::config::show(&resolve_config(model, max_tool_hops)?),
        },
    }
}
