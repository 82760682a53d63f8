use anyhow::Result;
use calchat_core::AppConfig;

use crate::app::App;
use crate::render;
use crate::utils::tui::create_spinner;

pub async fn run(config: AppConfig, question: &str) -> Result<()> {
    let question = question.trim();
    if question.is_empty() {
        anyhow::bail!("Nothing to ask. Example:\n  calchat ask \"What are my upcoming events?\"");
    }

    let app = App::build(&config)?;

    let spinner = create_spinner("🤖 Assistant is thinking...".to_string());
    let answer = app.orchestrator.submit_turn(question).await;
    spinner.finish_and_clear();

    println!("{}", render::answer(&answer));

    app.shutdown().await
}
