use std::io::{BufRead, Write};

use anyhow::Result;
use calchat_core::{AppConfig, Orchestrator};

use crate::app::App;
use crate::render;
use crate::utils::tui::create_spinner;

const EXIT_COMMANDS: &[&str] = &["quit", "exit", "bye"];

pub fn is_exit_command(input: &str) -> bool {
    EXIT_COMMANDS.iter().any(|c| input.eq_ignore_ascii_case(c))
}

pub async fn run(config: AppConfig) -> Result<()> {
    let app = App::build(&config)?;

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let result = shell(&app.orchestrator, stdin.lock(), &mut stdout, true).await;

    app.shutdown().await?;
    result
}

/// Read questions until an exit command or end of input.
pub async fn shell<R: BufRead, W: Write>(
    orchestrator: &Orchestrator,
    mut input: R,
    output: &mut W,
    show_progress: bool,
) -> Result<()> {
    writeln!(output, "{}", render::banner())?;

    loop {
        write!(output, "{}", render::prompt())?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            break;
        }

        let text = line.trim();
        if is_exit_command(text) {
            break;
        }
        if text.is_empty() {
            continue;
        }

        let spinner =
            show_progress.then(|| create_spinner("🤖 Assistant is thinking...".to_string()));
        let answer = orchestrator.submit_turn(text).await;
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }

        writeln!(output, "{}", render::answer(&answer))?;
    }

    writeln!(output, "{}", render::goodbye())?;
    Ok(())
}
