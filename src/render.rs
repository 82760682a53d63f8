//! Colored terminal output for the chat shell and tool listing.

use calchat_core::ToolSpec;
use owo_colors::OwoColorize;

pub const EXAMPLE_PROMPTS: &[&str] = &[
    "What are my upcoming events?",
    "Search for meetings with John",
    "Show me my next 5 events",
];

pub fn banner() -> String {
    let mut lines = vec![
        format!("🤖 {}", "Google Calendar Assistant".bold()),
        "Ask me about your calendar events!".to_string(),
        "Examples:".to_string(),
    ];
    lines.extend(EXAMPLE_PROMPTS.iter().map(|p| format!("- '{}'", p).dimmed().to_string()));
    lines.push("Type 'quit' to exit\n".to_string());
    lines.join("\n")
}

pub fn prompt() -> String {
    format!("{} ", "You:".green().bold())
}

pub fn answer(text: &str) -> String {
    format!("🤖 {} {}\n", "Assistant:".cyan().bold(), text)
}

pub fn goodbye() -> String {
    "Goodbye! 👋".to_string()
}

pub fn tool(spec: &ToolSpec) -> String {
    let mut lines = vec![format!("{}  {}", spec.name.bold(), spec.description.dimmed())];

    let required: Vec<&str> = spec.parameters["required"]
        .as_array()
        .map(|names| names.iter().filter_map(|n| n.as_str()).collect())
        .unwrap_or_default();

    if let Some(properties) = spec.parameters["properties"].as_object() {
        for (name, property) in properties {
            let kind = property["type"].as_str().unwrap_or("any");
            let detail = if required.contains(&name.as_str()) {
                "required".yellow().to_string()
            } else {
                match property.get("default") {
                    Some(default) => format!("default {}", default),
                    None => "optional".to_string(),
                }
            };
            lines.push(format!("   {}: {} ({})", name, kind, detail));
        }
    }

    lines.join("\n")
}
