use anyhow::Result;
use calchat_core::ToolRegistry;
use serde_json::json;

use crate::render;

pub fn run(as_json: bool) -> Result<()> {
    let registry = ToolRegistry::calendar()?;

    if as_json {
        let tools: Vec<_> = registry
            .list_tools()
            .iter()
            .map(|spec| json!({"type": "function", "function": spec}))
            .collect();
        println!("{}", serde_json::to_string_pretty(&tools)?);
        return Ok(());
    }

    for spec in registry.list_tools() {
        println!("{}\n", render::tool(spec));
    }

    Ok(())
}
