//! The calendar tools offered to the model.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde_json::json;

use crate::error::RegistryError;
use crate::schema::ArgumentSchema;
use crate::tool::ToolSpec;

pub const DEFAULT_MAX_RESULTS: u32 = 10;

/// Google's alias for the user's main calendar
pub const DEFAULT_CALENDAR_ID: &str = "primary";

/// The closed set of tools this system can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalendarTool {
    GetUpcomingEvents,
    SearchEvents,
}

impl CalendarTool {
    pub const ALL: [CalendarTool; 2] = [
        CalendarTool::GetUpcomingEvents,
        CalendarTool::SearchEvents,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CalendarTool::GetUpcomingEvents => "get_upcoming_events",
            CalendarTool::SearchEvents => "search_events",
        }
    }

    pub fn spec(&self) -> ToolSpec {
        match self {
            CalendarTool::GetUpcomingEvents => ToolSpec {
                name: self.name().to_string(),
                description: "Get upcoming events from Google Calendar".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "max_results": {
                            "type": "integer",
                            "description": "Maximum number of events to return (default: 10)",
                            "minimum": 1,
                            "default": DEFAULT_MAX_RESULTS
                        },
                        "calendar_id": {
                            "type": "string",
                            "description": "Calendar ID to query (default: 'primary')",
                            "default": DEFAULT_CALENDAR_ID
                        }
                    },
                    "required": []
                }),
            },
            CalendarTool::SearchEvents => ToolSpec {
                name: self.name().to_string(),
                description: "Search for events in Google Calendar".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "Search query for events",
                            "minLength": 1,
                            "pattern": "\\S"
                        },
                        "max_results": {
                            "type": "integer",
                            "description": "Maximum number of events to return",
                            "minimum": 1,
                            "default": DEFAULT_MAX_RESULTS
                        },
                        "calendar_id": {
                            "type": "string",
                            "description": "Calendar ID to search in (default: 'primary')",
                            "default": DEFAULT_CALENDAR_ID
                        }
                    },
                    "required": ["query"]
                }),
            },
        }
    }
}

impl fmt::Display for CalendarTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CalendarTool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CalendarTool::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| format!("Unknown function: {}", s))
    }
}

/// Ordered, immutable set of tool specs built at startup, with each
/// parameter schema compiled once.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    specs: Vec<ToolSpec>,
    schemas: HashMap<CalendarTool, ArgumentSchema>,
}

impl ToolRegistry {
    /// The two read-only calendar tools.
    pub fn calendar() -> Result<Self, RegistryError> {
        let mut specs = Vec::with_capacity(CalendarTool::ALL.len());
        let mut schemas = HashMap::new();

        for tool in CalendarTool::ALL {
            let spec = tool.spec();
            let schema =
                ArgumentSchema::compile(&spec.parameters).map_err(|detail| RegistryError {
                    tool: spec.name.clone(),
                    detail,
                })?;
            schemas.insert(tool, schema);
            specs.push(spec);
        }

        Ok(ToolRegistry { specs, schemas })
    }

    pub fn list_tools(&self) -> &[ToolSpec] {
        &self.specs
    }

    pub fn lookup(&self, name: &str) -> Option<&ToolSpec> {
        self.specs.iter().find(|t| t.name == name)
    }

    /// The tool called `name` and its compiled schema.
    pub fn resolve(&self, name: &str) -> Option<(CalendarTool, &ArgumentSchema)> {
        let tool: CalendarTool = name.parse().ok()?;
        self.schemas.get(&tool).map(|schema| (tool, schema))
    }
}
