//! File listing tool returning resource links.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::Result;
use crate::mcp::handler::{
    get_optional_string_arg, get_string_arg, text_content, ToolHandler,
};
use crate::mcp::protocol::{ContentBlock, Tool, ToolResult};

/// Fixture listing served by the explorer; there is no real filesystem walk.
const MOCK_FILES: &[(&str, u64, &str)] = &[
    ("README.md", 1024, "markdown"),
    ("package.json", 512, "json"),
    ("src/index.ts", 2048, "typescript"),
];

/// File system explorer tool.
pub struct ListFilesTool;

impl ListFilesTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolHandler for ListFilesTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "list-files".to_string(),
            description: "List files in a directory with metadata".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "directory": {
                        "type": "string",
                        "description": "Directory path to explore"
                    },
                    "pattern": {
                        "type": "string",
                        "description": "File pattern to match"
                    }
                },
                "required": ["directory"]
            }),
        }
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
        let directory = get_string_arg(&args, "directory")?;
        let pattern =
            get_optional_string_arg(&args, "pattern").unwrap_or_else(|| "*".to_string());

        let matches: Vec<_> = MOCK_FILES
            .iter()
            .filter(|(name, _, _)| pattern == "*" || name.contains(&pattern))
            .collect();

        let mut content = vec![text_content(format!(
            "Found {} files in {}:",
            matches.len(),
            directory
        ))];

        for (name, size, file_type) in matches {
            content.push(ContentBlock::ResourceLink {
                uri: format!("file://{}/{}", directory, name),
                name: (*name).to_string(),
                mime_type: Some(mime_for(file_type).to_string()),
                description: Some(format!("{} file ({} bytes)", file_type, size)),
            });
        }

        Ok(ToolResult {
            content,
            is_error: false,
        })
    }
}

fn mime_for(file_type: &str) -> &'static str {
    match file_type {
        "markdown" => "text/markdown",
        "json" => "application/json",
        "typescript" => "text/typescript",
        _ => "text/plain",
    }
}
