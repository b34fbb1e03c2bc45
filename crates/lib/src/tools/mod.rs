//! Tool layer: the executor seam used by the agent loop, the built-in tools, and the
//! read-only catalog shown to the user.

mod builtin;

pub use builtin::{BuiltinTools, FILE_SAVER, TERMINATE};
pub use crate::llm::ToolDefinition;

/// Executes a tool by name and JSON arguments. Returns output or error string.
pub trait ToolExecutor: Send + Sync {
    fn execute(&self, name: &str, args: &serde_json::Value) -> Result<String, String>;
}

/// One row in the tool catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

/// Static list of the tools the agent can call, for display.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    entries: Vec<ToolInfo>,
}

impl ToolCatalog {
    pub fn from_definitions(defs: &[ToolDefinition]) -> Self {
        let entries = defs
            .iter()
            .map(|d| ToolInfo {
                name: d.function.name.clone(),
                description: d.function.description.clone().unwrap_or_default(),
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[ToolInfo] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Plain-text listing, one `name - description` line per tool.
    pub fn render_text(&self) -> String {
        if self.entries.is_empty() {
            return "No tools enabled.".to_string();
        }
        self.entries
            .iter()
            .map(|t| {
                if t.description.is_empty() {
                    t.name.clone()
                } else {
                    format!("{} - {}", t.name, t.description)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ToolFunctionDefinition;

    fn def(name: &str, description: Option<&str>) -> ToolDefinition {
        ToolDefinition {
            typ: "function".to_string(),
            function: ToolFunctionDefinition {
                name: name.to_string(),
                description: description.map(String::from),
                parameters: serde_json::json!({"type": "object"}),
            },
        }
    }

    #[test]
    fn catalog_renders_one_line_per_tool() {
        let catalog = ToolCatalog::from_definitions(&[
            def("file_saver", Some("Save content to a file")),
            def("bare", None),
        ]);
        assert_eq!(catalog.entries().len(), 2);
        assert_eq!(
            catalog.render_text(),
            "file_saver - Save content to a file\nbare"
        );
    }

    #[test]
    fn empty_catalog_says_so() {
        let catalog = ToolCatalog::default();
        assert!(catalog.is_empty());
        assert_eq!(catalog.render_text(), "No tools enabled.");
    }
}
