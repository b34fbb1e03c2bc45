//! Built-in tools: `file_saver` (write into the workspace) and `terminate` (end the run).

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use super::{ToolCatalog, ToolExecutor};
use crate::llm::{ToolDefinition, ToolFunctionDefinition};

pub const FILE_SAVER: &str = "file_saver";
pub const TERMINATE: &str = "terminate";

const ALL: [&str; 2] = [FILE_SAVER, TERMINATE];

/// Registry of the built-in tools, minus any disabled in config.
#[derive(Debug, Clone)]
pub struct BuiltinTools {
    workspace: PathBuf,
    enabled: Vec<&'static str>,
}

impl BuiltinTools {
    /// `disabled` names are skipped; unknown names are ignored.
    pub fn new(workspace: PathBuf, disabled: &[String]) -> Self {
        let enabled = ALL
            .iter()
            .copied()
            .filter(|name| !disabled.iter().any(|d| d.trim() == *name))
            .collect();
        Self { workspace, enabled }
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.enabled.iter().any(|n| *n == name)
    }

    /// Function-calling definitions for every enabled tool.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.enabled.iter().map(|name| definition(name)).collect()
    }

    pub fn catalog(&self) -> ToolCatalog {
        ToolCatalog::from_definitions(&self.definitions())
    }
}

impl ToolExecutor for BuiltinTools {
    fn execute(&self, name: &str, args: &serde_json::Value) -> Result<String, String> {
        if !self.has_tool(name) {
            return Err(format!("unknown tool: {}", name));
        }
        let args = normalize_args(args)?;
        match name {
            FILE_SAVER => save_file(&self.workspace, &args),
            TERMINATE => {
                let status = args
                    .get("status")
                    .and_then(|v| v.as_str())
                    .unwrap_or("success");
                Ok(format!(
                    "The interaction has been completed with status: {}",
                    status
                ))
            }
            _ => Err(format!("unknown tool: {}", name)),
        }
    }
}

fn definition(name: &str) -> ToolDefinition {
    let (description, parameters) = match name {
        FILE_SAVER => (
            "Save content to a file in the workspace. Use for text, code, or generated reports.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "content": { "type": "string", "description": "Content to write." },
                    "path": { "type": "string", "description": "File path relative to the workspace." },
                    "mode": { "type": "string", "enum": ["w", "a"], "description": "w to overwrite (default), a to append." }
                },
                "required": ["content", "path"]
            }),
        ),
        _ => (
            "Finish the interaction when the request is met or cannot proceed further.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "status": { "type": "string", "enum": ["success", "failure"], "description": "Outcome of the interaction." }
                },
                "required": ["status"]
            }),
        ),
    };
    ToolDefinition {
        typ: "function".to_string(),
        function: ToolFunctionDefinition {
            name: name.to_string(),
            description: Some(description.to_string()),
            parameters,
        },
    }
}

/// Some models send arguments as a JSON-encoded string instead of an object.
fn normalize_args(args: &serde_json::Value) -> Result<serde_json::Value, String> {
    match args {
        serde_json::Value::String(s) if s.trim().is_empty() => Ok(serde_json::json!({})),
        serde_json::Value::String(s) => {
            serde_json::from_str(s).map_err(|e| format!("invalid arguments: {}", e))
        }
        serde_json::Value::Null => Ok(serde_json::json!({})),
        other => Ok(other.clone()),
    }
}

fn save_file(workspace: &Path, args: &serde_json::Value) -> Result<String, String> {
    let content = args
        .get("content")
        .and_then(|v| v.as_str())
        .ok_or("missing required parameter: content")?;
    let rel = args
        .get("path")
        .and_then(|v| v.as_str())
        .ok_or("missing required parameter: path")?;
    let append = match args.get("mode").and_then(|v| v.as_str()).unwrap_or("w") {
        "w" => false,
        "a" => true,
        other => return Err(format!("invalid mode: {}", other)),
    };
    let path = resolve_in_workspace(workspace, rel)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("creating {}: {}", parent.display(), e))?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(&path)
        .map_err(|e| format!("opening {}: {}", path.display(), e))?;
    file.write_all(content.as_bytes())
        .map_err(|e| format!("writing {}: {}", path.display(), e))?;
    log::info!("file_saver: wrote {} bytes to {}", content.len(), path.display());
    Ok(format!("Content successfully saved to {}", path.display()))
}

/// Join a relative path onto the workspace, refusing anything that could escape it.
fn resolve_in_workspace(workspace: &Path, rel: &str) -> Result<PathBuf, String> {
    let rel_path = Path::new(rel.trim());
    if rel_path.as_os_str().is_empty() {
        return Err("path is empty".to_string());
    }
    for component in rel_path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => return Err(format!("path must stay inside the workspace: {}", rel)),
        }
    }
    Ok(workspace.join(rel_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_workspace() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("perch-tools-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("create workspace");
        dir
    }

    #[test]
    fn disabled_tools_are_hidden_and_refused() {
        let tools = BuiltinTools::new(temp_workspace(), &["file_saver".to_string()]);
        assert!(!tools.has_tool(FILE_SAVER));
        assert_eq!(tools.definitions().len(), 1);
        assert_eq!(tools.catalog().entries()[0].name, TERMINATE);
        let err = tools
            .execute(FILE_SAVER, &serde_json::json!({"content": "x", "path": "a.txt"}))
            .unwrap_err();
        assert!(err.contains("unknown tool"));
    }

    #[test]
    fn file_saver_writes_and_appends() {
        let ws = temp_workspace();
        let tools = BuiltinTools::new(ws.clone(), &[]);
        tools
            .execute(FILE_SAVER, &serde_json::json!({"content": "one", "path": "notes/out.txt"}))
            .unwrap();
        tools
            .execute(
                FILE_SAVER,
                &serde_json::json!({"content": " two", "path": "notes/out.txt", "mode": "a"}),
            )
            .unwrap();
        let written = std::fs::read_to_string(ws.join("notes/out.txt")).unwrap();
        assert_eq!(written, "one two");
    }

    #[test]
    fn file_saver_accepts_string_encoded_arguments() {
        let ws = temp_workspace();
        let tools = BuiltinTools::new(ws.clone(), &[]);
        let args = serde_json::Value::String(r#"{"content":"hi","path":"x.txt"}"#.to_string());
        tools.execute(FILE_SAVER, &args).unwrap();
        assert_eq!(std::fs::read_to_string(ws.join("x.txt")).unwrap(), "hi");
    }

    #[test]
    fn file_saver_rejects_escaping_paths() {
        let tools = BuiltinTools::new(temp_workspace(), &[]);
        for bad in ["../escape.txt", "/etc/passwd", "a/../../b.txt"] {
            let err = tools
                .execute(FILE_SAVER, &serde_json::json!({"content": "x", "path": bad}))
                .unwrap_err();
            assert!(err.contains("inside the workspace"), "{}: {}", bad, err);
        }
    }

    #[test]
    fn terminate_reports_status() {
        let tools = BuiltinTools::new(temp_workspace(), &[]);
        let out = tools
            .execute(TERMINATE, &serde_json::json!({"status": "failure"}))
            .unwrap();
        assert!(out.ends_with("status: failure"));
    }
}
