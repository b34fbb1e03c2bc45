//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.perch/config.json`) and environment.
//! Every key is optional; a missing file means defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::agent::{DEFAULT_MAX_MESSAGES, DEFAULT_MAX_STEPS};

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Model, backend URL, prompt, and step budget for the agent.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Log view settings.
    #[serde(default)]
    pub logs: LogsConfig,

    /// Built-in tool settings.
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Agent defaults (model, backend, workspace).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    /// Ollama model name as shown by `ollama list` (e.g. "llama3.2:latest", "qwen3:8b"). Overridden by PERCH_MODEL env.
    #[serde(default = "default_model")]
    pub model: String,

    /// Ollama base URL (default http://127.0.0.1:11434). Overridden by PERCH_OLLAMA_URL env.
    #[serde(default)]
    pub ollama_url: Option<String>,

    /// Optional system message sent before the conversation on every model call.
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Maximum model calls per request before giving up (default 10).
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    /// Messages the agent remembers across requests; the oldest are forgotten first
    /// (default 100). 0 keeps everything.
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,

    /// Directory the file_saver tool writes into (default ~/.perch/workspace).
    #[serde(default)]
    pub workspace: Option<PathBuf>,
}

fn default_model() -> String {
    "llama3.2:latest".to_string()
}

fn default_max_steps() -> usize {
    DEFAULT_MAX_STEPS
}

fn default_max_messages() -> usize {
    DEFAULT_MAX_MESSAGES
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            ollama_url: None,
            system_prompt: None,
            max_steps: default_max_steps(),
            max_messages: default_max_messages(),
            workspace: None,
        }
    }
}

/// Log view settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsConfig {
    /// Lines kept in the log view; older lines are dropped. 0 keeps everything.
    #[serde(default = "default_log_lines")]
    pub max_lines: usize,
}

fn default_log_lines() -> usize {
    2000
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            max_lines: default_log_lines(),
        }
    }
}

/// Built-in tool settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsConfig {
    /// Tool names to hide from the agent (e.g. ["file_saver"]).
    #[serde(default)]
    pub disabled: Vec<String>,
}

fn env_override(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

/// Resolve the model: env PERCH_MODEL overrides config; blank config falls back to the default.
pub fn resolve_model(config: &Config) -> String {
    env_override("PERCH_MODEL").unwrap_or_else(|| {
        let m = config.agent.model.trim();
        if m.is_empty() {
            log::warn!("config: agent.model is empty, using {}", default_model());
            default_model()
        } else {
            m.to_string()
        }
    })
}

/// Resolve the Ollama URL: env PERCH_OLLAMA_URL overrides config.
pub fn resolve_ollama_url(config: &Config) -> Option<String> {
    env_override("PERCH_OLLAMA_URL").or_else(|| {
        config
            .agent
            .ollama_url
            .as_ref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("PERCH_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".perch").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Resolve the workspace directory: `agent.workspace` (relative paths resolved against the
/// config file's parent), else `workspace` next to the config file.
pub fn resolve_workspace_dir(config: &Config, config_path: &Path) -> PathBuf {
    let config_parent = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    match &config.agent.workspace {
        Some(d) if !d.as_os_str().is_empty() => {
            if d.is_absolute() {
                d.clone()
            } else {
                config_parent.join(d)
            }
        }
        _ => config_parent.join("workspace"),
    }
}

/// Load config from the given path, or the default path (or PERCH_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used (for resolving the config directory).
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
