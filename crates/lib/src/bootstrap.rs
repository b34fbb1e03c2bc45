//! Wire config into a ready-to-use agent and its tool catalog. Shared by the CLI and desktop.

use std::path::Path;
use std::sync::Arc;

use crate::agent::{Agent, ToolCallingAgent};
use crate::config::{self, Config};
use crate::llm::OllamaClient;
use crate::tools::{BuiltinTools, ToolCatalog};

/// The agent instance for the application's lifetime, plus what it can call.
pub struct AgentSetup {
    pub agent: Arc<dyn Agent>,
    pub catalog: ToolCatalog,
    pub model: String,
}

/// Build the Ollama-backed tool-calling agent described by `config`.
pub fn build_agent(config: &Config, config_path: &Path) -> AgentSetup {
    let model = config::resolve_model(config);
    let client = OllamaClient::new(config::resolve_ollama_url(config));
    let workspace = config::resolve_workspace_dir(config, config_path);
    let tools = BuiltinTools::new(workspace, &config.tools.disabled);
    let catalog = tools.catalog();
    log::info!(
        "agent: model {} at {}, {} tool(s), workspace {}",
        model,
        client.base_url(),
        catalog.entries().len(),
        tools.workspace().display()
    );

    let agent = ToolCallingAgent::new(client, model.clone())
        .with_system_prompt(config.agent.system_prompt.clone())
        .with_max_steps(config.agent.max_steps)
        .with_max_messages(config.agent.max_messages)
        .with_tools(tools.definitions(), Box::new(tools));

    AgentSetup {
        agent: Arc::new(agent),
        catalog,
        model,
    }
}
