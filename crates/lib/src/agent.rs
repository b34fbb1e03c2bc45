//! Agent facade and the shipped tool-calling agent.
//!
//! The rest of the crate only sees [`Agent::run`]: one prompt in, one answer (or error) out.
//! [`ToolCallingAgent`] implements it as a loop over an [`LlmBackend`]: call the model with the
//! tool definitions, execute any tool calls, feed the results back, and stop when the model
//! answers without tools, calls `terminate`, or the step budget runs out.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::llm::{ChatMessage, LlmBackend, LlmError, ToolCall, ToolDefinition};
use crate::tools::{ToolExecutor, TERMINATE};

pub const DEFAULT_MAX_STEPS: usize = 10;
pub const DEFAULT_MAX_MESSAGES: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("agent stopped after {0} steps without an answer")]
    StepLimit(usize),
    #[error("{0}")]
    Other(String),
}

/// The one operation the shell depends on. Implementations are shared across submissions but
/// never called concurrently; the session controller guarantees one call at a time.
#[async_trait]
pub trait Agent: Send + Sync {
    async fn run(&self, prompt: &str) -> Result<String, AgentError>;
}

/// ReAct-style agent: model + tools + conversation memory that lives as long as the agent.
pub struct ToolCallingAgent<B: LlmBackend> {
    backend: B,
    model: String,
    system_prompt: Option<String>,
    tools: Vec<ToolDefinition>,
    executor: Option<Box<dyn ToolExecutor>>,
    max_steps: usize,
    max_messages: usize,
    memory: Mutex<Vec<ChatMessage>>,
}

impl<B: LlmBackend> ToolCallingAgent<B> {
    pub fn new(backend: B, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
            system_prompt: None,
            tools: Vec::new(),
            executor: None,
            max_steps: DEFAULT_MAX_STEPS,
            max_messages: DEFAULT_MAX_MESSAGES,
            memory: Mutex::new(Vec::new()),
        }
    }

    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt.filter(|p| !p.trim().is_empty());
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>, executor: Box<dyn ToolExecutor>) -> Self {
        self.tools = tools;
        self.executor = Some(executor);
        self
    }

    /// Zero is treated as one: every run gets at least one model call.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    /// Cap on remembered messages; the oldest are forgotten first. 0 keeps everything.
    pub fn with_max_messages(mut self, max_messages: usize) -> Self {
        self.max_messages = max_messages;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Number of messages remembered so far (user, assistant, and tool results).
    pub async fn memory_len(&self) -> usize {
        self.memory.lock().await.len()
    }

    /// Append to memory, then forget from the front until under the cap. Tool results are only
    /// dropped along with (or after) the assistant message that requested them, so memory never
    /// starts with an orphaned `tool` message.
    fn remember(&self, memory: &mut Vec<ChatMessage>, message: ChatMessage) {
        memory.push(message);
        if self.max_messages == 0 || memory.len() <= self.max_messages {
            return;
        }
        let mut cut = memory.len() - self.max_messages;
        while cut < memory.len() && memory[cut].role == "tool" {
            cut += 1;
        }
        memory.drain(..cut);
        log::debug!("agent: forgot {} old message(s)", cut);
    }

    fn request_messages(&self, memory: &[ChatMessage]) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(memory.len() + 1);
        if let Some(ref prompt) = self.system_prompt {
            messages.push(ChatMessage::system(prompt.clone()));
        }
        messages.extend_from_slice(memory);
        messages
    }

    fn run_tool(&self, call: &ToolCall) -> String {
        let name = call.function.name.as_str();
        let Some(executor) = self.executor.as_deref() else {
            return format!("error: tool {} is not available", name);
        };
        log::info!("agent: calling tool {}", name);
        match executor.execute(name, &call.function.arguments) {
            Ok(out) => out,
            Err(e) => {
                log::warn!("agent: tool {} failed: {}", name, e);
                format!("error: {}", e)
            }
        }
    }
}

#[async_trait]
impl<B: LlmBackend> Agent for ToolCallingAgent<B> {
    async fn run(&self, prompt: &str) -> Result<String, AgentError> {
        let mut memory = self.memory.lock().await;
        self.remember(&mut memory, ChatMessage::user(prompt));
        log::info!("agent: using model {}", self.model);

        let tools = if self.tools.is_empty() {
            None
        } else {
            Some(self.tools.clone())
        };
        let mut last_content = String::new();

        for step in 1..=self.max_steps {
            log::debug!("agent: step {}/{}", step, self.max_steps);
            let res = self
                .backend
                .chat(&self.model, self.request_messages(&memory), tools.clone())
                .await?;
            let content = res.content().to_string();
            let tool_calls = res.tool_calls().to_vec();
            if !content.trim().is_empty() {
                last_content = content.clone();
            }

            self.remember(
                &mut memory,
                ChatMessage {
                    role: "assistant".to_string(),
                    content: content.clone(),
                    tool_calls: if tool_calls.is_empty() {
                        None
                    } else {
                        Some(tool_calls.clone())
                    },
                    tool_name: None,
                },
            );

            if tool_calls.is_empty() {
                return Ok(content);
            }

            let mut terminated = None;
            for call in &tool_calls {
                let output = self.run_tool(call);
                if call.function.name == TERMINATE {
                    terminated = Some(output.clone());
                }
                self.remember(&mut memory, ChatMessage::tool(call.function.name.clone(), output));
            }
            if let Some(status) = terminated {
                log::info!("agent: terminated after {} steps", step);
                return Ok(if last_content.trim().is_empty() {
                    status
                } else {
                    last_content
                });
            }
        }

        log::warn!("agent: max steps ({}) reached", self.max_steps);
        Err(AgentError::StepLimit(self.max_steps))
    }
}
