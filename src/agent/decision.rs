//! Command generation: given the requirement, the retrieved page parts and
//! the transcript so far, pick the next action (or end the run).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::agent::actions::ActionRegistry;
use crate::agent::state::{ActionData, AgentState, END_ACTION, StateUpdate, TranscriptEntry};
use crate::error::LlmError;
use crate::llm::{ChatMessage, DECISION_MODEL, LanguageModel};

const COMMAND_GEN_PROMPT: &str = r#"Analyze the provided page parts and determine the appropriate action to meet the user's requirement and based on what we have done so far. Populate the 'data' field with the necessary information. If all actions are completed or a step fails, respond with 'END' for the action.

Available actions:
{actions}

Rules:
1. Return ONLY a single JSON object per response. No markdown, no explanation.
2. The JSON object has the shape {"action": "...", "data": {...}, "description": "..."}.
3. 'action' must be one of the available action names, or 'END' to stop.
4. 'data' carries only the fields the chosen action asks for (url, selector, text, file_path).
5. 'description' briefly states what the command does and why."#;

/// The decision engine's structured output: which action to run next,
/// with what data, and the rationale that becomes a transcript entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    pub action: String,
    #[serde(default)]
    pub data: ActionData,
    pub description: String,
}

impl Command {
    /// A stop command carrying the given rationale.
    pub fn terminal(description: impl Into<String>) -> Self {
        Self {
            action: END_ACTION.to_string(),
            data: ActionData::default(),
            description: description.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.action == END_ACTION
    }

    /// The state update this command implies: next action and data replace
    /// the previous cycle's, the rationale joins the transcript.
    pub fn into_update(self) -> StateUpdate {
        StateUpdate {
            action: Some(self.action),
            data: Some(self.data),
            docs: None,
            messages: vec![TranscriptEntry::info(self.description)],
        }
    }
}

pub struct DecisionEngine {
    llm: Arc<dyn LanguageModel>,
    system_prompt: String,
}

impl DecisionEngine {
    pub fn new(llm: Arc<dyn LanguageModel>, registry: &ActionRegistry) -> Self {
        Self {
            llm,
            system_prompt: COMMAND_GEN_PROMPT.replace("{actions}", &registry.instructions()),
        }
    }

    /// Produce the next command. Never fails: any model or parse problem
    /// is converted into a terminal command so the loop stops gracefully
    /// instead of crashing.
    pub async fn decide(&self, state: &AgentState) -> Command {
        match self.generate(state).await {
            Ok(command) => command,
            Err(e) => {
                warn!("decision generation failed: {e}");
                Command::terminal(format!("Ending run: decision generation failed ({e})"))
            }
        }
    }

    async fn generate(&self, state: &AgentState) -> Result<Command, LlmError> {
        let mut messages = vec![
            ChatMessage::system(&self.system_prompt),
            ChatMessage::user(format!(
                "Requirement: {}\nPage Parts: {}",
                state.requirement, state.docs
            )),
        ];
        messages.extend(state.transcript_messages());

        let content = self.llm.chat(DECISION_MODEL, &messages).await?;
        debug!("decision model replied: {content}");
        parse_command(&content)
    }
}

/// Parse a command out of the model's reply, tolerating the markdown
/// fences models like to add around JSON.
pub(crate) fn parse_command(content: &str) -> Result<Command, LlmError> {
    let cleaned = content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    serde_json::from_str(cleaned)
        .map_err(|e| LlmError::Malformed(format!("not a valid command: {e}; content: {cleaned}")))
}
