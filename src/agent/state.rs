use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::browser::PageDriver;
use crate::llm::ChatMessage;

/// The designated `action` value meaning "stop the run".
pub const END_ACTION: &str = "END";

/// Structured parameters for the next action. Fields are action-specific
/// and mutually optional; each action validates the ones it needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionData {
    pub url: Option<String>,
    pub selector: Option<String>,
    pub text: Option<String>,
    pub file_path: Option<String>,
}

/// Origin of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Info,
    Error,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::Info => "info",
            EntryKind::Error => "error",
        }
    }
}

/// One immutable line of the run transcript. Ordering is the only
/// structural guarantee the transcript makes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub kind: EntryKind,
    pub content: String,
}

impl TranscriptEntry {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::Info,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::Error,
            content: content.into(),
        }
    }
}

/// Mutable state threaded through every loop iteration.
///
/// `messages` accumulates for the whole run; `action`, `data` and `docs`
/// only carry the current cycle and are overwritten by the next one.
pub struct AgentState {
    pub requirement: String,
    pub page: Arc<dyn PageDriver>,
    pub action: String,
    pub data: ActionData,
    pub docs: String,
    pub messages: Vec<TranscriptEntry>,
}

impl AgentState {
    pub fn new(requirement: impl Into<String>, page: Arc<dyn PageDriver>) -> Self {
        Self {
            requirement: requirement.into(),
            page,
            action: String::new(),
            data: ActionData::default(),
            docs: String::new(),
            messages: Vec::new(),
        }
    }

    /// Merge a partial update into the state: `messages` append, every
    /// other field replaces when the update carries it.
    pub fn apply(&mut self, update: StateUpdate) {
        if let Some(action) = update.action {
            self.action = action;
        }
        if let Some(data) = update.data {
            self.data = data;
        }
        if let Some(docs) = update.docs {
            self.docs = docs;
        }
        self.messages.extend(update.messages);
    }

    /// The transcript so far as conversation turns for the model, oldest
    /// first. Every entry speaks with the agent's voice.
    pub fn transcript_messages(&self) -> Vec<ChatMessage> {
        self.messages
            .iter()
            .map(|entry| ChatMessage::assistant(&entry.content))
            .collect()
    }
}

/// A partial-state update produced by the retriever, the decision engine,
/// or an action, merged via [`AgentState::apply`].
#[derive(Debug, Default)]
pub struct StateUpdate {
    pub action: Option<String>,
    pub data: Option<ActionData>,
    pub docs: Option<String>,
    pub messages: Vec<TranscriptEntry>,
}

impl StateUpdate {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            messages: vec![TranscriptEntry::info(content)],
            ..Default::default()
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            messages: vec![TranscriptEntry::error(content)],
            ..Default::default()
        }
    }

    pub fn docs(docs: impl Into<String>) -> Self {
        Self {
            docs: Some(docs.into()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;

    struct NullPage;

    #[async_trait]
    impl PageDriver for NullPage {
        async fn content(&self) -> Result<String> {
            Ok(String::new())
        }
        async fn navigate(&self, _url: &str) -> Result<()> {
            Ok(())
        }
        async fn click(&self, _selector: &str) -> Result<()> {
            Ok(())
        }
        async fn fill(&self, _selector: &str, _text: &str) -> Result<()> {
            Ok(())
        }
        async fn set_input_files(&self, _selector: &str, _file_path: &str) -> Result<()> {
            Ok(())
        }
    }

    fn state() -> AgentState {
        AgentState::new("upload a video", Arc::new(NullPage))
    }

    #[test]
    fn apply_appends_messages_and_replaces_the_rest() {
        let mut state = state();
        state.apply(StateUpdate::info("first"));
        state.apply(StateUpdate {
            action: Some("click_element".to_string()),
            data: Some(ActionData {
                selector: Some("#open".to_string()),
                ..Default::default()
            }),
            docs: Some("part one".to_string()),
            messages: vec![TranscriptEntry::error("second")],
        });

        assert_eq!(state.action, "click_element");
        assert_eq!(state.data.selector.as_deref(), Some("#open"));
        assert_eq!(state.docs, "part one");
        assert_eq!(
            state.messages,
            vec![
                TranscriptEntry::info("first"),
                TranscriptEntry::error("second")
            ]
        );
    }

    #[test]
    fn apply_without_fields_leaves_previous_cycle_values() {
        let mut state = state();
        state.apply(StateUpdate {
            action: Some("navigate_page".to_string()),
            docs: Some("docs".to_string()),
            ..Default::default()
        });
        state.apply(StateUpdate::info("only a message"));

        assert_eq!(state.action, "navigate_page");
        assert_eq!(state.docs, "docs");
        assert_eq!(state.messages.len(), 1);
    }

    #[test]
    fn transcript_messages_preserve_order() {
        let mut state = state();
        state.apply(StateUpdate::info("a"));
        state.apply(StateUpdate::error("b"));

        let turns = state.transcript_messages();
        assert_eq!(turns.len(), 2);
        assert!(turns.iter().all(|m| m.role == "assistant"));
        assert_eq!(turns[0].content, "a");
        assert_eq!(turns[1].content, "b");
    }
}
