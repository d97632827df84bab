//! Browser actions the decision engine can choose from.
//!
//! The set is closed: every action is a variant of [`ActionKind`] and is
//! registered into the [`ActionRegistry`] by an explicit call at startup.
//! Adding an action means adding a variant, a module, and one line in
//! [`ActionKind::ALL`].

mod click_element;
mod input_file;
mod navigate_page;
mod type_text;

use std::collections::HashMap;

use crate::agent::state::{AgentState, StateUpdate};
use crate::error::AgentError;

/// One executable browser action.
///
/// `run` performs a single side effect against the state's page and
/// reports the outcome as a transcript entry. A missing required data
/// field is a fatal error and aborts the run; a failing browser operation
/// is converted into an error entry so the next decision can react to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    NavigatePage,
    ClickElement,
    TypeText,
    InputFile,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [
        ActionKind::NavigatePage,
        ActionKind::ClickElement,
        ActionKind::TypeText,
        ActionKind::InputFile,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ActionKind::NavigatePage => "navigate_page",
            ActionKind::ClickElement => "click_element",
            ActionKind::TypeText => "type_text",
            ActionKind::InputFile => "input_file",
        }
    }

    /// Documentation shown to humans and quoted to the decision model so
    /// it knows which data fields the action needs.
    pub fn doc(self) -> &'static str {
        match self {
            ActionKind::NavigatePage => {
                "Navigate page to specific URL. You must provide 'url' to be navigated to the data field."
            }
            ActionKind::ClickElement => {
                "Click element action is used to click any element of the page. You must provide CSS 'selector' of element which to be clicked."
            }
            ActionKind::TypeText => {
                "Type text to input or textarea element. You must provide CSS 'selector' of element which to be clicked and 'text' to be typed."
            }
            ActionKind::InputFile => {
                "Input file action is used to select file for input[type=file] element of the page. You must provide CSS 'selector' of element which to be clicked and 'file_path' to be selected."
            }
        }
    }

    pub async fn run(self, state: &AgentState) -> Result<StateUpdate, AgentError> {
        match self {
            ActionKind::NavigatePage => navigate_page::run(state).await,
            ActionKind::ClickElement => click_element::run(state).await,
            ActionKind::TypeText => type_text::run(state).await,
            ActionKind::InputFile => input_file::run(state).await,
        }
    }
}

/// Mapping from action name to executable action, built once at startup
/// and read-only afterward.
pub struct ActionRegistry {
    actions: HashMap<String, ActionKind>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
        }
    }

    /// Registry pre-populated with every builtin action.
    pub fn with_builtin_actions() -> Self {
        let mut registry = Self::new();
        for kind in ActionKind::ALL {
            registry.register(kind.name(), kind);
        }
        registry
    }

    /// Register an action under a name. The last registration for a name
    /// wins.
    pub fn register(&mut self, name: impl Into<String>, action: ActionKind) {
        self.actions.insert(name.into(), action);
    }

    pub fn lookup(&self, name: &str) -> Result<ActionKind, AgentError> {
        self.actions
            .get(name)
            .copied()
            .ok_or_else(|| AgentError::UnknownAction(name.to_string()))
    }

    pub fn all(&self) -> impl Iterator<Item = (&str, ActionKind)> {
        self.actions.iter().map(|(name, kind)| (name.as_str(), *kind))
    }

    /// One "name: doc" line per registered action, sorted by name so the
    /// prompt text is stable across runs.
    pub fn instructions(&self) -> String {
        let mut lines: Vec<String> = self
            .all()
            .map(|(name, kind)| format!("{name}: {}", kind.doc()))
            .collect();
        lines.sort();
        lines.join("\n")
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;

    #[test]
    fn builtin_registry_knows_every_action() {
        let registry = ActionRegistry::with_builtin_actions();
        for kind in ActionKind::ALL {
            assert_eq!(registry.lookup(kind.name()).unwrap(), kind);
        }
    }

    #[test]
    fn lookup_of_unregistered_name_fails_with_unknown_action() {
        let registry = ActionRegistry::with_builtin_actions();
        let err = registry.lookup("scroll_page").unwrap_err();
        assert_eq!(err, AgentError::UnknownAction("scroll_page".to_string()));
    }

    #[test]
    fn last_registration_wins() {
        let mut registry = ActionRegistry::new();
        registry.register("go", ActionKind::NavigatePage);
        registry.register("go", ActionKind::ClickElement);

        assert_eq!(registry.lookup("go").unwrap(), ActionKind::ClickElement);
        assert_eq!(registry.all().count(), 1);
    }

    #[test]
    fn instructions_list_every_action_with_its_doc() {
        let registry = ActionRegistry::with_builtin_actions();
        let instructions = registry.instructions();
        for kind in ActionKind::ALL {
            assert!(instructions.contains(kind.name()));
            assert!(instructions.contains(kind.doc()));
        }
    }
}
