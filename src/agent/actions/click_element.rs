use crate::agent::state::{AgentState, StateUpdate};
use crate::error::AgentError;

pub(super) async fn run(state: &AgentState) -> Result<StateUpdate, AgentError> {
    let selector = state
        .data
        .selector
        .as_deref()
        .ok_or(AgentError::MissingField {
            action: "click_element",
            field: "selector",
        })?;

    match state.page.click(selector).await {
        Ok(()) => Ok(StateUpdate::info(format!(
            "Clicked {selector} element successfully"
        ))),
        Err(e) => Ok(StateUpdate::error(format!(
            "Failed to click {selector} element: {e}"
        ))),
    }
}
