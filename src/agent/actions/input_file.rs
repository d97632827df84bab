use crate::agent::state::{AgentState, StateUpdate};
use crate::error::AgentError;

pub(super) async fn run(state: &AgentState) -> Result<StateUpdate, AgentError> {
    let selector = state
        .data
        .selector
        .as_deref()
        .ok_or(AgentError::MissingField {
            action: "input_file",
            field: "selector",
        })?;
    let file_path = state
        .data
        .file_path
        .as_deref()
        .ok_or(AgentError::MissingField {
            action: "input_file",
            field: "file_path",
        })?;

    match state.page.set_input_files(selector, file_path).await {
        Ok(()) => Ok(StateUpdate::info(format!(
            "Selected {file_path} successfully to {selector} element"
        ))),
        Err(e) => Ok(StateUpdate::error(format!(
            "Failed to select {file_path} to {selector} element: {e}"
        ))),
    }
}
