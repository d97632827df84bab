use crate::agent::state::{AgentState, StateUpdate};
use crate::error::AgentError;

pub(super) async fn run(state: &AgentState) -> Result<StateUpdate, AgentError> {
    let selector = state
        .data
        .selector
        .as_deref()
        .ok_or(AgentError::MissingField {
            action: "type_text",
            field: "selector",
        })?;
    let text = state.data.text.as_deref().ok_or(AgentError::MissingField {
        action: "type_text",
        field: "text",
    })?;

    match state.page.fill(selector, text).await {
        Ok(()) => Ok(StateUpdate::info(format!(
            "Typed {text} to {selector} element"
        ))),
        Err(e) => Ok(StateUpdate::error(format!(
            "Failed to type {text} to {selector} element: {e}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::agent::actions::testing::{RecordingPage, state_with};
    use crate::agent::state::{ActionData, EntryKind};

    fn data(selector: Option<&str>, text: Option<&str>) -> ActionData {
        ActionData {
            selector: selector.map(String::from),
            text: text.map(String::from),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn missing_selector_or_text_is_fatal() {
        let page = Arc::new(RecordingPage::ok());

        let state = state_with(page.clone(), data(None, Some("hello")));
        assert_eq!(
            run(&state).await.unwrap_err(),
            AgentError::MissingField {
                action: "type_text",
                field: "selector"
            }
        );

        let state = state_with(page.clone(), data(Some("#search"), None));
        assert_eq!(
            run(&state).await.unwrap_err(),
            AgentError::MissingField {
                action: "type_text",
                field: "text"
            }
        );
        assert!(page.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn success_produces_one_info_entry() {
        let page = Arc::new(RecordingPage::ok());
        let state = state_with(page.clone(), data(Some("#search"), Some("cats")));

        let update = run(&state).await.unwrap();
        assert_eq!(update.messages.len(), 1);
        assert_eq!(update.messages[0].kind, EntryKind::Info);
        assert_eq!(update.messages[0].content, "Typed cats to #search element");
        assert_eq!(
            *page.calls.lock().unwrap(),
            vec!["fill #search cats".to_string()]
        );
    }

    #[tokio::test]
    async fn browser_failure_becomes_an_error_entry() {
        let page = Arc::new(RecordingPage::failing());
        let state = state_with(page, data(Some("#search"), Some("cats")));

        let update = run(&state).await.unwrap();
        assert_eq!(update.messages.len(), 1);
        assert_eq!(update.messages[0].kind, EntryKind::Error);
        assert!(
            update.messages[0]
                .content
                .starts_with("Failed to type cats to #search element:")
        );
    }
}
