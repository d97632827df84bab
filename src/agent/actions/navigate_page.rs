use crate::agent::state::{AgentState, StateUpdate};
use crate::error::AgentError;

pub(super) async fn run(state: &AgentState) -> Result<StateUpdate, AgentError> {
    let url = state.data.url.as_deref().ok_or(AgentError::MissingField {
        action: "navigate_page",
        field: "url",
    })?;

    match state.page.navigate(url).await {
        Ok(()) => Ok(StateUpdate::info(format!(
            "Navigated to {url} successfully."
        ))),
        Err(e) => Ok(StateUpdate::error(format!(
            "Failed to navigate to {url}: {e}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::agent::actions::testing::{RecordingPage, state_with};
    use crate::agent::state::{ActionData, EntryKind};

    fn data(url: Option<&str>) -> ActionData {
        ActionData {
            url: url.map(String::from),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn missing_url_is_a_fatal_validation_error() {
        let page = Arc::new(RecordingPage::ok());
        let state = state_with(page.clone(), data(None));

        let err = run(&state).await.unwrap_err();
        assert_eq!(
            err,
            AgentError::MissingField {
                action: "navigate_page",
                field: "url"
            }
        );
        assert!(page.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn success_produces_one_info_entry() {
        let page = Arc::new(RecordingPage::ok());
        let state = state_with(page.clone(), data(Some("https://example.com")));

        let update = run(&state).await.unwrap();
        assert_eq!(update.messages.len(), 1);
        assert_eq!(update.messages[0].kind, EntryKind::Info);
        assert_eq!(
            update.messages[0].content,
            "Navigated to https://example.com successfully."
        );
        assert_eq!(
            *page.calls.lock().unwrap(),
            vec!["navigate https://example.com".to_string()]
        );
    }

    #[tokio::test]
    async fn browser_failure_becomes_an_error_entry() {
        let page = Arc::new(RecordingPage::failing());
        let state = state_with(page, data(Some("https://example.com")));

        let update = run(&state).await.unwrap();
        assert_eq!(update.messages.len(), 1);
        assert_eq!(update.messages[0].kind, EntryKind::Error);
        assert!(
            update.messages[0]
                .content
                .starts_with("Failed to navigate to https://example.com:")
        );
    }
}
