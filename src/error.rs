use thiserror::Error;

/// Fatal errors raised by the agent core.
///
/// Both variants indicate a defective command coming out of the decision
/// engine, not a flaky page. They abort the run; recoverable browser
/// failures never surface here (actions convert those into transcript
/// entries instead).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AgentError {
    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error("action '{action}' requires the '{field}' data field")]
    MissingField {
        action: &'static str,
        field: &'static str,
    },
}

/// Errors from the model inference boundary.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("malformed model response: {0}")]
    Malformed(String),
}

/// Errors from the persistence harness.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("unknown test case id {0}")]
    UnknownTestCase(i64),
}
