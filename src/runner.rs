//! Runs one stored test case through the agent and persists the outcome:
//! every transcript line becomes a log row, the final status lands on the
//! test case, and a JSON result artifact is written for the CSV reporter.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::agent::E2eTestAgent;
use crate::agent::state::EntryKind;
use crate::store::{CaseStatus, TestStore};

/// Structured result artifact of one run, the reporter's input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub status: CaseStatus,
    pub error: Option<String>,
    pub finished_at: DateTime<Utc>,
}

impl TestResult {
    pub fn artifact_path(reports_dir: &Path, name: &str) -> PathBuf {
        reports_dir.join(format!("{name}.json"))
    }

    pub fn save(&self, reports_dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(reports_dir)
            .with_context(|| format!("creating {}", reports_dir.display()))?;
        let path = Self::artifact_path(reports_dir, &self.name);
        let file = File::create(&path).with_context(|| format!("writing {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(path)
    }

    pub fn load(reports_dir: &Path, name: &str) -> Result<Self> {
        let path = Self::artifact_path(reports_dir, name);
        let file = File::open(&path).with_context(|| format!("reading {}", path.display()))?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

/// Execute a stored test case. Infallible from the caller's point of view
/// only in the sense that it is meant to be fire-and-forgotten; failures
/// are recorded in the store and logged here.
pub async fn run_test(
    store: Arc<TestStore>,
    agent: Arc<E2eTestAgent>,
    reports_dir: PathBuf,
    test_id: i64,
) -> Result<()> {
    let case = store.fetch_case(test_id)?;
    info!("running test case {test_id}: {}", case.name);

    store.delete_logs(test_id)?;
    store.update_status(test_id, CaseStatus::InProgress)?;

    let (status, first_error) = match agent.run(&case.description).await {
        Ok(outcome) => {
            for entry in &outcome.transcript {
                store.log_message(test_id, &entry.content, entry.kind)?;
            }
            let status = if outcome.passed() {
                CaseStatus::Success
            } else {
                CaseStatus::Failed
            };
            (status, outcome.first_error().map(String::from))
        }
        Err(e) => {
            let message = format!("Test run failed to start: {e:#}");
            error!("{message}");
            store.log_message(test_id, &message, EntryKind::Error)?;
            (CaseStatus::Failed, Some(message))
        }
    };

    store.update_status(test_id, status)?;

    let result = TestResult {
        name: case.name,
        status,
        error: first_error,
        finished_at: Utc::now(),
    };
    let path = result.save(&reports_dir)?;
    info!(
        "test case {test_id} finished as {}; artifact at {}",
        status.as_str(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let result = TestResult {
            name: "test_success_upload".to_string(),
            status: CaseStatus::Failed,
            error: Some("Failed to click #open element: element not found".to_string()),
            finished_at: Utc::now(),
        };

        let path = result.save(dir.path()).unwrap();
        assert!(path.ends_with("test_success_upload.json"));

        let loaded = TestResult::load(dir.path(), "test_success_upload").unwrap();
        assert_eq!(loaded.name, result.name);
        assert_eq!(loaded.status, CaseStatus::Failed);
        assert_eq!(loaded.error, result.error);
    }

    #[test]
    fn load_of_missing_artifact_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(TestResult::load(dir.path(), "nope").is_err());
    }
}
