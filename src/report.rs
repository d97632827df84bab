//! CSV report generation from run artifacts. Failed runs get a brief
//! model-written explanation of the error; generated reports are cached
//! on disk next to the artifacts.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::llm::{ChatMessage, FAST_MODEL, LanguageModel};
use crate::runner::TestResult;
use crate::store::CaseStatus;

pub fn report_path(reports_dir: &Path, name: &str) -> PathBuf {
    reports_dir.join(format!("{name}.csv"))
}

/// Build (or return the cached) CSV report for a named test run.
pub async fn generate_csv_report(
    llm: &dyn LanguageModel,
    reports_dir: &Path,
    name: &str,
) -> Result<PathBuf> {
    let csv_path = report_path(reports_dir, name);
    if csv_path.exists() {
        return Ok(csv_path);
    }

    let result = TestResult::load(reports_dir, name)?;

    let description = match (&result.status, &result.error) {
        (CaseStatus::Failed, Some(error)) => explain_error(llm, error).await?,
        _ => String::new(),
    };

    let mut writer = csv::Writer::from_path(&csv_path)?;
    writer.write_record(["Test Case Name", "Status", "Error", "Description"])?;
    writer.write_record([
        result.name.as_str(),
        result.status.as_str(),
        result.error.as_deref().unwrap_or(""),
        description.as_str(),
    ])?;
    writer.flush()?;

    Ok(csv_path)
}

async fn explain_error(llm: &dyn LanguageModel, error_msg: &str) -> Result<String> {
    let messages = [
        ChatMessage::system("Generate brief description about the test error"),
        ChatMessage::user(format!("Here is the error message: {error_msg}")),
    ];
    Ok(llm.chat(FAST_MODEL, &messages).await?)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::error::LlmError;

    struct CountingModel {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LanguageModel for CountingModel {
        async fn chat(&self, _model: &str, _messages: &[ChatMessage]) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("The click target was missing from the page".to_string())
        }

        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
            Err(LlmError::Malformed("unused".to_string()))
        }
    }

    fn artifact(dir: &Path, status: CaseStatus, error: Option<&str>) {
        TestResult {
            name: "test_success_upload".to_string(),
            status,
            error: error.map(String::from),
            finished_at: Utc::now(),
        }
        .save(dir)
        .unwrap();
    }

    #[tokio::test]
    async fn failed_run_gets_an_explained_row() {
        let dir = tempfile::tempdir().unwrap();
        artifact(
            dir.path(),
            CaseStatus::Failed,
            Some("Failed to click #open element: element not found"),
        );
        let model = CountingModel {
            calls: AtomicUsize::new(0),
        };

        let path = generate_csv_report(&model, dir.path(), "test_success_upload")
            .await
            .unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();

        assert!(contents.starts_with("Test Case Name,Status,Error,Description"));
        assert!(contents.contains("test_success_upload"));
        assert!(contents.contains("failed"));
        assert!(contents.contains("The click target was missing from the page"));
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn successful_run_needs_no_explanation() {
        let dir = tempfile::tempdir().unwrap();
        artifact(dir.path(), CaseStatus::Success, None);
        let model = CountingModel {
            calls: AtomicUsize::new(0),
        };

        let path = generate_csv_report(&model, dir.path(), "test_success_upload")
            .await
            .unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();

        assert!(contents.contains("success"));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn report_is_cached_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        artifact(dir.path(), CaseStatus::Failed, Some("boom"));
        let model = CountingModel {
            calls: AtomicUsize::new(0),
        };

        generate_csv_report(&model, dir.path(), "test_success_upload")
            .await
            .unwrap();
        generate_csv_report(&model, dir.path(), "test_success_upload")
            .await
            .unwrap();

        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }
}
