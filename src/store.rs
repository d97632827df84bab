//! SQLite persistence for test-case status and run logs.
//!
//! The agent core never touches this; the runner and the HTTP surface do.

use std::path::Path;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::agent::state::EntryKind;
use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaseStatus {
    Todo,
    InProgress,
    Success,
    Failed,
}

impl CaseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CaseStatus::Todo => "todo",
            CaseStatus::InProgress => "in-progress",
            CaseStatus::Success => "success",
            CaseStatus::Failed => "failed",
        }
    }

    fn from_str(value: &str) -> Self {
        match value {
            "in-progress" => CaseStatus::InProgress,
            "success" => CaseStatus::Success,
            "failed" => CaseStatus::Failed,
            _ => CaseStatus::Todo,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub status: CaseStatus,
    pub no_of_steps: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: String,
}

/// Store handle shared across the server and the runner. rusqlite
/// connections are not Sync, so all access funnels through one mutex.
pub struct TestStore {
    conn: Mutex<Connection>,
}

impl TestStore {
    /// Open (creating if needed) the database, apply the schema and seed
    /// the built-in test cases.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS test_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                test_id INTEGER,
                message TEXT,
                type TEXT,
                created_at TEXT
            );

            CREATE TABLE IF NOT EXISTS test_cases (
                id INTEGER PRIMARY KEY,
                name TEXT,
                description TEXT,
                status TEXT,
                no_of_steps INTEGER
            );
            ",
        )?;

        conn.execute(
            "
            INSERT OR IGNORE INTO test_cases (id, name, description, status, no_of_steps)
            VALUES
            (0, 'test_success_upload', 'Success upload use case: agent is able to select an mp4 less than 4GB to be converted to avi with rule to choose the lowest HD', 'todo', 4),
            (1, 'test_unsuccessful_youtube_upload', 'Unsuccessful upload use case: upload a video from youtube: https://www.youtube.com/watch?v=aWk2XZ_8lhA', 'todo', 4),
            (2, 'test_unsuccessful_large_file_upload', 'Unsuccessful upload use case: upload video file above 4GB', 'todo', 4)
            ",
            [],
        )?;
        Ok(())
    }

    pub fn log_message(
        &self,
        test_id: i64,
        message: &str,
        kind: EntryKind,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO test_logs (test_id, message, type, created_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![test_id, message, kind.as_str(), Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// All log messages for a test case, oldest first.
    pub fn fetch_logs(&self, test_id: i64) -> Result<Vec<LogRecord>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT message, type, created_at FROM test_logs WHERE test_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([test_id], |row| {
            Ok(LogRecord {
                message: row.get(0)?,
                kind: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn delete_logs(&self, test_id: i64) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM test_logs WHERE test_id = ?1", [test_id])?;
        Ok(())
    }

    pub fn fetch_cases(&self) -> Result<Vec<TestCase>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, name, description, status, no_of_steps FROM test_cases ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(TestCase {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                status: CaseStatus::from_str(&row.get::<_, String>(3)?),
                no_of_steps: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn fetch_case(&self, test_id: i64) -> Result<TestCase, StoreError> {
        self.fetch_cases()?
            .into_iter()
            .find(|case| case.id == test_id)
            .ok_or(StoreError::UnknownTestCase(test_id))
    }

    pub fn update_status(&self, test_id: i64, status: CaseStatus) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE test_cases SET status = ?1 WHERE id = ?2",
            rusqlite::params![status.as_str(), test_id],
        )?;
        Ok(())
    }

    /// Reset every test case to todo and drop all logs.
    pub fn reset_all(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM test_logs", [])?;
        conn.execute("UPDATE test_cases SET status = 'todo'", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, TestStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = TestStore::open(&dir.path().join("test.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn open_seeds_the_builtin_cases() {
        let (_dir, store) = store();
        let cases = store.fetch_cases().unwrap();
        assert_eq!(cases.len(), 3);
        assert_eq!(cases[0].name, "test_success_upload");
        assert!(cases.iter().all(|c| c.status == CaseStatus::Todo));
        assert!(cases.iter().all(|c| c.no_of_steps == 4));
    }

    #[test]
    fn reopening_does_not_duplicate_seeds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        drop(TestStore::open(&path).unwrap());
        let store = TestStore::open(&path).unwrap();
        assert_eq!(store.fetch_cases().unwrap().len(), 3);
    }

    #[test]
    fn logs_round_trip_in_insertion_order() {
        let (_dir, store) = store();
        store.log_message(1, "first", EntryKind::Info).unwrap();
        store.log_message(1, "second", EntryKind::Error).unwrap();
        store.log_message(2, "other case", EntryKind::Info).unwrap();

        let logs = store.fetch_logs(1).unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].message, "first");
        assert_eq!(logs[0].kind, "info");
        assert_eq!(logs[1].message, "second");
        assert_eq!(logs[1].kind, "error");
    }

    #[test]
    fn update_status_and_fetch_case() {
        let (_dir, store) = store();
        store.update_status(1, CaseStatus::InProgress).unwrap();
        assert_eq!(store.fetch_case(1).unwrap().status, CaseStatus::InProgress);
        assert!(matches!(
            store.fetch_case(99),
            Err(StoreError::UnknownTestCase(99))
        ));
    }

    #[test]
    fn reset_all_clears_logs_and_statuses() {
        let (_dir, store) = store();
        store.update_status(0, CaseStatus::Failed).unwrap();
        store.log_message(0, "boom", EntryKind::Error).unwrap();

        store.reset_all().unwrap();

        assert!(store.fetch_logs(0).unwrap().is_empty());
        assert!(
            store
                .fetch_cases()
                .unwrap()
                .iter()
                .all(|c| c.status == CaseStatus::Todo)
        );
    }
}
