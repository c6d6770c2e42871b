use crate::domain::model::{Bug, Commit};
use crate::domain::ports::{BugSource, CommitSource, Storage};
use crate::utils::error::{MinerError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::hash::Hash;

/// Parses one JSON document per line. Blank lines are skipped.
pub fn parse_json_lines<T: DeserializeOwned>(data: &[u8], source_name: &str) -> Result<Vec<T>> {
    let text = std::str::from_utf8(data).map_err(|e| MinerError::ProcessingError {
        message: format!("{} is not valid UTF-8: {}", source_name, e),
    })?;

    let mut items = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let item = serde_json::from_str(line).map_err(|e| MinerError::ProcessingError {
            message: format!("{} line {}: {}", source_name, index + 1, e),
        })?;
        items.push(item);
    }
    Ok(items)
}

/// Keeps the first record for each key.
fn dedup_by_key<T, K, F>(items: Vec<T>, source_name: &str, key: F) -> Vec<T>
where
    K: Eq + Hash + std::fmt::Debug,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(items.len());
    for item in items {
        let k = key(&item);
        if seen.contains(&k) {
            tracing::warn!("⚠️ Duplicate id {:?} in {}, keeping the first one", k, source_name);
            continue;
        }
        seen.insert(k);
        unique.push(item);
    }
    unique
}

/// Commit database exported as JSON lines.
pub struct JsonLinesCommitDb<S: Storage> {
    storage: S,
    path: String,
}

impl<S: Storage> JsonLinesCommitDb<S> {
    pub fn new(storage: S, path: impl Into<String>) -> Self {
        Self {
            storage,
            path: path.into(),
        }
    }
}

#[async_trait]
impl<S: Storage> CommitSource for JsonLinesCommitDb<S> {
    async fn commits(&self) -> Result<Vec<Commit>> {
        tracing::debug!("Reading commits from {}", self.path);
        let data = self.storage.read_file(&self.path).await?;
        let commits: Vec<Commit> = parse_json_lines(&data, &self.path)?;
        Ok(dedup_by_key(commits, &self.path, |c| c.node.clone()))
    }
}

/// Bug database exported as JSON lines.
pub struct JsonLinesBugDb<S: Storage> {
    storage: S,
    path: String,
}

impl<S: Storage> JsonLinesBugDb<S> {
    pub fn new(storage: S, path: impl Into<String>) -> Self {
        Self {
            storage,
            path: path.into(),
        }
    }
}

#[async_trait]
impl<S: Storage> BugSource for JsonLinesBugDb<S> {
    async fn bugs(&self, ids: &[u64]) -> Result<Vec<Bug>> {
        let wanted: HashSet<u64> = ids.iter().copied().collect();
        let bugs = self.all_bugs().await?;
        Ok(bugs.into_iter().filter(|bug| wanted.contains(&bug.id)).collect())
    }

    async fn all_bugs(&self) -> Result<Vec<Bug>> {
        tracing::debug!("Reading bugs from {}", self.path);
        let data = self.storage.read_file(&self.path).await?;
        let bugs: Vec<Bug> = parse_json_lines(&data, &self.path)?;
        Ok(dedup_by_key(bugs, &self.path, |b| b.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        async fn with_file(path: &str, content: &str) -> Self {
            let storage = Self::default();
            storage
                .files
                .lock()
                .await
                .insert(path.to_string(), content.as_bytes().to_vec());
            storage
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                MinerError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        async fn append_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.entry(path.to_string()).or_default().extend_from_slice(data);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_commit_db_skips_blank_lines_and_duplicates() {
        let content = r#"{"node": "a", "bug_id": 1, "pushdate": "2020-01-01 00:00:00"}

{"node": "b", "bug_id": 2, "backedoutby": "c"}
{"node": "a", "bug_id": 99}
"#;
        let storage = MockStorage::with_file("commits.json", content).await;
        let db = JsonLinesCommitDb::new(storage, "commits.json");

        let commits = db.commits().await.unwrap();
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].bug_id, Some(1));
        assert!(commits[1].is_backed_out());
    }

    #[tokio::test]
    async fn test_commit_db_reports_bad_line() {
        let content = "{\"node\": \"a\"}\nnot json\n";
        let storage = MockStorage::with_file("commits.json", content).await;
        let db = JsonLinesCommitDb::new(storage, "commits.json");

        match db.commits().await {
            Err(MinerError::ProcessingError { message }) => {
                assert!(message.contains("line 2"), "{}", message)
            }
            other => panic!("unexpected result: {:?}", other.map(|c| c.len())),
        }
    }

    #[tokio::test]
    async fn test_bug_db_filters_by_id() {
        let content = r#"{"id": 1, "status": "RESOLVED"}
{"id": 2, "status": "NEW"}
{"id": 3, "status": "VERIFIED"}
"#;
        let storage = MockStorage::with_file("bugs.json", content).await;
        let db = JsonLinesBugDb::new(storage, "bugs.json");

        let bugs = db.bugs(&[1, 3, 7]).await.unwrap();
        let ids: Vec<u64> = bugs.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(db.all_bugs().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_missing_db_file() {
        let db = JsonLinesBugDb::new(MockStorage::default(), "absent.json");
        assert!(matches!(db.all_bugs().await, Err(MinerError::IoError(_))));
    }
}
