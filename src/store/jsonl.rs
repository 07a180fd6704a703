use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use fs2::FileExt;
use tracing::{debug, info, warn};

use delphi_common::{DocumentId, Expert, SubmissionRecord};

use super::{SubmissionStore, expert_key, reviewed_ids, run_blocking};
use crate::errors::StoreError;

/// One append-only JSON-lines file per expert.
///
/// Two sessions for the same expert share a file, so appends hold an
/// exclusive advisory lock and reads a shared one. A crash mid-append can
/// leave an unterminated last line; readers skip it and the next append
/// starts on a fresh line.
#[derive(Debug, Clone)]
pub struct JsonlStore {
    root: PathBuf,
    timeout: Duration,
}

impl JsonlStore {
    pub fn new(root: PathBuf, timeout: Duration) -> Self {
        Self { root, timeout }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ledger_file(&self, expert_name: &str) -> PathBuf {
        self.root.join(format!("{}.jsonl", expert_key(expert_name)))
    }
}

fn parse_ledger(path: &Path, content: &str) -> Vec<SubmissionRecord> {
    let mut lines: Vec<&str> = content.split('\n').collect();
    // The segment after the final newline is either empty or a torn write.
    if let Some(tail) = lines.pop()
        && !tail.trim().is_empty()
    {
        debug!(path = %path.display(), "Ignoring unterminated trailing ledger line");
    }

    lines
        .into_iter()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(n, line)| match serde_json::from_str(line) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(path = %path.display(), line = n + 1, error = %e, "Skipping unparsable ledger line");
                None
            }
        })
        .collect()
}

fn read_ledger(path: &Path) -> Result<Vec<SubmissionRecord>, StoreError> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::unavailable("open ledger", e)),
    };
    FileExt::lock_shared(&file).map_err(|e| StoreError::unavailable("lock ledger", e))?;
    let mut content = String::new();
    let read = file.read_to_string(&mut content);
    let _ = FileExt::unlock(&file);
    read.map_err(|e| StoreError::unavailable("read ledger", e))?;
    Ok(parse_ledger(path, &content))
}

fn read_all_ledgers(root: &Path) -> Result<Vec<SubmissionRecord>, StoreError> {
    if !root.exists() {
        return Ok(Vec::new());
    }
    let mut records = Vec::new();
    let entries = fs::read_dir(root).map_err(|e| StoreError::unavailable("read ledger", e))?;
    for entry in entries {
        let path = entry
            .map_err(|e| StoreError::unavailable("read ledger", e))?
            .path();
        if path.extension().is_some_and(|ext| ext == "jsonl") {
            records.extend(read_ledger(&path)?);
        }
    }
    Ok(records)
}

fn append_line(path: &Path, record: &SubmissionRecord) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| StoreError::unavailable("create ledger directory", e))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)
        .map_err(|e| StoreError::unavailable("open ledger", e))?;

    FileExt::lock_exclusive(&file).map_err(|e| StoreError::unavailable("lock ledger", e))?;
    let result = append_locked(&mut file, path, record);
    let _ = FileExt::unlock(&file);
    result
}

fn append_locked(file: &mut File, path: &Path, record: &SubmissionRecord) -> Result<(), StoreError> {
    let mut existing = String::new();
    file.read_to_string(&mut existing)
        .map_err(|e| StoreError::unavailable("read ledger", e))?;

    if parse_ledger(path, &existing)
        .iter()
        .any(|r| r.record_id == record.record_id)
    {
        return Err(StoreError::WriteConflict {
            record_id: record.record_id,
        });
    }

    let mut line = String::new();
    if !existing.is_empty() && !existing.ends_with('\n') {
        line.push('\n');
    }
    line.push_str(
        &serde_json::to_string(record).map_err(|e| StoreError::unavailable("serialize record", e))?,
    );
    line.push('\n');

    file.write_all(line.as_bytes())
        .and_then(|_| file.sync_data())
        .map_err(|e| StoreError::unavailable("write record", e))
}

#[async_trait]
impl SubmissionStore for JsonlStore {
    async fn list_reviewed(&self, expert: &Expert) -> Result<BTreeSet<DocumentId>, StoreError> {
        let path = self.ledger_file(expert.name());
        let records = run_blocking(self.timeout, "list reviewed", move || read_ledger(&path)).await?;
        Ok(reviewed_ids(&records, expert))
    }

    async fn append(&self, record: &SubmissionRecord) -> Result<(), StoreError> {
        let path = self.ledger_file(&record.expert_name);
        let owned = record.clone();
        run_blocking(self.timeout, "append", move || append_line(&path, &owned)).await?;
        info!(
            record_id = %record.record_id,
            expert = %record.expert_name,
            document = %record.document_id,
            "Appended submission"
        );
        Ok(())
    }

    async fn records(&self, expert: Option<&Expert>) -> Result<Vec<SubmissionRecord>, StoreError> {
        let mut records = match expert {
            Some(expert) => {
                let path = self.ledger_file(expert.name());
                let expert = expert.clone();
                run_blocking(self.timeout, "read records", move || {
                    Ok(read_ledger(&path)?
                        .into_iter()
                        .filter(|r| r.is_for(&expert))
                        .collect())
                })
                .await?
            }
            None => {
                let root = self.root.clone();
                run_blocking(self.timeout, "read records", move || read_all_ledgers(&root)).await?
            }
        };
        records.sort_by_key(|r| r.submitted_at);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use delphi_common::ScoreForm;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn setup_store() -> (JsonlStore, TempDir) {
        let dir = TempDir::new().expect("failed to create temp dir");
        let store = JsonlStore::new(dir.path().join("submissions"), Duration::from_secs(5));
        (store, dir)
    }

    fn record(expert: &str, doc: &str) -> SubmissionRecord {
        SubmissionRecord::from_form(
            &Expert::new(expert),
            &DocumentId::new(doc),
            &ScoreForm::new(vec![7.0, 8.0], 7.5).with_field("Strengths", "clear, well sourced"),
        )
    }

    #[tokio::test]
    async fn test_append_then_read_back() {
        let (store, _dir) = setup_store();
        let rec = record("Dr. Lin", "P1");
        store.append(&rec).await.unwrap();

        let lin = Expert::new("Dr. Lin");
        assert!(store.has_reviewed(&lin, &DocumentId::new("P1")).await.unwrap());
        assert_eq!(store.records(Some(&lin)).await.unwrap(), vec![rec]);
    }

    #[tokio::test]
    async fn test_experts_get_separate_files() {
        let (store, _dir) = setup_store();
        store.append(&record("Dr. Lin", "P1")).await.unwrap();
        store.append(&record("Dr. Osei", "P1")).await.unwrap();

        assert!(store.ledger_file("Dr. Lin").exists());
        assert!(store.ledger_file("Dr. Osei").exists());
        assert_eq!(store.records(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_torn_trailing_line_is_ignored_and_repaired() {
        let (store, _dir) = setup_store();
        store.append(&record("Dr. Lin", "P1")).await.unwrap();

        let path = store.ledger_file("Dr. Lin");
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"{\"record_id\": \"0000").unwrap();
        drop(file);

        let lin = Expert::new("Dr. Lin");
        assert_eq!(store.list_reviewed(&lin).await.unwrap().len(), 1);

        store.append(&record("Dr. Lin", "P2")).await.unwrap();
        let reviewed = store.list_reviewed(&lin).await.unwrap();
        assert!(reviewed.contains(&DocumentId::new("P2")));
        assert_eq!(reviewed.len(), 2);
    }

    #[tokio::test]
    async fn test_same_record_twice_is_a_conflict() {
        let (store, _dir) = setup_store();
        let rec = record("Dr. Lin", "P1");
        store.append(&rec).await.unwrap();
        assert!(matches!(
            store.append(&rec).await,
            Err(StoreError::WriteConflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_concurrent_appends_for_one_expert_are_all_kept() {
        let (store, _dir) = setup_store();
        let store = Arc::new(store);

        let mut handles = Vec::new();
        for i in 0..12 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.append(&record("Dr. Lin", &format!("P{}", i))).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let reviewed = store.list_reviewed(&Expert::new("Dr. Lin")).await.unwrap();
        assert_eq!(reviewed.len(), 12);
    }

    #[test]
    fn test_parse_ledger_skips_garbage_lines() {
        let rec = record("Dr. Lin", "P1");
        let content = format!("garbage\n{}\n\n", serde_json::to_string(&rec).unwrap());
        let parsed = parse_ledger(Path::new("x.jsonl"), &content);
        assert_eq!(parsed, vec![rec]);
    }
}
