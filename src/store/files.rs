use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use delphi_common::{DocumentId, Expert, SubmissionRecord};

use super::{SubmissionStore, expert_key, reviewed_ids, run_blocking, slugify};
use crate::errors::StoreError;

/// One JSON file per submission, in a directory per expert.
///
/// Files are written under a hidden temporary name, synced, then renamed into
/// place, so readers only ever see complete records. No two writers share a
/// file, so concurrent sessions need no coordination.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    timeout: Duration,
}

impl FileStore {
    pub fn new(root: PathBuf, timeout: Duration) -> Self {
        Self { root, timeout }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn expert_dir(&self, expert_name: &str) -> PathBuf {
        self.root.join(expert_key(expert_name))
    }
}

fn record_file_name(record: &SubmissionRecord) -> String {
    format!(
        "{}__{}__{}.json",
        slugify(record.document_id.as_str(), 40),
        record.submitted_at.format("%Y%m%dT%H%M%S%.3fZ"),
        record.record_id.simple()
    )
}

fn is_record_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    !name.starts_with('.') && name.ends_with(".json")
}

fn read_dir_records(dir: &Path) -> Result<Vec<SubmissionRecord>, StoreError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let entries = fs::read_dir(dir).map_err(|e| StoreError::unavailable("read ledger", e))?;

    let mut records = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| StoreError::unavailable("read ledger", e))?
            .path();
        if !is_record_file(&path) {
            continue;
        }
        let content =
            fs::read_to_string(&path).map_err(|e| StoreError::unavailable("read ledger", e))?;
        match serde_json::from_str::<SubmissionRecord>(&content) {
            Ok(record) => records.push(record),
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping unparsable ledger file"),
        }
    }
    Ok(records)
}

fn read_all_records(root: &Path) -> Result<Vec<SubmissionRecord>, StoreError> {
    if !root.exists() {
        return Ok(Vec::new());
    }
    let mut records = Vec::new();
    let entries = fs::read_dir(root).map_err(|e| StoreError::unavailable("read ledger", e))?;
    for entry in entries {
        let path = entry
            .map_err(|e| StoreError::unavailable("read ledger", e))?
            .path();
        if path.is_dir() {
            records.extend(read_dir_records(&path)?);
        }
    }
    Ok(records)
}

fn write_record(dir: &Path, record: &SubmissionRecord) -> Result<PathBuf, StoreError> {
    fs::create_dir_all(dir).map_err(|e| StoreError::unavailable("create ledger directory", e))?;

    let final_path = dir.join(record_file_name(record));
    if final_path.exists() {
        return Err(StoreError::WriteConflict {
            record_id: record.record_id,
        });
    }

    let json = serde_json::to_string_pretty(record)
        .map_err(|e| StoreError::unavailable("serialize record", e))?;
    let tmp_path = dir.join(format!(".{}.tmp", record.record_id.simple()));

    let written = (|| -> std::io::Result<()> {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp_path, &final_path)
    })();

    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(StoreError::unavailable("write record", e));
    }
    // The rename is only durable once the directory entry is on disk.
    if let Err(e) = sync_dir(dir) {
        debug!(dir = %dir.display(), error = %e, "Could not sync ledger directory");
    }
    Ok(final_path)
}

fn sync_dir(dir: &Path) -> std::io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[async_trait]
impl SubmissionStore for FileStore {
    async fn list_reviewed(&self, expert: &Expert) -> Result<BTreeSet<DocumentId>, StoreError> {
        let dir = self.expert_dir(expert.name());
        let records = run_blocking(self.timeout, "list reviewed", move || read_dir_records(&dir)).await?;
        let reviewed = reviewed_ids(&records, expert);
        debug!(expert = %expert, reviewed = reviewed.len(), "Read reviewed set");
        Ok(reviewed)
    }

    async fn append(&self, record: &SubmissionRecord) -> Result<(), StoreError> {
        let dir = self.expert_dir(&record.expert_name);
        let owned = record.clone();
        let path = run_blocking(self.timeout, "append", move || write_record(&dir, &owned)).await?;
        info!(
            record_id = %record.record_id,
            expert = %record.expert_name,
            document = %record.document_id,
            path = %path.display(),
            "Appended submission"
        );
        Ok(())
    }

    async fn records(&self, expert: Option<&Expert>) -> Result<Vec<SubmissionRecord>, StoreError> {
        let mut records = match expert {
            Some(expert) => {
                let dir = self.expert_dir(expert.name());
                let expert = expert.clone();
                run_blocking(self.timeout, "read records", move || {
                    Ok(read_dir_records(&dir)?
                        .into_iter()
                        .filter(|r| r.is_for(&expert))
                        .collect())
                })
                .await?
            }
            None => {
                let root = self.root.clone();
                run_blocking(self.timeout, "read records", move || read_all_records(&root)).await?
            }
        };
        records.sort_by_key(|r| r.submitted_at);
        Ok(records)
    }
}
