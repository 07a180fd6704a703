//! The submission ledger.
//!
//! | Backend      | Layout                                            |
//! |--------------|---------------------------------------------------|
//! | `MemoryStore`| in-process `Vec`, for tests and embedding         |
//! | `FileStore`  | `<dir>/<expert-key>/<doc>__<time>__<id>.json`     |
//! | `JsonlStore` | `<dir>/<expert-key>.jsonl`, one line per record   |
//!
//! Both on-disk layouts give every expert an independent unit, so sessions for
//! different experts never write the same file. Records are merged at read
//! time; a pair reviewed twice still counts once in [`SubmissionStore::list_reviewed`].

pub mod files;
pub mod jsonl;
pub mod memory;

pub use files::FileStore;
pub use jsonl::JsonlStore;
pub use memory::MemoryStore;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use delphi_common::{DocumentId, Expert, SubmissionRecord};

use crate::config::{DelphiConfig, StoreBackend};
use crate::errors::StoreError;

/// Append-only ledger of submissions.
///
/// Reads may lag appends made by other sessions. Implementations must report
/// an unreachable backend as [`StoreError::Unavailable`], never as an empty
/// result.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Every document id with at least one record for `expert`.
    async fn list_reviewed(&self, expert: &Expert) -> Result<BTreeSet<DocumentId>, StoreError>;

    async fn has_reviewed(
        &self,
        expert: &Expert,
        document: &DocumentId,
    ) -> Result<bool, StoreError> {
        Ok(self.list_reviewed(expert).await?.contains(document))
    }

    /// Durably write one record. A failed append leaves nothing visible.
    async fn append(&self, record: &SubmissionRecord) -> Result<(), StoreError>;

    /// All records, optionally restricted to one expert, oldest first.
    async fn records(&self, expert: Option<&Expert>) -> Result<Vec<SubmissionRecord>, StoreError>;
}

/// Open the backend selected in the configuration.
pub fn open_store(config: &DelphiConfig) -> Arc<dyn SubmissionStore> {
    let dir = config.store_dir();
    let timeout = config.store_timeout();
    match config.toml.store.backend {
        StoreBackend::Files => Arc::new(FileStore::new(dir, timeout)),
        StoreBackend::Jsonl => Arc::new(JsonlStore::new(dir, timeout)),
    }
}

/// Run blocking ledger I/O off the async runtime, bounded by `timeout`.
///
/// On timeout the blocking task is not cancelled; an append may still land
/// after `Unavailable` was reported.
pub(crate) async fn run_blocking<T, F>(
    timeout: Duration,
    op: &'static str,
    f: F,
) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::time::timeout(timeout, tokio::task::spawn_blocking(f)).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(StoreError::unavailable(op, join_err)),
        Err(_) => Err(StoreError::Unavailable(format!(
            "{} timed out after {}ms",
            op,
            timeout.as_millis()
        ))),
    }
}

/// Filesystem-safe, collision-free directory/file stem for an expert.
///
/// Readable slug of the name plus a SHA-256 prefix of the exact name, so
/// "Dr. Lin" and "dr lin" never share a unit.
pub fn expert_key(name: &str) -> String {
    let slug = slugify(name, 40);
    let digest = format!("{:x}", Sha256::digest(name.as_bytes()));
    let slug = if slug.is_empty() { "expert".to_string() } else { slug };
    format!("{}-{}", slug, &digest[..12])
}

pub(crate) fn slugify(text: &str, max_len: usize) -> String {
    let mut slug = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');
    slug.chars().take(max_len).collect::<String>().trim_end_matches('-').to_string()
}

/// Collapse repeated submissions to the latest one per (expert, document).
pub fn latest_per_pair(mut records: Vec<SubmissionRecord>) -> Vec<SubmissionRecord> {
    records.sort_by_key(|r| r.submitted_at);
    let mut latest: BTreeMap<(String, DocumentId), SubmissionRecord> = BTreeMap::new();
    for record in records {
        latest.insert((record.expert_name.clone(), record.document_id.clone()), record);
    }
    let mut out: Vec<SubmissionRecord> = latest.into_values().collect();
    out.sort_by_key(|r| r.submitted_at);
    out
}

fn reviewed_ids<'a>(
    records: impl IntoIterator<Item = &'a SubmissionRecord>,
    expert: &Expert,
) -> BTreeSet<DocumentId> {
    records
        .into_iter()
        .filter(|r| r.is_for(expert))
        .map(|r| r.document_id.clone())
        .collect()
}
