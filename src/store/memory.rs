use std::collections::BTreeSet;

use async_trait::async_trait;
use tokio::sync::RwLock;

use delphi_common::{DocumentId, Expert, SubmissionRecord};

use super::{SubmissionStore, reviewed_ids};
use crate::errors::StoreError;

/// In-process ledger.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<SubmissionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn list_reviewed(&self, expert: &Expert) -> Result<BTreeSet<DocumentId>, StoreError> {
        Ok(reviewed_ids(self.records.read().await.iter(), expert))
    }

    async fn append(&self, record: &SubmissionRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if records.iter().any(|r| r.record_id == record.record_id) {
            return Err(StoreError::WriteConflict {
                record_id: record.record_id,
            });
        }
        records.push(record.clone());
        Ok(())
    }

    async fn records(&self, expert: Option<&Expert>) -> Result<Vec<SubmissionRecord>, StoreError> {
        let mut out: Vec<SubmissionRecord> = self
            .records
            .read()
            .await
            .iter()
            .filter(|r| expert.is_none_or(|e| r.is_for(e)))
            .cloned()
            .collect();
        out.sort_by_key(|r| r.submitted_at);
        Ok(out)
    }
}
