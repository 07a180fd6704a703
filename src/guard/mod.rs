//! Submission validation.
//!
//! Rules run in a fixed order and the first failure wins:
//!
//! | # | Rule                                   | Error                 |
//! |---|----------------------------------------|-----------------------|
//! | 1 | expert resolved                        | `NoIdentity`          |
//! | 2 | document selected                      | `NoDocument`          |
//! | 3 | not every score zero                   | `AllZero`             |
//! | 4 | scores finite, in range, right count   | `ScoreOutOfRange`     |
//! | 5 | pair not already in the store (block)  | `DuplicateSubmission` |
//! | 6 | append succeeds                        | `PersistenceFailed`   |
//!
//! Rule 5 reads the store at submit time. A store that cannot be read fails
//! the submission instead of assuming the pair is new.

use std::sync::Arc;

use tracing::{info, warn};

use delphi_common::{DocumentId, Expert, ScoreForm, SubmissionRecord};

use crate::config::{DuplicatePolicy, ScoringSection};
use crate::errors::ValidationError;
use crate::store::SubmissionStore;

/// Score constraints applied at submit time.
#[derive(Debug, Clone)]
pub struct ScoreRules {
    /// Dimension labels; when non-empty the score count must match.
    pub dimensions: Vec<String>,
    pub min_score: f64,
    pub max_score: f64,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for ScoreRules {
    fn default() -> Self {
        Self::from_config(&ScoringSection::default())
    }
}

impl ScoreRules {
    pub fn from_config(scoring: &ScoringSection) -> Self {
        Self {
            dimensions: scoring.dimensions.clone(),
            min_score: scoring.min_score,
            max_score: scoring.max_score,
            duplicate_policy: scoring.duplicate_policy,
        }
    }

    fn dimension_name(&self, index: usize) -> String {
        self.dimensions
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("score[{}]", index))
    }

    fn check_scores(&self, form: &ScoreForm) -> Result<(), ValidationError> {
        let expected = self.dimensions.len();
        if expected > 0 && form.quantitative_scores.len() != expected {
            return Err(ValidationError::ScoreOutOfRange {
                field: "quantitative_scores (count)".to_string(),
                value: form.quantitative_scores.len() as f64,
                min: expected as f64,
                max: expected as f64,
            });
        }

        let quantitative = form.quantitative_scores.len();
        for (i, value) in form.all_scores().enumerate() {
            if !value.is_finite() || value < self.min_score || value > self.max_score {
                let field = if i < quantitative {
                    self.dimension_name(i)
                } else {
                    "human_comparison_score".to_string()
                };
                return Err(ValidationError::ScoreOutOfRange {
                    field,
                    value,
                    min: self.min_score,
                    max: self.max_score,
                });
            }
        }
        Ok(())
    }
}

/// Gatekeeper between a session's form and the ledger.
#[derive(Clone)]
pub struct SubmissionGuard {
    store: Arc<dyn SubmissionStore>,
    rules: ScoreRules,
}

impl SubmissionGuard {
    pub fn new(store: Arc<dyn SubmissionStore>, rules: ScoreRules) -> Self {
        Self { store, rules }
    }

    pub fn rules(&self) -> &ScoreRules {
        &self.rules
    }

    /// Validate and persist one submission.
    ///
    /// The store is untouched unless every rule passes; on error the caller
    /// still owns `form` and can retry.
    pub async fn submit(
        &self,
        expert: Option<&Expert>,
        document: Option<&DocumentId>,
        form: &ScoreForm,
    ) -> Result<SubmissionRecord, ValidationError> {
        let result = self.check_and_append(expert, document, form).await;
        match &result {
            Ok(record) => info!(
                record_id = %record.record_id,
                expert = %record.expert_name,
                document = %record.document_id,
                "Submission accepted"
            ),
            Err(err) => warn!(
                rule = err.rule(),
                expert = expert.map(|e| e.name()).unwrap_or("<unresolved>"),
                document = document.map(|d| d.as_str()).unwrap_or("<none>"),
                "Submission rejected: {}",
                err
            ),
        }
        result
    }

    async fn check_and_append(
        &self,
        expert: Option<&Expert>,
        document: Option<&DocumentId>,
        form: &ScoreForm,
    ) -> Result<SubmissionRecord, ValidationError> {
        let expert = expert.ok_or(ValidationError::NoIdentity)?;
        let document = document.ok_or(ValidationError::NoDocument)?;

        if form.is_all_zero() {
            return Err(ValidationError::AllZero);
        }
        self.rules.check_scores(form)?;

        if self.rules.duplicate_policy == DuplicatePolicy::Block {
            let seen = self
                .store
                .has_reviewed(expert, document)
                .await
                .map_err(ValidationError::PersistenceFailed)?;
            if seen {
                return Err(ValidationError::DuplicateSubmission {
                    expert: expert.name().to_string(),
                    document: document.clone(),
                });
            }
        }

        let record = SubmissionRecord::from_form(expert, document, form);
        self.store
            .append(&record)
            .await
            .map_err(ValidationError::PersistenceFailed)?;
        Ok(record)
    }
}
