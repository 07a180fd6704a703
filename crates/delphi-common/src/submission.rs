use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::document::DocumentId;
use crate::expert::Expert;

/// The in-progress score entry for one document.
///
/// Quantitative scores default to zero, matching an untouched slider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreForm {
    pub quantitative_scores: Vec<f64>,
    pub human_comparison_score: f64,
    #[serde(default)]
    pub qualitative_fields: BTreeMap<String, String>,
}

impl ScoreForm {
    pub fn new(quantitative_scores: Vec<f64>, human_comparison_score: f64) -> Self {
        Self {
            quantitative_scores,
            human_comparison_score,
            qualitative_fields: BTreeMap::new(),
        }
    }

    /// A blank form with `dimensions` zeroed scores.
    pub fn blank(dimensions: usize) -> Self {
        Self::new(vec![0.0; dimensions], 0.0)
    }

    pub fn with_field(mut self, name: &str, text: &str) -> Self {
        self.qualitative_fields
            .insert(name.to_string(), text.to_string());
        self
    }

    /// True when every score, including the human-comparison score, is zero.
    pub fn is_all_zero(&self) -> bool {
        self.quantitative_scores.iter().all(|s| *s == 0.0) && self.human_comparison_score == 0.0
    }

    /// Iterate every numeric score on the form, human-comparison score last.
    pub fn all_scores(&self) -> impl Iterator<Item = f64> + '_ {
        self.quantitative_scores
            .iter()
            .copied()
            .chain(std::iter::once(self.human_comparison_score))
    }
}

/// One completed review, as persisted in the ledger.
///
/// Records are immutable once built. Consumers of the ledger must tolerate
/// extra fields being added later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub record_id: Uuid,
    pub expert_name: String,
    pub document_id: DocumentId,
    pub quantitative_scores: Vec<f64>,
    pub human_comparison_score: f64,
    #[serde(default)]
    pub qualitative_fields: BTreeMap<String, String>,
    pub submitted_at: DateTime<Utc>,
}

impl SubmissionRecord {
    /// Build a record from a validated form, stamping it with the current time.
    pub fn from_form(expert: &Expert, document_id: &DocumentId, form: &ScoreForm) -> Self {
        Self {
            record_id: Uuid::new_v4(),
            expert_name: expert.name().to_string(),
            document_id: document_id.clone(),
            quantitative_scores: form.quantitative_scores.clone(),
            human_comparison_score: form.human_comparison_score,
            qualitative_fields: form.qualitative_fields.clone(),
            submitted_at: Utc::now(),
        }
    }

    pub fn is_for(&self, expert: &Expert) -> bool {
        self.expert_name == expert.name()
    }
}
