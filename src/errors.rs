//! Typed error hierarchy for the review ledger.
//!
//! One enum per component:
//! - `IdentityError`: token/roster resolution, fatal to the session
//! - `CatalogError`: corpus loading, fatal to the session
//! - `NavigationError`: recovered locally by staying on the current document
//! - `ValidationError`: submission rejected, form contents are kept
//! - `StoreError`: ledger backend failures

use std::path::PathBuf;

use delphi_common::DocumentId;
use thiserror::Error;

/// Errors from resolving an inbound token or roster selection.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("No access token was supplied")]
    MissingToken,

    #[error("Access token is not on the roster")]
    InvalidToken,

    #[error("Failed to read roster at {path}: {reason}")]
    RosterUnreadable { path: PathBuf, reason: String },
}

/// Errors from loading the corpus.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Corpus at {path} is unreadable: {reason}")]
    Unreadable { path: PathBuf, reason: String },
}

/// Errors from a navigation input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NavigationError {
    #[error("Selection '{label}' does not match any document in the corpus")]
    StaleSelection { label: String },
}

/// Errors from the submission ledger backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Submission store unavailable: {0}")]
    Unavailable(String),

    #[error("Record {record_id} already exists in the ledger")]
    WriteConflict { record_id: uuid::Uuid },
}

impl StoreError {
    pub fn unavailable(context: &str, err: impl std::fmt::Display) -> Self {
        StoreError::Unavailable(format!("{context}: {err}"))
    }
}

/// Reasons a submission was refused. The first failing rule wins.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("No expert identity is attached to this session")]
    NoIdentity,

    #[error("No document is selected")]
    NoDocument,

    #[error("Every score is zero; move at least one slider before submitting")]
    AllZero,

    #[error("Score {field} = {value} is outside the allowed range {min}..={max}")]
    ScoreOutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{expert} has already submitted a review for {document}")]
    DuplicateSubmission { expert: String, document: DocumentId },

    #[error("Could not persist the submission: {0}")]
    PersistenceFailed(#[source] StoreError),
}

impl ValidationError {
    /// Short stable name of the failed rule, used in logs and CLI output.
    pub fn rule(&self) -> &'static str {
        match self {
            ValidationError::NoIdentity => "no-identity",
            ValidationError::NoDocument => "no-document",
            ValidationError::AllZero => "all-zero",
            ValidationError::ScoreOutOfRange { .. } => "score-out-of-range",
            ValidationError::DuplicateSubmission { .. } => "duplicate-submission",
            ValidationError::PersistenceFailed(_) => "persistence-failed",
        }
    }
}
