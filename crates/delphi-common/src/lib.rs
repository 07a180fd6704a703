//! Shared domain types for the Delphi review ledger.
//!
//! These types cross every boundary in the system (catalog, store, guard,
//! CLI) and are kept free of I/O so they can be reused by offline tooling.

pub mod document;
pub mod expert;
pub mod submission;

pub use document::{Document, DocumentId};
pub use expert::Expert;
pub use submission::{ScoreForm, SubmissionRecord};
