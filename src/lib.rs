pub mod catalog;
pub mod config;
pub mod errors;
pub mod guard;
pub mod identity;
pub mod init;
pub mod navigator;
pub mod session;
pub mod store;

pub use delphi_common::{Document, DocumentId, Expert, ScoreForm, SubmissionRecord};
