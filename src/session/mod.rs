//! Per-client review sessions.
//!
//! [`ReviewSession`] is plain state; [`SessionService`] owns the shared
//! catalog, store, and guard and drives a session through its lifecycle:
//! start → options/navigate/edit → submit → refresh.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use delphi_common::{Document, Expert, ScoreForm, SubmissionRecord};

use crate::catalog::Catalog;
use crate::errors::{NavigationError, ValidationError};
use crate::guard::{ScoreRules, SubmissionGuard};
use crate::navigator::{DocumentOption, NavigationInput, Navigator, ReviewedSnapshot, option_list};
use crate::store::SubmissionStore;

/// State of one connected expert.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewSession {
    expert: Option<Expert>,
    navigator: Navigator,
    reviewed: ReviewedSnapshot,
}

impl ReviewSession {
    pub fn expert(&self) -> Option<&Expert> {
        self.expert.as_ref()
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn reviewed(&self) -> &ReviewedSnapshot {
        &self.reviewed
    }
}

/// `reviewed_count / total_count` for display.
///
/// `reviewed` is `None` when the store could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub reviewed: Option<usize>,
    pub total: usize,
}

impl Progress {
    pub fn is_complete(&self) -> bool {
        self.reviewed.is_some_and(|r| self.total > 0 && r >= self.total)
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reviewed {
            Some(r) => write!(f, "{}/{}", r, self.total),
            None => write!(f, "?/{}", self.total),
        }
    }
}

pub struct SessionService {
    catalog: Arc<Catalog>,
    store: Arc<dyn SubmissionStore>,
    guard: SubmissionGuard,
}

impl SessionService {
    pub fn new(catalog: Arc<Catalog>, store: Arc<dyn SubmissionStore>, rules: ScoreRules) -> Self {
        let guard = SubmissionGuard::new(Arc::clone(&store), rules);
        Self {
            catalog,
            store,
            guard,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn rules(&self) -> &ScoreRules {
        self.guard.rules()
    }

    /// Open a session for a resolved expert and read their reviewed set.
    pub async fn start(&self, expert: Expert) -> ReviewSession {
        info!(expert = %expert, documents = self.catalog.len(), "Session started");
        let mut session = ReviewSession {
            expert: Some(expert),
            navigator: Navigator::new(&self.catalog),
            reviewed: ReviewedSnapshot::Unknown("not read yet".to_string()),
        };
        self.refresh(&mut session).await;
        session
    }

    /// A session with no identity attached; every submit fails `NoIdentity`.
    pub fn unidentified(&self) -> ReviewSession {
        ReviewSession {
            expert: None,
            navigator: Navigator::new(&self.catalog),
            reviewed: ReviewedSnapshot::Unknown("no identity".to_string()),
        }
    }

    /// Re-read the reviewed set from the store.
    pub async fn refresh(&self, session: &mut ReviewSession) {
        let Some(expert) = session.expert.as_ref() else {
            return;
        };
        session.reviewed = match self.store.list_reviewed(expert).await {
            Ok(set) => ReviewedSnapshot::Known(set),
            Err(e) => {
                warn!(expert = %expert, error = %e, "Reviewed set unavailable");
                ReviewedSnapshot::Unknown(e.to_string())
            }
        };
    }

    /// Picker entries, always rendered from a fresh store read.
    pub async fn options(&self, session: &mut ReviewSession) -> Vec<DocumentOption> {
        self.refresh(session).await;
        option_list(&self.catalog, &session.reviewed)
    }

    pub fn current_document(&self, session: &ReviewSession) -> Option<&Document> {
        session.navigator.current_document(&self.catalog)
    }

    /// Apply a navigation input. A stale selection leaves the session as it was.
    pub fn navigate(
        &self,
        session: &mut ReviewSession,
        input: &NavigationInput,
    ) -> Result<(), NavigationError> {
        let transition = session.navigator.transition(&self.catalog, input)?;
        if let Some(draft) = &transition.discarded {
            debug!(document = %draft.document, "Discarded unsaved draft");
        }
        session.navigator = transition.next;
        Ok(())
    }

    /// Edit the draft for the current document. No-op when nothing is selected.
    pub fn edit_draft(&self, session: &mut ReviewSession, edit: impl FnOnce(&mut ScoreForm)) {
        let dimensions = self.rules().dimensions.len();
        if let Some(form) = session.navigator.draft_form(&self.catalog, dimensions) {
            edit(form);
        }
    }

    /// Submit the current draft (a blank form if none was started).
    ///
    /// On failure the draft is left in place for a retry. On success it is
    /// cleared and the reviewed set re-read.
    pub async fn submit(&self, session: &mut ReviewSession) -> Result<SubmissionRecord, ValidationError> {
        let document = session.navigator.current_id(&self.catalog).cloned();
        let form = session
            .navigator
            .draft()
            .filter(|d| Some(&d.document) == document.as_ref())
            .map(|d| d.form.clone())
            .unwrap_or_else(|| ScoreForm::blank(self.rules().dimensions.len()));

        let record = self
            .guard
            .submit(session.expert.as_ref(), document.as_ref(), &form)
            .await?;

        session.navigator.take_draft();
        self.refresh(session).await;
        Ok(record)
    }

    /// Reviewed documents still present in the corpus, over the corpus size.
    pub fn progress(&self, session: &ReviewSession) -> Progress {
        Progress {
            reviewed: session.reviewed.count_in(&self.catalog),
            total: self.catalog.len(),
        }
    }
}
