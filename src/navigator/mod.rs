//! Document navigation state machine.
//!
//! ```text
//! Unselected ──(catalog non-empty)──▶ Viewing(0) ──(input)──▶ Viewing(i)
//! ```
//!
//! Transitions are pure: [`Navigator::transition`] returns the next state and
//! whatever unsaved draft the move abandoned. Moving to a different document
//! always drops the draft for the previous one; re-selecting the current
//! document keeps it.

use std::collections::BTreeSet;

use tracing::debug;

use delphi_common::{Document, DocumentId, ScoreForm};

use crate::catalog::Catalog;
use crate::errors::NavigationError;

pub const REVIEWED_MARKER: &str = "✅";
pub const PENDING_MARKER: &str = "⏳";
pub const UNKNOWN_MARKER: &str = "❔";
const LABEL_SEPARATOR: &str = " | ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    Unselected,
    Viewing(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationInput {
    /// A display label as rendered by [`option_list`]
    Select(String),
    SelectId(DocumentId),
    Next,
    Previous,
}

/// Unsaved score entry for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub document: DocumentId,
    pub form: ScoreForm,
}

/// What the session last learned from the store about reviewed documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewedSnapshot {
    Known(BTreeSet<DocumentId>),
    /// The store could not be read; progress is unknown, not zero.
    Unknown(String),
}

impl ReviewedSnapshot {
    /// `Some(true/false)` when known, `None` when the store was unreadable.
    pub fn contains(&self, id: &DocumentId) -> Option<bool> {
        match self {
            ReviewedSnapshot::Known(set) => Some(set.contains(id)),
            ReviewedSnapshot::Unknown(_) => None,
        }
    }

    /// Reviewed documents that are still in `catalog`; ids the corpus no
    /// longer carries do not count.
    pub fn count_in(&self, catalog: &Catalog) -> Option<usize> {
        match self {
            ReviewedSnapshot::Known(set) => Some(
                set.iter()
                    .filter(|id| catalog.index_of(id).is_some())
                    .count(),
            ),
            ReviewedSnapshot::Unknown(_) => None,
        }
    }
}

/// One entry of the document picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentOption {
    pub index: usize,
    pub id: DocumentId,
    pub reviewed: Option<bool>,
    pub label: String,
}

/// Render the picker entries with reviewed/pending markers.
pub fn option_list(catalog: &Catalog, reviewed: &ReviewedSnapshot) -> Vec<DocumentOption> {
    catalog
        .documents()
        .iter()
        .enumerate()
        .map(|(index, doc)| {
            let status = reviewed.contains(&doc.id);
            DocumentOption {
                index,
                id: doc.id.clone(),
                reviewed: status,
                label: label_for(doc, status),
            }
        })
        .collect()
}

fn label_for(doc: &Document, reviewed: Option<bool>) -> String {
    let marker = match reviewed {
        Some(true) => REVIEWED_MARKER,
        Some(false) => PENDING_MARKER,
        None => UNKNOWN_MARKER,
    };
    format!("{} {}{}{}", marker, doc.id, LABEL_SEPARATOR, doc.title)
}

/// Map an externally supplied display label back to a catalog position.
///
/// The status marker is ignored, so a label rendered before a submission
/// still resolves after the document flips to reviewed. Callers holding a
/// [`DocumentOption`] should navigate by its id instead.
pub fn resolve_label(catalog: &Catalog, label: &str) -> Option<usize> {
    let mut rest = label.trim();
    for marker in [REVIEWED_MARKER, PENDING_MARKER, UNKNOWN_MARKER] {
        if let Some(stripped) = rest.strip_prefix(marker) {
            rest = stripped.trim_start();
            break;
        }
    }

    // Exact "id | title" first: ids may themselves contain the separator.
    let exact = catalog.documents().iter().position(|doc| {
        rest.strip_prefix(doc.id.as_str())
            .and_then(|r| r.strip_prefix(LABEL_SEPARATOR))
            .is_some_and(|title| title == doc.title)
    });
    if exact.is_some() {
        return exact;
    }
    if let Some(index) = catalog.index_of(&DocumentId::new(rest)) {
        return Some(index);
    }
    let id = rest.split(LABEL_SEPARATOR).next().unwrap_or(rest).trim();
    catalog.index_of(&DocumentId::new(id))
}

/// Result of a successful transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next: Navigator,
    pub discarded: Option<Draft>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Navigator {
    state: NavState,
    draft: Option<Draft>,
}

impl Navigator {
    /// Starts on the first document, or `Unselected` for an empty catalog.
    pub fn new(catalog: &Catalog) -> Self {
        let state = if catalog.is_empty() {
            NavState::Unselected
        } else {
            NavState::Viewing(0)
        };
        Self { state, draft: None }
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    pub fn current_index(&self) -> Option<usize> {
        match self.state {
            NavState::Viewing(i) => Some(i),
            NavState::Unselected => None,
        }
    }

    pub fn current_id<'a>(&self, catalog: &'a Catalog) -> Option<&'a DocumentId> {
        self.current_index().and_then(|i| catalog.id_at(i))
    }

    pub fn current_document<'a>(&self, catalog: &'a Catalog) -> Option<&'a Document> {
        self.current_index().and_then(|i| catalog.get(i))
    }

    pub fn draft(&self) -> Option<&Draft> {
        self.draft.as_ref()
    }

    /// Mutable form for the current document, created blank on first use.
    ///
    /// Returns `None` when no document is selected.
    pub fn draft_form(&mut self, catalog: &Catalog, dimensions: usize) -> Option<&mut ScoreForm> {
        let current = self.current_id(catalog)?.clone();
        if self.draft.as_ref().is_none_or(|d| d.document != current) {
            self.draft = Some(Draft {
                document: current,
                form: ScoreForm::blank(dimensions),
            });
        }
        self.draft.as_mut().map(|d| &mut d.form)
    }

    pub fn take_draft(&mut self) -> Option<Draft> {
        self.draft.take()
    }

    fn target_index(&self, catalog: &Catalog, input: &NavigationInput) -> Result<Option<usize>, NavigationError> {
        let last = catalog.len().checked_sub(1);
        match input {
            NavigationInput::Select(label) => resolve_label(catalog, label)
                .map(Some)
                .ok_or_else(|| NavigationError::StaleSelection {
                    label: label.clone(),
                }),
            NavigationInput::SelectId(id) => catalog
                .index_of(id)
                .map(Some)
                .ok_or_else(|| NavigationError::StaleSelection {
                    label: id.to_string(),
                }),
            NavigationInput::Next => Ok(match (self.state, last) {
                (_, None) => None,
                (NavState::Unselected, Some(_)) => Some(0),
                (NavState::Viewing(i), Some(last)) => Some((i + 1).min(last)),
            }),
            NavigationInput::Previous => Ok(match (self.state, last) {
                (_, None) => None,
                (NavState::Unselected, Some(_)) => Some(0),
                (NavState::Viewing(i), Some(last)) => Some(i.saturating_sub(1).min(last)),
            }),
        }
    }

    /// Compute the next navigator for `input`.
    ///
    /// On `StaleSelection` the caller keeps the current navigator.
    pub fn transition(&self, catalog: &Catalog, input: &NavigationInput) -> Result<Transition, NavigationError> {
        let Some(target) = self.target_index(catalog, input)? else {
            return Ok(Transition {
                next: self.clone(),
                discarded: None,
            });
        };

        if self.state == NavState::Viewing(target) {
            return Ok(Transition {
                next: self.clone(),
                discarded: None,
            });
        }

        debug!(from = ?self.state, to = target, "Navigating");
        Ok(Transition {
            next: Navigator {
                state: NavState::Viewing(target),
                draft: None,
            },
            discarded: self.draft.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::new(vec![
            Document::new("P1", "First"),
            Document::new("P2", "Second"),
            Document::new("P3", "Third"),
        ])
    }

    fn known(ids: &[&str]) -> ReviewedSnapshot {
        ReviewedSnapshot::Known(ids.iter().map(|id| DocumentId::new(*id)).collect())
    }

    #[test]
    fn test_initial_state() {
        assert_eq!(Navigator::new(&catalog()).state(), NavState::Viewing(0));
        assert_eq!(Navigator::new(&Catalog::default()).state(), NavState::Unselected);
    }

    #[test]
    fn test_labels_carry_status() {
        let options = option_list(&catalog(), &known(&["P2"]));
        assert_eq!(options[0].label, "⏳ P1 | First");
        assert_eq!(options[1].label, "✅ P2 | Second");
        assert_eq!(options[1].reviewed, Some(true));

        let unknown = option_list(&catalog(), &ReviewedSnapshot::Unknown("down".into()));
        assert!(unknown.iter().all(|o| o.reviewed.is_none()));
        assert!(unknown[0].label.starts_with(UNKNOWN_MARKER));
    }

    #[test]
    fn test_count_in_skips_ids_outside_catalog() {
        let catalog = catalog();
        assert_eq!(known(&["P1", "P9"]).count_in(&catalog), Some(1));
        assert_eq!(known(&["P1", "P2", "P3"]).count_in(&catalog), Some(3));
        assert_eq!(
            ReviewedSnapshot::Unknown("down".into()).count_in(&catalog),
            None
        );
    }

    #[test]
    fn test_resolve_label_ignores_marker() {
        let catalog = catalog();
        assert_eq!(resolve_label(&catalog, "⏳ P2 | Second"), Some(1));
        assert_eq!(resolve_label(&catalog, "✅ P2 | Second"), Some(1));
        assert_eq!(resolve_label(&catalog, "P3"), Some(2));
        assert_eq!(resolve_label(&catalog, "⏳ P9 | Gone"), None);
    }

    #[test]
    fn test_resolve_label_with_separator_inside_id() {
        let catalog = Catalog::new(vec![
            Document::new("A", "Solo"),
            Document::new("A | B", "Joint"),
        ]);
        let options = option_list(&catalog, &known(&[]));
        assert_eq!(options[1].label, "⏳ A | B | Joint");
        assert_eq!(resolve_label(&catalog, &options[1].label), Some(1));
        assert_eq!(resolve_label(&catalog, &options[0].label), Some(0));
        assert_eq!(resolve_label(&catalog, "A | B"), Some(1));
    }

    #[test]
    fn test_select_moves_and_discards_draft() {
        let catalog = catalog();
        let mut nav = Navigator::new(&catalog);
        nav.draft_form(&catalog, 4).unwrap().quantitative_scores[0] = 5.0;

        let t = nav
            .transition(&catalog, &NavigationInput::Select("⏳ P3 | Third".into()))
            .unwrap();
        assert_eq!(t.next.state(), NavState::Viewing(2));
        assert!(t.next.draft().is_none());
        let discarded = t.discarded.unwrap();
        assert_eq!(discarded.document, DocumentId::new("P1"));
        assert_eq!(discarded.form.quantitative_scores[0], 5.0);
    }

    #[test]
    fn test_reselecting_current_document_is_idempotent() {
        let catalog = catalog();
        let mut nav = Navigator::new(&catalog);
        nav.draft_form(&catalog, 4).unwrap().human_comparison_score = 6.0;

        let input = NavigationInput::SelectId(DocumentId::new("P1"));
        let once = nav.transition(&catalog, &input).unwrap();
        let twice = once.next.transition(&catalog, &input).unwrap();

        assert_eq!(twice.next.current_index(), Some(0));
        assert!(once.discarded.is_none());
        assert!(twice.discarded.is_none());
        assert_eq!(twice.next.draft().unwrap().form.human_comparison_score, 6.0);
    }

    #[test]
    fn test_stale_selection_fails_closed() {
        let catalog = catalog();
        let nav = Navigator::new(&catalog);
        let err = nav
            .transition(&catalog, &NavigationInput::Select("⏳ P9 | Removed".into()))
            .unwrap_err();
        assert_eq!(
            err,
            NavigationError::StaleSelection {
                label: "⏳ P9 | Removed".into()
            }
        );
        assert_eq!(nav.state(), NavState::Viewing(0));
    }

    #[test]
    fn test_next_and_previous_clamp() {
        let catalog = catalog();
        let nav = Navigator::new(&catalog);

        let back = nav.transition(&catalog, &NavigationInput::Previous).unwrap();
        assert_eq!(back.next.current_index(), Some(0));

        let mut nav = nav;
        for _ in 0..5 {
            nav = nav.transition(&catalog, &NavigationInput::Next).unwrap().next;
        }
        assert_eq!(nav.current_index(), Some(2));
    }

    #[test]
    fn test_empty_catalog_stays_unselected() {
        let catalog = Catalog::default();
        let nav = Navigator::new(&catalog);
        let t = nav.transition(&catalog, &NavigationInput::Next).unwrap();
        assert_eq!(t.next.state(), NavState::Unselected);
        assert!(nav.clone().draft_form(&catalog, 4).is_none());
        assert!(nav.transition(&catalog, &NavigationInput::Select("P1".into())).is_err());
    }
}
