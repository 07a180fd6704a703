//! Expert identity resolution.
//!
//! Every session starts here: an opaque token (or, in debug mode, a name
//! picked from the roster) is turned into an [`Expert`]. Nothing downstream
//! accepts an unresolved identity.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use delphi_common::Expert;

use crate::config::IdentityMode;
use crate::errors::IdentityError;

/// One row of the roster table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub name: String,
    pub token: String,
}

/// The static `token -> expert name` table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    entries: Vec<RosterEntry>,
}

impl Roster {
    pub fn new(entries: Vec<RosterEntry>) -> Self {
        Self { entries }
    }

    /// Load the roster from a JSON array of `{ "name", "token" }` rows.
    pub fn load(path: &Path) -> Result<Self, IdentityError> {
        let unreadable = |reason: String| IdentityError::RosterUnreadable {
            path: path.to_path_buf(),
            reason,
        };
        let content = std::fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;
        let entries: Vec<RosterEntry> =
            serde_json::from_str(&content).map_err(|e| unreadable(e.to_string()))?;

        let roster = Self::new(entries);
        for warning in roster.validate() {
            warn!(path = %path.display(), "{}", warning);
        }
        Ok(roster)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry holding `token`.
    fn by_token(&self, token: &str) -> Option<&RosterEntry> {
        self.entries.iter().find(|e| e.token == token)
    }

    fn by_name(&self, name: &str) -> Option<&RosterEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for entry in &self.entries {
            if entry.token.trim().is_empty() {
                warnings.push(format!("Roster entry '{}' has an empty token", entry.name));
            } else if !seen.insert(entry.token.as_str()) {
                warnings.push(format!(
                    "Roster token for '{}' duplicates an earlier entry; the earlier entry wins",
                    entry.name
                ));
            }
        }
        warnings
    }
}

/// Turns session entry parameters into an [`Expert`].
///
/// The mode is fixed for the resolver's lifetime.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    mode: IdentityMode,
    roster: Roster,
}

impl IdentityResolver {
    pub fn new(mode: IdentityMode, roster: Roster) -> Self {
        Self { mode, roster }
    }

    pub fn mode(&self) -> IdentityMode {
        self.mode
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Resolve a token (token mode) or a roster name (debug mode).
    ///
    /// A missing or blank input is `MissingToken`; an input that matches no
    /// roster row is `InvalidToken`.
    pub fn resolve(&self, input: Option<&str>) -> Result<Expert, IdentityError> {
        let input = input
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(IdentityError::MissingToken)?;

        let entry = match self.mode {
            IdentityMode::Token => self.roster.by_token(input),
            IdentityMode::Debug => self.roster.by_name(input),
        };

        match entry {
            Some(entry) => {
                info!(expert = %entry.name, mode = %self.mode, "Resolved expert identity");
                Ok(Expert::new(entry.name.clone()))
            }
            None => {
                warn!(mode = %self.mode, "Identity lookup failed");
                Err(IdentityError::InvalidToken)
            }
        }
    }
}
