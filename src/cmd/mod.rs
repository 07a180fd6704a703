//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module     | Commands handled                          |
//! |------------|-------------------------------------------|
//! | `project`  | `Init`                                    |
//! | `config`   | `Config`                                  |
//! | `ledger`   | `Documents`, `Progress`, `Submit`, `Export` |
//! | `review`   | `Review`                                  |

pub mod config;
pub mod ledger;
pub mod project;
pub mod review;

pub use config::cmd_config;
pub use ledger::{cmd_documents, cmd_export, cmd_progress, cmd_submit};
pub use project::cmd_init;
pub use review::cmd_review;

use anyhow::{Context, Result, bail};
use std::path::Path;

use delphi::config::DelphiConfig;
use delphi::guard::ScoreRules;
use delphi::identity::{IdentityResolver, Roster};
use delphi::session::SessionService;

/// Everything a command needs once the project is loaded.
///
/// Roster and corpus failures surface here, before any document is shown.
pub struct Workspace {
    pub config: DelphiConfig,
    pub resolver: IdentityResolver,
    pub service: SessionService,
}

impl Workspace {
    pub fn open(project_dir: &Path) -> Result<Self> {
        if !delphi::init::is_initialized(project_dir) {
            bail!(
                "No review project at {}. Run `delphi init` first.",
                project_dir.display()
            );
        }
        let config = DelphiConfig::new(project_dir.to_path_buf())?;

        let roster = Roster::load(&config.roster_file())?;
        let resolver = IdentityResolver::new(config.toml.identity.mode, roster);

        let catalog = delphi::catalog::load(&config.corpus_file())?;
        let store = delphi::store::open_store(&config);
        let rules = ScoreRules::from_config(&config.toml.scoring);
        let service = SessionService::new(catalog, store, rules);

        Ok(Self {
            config,
            resolver,
            service,
        })
    }
}

/// Parse a `NAME=TEXT` qualitative field.
pub fn parse_field(raw: &str) -> Result<(String, String)> {
    let (name, text) = raw
        .split_once('=')
        .context("expected NAME=TEXT")?;
    let name = name.trim();
    if name.is_empty() {
        bail!("field name must not be empty");
    }
    Ok((name.to_string(), text.to_string()))
}
