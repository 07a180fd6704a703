//! Initialization of a review project.
//!
//! `delphi init` creates the `.delphi/` directory:
//!
//! ```text
//! .delphi/
//! ├── delphi.toml      # Project configuration
//! ├── corpus.json      # Documents under review (placeholder: [])
//! ├── roster.json      # token -> expert name table (placeholder: [])
//! ├── submissions/     # Submission ledger
//! └── logs/            # Rolling log files
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::DelphiToml;

/// The name of the project configuration directory.
pub const DELPHI_DIR: &str = ".delphi";

/// Result of initializing a review project.
#[derive(Debug)]
pub struct InitResult {
    /// Path to the `.delphi` directory
    pub delphi_dir: PathBuf,
    /// Whether the directory was newly created (false if it already existed)
    pub created: bool,
}

/// Initialize a review project in the given directory.
///
/// Existing files are never overwritten; a partial structure is completed.
pub fn init_project(project_dir: &Path) -> Result<InitResult> {
    let delphi_dir = project_dir.join(DELPHI_DIR);

    let created = !delphi_dir.exists();
    if created {
        std::fs::create_dir_all(&delphi_dir)
            .with_context(|| format!("Failed to create directory: {}", delphi_dir.display()))?;
    }
    ensure_directory_structure(&delphi_dir)?;

    Ok(InitResult {
        delphi_dir,
        created,
    })
}

fn ensure_directory_structure(delphi_dir: &Path) -> Result<()> {
    for sub in ["submissions", "logs"] {
        let path = delphi_dir.join(sub);
        std::fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    }

    let config_file = delphi_dir.join("delphi.toml");
    if !config_file.exists() {
        DelphiToml::default().save(&config_file)?;
    }

    for placeholder in ["corpus.json", "roster.json"] {
        let path = delphi_dir.join(placeholder);
        if !path.exists() {
            std::fs::write(&path, "[]\n")
                .with_context(|| format!("Failed to create {}", path.display()))?;
        }
    }

    Ok(())
}

/// Check if a project has been initialized.
pub fn is_initialized(project_dir: &Path) -> bool {
    project_dir.join(DELPHI_DIR).exists()
}

pub fn get_delphi_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(DELPHI_DIR)
}
