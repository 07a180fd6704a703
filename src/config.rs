//! Configuration for a Delphi review project.
//!
//! Settings are read from `.delphi/delphi.toml` and layered
//! file → environment → CLI.
//!
//! # Configuration File Format
//!
//! ```toml
//! [project]
//! name = "statin-evidence-round-2"
//!
//! [identity]
//! mode = "token"
//! roster_file = "roster.json"
//!
//! [corpus]
//! file = "corpus.json"
//!
//! [store]
//! backend = "files"
//! dir = "submissions"
//! timeout_ms = 5000
//!
//! [scoring]
//! dimensions = ["Accuracy", "Completeness", "Clarity", "Clinical relevance"]
//! min_score = 0.0
//! max_score = 10.0
//! qualitative_fields = ["Strengths", "Weaknesses"]
//! duplicate_policy = "block"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::init::DELPHI_DIR;

/// How an inbound session identifies its expert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityMode {
    /// Opaque token looked up against the roster (production)
    #[default]
    Token,
    /// Name picked from the roster directly (local/debug)
    Debug,
}

impl std::fmt::Display for IdentityMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityMode::Token => write!(f, "token"),
            IdentityMode::Debug => write!(f, "debug"),
        }
    }
}

impl std::str::FromStr for IdentityMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "token" => Ok(IdentityMode::Token),
            "debug" => Ok(IdentityMode::Debug),
            _ => anyhow::bail!("Invalid identity mode '{}'. Valid values: token, debug", s),
        }
    }
}

/// Which ledger layout backs the submission store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// One JSON file per submission, grouped by expert
    #[default]
    Files,
    /// One append-only JSON-lines file per expert
    Jsonl,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::Files => write!(f, "files"),
            StoreBackend::Jsonl => write!(f, "jsonl"),
        }
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "files" => Ok(StoreBackend::Files),
            "jsonl" => Ok(StoreBackend::Jsonl),
            _ => anyhow::bail!("Invalid store backend '{}'. Valid values: files, jsonl", s),
        }
    }
}

/// What to do when an expert submits a document they already reviewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Reject with `DuplicateSubmission`
    #[default]
    Block,
    /// Append another row; readers decide which one counts
    Accumulate,
}

impl std::fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DuplicatePolicy::Block => write!(f, "block"),
            DuplicatePolicy::Accumulate => write!(f, "accumulate"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectSection {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentitySection {
    #[serde(default)]
    pub mode: IdentityMode,
    /// Roster path, relative to `.delphi/`
    #[serde(default = "default_roster_file")]
    pub roster_file: String,
}

fn default_roster_file() -> String {
    "roster.json".to_string()
}

impl Default for IdentitySection {
    fn default() -> Self {
        Self {
            mode: IdentityMode::default(),
            roster_file: default_roster_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusSection {
    /// Corpus path, relative to `.delphi/`
    #[serde(default = "default_corpus_file")]
    pub file: String,
}

fn default_corpus_file() -> String {
    "corpus.json".to_string()
}

impl Default for CorpusSection {
    fn default() -> Self {
        Self {
            file: default_corpus_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSection {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Ledger directory, relative to `.delphi/`
    #[serde(default = "default_store_dir")]
    pub dir: String,
    /// Upper bound for any single store read or append
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_store_dir() -> String {
    "submissions".to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            dir: default_store_dir(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringSection {
    /// Labels of the quantitative scores, in submission order
    #[serde(default = "default_dimensions")]
    pub dimensions: Vec<String>,
    #[serde(default = "default_min_score")]
    pub min_score: f64,
    #[serde(default = "default_max_score")]
    pub max_score: f64,
    /// Names of the free-text fields offered alongside the scores
    #[serde(default = "default_qualitative_fields")]
    pub qualitative_fields: Vec<String>,
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
}

fn default_dimensions() -> Vec<String> {
    ["Accuracy", "Completeness", "Clarity", "Clinical relevance"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_min_score() -> f64 {
    0.0
}

fn default_max_score() -> f64 {
    10.0
}

fn default_qualitative_fields() -> Vec<String> {
    vec!["Strengths".to_string(), "Weaknesses".to_string()]
}

impl Default for ScoringSection {
    fn default() -> Self {
        Self {
            dimensions: default_dimensions(),
            min_score: default_min_score(),
            max_score: default_max_score(),
            qualitative_fields: default_qualitative_fields(),
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

/// Root of `delphi.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DelphiToml {
    #[serde(default)]
    pub project: ProjectSection,
    #[serde(default)]
    pub identity: IdentitySection,
    #[serde(default)]
    pub corpus: CorpusSection,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub scoring: ScoringSection,
}

impl DelphiToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse delphi.toml")
    }

    /// Load `.delphi/delphi.toml`, or defaults if the file doesn't exist.
    pub fn load_or_default(delphi_dir: &Path) -> Result<Self> {
        let config_path = delphi_dir.join("delphi.toml");
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize delphi.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Apply `DELPHI_*` environment overrides on top of the file values.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(mode) = std::env::var("DELPHI_IDENTITY_MODE") {
            self.identity.mode = mode.parse()?;
        }
        if let Ok(backend) = std::env::var("DELPHI_STORE_BACKEND") {
            self.store.backend = backend.parse()?;
        }
        if let Ok(dir) = std::env::var("DELPHI_STORE_DIR") {
            self.store.dir = dir;
        }
        if let Ok(ms) = std::env::var("DELPHI_STORE_TIMEOUT_MS") {
            self.store.timeout_ms = ms
                .parse()
                .with_context(|| format!("Invalid DELPHI_STORE_TIMEOUT_MS '{}'", ms))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.scoring.dimensions.is_empty() {
            warnings.push("scoring.dimensions is empty: submissions will carry no quantitative scores".to_string());
        }
        if !(self.scoring.min_score.is_finite() && self.scoring.max_score.is_finite()) {
            warnings.push("scoring.min_score and scoring.max_score must be finite".to_string());
        } else if self.scoring.min_score > self.scoring.max_score {
            warnings.push(format!(
                "scoring.min_score ({}) is greater than scoring.max_score ({})",
                self.scoring.min_score, self.scoring.max_score
            ));
        }
        if self.scoring.min_score > 0.0 {
            warnings.push(format!(
                "scoring.min_score is {}: untouched zero sliders will be rejected as out of range",
                self.scoring.min_score
            ));
        }
        if self.store.timeout_ms == 0 {
            warnings.push("store.timeout_ms is 0: every store call will time out".to_string());
        }

        warnings
    }
}

/// Effective configuration for one invocation.
#[derive(Debug, Clone)]
pub struct DelphiConfig {
    pub project_dir: PathBuf,
    pub delphi_dir: PathBuf,
    pub toml: DelphiToml,
}

/// Rolling log directory for a project, usable before the config is loaded.
pub fn log_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(DELPHI_DIR).join("logs")
}

impl DelphiConfig {
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let delphi_dir = project_dir.join(DELPHI_DIR);
        let mut toml = DelphiToml::load_or_default(&delphi_dir)?;
        toml.apply_env()?;

        Ok(Self {
            project_dir,
            delphi_dir,
            toml,
        })
    }

    pub fn config_file(&self) -> PathBuf {
        self.delphi_dir.join("delphi.toml")
    }

    pub fn corpus_file(&self) -> PathBuf {
        self.delphi_dir.join(&self.toml.corpus.file)
    }

    pub fn roster_file(&self) -> PathBuf {
        self.delphi_dir.join(&self.toml.identity.roster_file)
    }

    pub fn store_dir(&self) -> PathBuf {
        self.delphi_dir.join(&self.toml.store.dir)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.toml.store.timeout_ms)
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}
