//! The corpus of reviewable documents.
//!
//! The catalog is ordered: position defines navigation order, while
//! everything outside the navigator addresses documents by [`DocumentId`].
//! Loads are cached for the lifetime of the process, keyed by path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use tracing::{debug, info, warn};

use delphi_common::{Document, DocumentId};

use crate::errors::CatalogError;

/// Immutable, ordered list of documents with an id → position index.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    documents: Vec<Document>,
    positions: HashMap<DocumentId, usize>,
}

impl Catalog {
    /// Build a catalog, indexing documents by id.
    ///
    /// Ids are expected to be unique. If one repeats, the first position keeps
    /// the id mapping.
    pub fn new(documents: Vec<Document>) -> Self {
        let mut positions = HashMap::with_capacity(documents.len());
        for (index, doc) in documents.iter().enumerate() {
            if positions.contains_key(&doc.id) {
                warn!(id = %doc.id, index, "Duplicate document id in corpus");
                continue;
            }
            positions.insert(doc.id.clone(), index);
        }
        Self {
            documents,
            positions,
        }
    }

    /// Parse a corpus JSON array (one object per row).
    pub fn from_json(path: &Path, content: &str) -> Result<Self, CatalogError> {
        let documents: Vec<Document> =
            serde_json::from_str(content).map_err(|e| CatalogError::Unreadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if let Some(pos) = documents.iter().position(|d| d.id.as_str().trim().is_empty()) {
            return Err(CatalogError::Unreadable {
                path: path.to_path_buf(),
                reason: format!("row {} has an empty ID", pos + 1),
            });
        }

        Ok(Self::new(documents))
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Document> {
        self.documents.get(index)
    }

    pub fn by_id(&self, id: &DocumentId) -> Option<&Document> {
        self.index_of(id).and_then(|i| self.documents.get(i))
    }

    pub fn index_of(&self, id: &DocumentId) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn id_at(&self, index: usize) -> Option<&DocumentId> {
        self.documents.get(index).map(|d| &d.id)
    }
}

fn cache() -> &'static Mutex<HashMap<PathBuf, Arc<Catalog>>> {
    static CACHE: OnceLock<Mutex<HashMap<PathBuf, Arc<Catalog>>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Load the corpus at `path`, returning the cached copy on later calls.
///
/// A failed load is not cached.
pub fn load(path: &Path) -> Result<Arc<Catalog>, CatalogError> {
    let key = path.to_path_buf();
    {
        let cached = cache().lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(catalog) = cached.get(&key) {
            debug!(path = %path.display(), "Corpus cache hit");
            return Ok(Arc::clone(catalog));
        }
    }

    let content = std::fs::read_to_string(path).map_err(|e| CatalogError::Unreadable {
        path: key.clone(),
        reason: e.to_string(),
    })?;
    let catalog = Arc::new(Catalog::from_json(path, &content)?);
    info!(path = %path.display(), documents = catalog.len(), "Loaded corpus");

    let mut cached = cache().lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    Ok(Arc::clone(cached.entry(key).or_insert(catalog)))
}

/// Drop the cached corpus for `path` so the next [`load`] re-reads it.
pub fn invalidate(path: &Path) {
    let mut cached = cache().lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if cached.remove(path).is_some() {
        debug!(path = %path.display(), "Corpus cache invalidated");
    }
}
