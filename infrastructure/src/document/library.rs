use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Document not found: {0}")]
    NotFound(String),
}

/// A loaded document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    id: String,
    text: String,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whitespace-only documents count as empty.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// The first `limit` characters of the text.
    pub fn excerpt(&self, limit: usize) -> &str {
        match self.text.char_indices().nth(limit) {
            Some((end, _)) => &self.text[..end],
            None => &self.text,
        }
    }
}

/// In-memory store of loaded documents, keyed by id
#[derive(Debug, Default)]
pub struct DocumentLibrary {
    documents: RwLock<HashMap<String, Arc<Document>>>,
}

impl DocumentLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, document: Document) -> Arc<Document> {
        let document = Arc::new(document);
        self.documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(document.id().to_string(), document.clone());
        document
    }

    pub fn get(&self, id: &str) -> Result<Arc<Document>, DocumentError> {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| DocumentError::NotFound(id.to_string()))
    }

    /// Read `path` and register it under its file name.
    ///
    /// Invalid UTF-8 is replaced rather than rejected.
    pub async fn load_file(&self, path: &Path) -> Result<Arc<Document>, DocumentError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| DocumentError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let document = self.insert(Document::new(document_id(path), text));
        info!(
            id = document.id(),
            chars = document.text().chars().count(),
            "Document loaded"
        );
        Ok(document)
    }

    /// Like [`load_file`](Self::load_file), but an unreadable file is
    /// registered as an empty document so the session still starts and
    /// every answer becomes the canned "too little data" reply.
    pub async fn load_or_empty(&self, path: &Path) -> Arc<Document> {
        match self.load_file(path).await {
            Ok(document) => document,
            Err(e) => {
                warn!("{}; continuing with an empty document", e);
                self.insert(Document::new(document_id(path), String::new()))
            }
        }
    }
}

fn document_id(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
