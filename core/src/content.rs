//! Pluggable storage for raw document text, keyed by a reference string.

use crate::model::{DocumentId, DB_REFERENCE};
use crate::store::SledStore;
use crate::{Error, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

const FILE_SCHEME: &str = "file://";

pub trait ContentStorage: Send + Sync {
    /// Store `content` and return the reference to read it back with.
    fn save_content(&self, document_id: DocumentId, content: &str) -> Result<String>;

    fn get_content(&self, document_id: DocumentId, reference: &str) -> Result<Option<String>>;

    /// Returns false when there was nothing to delete.
    fn delete_content(&self, document_id: DocumentId, reference: &str) -> Result<bool>;

    fn update_content(&self, document_id: DocumentId, reference: &str, content: &str) -> Result<String> {
        self.delete_content(document_id, reference)?;
        self.save_content(document_id, content)
    }
}

/// Keeps content inline in the document record.
pub struct DatabaseContent {
    store: Arc<SledStore>,
}

impl DatabaseContent {
    pub fn new(store: Arc<SledStore>) -> Self { Self { store } }
}

impl ContentStorage for DatabaseContent {
    fn save_content(&self, document_id: DocumentId, content: &str) -> Result<String> {
        self.store.set_content(document_id, content, DB_REFERENCE)?;
        Ok(DB_REFERENCE.to_string())
    }

    fn get_content(&self, document_id: DocumentId, _reference: &str) -> Result<Option<String>> {
        Ok(self.store.get_document(document_id)?.map(|d| d.content))
    }

    /// Blanks the content; the record itself stays.
    fn delete_content(&self, document_id: DocumentId, _reference: &str) -> Result<bool> {
        self.store.set_content(document_id, "", DB_REFERENCE)
    }

    fn update_content(&self, document_id: DocumentId, _reference: &str, content: &str) -> Result<String> {
        self.save_content(document_id, content)
    }
}

/// One `<id>.txt` file per document under `root`.
pub struct FileContent {
    root: PathBuf,
}

impl FileContent {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    fn path_for(&self, document_id: DocumentId) -> PathBuf {
        self.root.join(format!("{document_id}.txt"))
    }

    fn resolve(&self, document_id: DocumentId, reference: &str) -> PathBuf {
        match reference.strip_prefix(FILE_SCHEME) {
            Some(path) => PathBuf::from(path),
            None => self.path_for(document_id),
        }
    }
}

impl ContentStorage for FileContent {
    fn save_content(&self, document_id: DocumentId, content: &str) -> Result<String> {
        fs::create_dir_all(&self.root)?;
        let path = self.path_for(document_id);
        fs::write(&path, content)?;
        Ok(format!("{FILE_SCHEME}{}", path.display()))
    }

    fn get_content(&self, document_id: DocumentId, reference: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.resolve(document_id, reference)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete_content(&self, document_id: DocumentId, reference: &str) -> Result<bool> {
        match fs::remove_file(self.resolve(document_id, reference)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentBackend {
    #[default]
    Database,
    File,
}

impl FromStr for ContentBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "db" | "database" => Ok(Self::Database),
            "file" | "fs" => Ok(Self::File),
            other => Err(Error::UnknownBackend(other.to_string())),
        }
    }
}

/// Storage for the configured backend. `root` is only used by the file backend.
pub fn content_storage(backend: ContentBackend, store: Arc<SledStore>, root: &Path) -> Arc<dyn ContentStorage> {
    match backend {
        ContentBackend::Database => Arc::new(DatabaseContent::new(store)),
        ContentBackend::File => Arc::new(FileContent::new(root)),
    }
}
