use std::collections::BTreeMap;
use std::sync::Mutex;

use mime::Mime;

use super::domain::LeaseId;

const DEFAULT_LEASE_FILE_NAME: &str = "lease.pdf";

/// Blob storage collaborator. Returns a locator the lease record can reference.
pub trait DocumentStorage: Send + Sync {
    fn store(&self, path: &str, bytes: &[u8], content_type: &Mime) -> Result<String, StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("document storage refused {path}: {reason}")]
    Rejected { path: String, reason: String },
    #[error("document storage unavailable: {0}")]
    Unavailable(String),
}

/// Parse `raw` and accept it only when it names a PDF.
pub fn require_pdf(raw: &str) -> Result<Mime, String> {
    let parsed: Mime = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{raw}' is not a valid content type"))?;

    if parsed.essence_str() == mime::APPLICATION_PDF.essence_str() {
        Ok(parsed)
    } else {
        Err(format!(
            "lease documents must be {}, found {}",
            mime::APPLICATION_PDF,
            parsed.essence_str()
        ))
    }
}

/// Storage path for a lease document, `leases/{lease_id}/{file}`, with the file name reduced to
/// ASCII alphanumerics and dots.
pub fn lease_document_path(lease_id: &LeaseId, file_name: &str) -> String {
    let sanitized: String = file_name
        .trim()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '.' {
                ch
            } else {
                '_'
            }
        })
        .collect();

    let file = if sanitized.trim_matches(|ch| ch == '_' || ch == '.').is_empty() {
        DEFAULT_LEASE_FILE_NAME.to_string()
    } else {
        sanitized
    };

    format!("leases/{}/{}", lease_id, file)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub content_type: String,
    pub size: usize,
}

/// In-process blob storage that records what was written and hands back `memory://` locators.
#[derive(Debug)]
pub struct MemoryDocumentStorage {
    base_url: String,
    objects: Mutex<BTreeMap<String, StoredObject>>,
}

impl Default for MemoryDocumentStorage {
    fn default() -> Self {
        Self::with_base_url("memory://documents")
    }
}

impl MemoryDocumentStorage {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn objects(&self) -> BTreeMap<String, StoredObject> {
        self.objects
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl DocumentStorage for MemoryDocumentStorage {
    fn store(&self, path: &str, bytes: &[u8], content_type: &Mime) -> Result<String, StorageError> {
        if bytes.is_empty() {
            return Err(StorageError::Rejected {
                path: path.to_string(),
                reason: "empty upload".to_string(),
            });
        }

        let mut objects = self
            .objects
            .lock()
            .map_err(|_| StorageError::Unavailable("document index lock poisoned".to_string()))?;
        objects.insert(
            path.to_string(),
            StoredObject {
                content_type: content_type.essence_str().to_string(),
                size: bytes.len(),
            },
        );

        Ok(format!("{}/{}", self.base_url, path))
    }
}
