use triage_catalog::CatalogError;
use triage_types::TypesError;

/// Errors raised by the triage engine.
///
/// The first three variants are client errors and carry a message fit to show the caller. The
/// rest are internal and should be logged rather than echoed.
#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("upstream unavailable: {0}")]
    Upstream(String),
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to write consultation file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read consultation file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to serialize consultation: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize consultation: {0}")]
    Deserialization(serde_json::Error),
    #[error("repository lock poisoned")]
    LockPoisoned,
}

impl From<TypesError> for TriageError {
    fn from(err: TypesError) -> Self {
        TriageError::Validation(err.to_string())
    }
}

impl TriageError {
    /// True for errors caused by the request rather than by the system.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TriageError::Validation(_) | TriageError::NotFound(_) | TriageError::Conflict(_)
        )
    }
}

pub type TriageResult<T> = std::result::Result<T, TriageError>;
