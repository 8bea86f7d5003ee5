use serde::Serialize;

use super::documents::StorageError;
use super::store::StoreError;

/// Failure returned by every rental operation.
#[derive(Debug, thiserror::Error)]
pub enum RentalError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("validation failed: {0}")]
    ValidationFailed(String),
    #[error("version conflict: {0}")]
    VersionConflict(String),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    InvalidState,
    ValidationFailed,
    VersionConflict,
    Unavailable,
}

impl ErrorKind {
    pub const fn label(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::ValidationFailed => "validation_failed",
            ErrorKind::VersionConflict => "version_conflict",
            ErrorKind::Unavailable => "unavailable",
        }
    }
}

impl RentalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RentalError::NotFound { .. } => ErrorKind::NotFound,
            RentalError::Unauthorized(_) => ErrorKind::Unauthorized,
            RentalError::InvalidState(_) => ErrorKind::InvalidState,
            RentalError::ValidationFailed(_) => ErrorKind::ValidationFailed,
            RentalError::VersionConflict(_) => ErrorKind::VersionConflict,
            RentalError::Unavailable(_) => ErrorKind::Unavailable,
        }
    }

    pub(crate) fn unauthorized(detail: impl Into<String>) -> Self {
        RentalError::Unauthorized(detail.into())
    }

    pub(crate) fn invalid_state(detail: impl Into<String>) -> Self {
        RentalError::InvalidState(detail.into())
    }

    pub(crate) fn validation(detail: impl Into<String>) -> Self {
        RentalError::ValidationFailed(detail.into())
    }
}

impl From<StoreError> for RentalError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { collection, id } => RentalError::NotFound {
                entity: collection.entity(),
                id,
            },
            conflict @ StoreError::VersionConflict { .. } => {
                RentalError::VersionConflict(conflict.to_string())
            }
            other => RentalError::Unavailable(other.to_string()),
        }
    }
}

impl From<StorageError> for RentalError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Rejected { .. } => RentalError::ValidationFailed(err.to_string()),
            StorageError::Unavailable(_) => RentalError::Unavailable(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::rentals::store::Collection;

    #[test]
    fn store_not_found_maps_to_entity_name() {
        let err = RentalError::from(StoreError::NotFound {
            collection: Collection::Leases,
            id: "lease-000009".to_string(),
        });
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "lease lease-000009 not found");
    }

    #[test]
    fn version_conflicts_keep_their_kind() {
        let err = RentalError::from(StoreError::VersionConflict {
            collection: Collection::Leases,
            id: "lease-000001".to_string(),
            expected: 2,
            actual: 3,
        });
        assert_eq!(err.kind(), ErrorKind::VersionConflict);
        assert_eq!(err.kind().label(), "version_conflict");
    }
}
