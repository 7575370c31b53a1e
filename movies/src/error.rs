//! Error taxonomy for store operations.
//!
//! Domain outcomes a caller is expected to branch on (`NotFound`,
//! `EditConflict`) are separate variants; everything else is folded into the
//! opaque [`StorageError`].

use std::time::Duration;

/// Failure returned by every [`MovieRepository`](crate::MovieRepository) operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("unable to update the record due to an edit conflict, please try again")]
    EditConflict,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Backend failures that carry no domain meaning.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{operation} exceeded its deadline of {after:?}")]
    DeadlineExceeded {
        operation: &'static str,
        after: Duration,
    },
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("migration error: {0}")]
    Migration(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse discriminator callers use to pick a user-visible outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    EditConflict,
    Storage,
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound => ErrorKind::NotFound,
            StoreError::EditConflict => ErrorKind::EditConflict,
            StoreError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// True when the operation was abandoned because its deadline expired.
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(
            self,
            StoreError::Storage(StorageError::DeadlineExceeded { .. })
        )
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Storage(StorageError::Database(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_one_to_one() {
        assert_eq!(StoreError::NotFound.kind(), ErrorKind::NotFound);
        assert_eq!(StoreError::EditConflict.kind(), ErrorKind::EditConflict);
        let err = StoreError::from(StorageError::Corrupt("bad genres".to_string()));
        assert_eq!(err.kind(), ErrorKind::Storage);
    }

    #[test]
    fn sqlx_errors_are_storage_failures() {
        let err = StoreError::from(sqlx::Error::PoolClosed);
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(!err.is_deadline_exceeded());
    }

    #[test]
    fn deadline_message_names_operation() {
        let err = StoreError::from(StorageError::DeadlineExceeded {
            operation: "get",
            after: Duration::from_millis(50),
        });
        assert!(err.is_deadline_exceeded());
        assert_eq!(err.to_string(), "get exceeded its deadline of 50ms");
    }
}
