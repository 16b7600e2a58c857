//! Error types for tessera operations.
//!
//! Every failure carries a structured [`ErrorCode`] so callers can tell a
//! correctable rejection from a stale write or a degraded success without
//! matching on message text.

use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::types::{ChangeDescription, Version};

/// Result type alias for tessera operations.
pub type TesseraResult<T> = Result<T, TesseraError>;

/// Main error type for all tessera operations.
#[derive(Error, Debug)]
pub enum TesseraError {
    /// The proposed entity was rejected before anything was persisted.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: ErrorCode,
        details: HashMap<String, String>,
    },

    /// The requested entity does not exist.
    #[error("Entity not found: {message}")]
    NotFound {
        message: String,
        code: ErrorCode,
        entity_type: String,
        entity_id: Option<Uuid>,
    },

    /// The caller observed a version that is no longer current.
    #[error("Concurrency conflict on {entity_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        entity_id: Uuid,
        expected: String,
        actual: String,
        code: ErrorCode,
    },

    /// The entity body is durable but its relationships were not stored.
    ///
    /// `change_description` is the persisted change, so callers can react to
    /// the new version without another read.
    #[error("Relationship persistence failed for {entity_type} {entity_id} at version {version}: {message}")]
    RelationshipPersist {
        entity_type: String,
        entity_id: Uuid,
        version: Version,
        change_description: Box<ChangeDescription>,
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// No hooks are registered for the entity type.
    #[error("Unknown entity type: {0}")]
    UnknownEntityType(String),

    /// Database operation failed.
    #[error("Database error: {message}")]
    Database {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Parse error.
    #[error("Parse error: {message}")]
    Parse { message: String, code: ErrorCode },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Validation (VAL_xxx)
    ValInvalidInput,
    ValMissingField,
    ValTypeMismatch,
    ValInvalidRange,

    // Entity (ENT_xxx)
    EntNotFound,
    EntUnknownType,

    // Concurrency (CONC_xxx)
    ConcVersionMismatch,
    ConcAlreadyExists,

    // Relationships (REL_xxx)
    RelPersistFailed,

    // Database (DB_xxx)
    DbConnectionFailed,
    DbOperationFailed,
    DbLockPoisoned,

    // Parse (PARSE_xxx)
    ParseInvalidJson,
    ParseInvalidVersion,

    // Configuration
    Configuration,

    // Filesystem and other internal failures
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ValMissingField => "VAL_002",
            ErrorCode::ValTypeMismatch => "VAL_003",
            ErrorCode::ValInvalidRange => "VAL_004",
            ErrorCode::EntNotFound => "ENT_001",
            ErrorCode::EntUnknownType => "ENT_002",
            ErrorCode::ConcVersionMismatch => "CONC_001",
            ErrorCode::ConcAlreadyExists => "CONC_002",
            ErrorCode::RelPersistFailed => "REL_001",
            ErrorCode::DbConnectionFailed => "DB_001",
            ErrorCode::DbOperationFailed => "DB_002",
            ErrorCode::DbLockPoisoned => "DB_003",
            ErrorCode::ParseInvalidJson => "PARSE_001",
            ErrorCode::ParseInvalidVersion => "PARSE_002",
            ErrorCode::Configuration => "CFG_001",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl TesseraError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            details: HashMap::new(),
        }
    }

    /// Create a validation error that names the offending field.
    pub fn missing_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let field = field.into();
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValMissingField,
            details: HashMap::from([("field".to_string(), field)]),
        }
    }

    /// Create a validation error for an inverted or malformed range.
    pub fn invalid_range(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidRange,
            details: HashMap::new(),
        }
    }

    /// Create a validation error for a proposal filed under the wrong type.
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        let expected = expected.into();
        let actual = actual.into();
        Self::Validation {
            message: format!("entity type '{}' does not match '{}'", actual, expected),
            code: ErrorCode::ValTypeMismatch,
            details: HashMap::from([
                ("expected".to_string(), expected),
                ("actual".to_string(), actual),
            ]),
        }
    }

    /// Create a not found error.
    pub fn not_found(entity_type: impl Into<String>, entity_id: Uuid) -> Self {
        let entity_type = entity_type.into();
        Self::NotFound {
            message: format!("{} with id '{}' not found", entity_type, entity_id),
            code: ErrorCode::EntNotFound,
            entity_type,
            entity_id: Some(entity_id),
        }
    }

    /// Create a concurrency conflict for a stale expected version.
    pub fn conflict(entity_id: Uuid, expected: Option<Version>, actual: Option<Version>) -> Self {
        let (expected, code) = match expected {
            Some(v) => (v.to_string(), ErrorCode::ConcVersionMismatch),
            None => ("<none>".to_string(), ErrorCode::ConcAlreadyExists),
        };
        Self::ConcurrencyConflict {
            entity_id,
            expected,
            actual: actual.map_or_else(|| "<none>".to_string(), |v| v.to_string()),
            code,
        }
    }

    /// Wrap a relationship hook failure for an entity that is already stored.
    pub fn relationship_persist(
        entity_type: impl Into<String>,
        entity_id: Uuid,
        change_description: ChangeDescription,
        source: TesseraError,
    ) -> Self {
        Self::RelationshipPersist {
            entity_type: entity_type.into(),
            entity_id,
            version: change_description.new_version,
            change_description: Box::new(change_description),
            message: source.to_string(),
            code: ErrorCode::RelPersistFailed,
            source: Some(Box::new(source)),
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            code: ErrorCode::ParseInvalidJson,
        }
    }

    /// Create an error for a database file that could not be opened.
    pub fn connection_failed(err: rusqlite::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            code: ErrorCode::DbConnectionFailed,
            source: Some(Box::new(err)),
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            code: ErrorCode::DbOperationFailed,
            source: None,
        }
    }

    /// Create an error for a connection mutex poisoned by a panicking holder.
    pub fn lock_poisoned(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            code: ErrorCode::DbLockPoisoned,
            source: None,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { code, .. } => *code,
            Self::NotFound { code, .. } => *code,
            Self::ConcurrencyConflict { code, .. } => *code,
            Self::RelationshipPersist { code, .. } => *code,
            Self::UnknownEntityType(_) => ErrorCode::EntUnknownType,
            Self::Database { code, .. } => *code,
            Self::Parse { code, .. } => *code,
            Self::Configuration(_) => ErrorCode::Configuration,
            Self::Serialization(_) => ErrorCode::ParseInvalidJson,
            Self::Io(_) => ErrorCode::Internal,
        }
    }

    /// Whether re-reading and resubmitting can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Validation { .. } => Some("Correct the entity and submit it again"),
            Self::NotFound { .. } => Some("Please check the entity ID and type"),
            Self::ConcurrencyConflict { .. } => {
                Some("Re-read the entity and retry with its current version")
            }
            Self::RelationshipPersist { .. } => {
                Some("The entity was stored; reconcile its relationships before relying on them")
            }
            Self::UnknownEntityType(_) => Some("Register hooks for this entity type first"),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for TesseraError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            code: ErrorCode::DbOperationFailed,
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let err = TesseraError::validation("testPlatforms must not be empty");
        assert_eq!(err.code(), ErrorCode::ValInvalidInput);
        assert!(err.to_string().contains("testPlatforms"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_missing_field_records_detail() {
        let err = TesseraError::missing_field("name", "name is required");
        match err {
            TesseraError::Validation { details, code, .. } => {
                assert_eq!(code, ErrorCode::ValMissingField);
                assert_eq!(details.get("field").map(String::as_str), Some("name"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_conflict_is_retryable() {
        let id = Uuid::new_v4();
        let err = TesseraError::conflict(id, Some(Version::new(1, 0)), Some(Version::new(1, 1)));
        assert_eq!(err.code(), ErrorCode::ConcVersionMismatch);
        assert!(err.is_retryable());
        assert!(err.to_string().contains("expected version 1.0, found 1.1"));

        let err = TesseraError::conflict(id, None, Some(Version::INITIAL));
        assert_eq!(err.code(), ErrorCode::ConcAlreadyExists);
    }

    #[test]
    fn test_relationship_persist_keeps_source() {
        let id = Uuid::new_v4();
        let change = ChangeDescription {
            previous_version: Some(Version::new(1, 3)),
            new_version: Version::new(2, 0),
            ..Default::default()
        };
        let err = TesseraError::relationship_persist(
            "table",
            id,
            change.clone(),
            TesseraError::database("owner edge insert failed"),
        );
        assert_eq!(err.code(), ErrorCode::RelPersistFailed);
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.suggestion().is_some());
        match err {
            TesseraError::RelationshipPersist {
                version,
                change_description,
                ..
            } => {
                assert_eq!(version, Version::new(2, 0));
                assert_eq!(*change_description, change);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_type_mismatch_names_both_types() {
        let err = TesseraError::type_mismatch("table", "topic");
        assert_eq!(err.code(), ErrorCode::ValTypeMismatch);
        assert_eq!(err.code().as_str(), "VAL_003");
        assert!(err.to_string().contains("'topic' does not match 'table'"));
    }

    #[test]
    fn test_open_failure_is_connection_error() {
        let err = TesseraError::connection_failed(rusqlite::Error::InvalidQuery);
        assert_eq!(err.code(), ErrorCode::DbConnectionFailed);

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(TesseraError::from(io).code(), ErrorCode::Internal);
    }

    #[test]
    fn test_error_code_as_str() {
        assert_eq!(ErrorCode::ValInvalidInput.as_str(), "VAL_001");
        assert_eq!(ErrorCode::EntNotFound.as_str(), "ENT_001");
        assert_eq!(ErrorCode::ConcVersionMismatch.as_str(), "CONC_001");
    }
}
