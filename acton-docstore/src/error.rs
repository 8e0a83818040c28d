//! Error types
//!
//! [`StoreError`] is the structured error every [`DocumentStore`](crate::store::DocumentStore)
//! returns: it records which operation failed, why, and on which collection.
//! The crate-level [`Error`] wraps it together with criteria, conversion,
//! identifier and configuration failures.
//!
//! # Example
//!
//! ```rust
//! use acton_docstore::error::{StoreError, StoreErrorKind, StoreOperation};
//!
//! let error = StoreError::not_found("users").with_operation(StoreOperation::FindOne);
//! assert!(matches!(error.kind, StoreErrorKind::NotFound));
//! assert!(!error.is_retriable());
//! ```

use std::fmt;

use thiserror::Error;

use crate::criteria::CriteriaError;
use crate::ids::IdError;

/// Store operation being performed when the error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// Establishing a connection
    Connect,
    /// Inserting one document
    InsertOne,
    /// Inserting several documents
    InsertMany,
    /// Updating the first matching document
    UpdateOne,
    /// Updating every matching document
    UpdateMany,
    /// Finding matching documents
    Find,
    /// Finding the first matching document
    FindOne,
    /// Counting matching documents
    Count,
    /// Creating indexes
    CreateIndexes,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => write!(f, "connect"),
            Self::InsertOne => write!(f, "insert_one"),
            Self::InsertMany => write!(f, "insert_many"),
            Self::UpdateOne => write!(f, "update_one"),
            Self::UpdateMany => write!(f, "update_many"),
            Self::Find => write!(f, "find"),
            Self::FindOne => write!(f, "find_one"),
            Self::Count => write!(f, "count"),
            Self::CreateIndexes => write!(f, "create_indexes"),
        }
    }
}

/// Category of store error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorKind {
    /// No document matched
    NotFound,
    /// Duplicate key on a unique index
    AlreadyExists,
    /// Other constraint violation
    ConstraintViolation,
    /// Failed to reach the store
    ConnectionFailed,
    /// Operation timed out
    Timeout,
    /// Underlying store error
    DatabaseError,
    /// Serialization or deserialization error
    SerializationError,
    /// Other unclassified error
    Other,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::AlreadyExists => write!(f, "already_exists"),
            Self::ConstraintViolation => write!(f, "constraint_violation"),
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::DatabaseError => write!(f, "database_error"),
            Self::SerializationError => write!(f, "serialization_error"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Structured store error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    /// The operation being performed when the error occurred
    pub operation: StoreOperation,
    /// The category of error
    pub kind: StoreErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Collection involved, if known
    pub collection: Option<String>,
    /// Identifier of the document involved, if known
    pub entity_id: Option<String>,
}

impl StoreError {
    /// Create a new store error
    ///
    /// # Example
    ///
    /// ```rust
    /// use acton_docstore::error::{StoreError, StoreErrorKind, StoreOperation};
    ///
    /// let error = StoreError::new(
    ///     StoreOperation::InsertOne,
    ///     StoreErrorKind::ConstraintViolation,
    ///     "document too large",
    /// );
    /// assert_eq!(error.operation, StoreOperation::InsertOne);
    /// ```
    pub fn new(
        operation: StoreOperation,
        kind: StoreErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            collection: None,
            entity_id: None,
        }
    }

    /// No document in `collection` matched the filter
    pub fn not_found(collection: impl Into<String>) -> Self {
        Self::new(
            StoreOperation::FindOne,
            StoreErrorKind::NotFound,
            "no document matched the filter",
        )
        .with_collection(collection)
    }

    /// A unique index rejected the write
    pub fn already_exists(collection: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::new(
            StoreOperation::InsertOne,
            StoreErrorKind::AlreadyExists,
            "duplicate key",
        )
        .with_collection(collection)
        .with_entity(identifier)
    }

    /// The store could not be reached
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::new(
            StoreOperation::Connect,
            StoreErrorKind::ConnectionFailed,
            message,
        )
    }

    /// The store rejected the operation
    pub fn database_error(operation: StoreOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StoreErrorKind::DatabaseError, message)
    }

    /// A document could not be encoded or decoded
    pub fn serialization_error(operation: StoreOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StoreErrorKind::SerializationError, message)
    }

    /// Add collection context
    #[must_use]
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Add document identifier context
    #[must_use]
    pub fn with_entity(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: StoreOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Returns `true` when no document matched
    pub fn is_not_found(&self) -> bool {
        self.kind == StoreErrorKind::NotFound
    }

    /// Check if this error is retriable (transient errors that may succeed on retry)
    ///
    /// ```rust
    /// use acton_docstore::error::StoreError;
    ///
    /// assert!(StoreError::connection_failed("connection reset").is_retriable());
    /// assert!(!StoreError::not_found("users").is_retriable());
    /// ```
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.kind,
            StoreErrorKind::ConnectionFailed | StoreErrorKind::Timeout
        )
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Store {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        match (&self.collection, &self.entity_id) {
            (Some(collection), Some(id)) => write!(f, " [{}: {}]", collection, id)?,
            (Some(collection), None) => write!(f, " [{}]", collection)?,
            _ => {}
        }
        Ok(())
    }
}

impl std::error::Error for StoreError {}

/// Error converting between a model and a domain entity
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// The source value could not be serialized to a document
    #[error("failed to serialize {type_name}: {message}")]
    Serialize {
        /// Source type
        type_name: &'static str,
        /// Underlying serializer message
        message: String,
    },

    /// The converted document could not be deserialized into the target
    #[error("failed to deserialize {type_name}: {message}")]
    Deserialize {
        /// Target type
        type_name: &'static str,
        /// Underlying deserializer message
        message: String,
    },

    /// A field value could not be coerced between kinds
    #[error("cannot convert field '{field}' from {from} to {to}: {message}")]
    Field {
        /// Field name
        field: String,
        /// Source field kind
        from: String,
        /// Target field kind
        to: String,
        /// Why the coercion failed
        message: String,
    },
}

/// Crate error type
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Criteria could not be translated into a filter
    #[error("Invalid criteria: {0}")]
    Criteria(#[from] CriteriaError),

    /// Structured store error with operation context
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Model/entity conversion failed
    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// Malformed record identifier
    #[error("Invalid id: {0}")]
    Id(#[from] IdError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns the store error kind, if this is a store error
    pub fn store_kind(&self) -> Option<StoreErrorKind> {
        match self {
            Self::Store(e) => Some(e.kind),
            _ => None,
        }
    }

    /// Returns `true` for a store "not found" error
    pub fn is_not_found(&self) -> bool {
        self.store_kind() == Some(StoreErrorKind::NotFound)
    }
}

// Manual From implementations for boxed errors
impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
