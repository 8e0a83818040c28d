//! Business error codes
//!
//! Each [`ErrorCode`] pairs a numeric application code with an HTTP status
//! and a default message. An [`ErrorCodeRegistry`] is built once and is
//! immutable afterwards; lookups of unknown codes resolve to
//! [`INTERNAL`], the reserved "unknown error" code.
//!
//! ```rust
//! use acton_docstore::codes::{ErrorCode, ErrorCodeRegistry, INTERNAL, NOT_FOUND};
//!
//! let registry = ErrorCodeRegistry::builder()
//!     .register(ErrorCode::new(20001, 409, "quota exceeded"))
//!     .unwrap()
//!     .build();
//!
//! assert_eq!(registry.parse(20001).http_status, 409);
//! assert_eq!(registry.parse(NOT_FOUND).http_status, 404);
//! assert_eq!(registry.parse(424242).code, INTERNAL);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{Error, StoreErrorKind};

/// Success
pub const OK: i32 = 0;
/// Resource created
pub const CREATED: i32 = 1;
/// Resource updated
pub const UPDATED: i32 = 2;
/// Resource deleted
pub const DELETED: i32 = 3;
/// Invalid request parameters
pub const PARAMETER_ERROR: i32 = 10001;
/// Resource already exists
pub const RESOURCE_REPEAT: i32 = 10002;
/// Resource does not exist
pub const NOT_FOUND: i32 = 10003;
/// Missing authorization header
pub const AUTH_HEADER_REQUIRED: i32 = 10004;
/// Malformed authorization header
pub const AUTH_HEADER_INVALID: i32 = 10005;
/// Access forbidden
pub const FORBIDDEN: i32 = 10006;
/// Missing request body
pub const REQUEST_BODY_REQUIRED: i32 = 10007;
/// Invalid token
pub const TOKEN_INVALID: i32 = 10008;
/// Missing token
pub const TOKEN_REQUIRED: i32 = 10009;
/// Insufficient permissions
pub const PERMISSION_DENIED: i32 = 10010;
/// Unknown or internal error; reserved
pub const INTERNAL: i32 = 9999;

/// An application error code with its HTTP status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCode {
    /// Application code
    pub code: i32,
    /// HTTP status returned with this code
    pub http_status: u16,
    /// Default message
    pub message: String,
}

impl ErrorCode {
    /// Create an error code
    pub fn new(code: i32, http_status: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            http_status,
            message: message.into(),
        }
    }

    /// The same code with a different message
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// The same code with a different HTTP status
    #[must_use]
    pub fn with_http_status(mut self, http_status: u16) -> Self {
        self.http_status = http_status;
        self
    }

    /// Whether this code reports success
    pub fn is_success(&self) -> bool {
        (OK..=DELETED).contains(&self.code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Registration failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodeError {
    /// The code is reserved for unknown errors
    #[error("code {0} is reserved for unknown errors")]
    Reserved(i32),

    /// The code is already registered
    #[error("code {0} is already registered")]
    Duplicate(i32),
}

fn internal() -> ErrorCode {
    ErrorCode::new(INTERNAL, 500, "An internal server error occurred")
}

fn builtin() -> [ErrorCode; 14] {
    [
        ErrorCode::new(OK, 200, "ok"),
        ErrorCode::new(CREATED, 201, "created"),
        ErrorCode::new(UPDATED, 200, "updated"),
        ErrorCode::new(DELETED, 204, "deleted"),
        ErrorCode::new(PARAMETER_ERROR, 400, "parameter error"),
        ErrorCode::new(RESOURCE_REPEAT, 302, "resource repeat"),
        ErrorCode::new(NOT_FOUND, 404, "resource notfound"),
        ErrorCode::new(AUTH_HEADER_REQUIRED, 401, "auth header required"),
        ErrorCode::new(AUTH_HEADER_INVALID, 401, "auth header is invalid"),
        ErrorCode::new(FORBIDDEN, 403, "forbidden"),
        ErrorCode::new(REQUEST_BODY_REQUIRED, 400, "request body required"),
        ErrorCode::new(TOKEN_INVALID, 401, "token invalid"),
        ErrorCode::new(TOKEN_REQUIRED, 401, "token required"),
        ErrorCode::new(PERMISSION_DENIED, 403, "permission denied"),
    ]
}

/// Immutable code table
///
/// [`Default`] holds the built-in codes; use [`builder`](Self::builder) to
/// add application codes.
#[derive(Debug, Clone)]
pub struct ErrorCodeRegistry {
    codes: BTreeMap<i32, ErrorCode>,
    fallback: ErrorCode,
}

impl Default for ErrorCodeRegistry {
    fn default() -> Self {
        ErrorCodeRegistryBuilder::default().build()
    }
}

impl ErrorCodeRegistry {
    /// A builder seeded with the built-in codes
    pub fn builder() -> ErrorCodeRegistryBuilder {
        ErrorCodeRegistryBuilder::default()
    }

    /// Look up a registered code
    pub fn get(&self, code: i32) -> Option<&ErrorCode> {
        if code == INTERNAL {
            return Some(&self.fallback);
        }
        self.codes.get(&code)
    }

    /// Look up a code, falling back to [`INTERNAL`]
    pub fn parse(&self, code: i32) -> &ErrorCode {
        self.get(code).unwrap_or(&self.fallback)
    }

    /// Whether a code is registered
    pub fn contains(&self, code: i32) -> bool {
        self.get(code).is_some()
    }

    /// The code reported for a crate error, carrying the error's message
    pub fn for_error(&self, err: &Error) -> ErrorCode {
        let code = match err {
            Error::Criteria(_) | Error::Id(_) => PARAMETER_ERROR,
            Error::Store(e) => match e.kind {
                StoreErrorKind::NotFound => NOT_FOUND,
                StoreErrorKind::AlreadyExists => RESOURCE_REPEAT,
                _ => INTERNAL,
            },
            _ => INTERNAL,
        };
        self.parse(code).clone().with_message(err.to_string())
    }

    /// Registered codes in ascending order, excluding [`INTERNAL`]
    pub fn iter(&self) -> impl Iterator<Item = &ErrorCode> {
        self.codes.values()
    }
}

/// Builds an [`ErrorCodeRegistry`]
#[derive(Debug, Clone)]
pub struct ErrorCodeRegistryBuilder {
    codes: BTreeMap<i32, ErrorCode>,
}

impl Default for ErrorCodeRegistryBuilder {
    fn default() -> Self {
        Self {
            codes: builtin().into_iter().map(|c| (c.code, c)).collect(),
        }
    }
}

impl ErrorCodeRegistryBuilder {
    /// A builder with no codes besides [`INTERNAL`]
    pub fn empty() -> Self {
        Self {
            codes: BTreeMap::new(),
        }
    }

    /// Add a code
    ///
    /// # Errors
    ///
    /// Fails on [`INTERNAL`] or on a code that is already registered.
    pub fn register(mut self, code: ErrorCode) -> Result<Self, CodeError> {
        if code.code == INTERNAL {
            return Err(CodeError::Reserved(INTERNAL));
        }
        if self.codes.contains_key(&code.code) {
            return Err(CodeError::Duplicate(code.code));
        }
        self.codes.insert(code.code, code);
        Ok(self)
    }

    /// Freeze the table
    pub fn build(self) -> ErrorCodeRegistry {
        ErrorCodeRegistry {
            codes: self.codes,
            fallback: internal(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::CriteriaError;
    use crate::error::{StoreError, StoreOperation};

    #[test]
    fn test_builtin_codes() {
        let registry = ErrorCodeRegistry::default();
        assert_eq!(registry.parse(OK).http_status, 200);
        assert_eq!(registry.parse(CREATED).http_status, 201);
        assert_eq!(registry.parse(DELETED).http_status, 204);
        assert_eq!(registry.parse(RESOURCE_REPEAT).http_status, 302);
        assert_eq!(registry.parse(PERMISSION_DENIED).message, "permission denied");
        assert_eq!(registry.iter().count(), 14);
        assert!(registry.parse(UPDATED).is_success());
        assert!(!registry.parse(NOT_FOUND).is_success());
    }

    #[test]
    fn test_unknown_code_falls_back() {
        let registry = ErrorCodeRegistry::default();
        let code = registry.parse(12345);
        assert_eq!(code.code, INTERNAL);
        assert_eq!(code.http_status, 500);
        assert!(registry.contains(INTERNAL));
        assert!(!registry.contains(12345));
    }

    #[test]
    fn test_register_rejects_duplicate_and_reserved() {
        let err = ErrorCodeRegistry::builder()
            .register(ErrorCode::new(NOT_FOUND, 404, "again"))
            .unwrap_err();
        assert_eq!(err, CodeError::Duplicate(NOT_FOUND));

        let err = ErrorCodeRegistryBuilder::empty()
            .register(ErrorCode::new(INTERNAL, 500, "mine"))
            .unwrap_err();
        assert_eq!(err, CodeError::Reserved(INTERNAL));

        let registry = ErrorCodeRegistryBuilder::empty()
            .register(ErrorCode::new(1, 200, "one"))
            .and_then(|b| b.register(ErrorCode::new(1, 200, "uno")));
        assert!(registry.is_err());
    }

    #[test]
    fn test_for_error_mapping() {
        let registry = ErrorCodeRegistry::default();

        let criteria = Error::Criteria(CriteriaError::MalformedClause("x".into()));
        assert_eq!(registry.for_error(&criteria).code, PARAMETER_ERROR);

        let missing = Error::Store(StoreError::not_found("users"));
        let code = registry.for_error(&missing);
        assert_eq!(code.code, NOT_FOUND);
        assert_eq!(code.message, missing.to_string());

        let dup = Error::Store(StoreError::already_exists("users", "abc"));
        assert_eq!(registry.for_error(&dup).code, RESOURCE_REPEAT);

        let db = Error::Store(StoreError::database_error(StoreOperation::Find, "boom"));
        assert_eq!(registry.for_error(&db).http_status, 500);
    }

    #[test]
    fn test_display() {
        let code = ErrorCode::new(7, 418, "teapot").with_http_status(200);
        assert_eq!(code.to_string(), "[7] teapot");
        assert_eq!(code.http_status, 200);
    }
}
