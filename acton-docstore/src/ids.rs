//! Time-ordered record identifiers
//!
//! Every persisted record is keyed by a [`RecordId`]. Identifiers are UUIDv7
//! values, so they sort by creation time and can be minted without any
//! coordination between processes.
//!
//! # Format
//!
//! The canonical encoding is 32 lowercase hexadecimal characters without
//! separators, e.g. `0190a6b2c3d47e8f9a0b1c2d3e4f5a6b`.
//!
//! # The nil sentinel
//!
//! [`RecordId::NIL`] (32 zeros) means "not yet persisted". It is also the
//! [`Default`] value, so a freshly defaulted model is recognised as new by
//! [`RecordId::is_nil`].
//!
//! ```rust
//! use acton_docstore::ids::RecordId;
//! use std::str::FromStr;
//!
//! let id = RecordId::new();
//! assert!(!id.is_nil());
//! assert_eq!(id.as_string().len(), 32);
//!
//! let parsed = RecordId::from_str(&id.to_string()).unwrap();
//! assert_eq!(parsed, id);
//!
//! assert!(RecordId::default().is_nil());
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Length of the canonical string encoding
pub const ENCODED_LEN: usize = 32;

/// A time-ordered, globally unique record identifier.
///
/// Ordering follows creation time for ids minted by [`RecordId::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(Uuid);

impl RecordId {
    /// The "unassigned" identifier.
    pub const NIL: Self = Self(Uuid::nil());

    /// Mints a new identifier (UUIDv7).
    ///
    /// # Example
    ///
    /// ```rust
    /// use acton_docstore::ids::RecordId;
    ///
    /// let a = RecordId::new();
    /// let b = RecordId::new();
    /// assert_ne!(a, b);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns `true` when this is the unassigned sentinel.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Returns the canonical string encoding.
    #[must_use]
    pub fn as_string(&self) -> String {
        self.0.simple().to_string()
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub fn inner(&self) -> &Uuid {
        &self.0
    }

    /// Converts the identifier into its UUID.
    #[must_use]
    pub fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::NIL
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for RecordId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != ENCODED_LEN {
            return Err(IdError::InvalidLength {
                expected: ENCODED_LEN,
                actual: s.len(),
            });
        }

        if !s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)) {
            return Err(IdError::InvalidCharacter(s.to_string()));
        }

        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| IdError::Parse(e.to_string()))
    }
}

impl From<Uuid> for RecordId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.as_string()
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_string())
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        RecordId::from_str(&raw).map_err(serde::de::Error::custom)
    }
}

/// Error type for identifier parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The string does not have the canonical length.
    #[error("invalid record id length: expected {expected}, got {actual}")]
    InvalidLength {
        /// The expected length.
        expected: usize,
        /// The actual length found.
        actual: usize,
    },

    /// The string contains characters outside lowercase hex.
    #[error("invalid record id '{0}': expected lowercase hexadecimal")]
    InvalidCharacter(String),

    /// The underlying UUID parser rejected the value.
    #[error("failed to parse record id: {0}")]
    Parse(String),
}
