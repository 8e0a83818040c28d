//! Epoch-millisecond timestamps
//!
//! [`UnixTime`] wraps a UTC instant and serializes as a JSON number of
//! milliseconds since the Unix epoch. Domain entities use it where API
//! consumers expect numeric timestamps, while persisted models keep a
//! [`chrono::DateTime`].

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A UTC instant serialized as epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct UnixTime(DateTime<Utc>);

impl UnixTime {
    /// The current instant, truncated to millisecond precision.
    #[must_use]
    pub fn now() -> Self {
        Self::from_millis(Utc::now().timestamp_millis())
    }

    /// Builds a timestamp from epoch milliseconds.
    ///
    /// Values outside chrono's representable range clamp to the epoch.
    #[must_use]
    pub fn from_millis(ms: i64) -> Self {
        Self(Utc.timestamp_millis_opt(ms).single().unwrap_or_default())
    }

    /// Milliseconds since the Unix epoch.
    #[must_use]
    pub fn millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// The wrapped instant.
    #[must_use]
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl From<DateTime<Utc>> for UnixTime {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl From<UnixTime> for DateTime<Utc> {
    fn from(t: UnixTime) -> Self {
        t.0
    }
}

impl fmt::Display for UnixTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.millis())
    }
}

impl Serialize for UnixTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.millis())
    }
}

impl<'de> Deserialize<'de> for UnixTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Accept both `1700000000000` and `"1700000000000"`.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(ms) => Ok(Self::from_millis(ms)),
            Raw::Text(s) => s
                .trim()
                .parse::<i64>()
                .map(Self::from_millis)
                .map_err(serde::de::Error::custom),
        }
    }
}
