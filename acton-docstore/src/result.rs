//! Write result envelope

use serde::{Deserialize, Serialize};

/// Outcome of a write: affected record count and the identifiers involved.
///
/// Failures travel on the `Err` side of the surrounding `Result`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResult {
    /// Number of records affected
    pub count: i64,
    /// Identifiers of inserted, upserted or targeted records
    pub ids: Vec<String>,
}

impl WriteResult {
    /// A result with a count and no identifiers
    #[must_use]
    pub fn with_count(count: i64) -> Self {
        Self {
            count,
            ids: Vec::new(),
        }
    }

    /// A single inserted record
    pub fn inserted(id: impl Into<String>) -> Self {
        Self {
            count: 1,
            ids: vec![id.into()],
        }
    }

    /// Several inserted records
    pub fn inserted_many<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        Self {
            count: ids.len() as i64,
            ids,
        }
    }

    /// Attach an identifier
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.ids.push(id.into());
        self
    }

    /// The first identifier, if any
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.ids.first().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inserted() {
        let r = WriteResult::inserted("a");
        assert_eq!(r.count, 1);
        assert_eq!(r.id(), Some("a"));
    }

    #[test]
    fn test_inserted_many_counts_ids() {
        let r = WriteResult::inserted_many(["a", "b", "c"]);
        assert_eq!(r.count, 3);
        assert_eq!(r.ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_empty_result_has_no_id() {
        let r = WriteResult::with_count(0);
        assert_eq!(r.id(), None);
        assert_eq!(WriteResult::default(), r);

        let r = WriteResult::with_count(1).with_id("x");
        assert_eq!(r.id(), Some("x"));
    }
}
