//! Live text filter over a window snapshot.
//!
//! Filtering is a pure recomputation: it reads a [`Snapshot`] and returns a
//! new one, never touching the window it came from. A row matches when any of
//! its stringified values contains the query, ignoring case.

use serde::Serialize;

use crate::model::Row;
use crate::window::Snapshot;

/// Search text entered by the user. Empty means no filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SearchQuery {
    text: String,
    #[serde(skip)]
    needle: String,
}

impl SearchQuery {
    /// Create a query from user input.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let needle = text.to_lowercase();
        Self { text, needle }
    }

    /// The text as entered.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Check if this query filters nothing out.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Check if a single row matches. Every row matches the empty query.
    pub fn matches(&self, row: &Row) -> bool {
        if self.needle.is_empty() {
            return true;
        }
        row.values()
            .iter()
            .any(|value| value.to_string().to_lowercase().contains(&self.needle))
    }
}

impl From<&str> for SearchQuery {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for SearchQuery {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

/// Rows of `snapshot` matching `query`, in their original order.
///
/// Each row appears at most once no matter how many of its columns match.
pub fn filter(snapshot: &Snapshot, query: &SearchQuery) -> Snapshot {
    if query.is_empty() {
        return snapshot.clone();
    }
    snapshot
        .iter()
        .filter(|row| query.matches(row))
        .cloned()
        .collect()
}
