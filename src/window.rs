//! Bounded window of the most recent rows.
//!
//! [`BoundedLog`] keeps at most `capacity` rows in arrival order, evicting the
//! oldest on overflow. Rows are stored behind `Arc` so a [`Snapshot`] is a
//! cheap, immutable copy of the window that later appends never touch.
//!
//! # Example
//!
//! ```
//! use livetail_client::window::BoundedLog;
//!
//! let log = BoundedLog::new(100);
//! assert_eq!(log.capacity(), 100);
//! assert!(log.snapshot().is_empty());
//! ```

use std::collections::VecDeque;
use std::ops::Deref;
use std::sync::Arc;

use serde::Serialize;

use crate::model::Row;

/// Default window capacity.
pub const DEFAULT_CAPACITY: usize = 100;

/// Fixed-capacity, insertion-ordered row buffer.
#[derive(Debug, Clone)]
pub struct BoundedLog {
    rows: VecDeque<Arc<Row>>,
    capacity: usize,
    total_appended: u64,
    evicted: u64,
}

impl BoundedLog {
    /// Create a window holding at most `capacity` rows.
    pub fn new(capacity: usize) -> Self {
        Self {
            rows: VecDeque::with_capacity(capacity),
            capacity,
            total_appended: 0,
            evicted: 0,
        }
    }

    /// Append a batch, evicting the oldest rows beyond capacity.
    ///
    /// Cost is proportional to the batch, not to the capacity: a batch larger
    /// than the window only has its tail copied in.
    pub fn append(&mut self, batch: Vec<Row>) {
        let incoming = batch.len();
        self.total_appended += incoming as u64;

        if incoming >= self.capacity {
            self.evicted += (self.rows.len() + incoming - self.capacity) as u64;
            self.rows.clear();
            self.rows
                .extend(batch.into_iter().skip(incoming - self.capacity).map(Arc::new));
            return;
        }

        let overflow = (self.rows.len() + incoming).saturating_sub(self.capacity);
        self.rows.drain(..overflow);
        self.evicted += overflow as u64;
        self.rows.extend(batch.into_iter().map(Arc::new));
    }

    /// Point-in-time copy of the window, oldest row first.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.rows.iter().cloned().collect())
    }

    /// Remove every row. Counters are kept.
    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Number of resident rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the window is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Maximum number of resident rows.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Rows appended over the lifetime of this window.
    pub fn total_appended(&self) -> u64 {
        self.total_appended
    }

    /// Rows dropped by eviction over the lifetime of this window.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }
}

impl Default for BoundedLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Immutable, ordered view of rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Snapshot {
    rows: Arc<[Arc<Row>]>,
}

impl Snapshot {
    pub(crate) fn new(rows: Vec<Arc<Row>>) -> Self {
        Self { rows: rows.into() }
    }

    /// The rows, oldest first.
    pub fn rows(&self) -> &[Arc<Row>] {
        &self.rows
    }
}

impl Deref for Snapshot {
    type Target = [Arc<Row>];

    fn deref(&self) -> &Self::Target {
        &self.rows
    }
}

impl FromIterator<Arc<Row>> for Snapshot {
    fn from_iter<I: IntoIterator<Item = Arc<Row>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::model::Value;

    fn messages(snapshot: &Snapshot) -> Vec<String> {
        snapshot
            .iter()
            .map(|r| r.get("message").map(Value::to_string).unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_append_within_capacity() {
        let schema = fixtures::session_schema();
        let mut log = BoundedLog::new(10);

        log.append(fixtures::numbered_rows(&schema, 0, 4));
        log.append(fixtures::numbered_rows(&schema, 4, 3));

        assert_eq!(log.len(), 7);
        assert_eq!(log.evicted(), 0);
        assert_eq!(messages(&log.snapshot())[6], "row-6");
    }

    #[test]
    fn test_keeps_last_hundred_of_160() {
        let schema = fixtures::session_schema();
        let mut log = BoundedLog::new(100);

        let mut fed = 0;
        for size in [30, 80, 50] {
            log.append(fixtures::numbered_rows(&schema, fed, size));
            fed += size;
            assert!(log.len() <= 100);
        }

        assert_eq!(log.len(), 100);
        assert_eq!(log.total_appended(), 160);
        assert_eq!(log.evicted(), 60);

        let expected: Vec<String> = (60..160).map(|i| format!("row-{}", i)).collect();
        assert_eq!(messages(&log.snapshot()), expected);
    }

    #[test]
    fn test_batch_larger_than_capacity() {
        let schema = fixtures::session_schema();
        let mut log = BoundedLog::new(5);

        log.append(fixtures::numbered_rows(&schema, 0, 3));
        log.append(fixtures::numbered_rows(&schema, 3, 12));

        assert_eq!(
            messages(&log.snapshot()),
            vec!["row-10", "row-11", "row-12", "row-13", "row-14"]
        );
        assert_eq!(log.evicted(), 10);
    }

    #[test]
    fn test_zero_capacity_stays_empty() {
        let schema = fixtures::session_schema();
        let mut log = BoundedLog::new(0);

        log.append(fixtures::numbered_rows(&schema, 0, 3));

        assert!(log.is_empty());
        assert_eq!(log.total_appended(), 3);
    }

    #[test]
    fn test_length_bound_for_many_capacities() {
        let schema = fixtures::session_schema();
        let sizes = [0usize, 1, 7, 2, 19, 3, 0, 11];

        for capacity in [1usize, 2, 5, 10, 100] {
            let mut log = BoundedLog::new(capacity);
            let mut fed = 0;
            for size in sizes {
                log.append(fixtures::numbered_rows(&schema, fed, size));
                fed += size;
                assert!(log.len() <= capacity);

                // Resident rows are exactly the newest ones, in order
                let expected: Vec<String> = (fed.saturating_sub(capacity)..fed)
                    .map(|i| format!("row-{}", i))
                    .collect();
                assert_eq!(messages(&log.snapshot()), expected);
            }
        }
    }

    #[test]
    fn test_snapshot_unaffected_by_later_appends() {
        let schema = fixtures::session_schema();
        let mut log = BoundedLog::new(3);
        log.append(fixtures::numbered_rows(&schema, 0, 3));

        let before = log.snapshot();
        log.append(fixtures::numbered_rows(&schema, 3, 2));
        log.clear();

        assert_eq!(messages(&before), vec!["row-0", "row-1", "row-2"]);
        assert!(log.snapshot().is_empty());
    }

    #[test]
    fn test_clear_keeps_counters() {
        let schema = fixtures::session_schema();
        let mut log = BoundedLog::default();
        log.append(fixtures::numbered_rows(&schema, 0, 5));

        log.clear();

        assert!(log.is_empty());
        assert_eq!(log.capacity(), DEFAULT_CAPACITY);
        assert_eq!(log.total_appended(), 5);
    }
}
