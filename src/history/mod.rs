// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/deepguard-rs

//! Verdict history - append-only, newest first, lives for the session only

use std::collections::{HashSet, VecDeque};
use std::fmt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};
use uuid::Uuid;

use crate::detection::Verdict;

/// Unique identifier of a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(Uuid);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scan-{}", self.0)
    }
}

/// One verdict in the history. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictRecord {
    id: RecordId,
    status: Verdict,
    timestamp: DateTime<Utc>,
}

impl VerdictRecord {
    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn status(&self) -> Verdict {
        self.status
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    /// The log could not grow. Existing records are untouched, but the log
    /// accepts no further entries.
    #[error("history log exhausted after {stored} records")]
    ResourceExhausted { stored: usize },
}

/// Ordered record of past verdicts
#[derive(Debug, Default)]
pub struct HistoryLog {
    records: VecDeque<VerdictRecord>,
    ids: HashSet<RecordId>,
    max_records: Option<usize>,
    exhausted: bool,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log that refuses to grow past `max_records` entries
    pub fn with_limit(max_records: usize) -> Self {
        Self {
            max_records: Some(max_records),
            ..Self::default()
        }
    }

    /// Record a verdict at the front of the log
    pub fn append(
        &mut self,
        status: Verdict,
        timestamp: DateTime<Utc>,
    ) -> Result<&VerdictRecord, HistoryError> {
        if self.exhausted {
            return Err(self.exhausted_error());
        }

        let at_limit = self.max_records.is_some_and(|max| self.records.len() >= max);
        if at_limit
            || self.records.try_reserve(1).is_err()
            || self.ids.try_reserve(1).is_err()
        {
            self.exhausted = true;
            error!("History log exhausted at {} records", self.records.len());
            return Err(self.exhausted_error());
        }

        let id = self.fresh_id();
        self.ids.insert(id);
        self.records.push_front(VerdictRecord { id, status, timestamp });
        debug!("History: {} {} ({} total)", id, status, self.records.len());

        Ok(&self.records[0])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True once an append has failed; the log is read-only from then on
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Newest first
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &VerdictRecord> + '_ {
        self.records.iter()
    }

    pub fn latest(&self) -> Option<&VerdictRecord> {
        self.records.front()
    }

    pub fn get(&self, id: RecordId) -> Option<&VerdictRecord> {
        if !self.ids.contains(&id) {
            return None;
        }
        self.records.iter().find(|r| r.id == id)
    }

    pub fn count_by(&self, status: Verdict) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }

    fn fresh_id(&self) -> RecordId {
        loop {
            let id = RecordId(Uuid::new_v4());
            if !self.ids.contains(&id) {
                return id;
            }
        }
    }

    fn exhausted_error(&self) -> HistoryError {
        HistoryError::ResourceExhausted { stored: self.records.len() }
    }
}

impl<'a> IntoIterator for &'a HistoryLog {
    type Item = &'a VerdictRecord;
    type IntoIter = std::collections::vec_deque::Iter<'a, VerdictRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_append_counts_and_orders_newest_first() {
        let mut log = HistoryLog::new();
        assert!(log.is_empty());

        let t0 = Utc::now();
        for (i, verdict) in [Verdict::Authentic, Verdict::Fake, Verdict::Authentic].into_iter().enumerate() {
            log.append(verdict, t0 + Duration::seconds(i as i64)).unwrap();
            assert_eq!(log.len(), i + 1);
        }

        let order: Vec<Verdict> = log.iter().map(|r| r.status()).collect();
        assert_eq!(order, vec![Verdict::Authentic, Verdict::Fake, Verdict::Authentic]);
        assert_eq!(log.latest().unwrap().timestamp(), t0 + Duration::seconds(2));
        assert_eq!(log.count_by(Verdict::Fake), 1);
    }

    #[test]
    fn test_insertion_order_wins_over_timestamps() {
        let mut log = HistoryLog::new();
        let now = Utc::now();

        log.append(Verdict::Fake, now).unwrap();
        log.append(Verdict::Authentic, now - Duration::hours(1)).unwrap();

        let first = log.iter().next().unwrap();
        assert_eq!(first.status(), Verdict::Authentic);
        assert_eq!(first.timestamp(), now - Duration::hours(1));
    }

    #[test]
    fn test_ids_are_unique() {
        let mut log = HistoryLog::new();
        let now = Utc::now();
        for _ in 0..500 {
            log.append(Verdict::Authentic, now).unwrap();
        }

        let ids: HashSet<RecordId> = log.iter().map(|r| r.id()).collect();
        assert_eq!(ids.len(), 500);
        let any = log.iter().nth(250).unwrap().id();
        assert_eq!(log.get(any).unwrap().id(), any);
    }

    #[test]
    fn test_exhaustion_preserves_records() {
        let mut log = HistoryLog::with_limit(2);
        let now = Utc::now();

        log.append(Verdict::Authentic, now).unwrap();
        log.append(Verdict::Fake, now).unwrap();
        let before: Vec<VerdictRecord> = log.iter().cloned().collect();

        assert_eq!(
            log.append(Verdict::Fake, now).unwrap_err(),
            HistoryError::ResourceExhausted { stored: 2 }
        );
        assert!(log.is_exhausted());
        assert!(log.append(Verdict::Authentic, now).is_err());

        let after: Vec<VerdictRecord> = log.iter().cloned().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_record_id_display() {
        let mut log = HistoryLog::new();
        let id = log.append(Verdict::Fake, Utc::now()).unwrap().id();
        assert!(id.to_string().starts_with("scan-"));
    }
}
