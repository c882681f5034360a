// File: jobbot-core/src/jobboard/offenders.rs

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use jobbot_common::models::Web3OffenderRecord;

/// Per-author escalating cooldowns for banned-topic offenses.
///
/// Each author is either clean (no record, or an expired one) or flagged
/// with a count. The active window scales with the count: an author at
/// count `n` stays flagged for `base × n` after their last offense. A
/// record that outlives its window is treated as absent, so the next
/// offense starts over at 1.
pub struct Web3OffenderCache {
    records: DashMap<String, Web3OffenderRecord>,
    base_cooldown: Duration,
}

impl Web3OffenderCache {
    pub fn new(base_cooldown: Duration) -> Self {
        Self {
            records: DashMap::new(),
            base_cooldown,
        }
    }

    fn window(&self, count: u32) -> Duration {
        self.base_cooldown * count as i32
    }

    fn is_active(&self, record: &Web3OffenderRecord, now: DateTime<Utc>) -> bool {
        now - record.last < self.window(record.count)
    }

    /// The author's current offense count, if their record is still inside
    /// its scaled window. Expired records are dropped on observation.
    pub fn active_count(&self, author_id: &str, now: DateTime<Utc>) -> Option<u32> {
        if let Some(rec) = self.records.get(author_id) {
            if self.is_active(&rec, now) {
                return Some(rec.count);
            }
        } else {
            return None;
        }
        self.records.remove(author_id);
        None
    }

    /// If the author is actively flagged, bump their count and restart the
    /// window; returns the new count. Clean authors are untouched.
    pub fn escalate_if_active(&self, author_id: &str, now: DateTime<Utc>) -> Option<u32> {
        let mut entry = self.records.get_mut(author_id)?;
        if !self.is_active(&entry, now) {
            drop(entry);
            self.records.remove(author_id);
            return None;
        }
        entry.count += 1;
        entry.last = now;
        Some(entry.count)
    }

    /// Record a fresh offense for a clean author. Returns the new count
    /// (always 1; escalation goes through [`Self::escalate_if_active`]).
    pub fn note_offense(&self, author_id: &str, now: DateTime<Utc>) -> u32 {
        self.records
            .insert(author_id.to_string(), Web3OffenderRecord { count: 1, last: now });
        1
    }

    /// Operator reset: forget the author entirely.
    pub fn purge(&self, author_id: &str) -> bool {
        self.records.remove(author_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
