// File: jobbot-core/src/jobboard/cache.rs

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use tracing::{debug, error};

use jobbot_common::models::{JobBoardSnapshot, PostKind, StoredPost};

use crate::jobboard::policy::JobBoardPolicy;

/// Ordered store of recently seen job posts.
///
/// Entries are kept sorted ascending by `created_at`; the oldest entry is
/// always at the head. Two expiry regimes share this structure: the repost
/// window (applies to every post, enforced on append) and the much shorter
/// for-hire aging pass (driven by the scheduled sweep).
pub struct JobPostCache {
    entries: VecDeque<StoredPost>,
    policy: JobBoardPolicy,
}

impl JobPostCache {
    pub fn new(policy: JobBoardPolicy) -> Self {
        Self {
            entries: VecDeque::new(),
            policy,
        }
    }

    /// Insert a post, keeping `created_at` order, then drop every entry
    /// that has outlived the repost window. Callers append in arrival
    /// order, so the ordered insert is effectively a tail push.
    pub fn append(&mut self, post: StoredPost) {
        self.insert_ordered(post);
        self.evict_expired(Utc::now());
    }

    /// Ordered insert without the eviction pass; used by the bootstrap
    /// load, which trims once at the end.
    pub fn insert_ordered(&mut self, post: StoredPost) {
        let mut idx = self.entries.len();
        while idx > 0 && self.entries[idx - 1].created_at > post.created_at {
            idx -= 1;
        }
        if idx == self.entries.len() {
            self.entries.push_back(post);
        } else {
            self.entries.insert(idx, post);
        }
    }

    /// Drop the prefix of entries older than the repost window. "Now" is
    /// biased forward so an author posting on a weekly rhythm is not
    /// rejected for being a few hours early.
    pub fn evict_expired(&mut self, now: DateTime<Utc>) {
        let cutoff = now + self.policy.repost_bias() - self.policy.repost_window();
        while let Some(front) = self.entries.front() {
            if front.created_at < cutoff {
                let dropped = self.entries.pop_front();
                if let Some(p) = dropped {
                    debug!(
                        "Evicting expired job post {} by {} from {}",
                        p.message_id, p.author_name, p.created_at
                    );
                }
            } else {
                break;
            }
        }
    }

    /// Remove one entry by its originating message id, wherever it sits.
    pub fn remove_by_message(&mut self, message_id: &str) -> Option<StoredPost> {
        let idx = self
            .entries
            .iter()
            .position(|p| p.message_id == message_id)?;
        self.entries.remove(idx)
    }

    /// Remove every entry for an author; returns how many were dropped.
    pub fn purge_author(&mut self, author_id: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|p| p.author_id != author_id);
        before - self.entries.len()
    }

    /// The author's most recent entry, if any.
    pub fn find_by_author(&self, author_id: &str) -> Option<&StoredPost> {
        self.entries.iter().rev().find(|p| p.author_id == author_id)
    }

    pub fn find_by_message(&self, message_id: &str) -> Option<&StoredPost> {
        self.entries.iter().find(|p| p.message_id == message_id)
    }

    /// The first for-hire entry inside the aged prefix (entries older than
    /// `cutoff`). Hiring posts inside the prefix are skipped; they only
    /// expire through the repost window. If the ordering invariant is
    /// observed broken, the scan reports nothing so the sweep cannot
    /// delete the wrong message.
    pub fn next_aged_for_hire(&self, cutoff: DateTime<Utc>) -> Option<(String, String)> {
        let mut prev: Option<DateTime<Utc>> = None;
        for entry in &self.entries {
            if let Some(prev_ts) = prev {
                if entry.created_at < prev_ts {
                    error!(
                        "Job post cache ordering invariant broken at message {}; \
                         aborting aged sweep",
                        entry.message_id
                    );
                    return None;
                }
            }
            prev = Some(entry.created_at);

            if entry.created_at >= cutoff {
                return None;
            }
            if entry.kind == PostKind::ForHire {
                return Some((entry.message_id.clone(), entry.channel_id.clone()));
            }
        }
        None
    }

    /// Read-only snapshot split by kind, each side oldest-first.
    pub fn snapshot(&self) -> JobBoardSnapshot {
        let mut snap = JobBoardSnapshot::default();
        for entry in &self.entries {
            match entry.kind {
                PostKind::Hiring => snap.hiring.push(entry.clone()),
                PostKind::ForHire => snap.for_hire.push(entry.clone()),
            }
        }
        snap
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
