// File: jobbot-core/src/jobboard/service.rs

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use jobbot_common::error::Error;
use jobbot_common::models::{
    ChannelEvent, ChannelMessage, JobBoardSnapshot, Post, PostFailure, PostKind, StoredPost,
};
use jobbot_common::traits::ChatTransport;

use crate::jobboard::cache::JobPostCache;
use crate::jobboard::offenders::Web3OffenderCache;
use crate::jobboard::parser::parse_posts;
use crate::jobboard::policy::JobBoardPolicy;
use crate::jobboard::rules::web3::simplify_content;
use crate::jobboard::rules::{self, PostRule, RuleContext};
use crate::utils::BoundedTtlMap;

/// A rejection report still live in an author's feedback thread. Repeated
/// identical violations update this message instead of filing a new one.
struct OutstandingReport {
    thread_id: String,
    message_id: String,
    warnings: u32,
}

/// Wires inbound job-board events through parse and validation, commits
/// accepted posts to the cache, and runs the full moderation flow for
/// rejected ones. Owns all mutable state in the moderation core.
pub struct JobBoardService {
    transport: Arc<dyn ChatTransport>,
    policy: JobBoardPolicy,
    rules: Vec<Box<dyn PostRule>>,
    board: Mutex<JobPostCache>,
    offenders: Web3OffenderCache,
    /// Message ids this bot deleted itself; consulted so deletion events we
    /// caused do not produce removal reports. One-shot per id.
    moderated: Mutex<HashSet<String>>,
    /// Author id -> feedback thread id.
    threads: Mutex<BoundedTtlMap<String, String>>,
    /// (author id, simplified content) -> outstanding report.
    reports: Mutex<BoundedTtlMap<(String, String), OutstandingReport>>,
    job_channel_id: String,
    report_channel_id: String,
}

impl JobBoardService {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        policy: JobBoardPolicy,
        job_channel_id: String,
        report_channel_id: String,
    ) -> Self {
        let threads = BoundedTtlMap::new(
            policy.thread_cache_capacity,
            chrono::Duration::minutes(policy.thread_cache_ttl_minutes),
        );
        let reports = BoundedTtlMap::new(
            policy.report_cache_capacity,
            chrono::Duration::minutes(policy.report_cache_ttl_minutes),
        );
        Self {
            transport,
            board: Mutex::new(JobPostCache::new(policy.clone())),
            offenders: Web3OffenderCache::new(policy.web3_base_cooldown()),
            rules: rules::default_rules(),
            moderated: Mutex::new(HashSet::new()),
            threads: Mutex::new(threads),
            reports: Mutex::new(reports),
            policy,
            job_channel_id,
            report_channel_id,
        }
    }

    /// Bootstrap the post cache from channel history: page backward in
    /// fixed batches until the lookback horizon (or the channel) is
    /// exhausted, skip the bot's own messages, insert oldest-first, then
    /// apply the standard eviction pass. Fetch failures end the load with
    /// whatever was gathered; a partial cache is reduced accuracy, not an
    /// error.
    pub async fn bootstrap(&self) -> Result<usize, Error> {
        let now = Utc::now();
        let cutoff = now - self.policy.history_lookback();
        let page_size = self.policy.bootstrap_page_size;

        let mut before: Option<String> = None;
        let mut collected: Vec<StoredPost> = Vec::new();
        let mut done = false;

        while !done {
            let batch = match self
                .transport
                .fetch_messages_before(&self.job_channel_id, before.as_deref(), page_size)
                .await
            {
                Ok(batch) => batch,
                Err(e) => {
                    warn!("Bootstrap page fetch failed: {e:?}; continuing with partial history");
                    break;
                }
            };
            if batch.is_empty() {
                break;
            }

            // Pages arrive newest-first.
            for msg in &batch {
                if msg.timestamp < cutoff {
                    done = true;
                    break;
                }
                if msg.author_is_bot {
                    continue;
                }
                let posts = parse_posts(&msg.content);
                collected.push(Self::stored_post(msg, &posts, msg.timestamp));
            }

            if batch.len() < page_size as usize {
                break;
            }
            before = batch.last().map(|m| m.id.clone());
        }

        collected.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        let loaded = collected.len();
        {
            let mut board = self.board.lock().await;
            for post in collected {
                board.insert_ordered(post);
            }
            board.evict_expired(Utc::now());
            info!(
                "Job board bootstrap complete: {} message(s) scanned into {} live post(s)",
                loaded,
                board.len()
            );
        }
        Ok(loaded)
    }

    /// Entry point for the transport's event stream. Events from other
    /// channels and the bot's own messages are ignored.
    pub async fn handle_event(&self, event: ChannelEvent) -> Result<(), Error> {
        if event.channel_id() != self.job_channel_id {
            return Ok(());
        }
        match event {
            ChannelEvent::MessageCreate(msg) => {
                if msg.author_is_bot {
                    return Ok(());
                }
                self.handle_message_create(msg).await
            }
            ChannelEvent::MessageUpdate(msg) => {
                if msg.author_is_bot {
                    return Ok(());
                }
                self.handle_message_update(msg).await
            }
            ChannelEvent::MessageDelete { message_id, .. } => {
                self.handle_message_delete(&message_id).await
            }
        }
    }

    async fn handle_message_create(&self, msg: ChannelMessage) -> Result<(), Error> {
        let posts = parse_posts(&msg.content);
        let failures = self.validate(&posts, &msg).await;
        if failures.is_empty() {
            self.accept(&msg, &posts, msg.timestamp).await;
            Ok(())
        } else {
            self.reject(&msg, &failures).await
        }
    }

    /// Re-parse and re-validate an edited message. An entry the author
    /// already holds for this same message is superseded first, so editing
    /// an accepted post does not trip the frequency rule; on acceptance
    /// the original timestamp is kept. A still-failing edit that switched
    /// the post's kind tags while a rejection report is outstanding is
    /// treated as circumvention: deleted and reported without a feedback
    /// thread.
    async fn handle_message_update(&self, msg: ChannelMessage) -> Result<(), Error> {
        let superseded = self.board.lock().await.remove_by_message(&msg.id);
        let posts = parse_posts(&msg.content);
        let failures = self.validate(&posts, &msg).await;

        if failures.is_empty() {
            let created_at = superseded
                .as_ref()
                .map(|p| p.created_at)
                .unwrap_or(msg.timestamp);
            self.accept(&msg, &posts, created_at).await;
            return Ok(());
        }

        let now = Utc::now();
        let has_kind_violation = failures.iter().any(|f| f.is_kind_violation());
        let has_outstanding_report = self
            .reports
            .lock()
            .await
            .any_key(now, |(author, _)| author == &msg.author_id);

        if has_kind_violation && has_outstanding_report {
            info!(
                "Author {} re-tagged a rejected post to dodge the board rules; removing",
                msg.author_name
            );
            self.delete_tracked(&msg.channel_id, &msg.id).await;
            let note = format!(
                "Removed an edited job post by {}: the edit switched its tags to get \
                 around an earlier rejection.",
                msg.author_name
            );
            if let Err(e) = self
                .transport
                .send_message(&self.report_channel_id, &note)
                .await
            {
                warn!("Failed to file circumvention report: {e:?}");
            }
            return Ok(());
        }

        self.reject(&msg, &failures).await
    }

    /// Deletions this bot performed are ignored (one-shot flag). A genuine
    /// external deletion inside the repost grace window also clears the
    /// cache entry so the author can repost; either way a removal report
    /// goes to the report channel.
    async fn handle_message_delete(&self, message_id: &str) -> Result<(), Error> {
        if self.moderated.lock().await.remove(message_id) {
            debug!("Ignoring deletion of {message_id}: this bot removed it");
            return Ok(());
        }

        let now = Utc::now();
        let (in_grace, entry) = {
            let board = self.board.lock().await;
            match board.find_by_message(message_id) {
                Some(p) => (
                    now - p.created_at <= self.policy.repost_grace(),
                    Some(p.clone()),
                ),
                None => (false, None),
            }
        };
        let Some(entry) = entry else {
            debug!("Deleted message {message_id} had no cache entry");
            return Ok(());
        };

        if in_grace {
            self.board.lock().await.remove_by_message(message_id);
            debug!("Cleared cache entry for {message_id}: deleted within the repost grace window");
        }

        let note = format!(
            "A {} post by {} was deleted by its author or staff.",
            entry.kind, entry.author_name
        );
        if let Err(e) = self
            .transport
            .send_message(&self.report_channel_id, &note)
            .await
        {
            warn!("Failed to send removal report: {e:?}");
        }
        Ok(())
    }

    /// Age expired for-hire listings off the board. The head of the cache
    /// is re-read after every awaited delete, so appends landing mid-sweep
    /// are seen; the first undeletable message ends the cycle early.
    pub async fn sweep_aged(&self) -> Result<usize, Error> {
        let cutoff = Utc::now() - self.policy.for_hire_max_age();
        let mut removed = 0usize;

        loop {
            let candidate = self.board.lock().await.next_aged_for_hire(cutoff);
            let Some((message_id, channel_id)) = candidate else {
                break;
            };

            self.moderated.lock().await.insert(message_id.clone());
            match self.transport.delete_message(&channel_id, &message_id).await {
                Ok(()) => {
                    self.board.lock().await.remove_by_message(&message_id);
                    removed += 1;
                    debug!("Aged out for-hire post {message_id}");
                }
                Err(e) => {
                    warn!("Could not delete aged for-hire post {message_id}: {e:?}; stopping sweep");
                    self.moderated.lock().await.remove(&message_id);
                    break;
                }
            }
        }

        if removed > 0 {
            info!("Aged sweep removed {removed} for-hire post(s)");
        }
        Ok(removed)
    }

    /// Read-only snapshot for the reporting layer.
    pub async fn job_posts(&self) -> JobBoardSnapshot {
        self.board.lock().await.snapshot()
    }

    /// Operator reset: drop every cached post and the web3 offender record
    /// for an author. Returns how many posts were removed.
    pub async fn purge_author(&self, author_id: &str) -> usize {
        let removed = self.board.lock().await.purge_author(author_id);
        let had_record = self.offenders.purge(author_id);
        self.threads.lock().await.remove(&author_id.to_string());
        info!(
            "Purged {removed} cached post(s) for author {author_id} \
             (web3 record cleared: {had_record})"
        );
        removed
    }

    async fn validate(&self, posts: &[Post], msg: &ChannelMessage) -> Vec<PostFailure> {
        let board = self.board.lock().await;
        let ctx = RuleContext {
            policy: &self.policy,
            board: &board,
            offenders: &self.offenders,
            now: Utc::now(),
        };
        rules::evaluate(&self.rules, posts, msg, &ctx)
    }

    async fn accept(&self, msg: &ChannelMessage, posts: &[Post], created_at: DateTime<Utc>) {
        let stored = Self::stored_post(msg, posts, created_at);
        info!(
            "Accepted {} post {} by {}",
            stored.kind, stored.message_id, stored.author_name
        );
        self.board.lock().await.append(stored);
    }

    async fn reject(&self, msg: &ChannelMessage, failures: &[PostFailure]) -> Result<(), Error> {
        info!(
            "Rejecting post {} by {}: {} violation(s)",
            msg.id,
            msg.author_name,
            failures.len()
        );
        self.delete_tracked(&msg.channel_id, &msg.id).await;
        self.file_report(msg, failures).await;
        self.escalate_web3(msg, failures).await;
        Ok(())
    }

    /// Delete a message and remember that we did, so the deletion event is
    /// not mistaken for an external removal.
    async fn delete_tracked(&self, channel_id: &str, message_id: &str) {
        self.moderated.lock().await.insert(message_id.to_string());
        if let Err(e) = self.transport.delete_message(channel_id, message_id).await {
            warn!("Failed to delete message {message_id}: {e:?}");
            self.moderated.lock().await.remove(message_id);
        }
    }

    /// File the rejection explanation in the author's feedback thread. A
    /// repeat of the same content inside the report window updates the
    /// existing report and bumps its warning counter instead of posting a
    /// new one.
    async fn file_report(&self, msg: &ChannelMessage, failures: &[PostFailure]) {
        let now = Utc::now();
        let key = (msg.author_id.clone(), simplify_content(&msg.content));

        let outstanding = {
            let mut reports = self.reports.lock().await;
            reports.get_mut(&key, now).map(|r| {
                r.warnings += 1;
                (r.thread_id.clone(), r.message_id.clone(), r.warnings)
            })
        };
        if let Some((thread_id, report_id, warnings)) = outstanding {
            let content = render_report(&msg.author_id, failures, warnings);
            if let Err(e) = self
                .transport
                .edit_message(&thread_id, &report_id, &content)
                .await
            {
                warn!(
                    "Failed to update outstanding report for {}: {e:?}",
                    msg.author_name
                );
            }
            return;
        }

        // Fall back to the report channel if the thread cannot be created;
        // a violation always produces an explanation somewhere.
        let thread_id = match self.feedback_thread(msg, now).await {
            Some(id) => id,
            None => self.report_channel_id.clone(),
        };
        let content = render_report(&msg.author_id, failures, 1);
        match self.transport.send_message(&thread_id, &content).await {
            Ok(report_id) => {
                self.reports.lock().await.insert(
                    key,
                    OutstandingReport {
                        thread_id,
                        message_id: report_id,
                        warnings: 1,
                    },
                    now,
                );
            }
            Err(e) => warn!(
                "Failed to send rejection report for {}: {e:?}",
                msg.author_name
            ),
        }
    }

    /// Find or create the author's feedback thread.
    async fn feedback_thread(&self, msg: &ChannelMessage, now: DateTime<Utc>) -> Option<String> {
        {
            let mut threads = self.threads.lock().await;
            if let Some(id) = threads.get(&msg.author_id, now) {
                return Some(id.clone());
            }
        }
        let name = format!("Job post feedback for {}", msg.author_name);
        match self.transport.create_thread(&self.job_channel_id, &name).await {
            Ok(id) => {
                self.threads
                    .lock()
                    .await
                    .insert(msg.author_id.clone(), id.clone(), now);
                Some(id)
            }
            Err(e) => {
                warn!(
                    "Failed to create feedback thread for {}: {e:?}",
                    msg.author_name
                );
                None
            }
        }
    }

    /// Past the threshold, repeated web3 offenses also time the author
    /// out, scaled like the cooldown window. Fire-and-forget: a failed
    /// timeout is logged and the rest of the rejection flow proceeds.
    async fn escalate_web3(&self, msg: &ChannelMessage, failures: &[PostFailure]) {
        let Some(count) = failures.iter().filter_map(|f| f.web3_count()).max() else {
            return;
        };
        if count < self.policy.web3_timeout_threshold {
            return;
        }
        let duration = (self.policy.web3_base_cooldown() * count as i32)
            .to_std()
            .unwrap_or_default();
        info!(
            "Timing out {} for repeated web3 content (offense #{count})",
            msg.author_name
        );
        if let Err(e) = self.transport.timeout_member(&msg.author_id, duration).await {
            warn!("Failed to time out {}: {e:?}", msg.author_id);
        }
    }

    fn stored_post(msg: &ChannelMessage, posts: &[Post], created_at: DateTime<Utc>) -> StoredPost {
        let kind = posts
            .iter()
            .find_map(|p| p.kind())
            .unwrap_or(PostKind::ForHire);
        let post = posts.first().cloned().unwrap_or(Post {
            tags: Vec::new(),
            description: String::new(),
        });
        StoredPost {
            message_id: msg.id.clone(),
            channel_id: msg.channel_id.clone(),
            author_id: msg.author_id.clone(),
            author_name: msg.author_name.clone(),
            created_at,
            kind,
            post,
        }
    }
}

fn render_report(author_id: &str, failures: &[PostFailure], warnings: u32) -> String {
    let mut out = format!("<@{author_id}> your job post was removed:\n");
    for failure in failures {
        out.push_str(&format!("- {failure}\n"));
    }
    if warnings > 1 {
        out.push_str(&format!(
            "\nWarning #{warnings}: this is the same post as before. Please fix the \
             issues above instead of reposting it."
        ));
    }
    out
}
