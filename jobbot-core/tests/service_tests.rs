// File: jobbot-core/tests/service_tests.rs

use std::collections::HashSet;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use jobbot_common::Error;
use jobbot_common::models::{ChannelEvent, ChannelMessage};
use jobbot_common::traits::ChatTransport;
use jobbot_core::jobboard::{JobBoardPolicy, JobBoardService};

/// Records every transport call so tests can assert on the moderation
/// flow; ids for sent messages and threads come from a counter.
#[derive(Default)]
struct MockTransport {
    pages: Mutex<VecDeque<Vec<ChannelMessage>>>,
    deleted: Mutex<Vec<String>>,
    sent: Mutex<Vec<(String, String)>>,
    edited: Mutex<Vec<(String, String, String)>>,
    threads: Mutex<Vec<(String, String)>>,
    timeouts: Mutex<Vec<(String, StdDuration)>>,
    undeletable: Mutex<HashSet<String>>,
    next_id: AtomicU64,
}

impl MockTransport {
    fn next(&self, prefix: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        format!("{prefix}-{n}")
    }

    fn sent_to(&self, channel: &str) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| c == channel)
            .map(|(_, content)| content.clone())
            .collect()
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn fetch_messages_before(
        &self,
        _channel_id: &str,
        _before: Option<&str>,
        _limit: u16,
    ) -> Result<Vec<ChannelMessage>, Error> {
        Ok(self.pages.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn send_message(&self, channel_id: &str, content: &str) -> Result<String, Error> {
        let id = self.next("sent");
        self.sent
            .lock()
            .unwrap()
            .push((channel_id.to_string(), content.to_string()));
        Ok(id)
    }

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<(), Error> {
        self.edited.lock().unwrap().push((
            channel_id.to_string(),
            message_id.to_string(),
            content.to_string(),
        ));
        Ok(())
    }

    async fn delete_message(&self, _channel_id: &str, message_id: &str) -> Result<(), Error> {
        if self.undeletable.lock().unwrap().contains(message_id) {
            return Err(Error::Platform("missing permissions".into()));
        }
        self.deleted.lock().unwrap().push(message_id.to_string());
        Ok(())
    }

    async fn create_thread(&self, channel_id: &str, name: &str) -> Result<String, Error> {
        let id = self.next("thread");
        self.threads
            .lock()
            .unwrap()
            .push((channel_id.to_string(), name.to_string()));
        Ok(id)
    }

    async fn timeout_member(&self, author_id: &str, duration: StdDuration) -> Result<(), Error> {
        self.timeouts
            .lock()
            .unwrap()
            .push((author_id.to_string(), duration));
        Ok(())
    }
}

fn build_service() -> (Arc<MockTransport>, JobBoardService) {
    let transport = Arc::new(MockTransport::default());
    let service = JobBoardService::new(
        transport.clone(),
        JobBoardPolicy::default(),
        "jobs".to_string(),
        "reports".to_string(),
    );
    (transport, service)
}

fn board_message(id: &str, author: &str, content: &str) -> ChannelMessage {
    ChannelMessage {
        id: id.into(),
        channel_id: "jobs".into(),
        author_id: author.into(),
        author_name: author.into(),
        author_is_bot: false,
        content: content.into(),
        timestamp: Utc::now(),
        is_reply: false,
        mentions: Vec::new(),
    }
}

#[tokio::test]
async fn accepted_post_is_committed_to_the_cache() -> Result<(), Error> {
    let (transport, service) = build_service();

    let msg = board_message("m1", "alice", "[hiring] Senior Engineer, remote\nApply via DM");
    service
        .handle_event(ChannelEvent::MessageCreate(msg))
        .await?;

    let snap = service.job_posts().await;
    assert_eq!(snap.hiring.len(), 1);
    assert_eq!(snap.hiring[0].author_id, "alice");
    assert!(transport.deleted.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn events_from_other_channels_are_ignored() -> Result<(), Error> {
    let (transport, service) = build_service();

    let mut msg = board_message("m1", "alice", "totally untagged chatter");
    msg.channel_id = "general".into();
    service
        .handle_event(ChannelEvent::MessageCreate(msg))
        .await?;

    assert!(transport.deleted.lock().unwrap().is_empty());
    assert!(service.job_posts().await.hiring.is_empty());
    Ok(())
}

#[tokio::test]
async fn rejected_post_is_deleted_and_explained_in_a_thread() -> Result<(), Error> {
    let (transport, service) = build_service();

    let body: Vec<String> = (0..20).map(|i| format!("line number {i}")).collect();
    let msg = board_message("m1", "bob", &body.join("\n"));
    service
        .handle_event(ChannelEvent::MessageCreate(msg))
        .await?;

    assert_eq!(transport.deleted.lock().unwrap().as_slice(), ["m1"]);
    let threads = transport.threads.lock().unwrap();
    assert_eq!(threads.len(), 1);
    assert!(threads[0].1.contains("bob"));
    drop(threads);

    let reports = transport.sent_to("thread-0");
    assert_eq!(reports.len(), 1);
    assert!(reports[0].contains("<@bob>"));
    assert!(reports[0].contains("tagged"));
    assert!(service.job_posts().await.for_hire.is_empty());
    Ok(())
}

#[tokio::test]
async fn repeated_identical_violation_updates_the_existing_report() -> Result<(), Error> {
    let (transport, service) = build_service();

    let content = "no tags here, just spam";
    service
        .handle_event(ChannelEvent::MessageCreate(board_message("m1", "bob", content)))
        .await?;
    service
        .handle_event(ChannelEvent::MessageCreate(board_message("m2", "bob", content)))
        .await?;

    // Both copies were deleted, but only one report message exists; the
    // repeat edited it with a warning counter.
    assert_eq!(transport.deleted.lock().unwrap().len(), 2);
    assert_eq!(transport.sent.lock().unwrap().len(), 1);
    let edited = transport.edited.lock().unwrap();
    assert_eq!(edited.len(), 1);
    assert!(edited[0].2.contains("Warning #2"));
    Ok(())
}

#[tokio::test]
async fn bot_deletions_do_not_produce_removal_reports() -> Result<(), Error> {
    let (transport, service) = build_service();

    service
        .handle_event(ChannelEvent::MessageCreate(board_message(
            "m1", "bob", "untagged and unwanted",
        )))
        .await?;
    let reports_before = transport.sent_to("reports").len();

    // The deletion event caused by our own moderation must be swallowed.
    service
        .handle_event(ChannelEvent::MessageDelete {
            channel_id: "jobs".into(),
            message_id: "m1".into(),
        })
        .await?;

    assert_eq!(transport.sent_to("reports").len(), reports_before);
    Ok(())
}

#[tokio::test]
async fn external_delete_within_grace_clears_the_frequency_block() -> Result<(), Error> {
    let (transport, service) = build_service();

    service
        .handle_event(ChannelEvent::MessageCreate(board_message(
            "m1",
            "alice",
            "[for-hire]\nAvailable for contract work",
        )))
        .await?;
    assert_eq!(service.job_posts().await.for_hire.len(), 1);

    service
        .handle_event(ChannelEvent::MessageDelete {
            channel_id: "jobs".into(),
            message_id: "m1".into(),
        })
        .await?;

    // A public removal report went out, and the author may post again.
    assert_eq!(transport.sent_to("reports").len(), 1);
    service
        .handle_event(ChannelEvent::MessageCreate(board_message(
            "m2",
            "alice",
            "[for-hire]\nAvailable for contract work again",
        )))
        .await?;
    assert_eq!(service.job_posts().await.for_hire.len(), 1);
    assert!(transport.deleted.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn external_delete_after_grace_keeps_the_frequency_block() -> Result<(), Error> {
    let (transport, service) = build_service();

    let mut msg = board_message("m1", "alice", "[for-hire]\nAvailable for contract work");
    msg.timestamp = Utc::now() - Duration::hours(1);
    service.handle_event(ChannelEvent::MessageCreate(msg)).await?;

    service
        .handle_event(ChannelEvent::MessageDelete {
            channel_id: "jobs".into(),
            message_id: "m1".into(),
        })
        .await?;
    assert_eq!(transport.sent_to("reports").len(), 1);

    // The cache entry survived, so a repost is still too frequent.
    service
        .handle_event(ChannelEvent::MessageCreate(board_message(
            "m2",
            "alice",
            "[for-hire]\nTrying again right away",
        )))
        .await?;
    assert_eq!(transport.deleted.lock().unwrap().as_slice(), ["m2"]);
    Ok(())
}

#[tokio::test]
async fn sweep_ages_out_for_hire_but_not_hiring() -> Result<(), Error> {
    let (transport, service) = build_service();

    let mut hiring = board_message("h1", "alice", "[hiring]\nOld but standing role");
    hiring.timestamp = Utc::now() - Duration::hours(3);
    let mut for_hire = board_message("f1", "bob", "[for-hire]\nShort lived listing");
    for_hire.timestamp = Utc::now() - Duration::hours(2);

    service.handle_event(ChannelEvent::MessageCreate(hiring)).await?;
    service.handle_event(ChannelEvent::MessageCreate(for_hire)).await?;

    let removed = service.sweep_aged().await?;
    assert_eq!(removed, 1);
    assert_eq!(transport.deleted.lock().unwrap().as_slice(), ["f1"]);

    let snap = service.job_posts().await;
    assert_eq!(snap.hiring.len(), 1);
    assert!(snap.for_hire.is_empty());
    Ok(())
}

#[tokio::test]
async fn sweep_stops_early_at_an_undeletable_message() -> Result<(), Error> {
    let (transport, service) = build_service();

    let mut first = board_message("f1", "alice", "[for-hire]\nOldest listing");
    first.timestamp = Utc::now() - Duration::hours(3);
    let mut second = board_message("f2", "bob", "[for-hire]\nAlso aged");
    second.timestamp = Utc::now() - Duration::hours(2);

    service.handle_event(ChannelEvent::MessageCreate(first)).await?;
    service.handle_event(ChannelEvent::MessageCreate(second)).await?;

    transport.undeletable.lock().unwrap().insert("f1".into());
    let removed = service.sweep_aged().await?;
    assert_eq!(removed, 0, "sweep must stop at the undeletable head");
    assert_eq!(service.job_posts().await.for_hire.len(), 2);

    // Once the head becomes deletable the next cycle clears both.
    transport.undeletable.lock().unwrap().clear();
    let removed = service.sweep_aged().await?;
    assert_eq!(removed, 2);
    assert!(service.job_posts().await.for_hire.is_empty());
    Ok(())
}

#[tokio::test]
async fn web3_offenses_escalate_to_a_timeout() -> Result<(), Error> {
    let (transport, service) = build_service();

    for id in ["m1", "m2", "m3"] {
        service
            .handle_event(ChannelEvent::MessageCreate(board_message(
                id,
                "carol",
                "[for-hire]\nI build NFT marketplaces",
            )))
            .await?;
    }

    let timeouts = transport.timeouts.lock().unwrap();
    assert_eq!(timeouts.len(), 1, "only the third offense crosses the threshold");
    assert_eq!(timeouts[0].0, "carol");
    // Scaled like the cooldown window: 12h base at offense three.
    assert_eq!(timeouts[0].1, StdDuration::from_secs(36 * 3600));
    Ok(())
}

#[tokio::test]
async fn retagging_a_rejected_post_is_treated_as_circumvention() -> Result<(), Error> {
    let (transport, service) = build_service();

    service
        .handle_event(ChannelEvent::MessageCreate(board_message(
            "m1", "dave", "an untagged post that will be rejected",
        )))
        .await?;
    assert_eq!(transport.threads.lock().unwrap().len(), 1);

    service
        .handle_event(ChannelEvent::MessageUpdate(board_message(
            "m1", "dave", "still untagged, lightly reworded",
        )))
        .await?;

    // Deleted again, reported to the report channel, and no second thread.
    assert_eq!(transport.deleted.lock().unwrap().len(), 2);
    assert_eq!(transport.threads.lock().unwrap().len(), 1);
    let reports = transport.sent_to("reports");
    assert_eq!(reports.len(), 1);
    assert!(reports[0].contains("dave"));
    Ok(())
}

#[tokio::test]
async fn editing_an_accepted_post_does_not_trip_the_frequency_rule() -> Result<(), Error> {
    let (transport, service) = build_service();

    let mut original = board_message("m1", "erin", "[hiring]\nBackend engineer, remote");
    original.timestamp = Utc::now() - Duration::hours(2);
    service
        .handle_event(ChannelEvent::MessageCreate(original.clone()))
        .await?;

    let mut edited = board_message("m1", "erin", "[hiring]\nBackend engineer, remote or Berlin");
    edited.timestamp = Utc::now();
    service.handle_event(ChannelEvent::MessageUpdate(edited)).await?;

    let snap = service.job_posts().await;
    assert_eq!(snap.hiring.len(), 1);
    assert!(snap.hiring[0].post.description.contains("Berlin"));
    // The original posting time is kept, so aging is not reset by edits.
    assert_eq!(snap.hiring[0].created_at, original.timestamp);
    assert!(transport.deleted.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn purge_author_clears_posts_and_web3_record() -> Result<(), Error> {
    let (transport, service) = build_service();

    service
        .handle_event(ChannelEvent::MessageCreate(board_message(
            "m1",
            "frank",
            "[hiring]\nCompiler engineer wanted",
        )))
        .await?;
    assert_eq!(service.purge_author("frank").await, 1);

    // Frequency no longer blocks the author.
    service
        .handle_event(ChannelEvent::MessageCreate(board_message(
            "m2",
            "frank",
            "[hiring]\nCompiler engineer wanted, round two",
        )))
        .await?;
    assert_eq!(service.job_posts().await.hiring.len(), 1);
    assert!(transport.deleted.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn bootstrap_loads_history_and_skips_bot_messages() -> Result<(), Error> {
    let (transport, service) = build_service();

    let mut older = board_message("m1", "alice", "[hiring]\nA standing role");
    older.timestamp = Utc::now() - Duration::days(2);
    let mut newer = board_message("m2", "bob", "[for-hire]\nFresh listing");
    newer.timestamp = Utc::now() - Duration::hours(1);
    let mut from_bot = board_message("m3", "jobbot", "board housekeeping notice");
    from_bot.author_is_bot = true;
    from_bot.timestamp = Utc::now() - Duration::hours(2);

    // Pages arrive newest-first.
    transport
        .pages
        .lock()
        .unwrap()
        .push_back(vec![newer, from_bot, older]);

    let scanned = service.bootstrap().await?;
    assert_eq!(scanned, 2);

    let snap = service.job_posts().await;
    assert_eq!(snap.hiring.len(), 1);
    assert_eq!(snap.for_hire.len(), 1);
    Ok(())
}
