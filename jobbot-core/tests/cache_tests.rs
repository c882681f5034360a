// File: jobbot-core/tests/cache_tests.rs

use chrono::{Duration, Utc};

use jobbot_common::models::{Post, PostKind, StoredPost};
use jobbot_core::jobboard::{JobBoardPolicy, JobPostCache};

fn stored(message_id: &str, author: &str, kind: PostKind, age: Duration) -> StoredPost {
    StoredPost {
        message_id: message_id.into(),
        channel_id: "jobs".into(),
        author_id: author.into(),
        author_name: author.into(),
        created_at: Utc::now() - age,
        kind,
        post: Post {
            tags: vec![kind.to_string()],
            description: "listing".into(),
        },
    }
}

fn build_cache() -> JobPostCache {
    JobPostCache::new(JobBoardPolicy::default())
}

#[test]
fn append_keeps_ascending_order() {
    let mut cache = build_cache();
    cache.append(stored("m1", "u1", PostKind::ForHire, Duration::hours(3)));
    cache.append(stored("m2", "u2", PostKind::ForHire, Duration::hours(2)));
    cache.append(stored("m3", "u3", PostKind::ForHire, Duration::hours(1)));

    let snap = cache.snapshot();
    let ids: Vec<&str> = snap.for_hire.iter().map(|p| p.message_id.as_str()).collect();
    assert_eq!(ids, vec!["m1", "m2", "m3"]);
}

#[test]
fn out_of_order_insert_is_reordered() {
    let mut cache = build_cache();
    cache.insert_ordered(stored("new", "u1", PostKind::Hiring, Duration::hours(1)));
    cache.insert_ordered(stored("old", "u2", PostKind::Hiring, Duration::hours(5)));
    cache.insert_ordered(stored("mid", "u3", PostKind::Hiring, Duration::hours(3)));

    let snap = cache.snapshot();
    let ids: Vec<&str> = snap.hiring.iter().map(|p| p.message_id.as_str()).collect();
    assert_eq!(ids, vec!["old", "mid", "new"]);
}

#[test]
fn eviction_removes_only_the_expired_prefix() {
    let mut cache = build_cache();
    cache.append(stored("ancient", "u1", PostKind::Hiring, Duration::days(10)));
    cache.append(stored("old", "u2", PostKind::ForHire, Duration::days(8)));
    cache.append(stored("recent", "u3", PostKind::Hiring, Duration::days(2)));

    // Every append runs the eviction pass.
    assert_eq!(cache.len(), 1);
    assert!(cache.find_by_message("recent").is_some());
    assert!(cache.find_by_message("ancient").is_none());
    assert!(cache.find_by_message("old").is_none());
}

#[test]
fn forward_bias_permits_slightly_early_reposts() {
    // Window is 7 days with a 6 hour bias: entries older than 6.75 days go.
    let mut cache = build_cache();
    cache.append(stored("early", "u1", PostKind::ForHire, Duration::hours(166)));
    cache.append(stored("recent", "u2", PostKind::ForHire, Duration::hours(156)));
    cache.append(stored("fresh", "u3", PostKind::ForHire, Duration::minutes(5)));

    assert!(cache.find_by_message("early").is_none(), "166h > 162h biased window");
    assert!(cache.find_by_message("recent").is_some(), "156h < 162h biased window");
    assert!(cache.find_by_message("fresh").is_some());
}

#[test]
fn month_old_posts_evicted_regardless_of_kind() {
    let mut cache = build_cache();
    cache.append(stored("h", "u1", PostKind::Hiring, Duration::days(30)));
    cache.append(stored("f", "u2", PostKind::ForHire, Duration::days(30)));
    cache.append(stored("fresh", "u3", PostKind::Hiring, Duration::minutes(1)));

    assert_eq!(cache.len(), 1);
    assert!(cache.find_by_message("fresh").is_some());
}

#[test]
fn remove_by_message_works_anywhere_in_the_cache() {
    let mut cache = build_cache();
    cache.append(stored("m1", "u1", PostKind::Hiring, Duration::hours(3)));
    cache.append(stored("m2", "u2", PostKind::Hiring, Duration::hours(2)));
    cache.append(stored("m3", "u3", PostKind::Hiring, Duration::hours(1)));

    let removed = cache.remove_by_message("m2");
    assert_eq!(removed.map(|p| p.message_id), Some("m2".to_string()));
    assert_eq!(cache.len(), 2);
    assert!(cache.remove_by_message("m2").is_none());
}

#[test]
fn purge_author_drops_all_their_entries() {
    let mut cache = build_cache();
    cache.append(stored("m1", "spammer", PostKind::ForHire, Duration::hours(3)));
    cache.append(stored("m2", "normal", PostKind::Hiring, Duration::hours(2)));
    cache.append(stored("m3", "spammer", PostKind::ForHire, Duration::hours(1)));

    assert_eq!(cache.purge_author("spammer"), 2);
    assert_eq!(cache.len(), 1);
    assert!(cache.find_by_author("spammer").is_none());
    assert!(cache.find_by_author("normal").is_some());
}

#[test]
fn find_by_author_returns_latest_entry() {
    let mut cache = build_cache();
    cache.append(stored("m1", "u1", PostKind::Hiring, Duration::hours(5)));
    cache.append(stored("m2", "u1", PostKind::Hiring, Duration::hours(1)));

    let found = cache.find_by_author("u1").map(|p| p.message_id.clone());
    assert_eq!(found, Some("m2".to_string()));
}

#[test]
fn aged_scan_skips_hiring_posts() {
    let mut cache = build_cache();
    cache.append(stored("h-old", "u1", PostKind::Hiring, Duration::hours(3)));
    cache.append(stored("f-old", "u2", PostKind::ForHire, Duration::minutes(90)));
    cache.append(stored("f-new", "u3", PostKind::ForHire, Duration::minutes(10)));

    let cutoff = Utc::now() - Duration::minutes(75);
    let candidate = cache.next_aged_for_hire(cutoff);
    assert_eq!(
        candidate.map(|(id, _)| id),
        Some("f-old".to_string()),
        "the aged hiring post at the head must be skipped, not returned"
    );
}

#[test]
fn aged_scan_finds_nothing_when_only_hiring_is_old() {
    let mut cache = build_cache();
    cache.append(stored("h-old", "u1", PostKind::Hiring, Duration::hours(4)));
    cache.append(stored("f-new", "u2", PostKind::ForHire, Duration::minutes(5)));

    let cutoff = Utc::now() - Duration::minutes(75);
    assert!(cache.next_aged_for_hire(cutoff).is_none());
}

#[test]
fn aged_scan_finds_nothing_when_board_is_fresh() {
    let mut cache = build_cache();
    cache.append(stored("f1", "u1", PostKind::ForHire, Duration::minutes(30)));

    let cutoff = Utc::now() - Duration::minutes(75);
    assert!(cache.next_aged_for_hire(cutoff).is_none());
}
