use std::fmt;

use chrono::{DateTime, Utc};

/// A single job advertisement extracted from a message. Pure value; never
/// mutated after parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Normalized tags in their original order, duplicates collapsed.
    pub tags: Vec<String>,
    /// Body text after the tag line, blank-line runs collapsed.
    pub description: String,
}

impl Post {
    /// The board kind this post advertises, taken from the first
    /// recognized tag. `None` when the post carries neither tag.
    pub fn kind(&self) -> Option<PostKind> {
        self.tags.iter().find_map(|t| match t.as_str() {
            "hiring" => Some(PostKind::Hiring),
            "for-hire" => Some(PostKind::ForHire),
            _ => None,
        })
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostKind {
    Hiring,
    ForHire,
}

impl fmt::Display for PostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostKind::Hiring => write!(f, "hiring"),
            PostKind::ForHire => write!(f, "for-hire"),
        }
    }
}

/// Cache entry: a parsed post plus the moderation metadata needed to age it
/// out and to find the originating message again.
#[derive(Debug, Clone)]
pub struct StoredPost {
    pub message_id: String,
    pub channel_id: String,
    pub author_id: String,
    pub author_name: String,
    /// Message timestamp, not insertion time.
    pub created_at: DateTime<Utc>,
    pub kind: PostKind,
    pub post: Post,
}

/// A rule violation. Each variant carries only the data needed to render a
/// human explanation; failures are produced fresh per validation pass and
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostFailure {
    /// The message replies to another message or mentions someone other
    /// than the author.
    ReplyOrMention,
    /// The author already has a live post on the board.
    TooFrequent { days_since: i64 },
    TooManyLines { lines: usize, limit: usize },
    TooLong { length: usize, limit: usize },
    TooManyEmojis { count: usize, allowed: usize },
    TooManyGaps { gaps: usize },
    /// No post in the message is tagged `[hiring]` or `[for-hire]`.
    MissingKind,
    /// One message mixes `[hiring]` and `[for-hire]`.
    InconsistentKind,
    /// First banned-topic offense inside the cooldown window.
    Web3Content { count: u32 },
    /// Repeat offense while a prior one is still cooling down.
    Web3Poster { count: u32 },
}

impl PostFailure {
    pub fn is_web3(&self) -> bool {
        matches!(
            self,
            PostFailure::Web3Content { .. } | PostFailure::Web3Poster { .. }
        )
    }

    /// Web3 offense count, when this failure carries one.
    pub fn web3_count(&self) -> Option<u32> {
        match self {
            PostFailure::Web3Content { count } | PostFailure::Web3Poster { count } => Some(*count),
            _ => None,
        }
    }

    /// True for the tag-related failures used to spot authors re-tagging a
    /// rejected post to dodge the rules.
    pub fn is_kind_violation(&self) -> bool {
        matches!(self, PostFailure::MissingKind | PostFailure::InconsistentKind)
    }
}

impl fmt::Display for PostFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostFailure::ReplyOrMention => write!(
                f,
                "Job posts may not reply to other messages or mention other members; \
                 the job board is not a discussion channel."
            ),
            PostFailure::TooFrequent { days_since } => write!(
                f,
                "You already have a post on the board from about {days_since} day(s) ago. \
                 Please wait for it to expire before posting again."
            ),
            PostFailure::TooManyLines { lines, limit } => write!(
                f,
                "Your post has {lines} lines; the limit for this kind of post is {limit}."
            ),
            PostFailure::TooLong { length, limit } => write!(
                f,
                "Your post is {length} characters long; the limit for this kind of post is {limit}."
            ),
            PostFailure::TooManyEmojis { count, allowed } => write!(
                f,
                "Your post uses {count} emojis; at this length, up to {allowed} fit the board's format."
            ),
            PostFailure::TooManyGaps { gaps } => write!(
                f,
                "Your post has {gaps} blank gaps between lines. Please tighten it up so \
                 listings stay scannable."
            ),
            PostFailure::MissingKind => write!(
                f,
                "Every post must be tagged `[hiring]` or `[for-hire]` so readers know \
                 which side of the board it belongs to."
            ),
            PostFailure::InconsistentKind => write!(
                f,
                "A single message cannot mix `[hiring]` and `[for-hire]` tags; \
                 post them separately."
            ),
            PostFailure::Web3Content { .. } => write!(
                f,
                "Blockchain, crypto and NFT work is not allowed on this job board."
            ),
            PostFailure::Web3Poster { count } => write!(
                f,
                "You have posted banned blockchain/crypto content repeatedly \
                 (offense #{count}). Further attempts extend the restriction."
            ),
        }
    }
}

/// Escalating-suspicion record for one author. `count` only grows while the
/// scaled cooldown window since `last` has not elapsed; an expired record is
/// treated as absent and the next offense starts over at 1.
#[derive(Debug, Clone, Copy)]
pub struct Web3OffenderRecord {
    pub count: u32,
    pub last: DateTime<Utc>,
}

/// Read-only snapshot of the board, split by post kind.
#[derive(Debug, Clone, Default)]
pub struct JobBoardSnapshot {
    pub hiring: Vec<StoredPost>,
    pub for_hire: Vec<StoredPost>,
}
