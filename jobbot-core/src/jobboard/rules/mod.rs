//! The job-board validation rule set.
//!
//! Every rule runs unconditionally against the parsed posts plus the
//! message context; their failures concatenate, and an empty result means
//! the post is accepted. Rules read the post cache through [`RuleContext`];
//! the web3 rule is also allowed to advance the offender cache, which is
//! part of this core.

pub mod formatting;
pub mod frequency;
pub mod participation;
pub mod web3;

use chrono::{DateTime, Utc};

use jobbot_common::models::{ChannelMessage, Post, PostFailure};

use crate::jobboard::cache::JobPostCache;
use crate::jobboard::offenders::Web3OffenderCache;
use crate::jobboard::policy::JobBoardPolicy;

pub use formatting::FormattingRule;
pub use frequency::FrequencyRule;
pub use participation::ParticipationRule;
pub use web3::Web3Rule;

/// Shared read view handed to every rule.
pub struct RuleContext<'a> {
    pub policy: &'a JobBoardPolicy,
    pub board: &'a JobPostCache,
    pub offenders: &'a Web3OffenderCache,
    pub now: DateTime<Utc>,
}

pub trait PostRule: Send + Sync {
    fn id(&self) -> &str;

    fn check(
        &self,
        posts: &[Post],
        message: &ChannelMessage,
        ctx: &RuleContext<'_>,
    ) -> Vec<PostFailure>;
}

/// The board's standard rule set, in evaluation order.
pub fn default_rules() -> Vec<Box<dyn PostRule>> {
    vec![
        Box::new(ParticipationRule),
        Box::new(FrequencyRule),
        Box::new(FormattingRule),
        Box::new(Web3Rule),
    ]
}

/// Run every rule and concatenate the failures.
pub fn evaluate(
    rules: &[Box<dyn PostRule>],
    posts: &[Post],
    message: &ChannelMessage,
    ctx: &RuleContext<'_>,
) -> Vec<PostFailure> {
    let mut failures = Vec::new();
    for rule in rules {
        failures.extend(rule.check(posts, message, ctx));
    }
    failures
}
