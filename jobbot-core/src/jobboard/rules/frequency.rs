use jobbot_common::models::{ChannelMessage, Post, PostFailure};

use crate::jobboard::rules::{PostRule, RuleContext};

/// An author with a live entry on the board cannot post again until it is
/// evicted. The failure carries how many days ago the last post went up so
/// the guidance can say when a retry will work.
pub struct FrequencyRule;

impl PostRule for FrequencyRule {
    fn id(&self) -> &str {
        "jobboard.frequency"
    }

    fn check(
        &self,
        _posts: &[Post],
        message: &ChannelMessage,
        ctx: &RuleContext<'_>,
    ) -> Vec<PostFailure> {
        match ctx.board.find_by_author(&message.author_id) {
            Some(existing) => {
                let days_since = (ctx.now - existing.created_at).num_days();
                vec![PostFailure::TooFrequent { days_since }]
            }
            None => Vec::new(),
        }
    }
}
