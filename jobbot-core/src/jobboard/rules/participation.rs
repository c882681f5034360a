use jobbot_common::models::{ChannelMessage, Post, PostFailure};

use crate::jobboard::rules::{PostRule, RuleContext};

/// The job board is not a discussion channel: replies and mentions of
/// anyone other than the author are rejected outright.
pub struct ParticipationRule;

impl PostRule for ParticipationRule {
    fn id(&self) -> &str {
        "jobboard.participation"
    }

    fn check(
        &self,
        _posts: &[Post],
        message: &ChannelMessage,
        _ctx: &RuleContext<'_>,
    ) -> Vec<PostFailure> {
        let mentions_other = message
            .mentions
            .iter()
            .any(|id| id != &message.author_id);
        if message.is_reply || mentions_other {
            vec![PostFailure::ReplyOrMention]
        } else {
            Vec::new()
        }
    }
}
