use jobbot_common::models::{ChannelMessage, Post, PostFailure, PostKind};

use crate::jobboard::rules::{PostRule, RuleContext};

/// Keeps listings scannable: line and length limits per post kind, an
/// emoji budget scaled by length, and a cap on blank gaps. Also enforces
/// that the message is tagged with exactly one side of the board.
pub struct FormattingRule;

impl PostRule for FormattingRule {
    fn id(&self) -> &str {
        "jobboard.formatting"
    }

    fn check(
        &self,
        posts: &[Post],
        _message: &ChannelMessage,
        ctx: &RuleContext<'_>,
    ) -> Vec<PostFailure> {
        let mut failures = Vec::new();

        let has_hiring = posts.iter().any(|p| p.has_tag("hiring"));
        let has_for_hire = posts.iter().any(|p| p.has_tag("for-hire"));
        if !has_hiring && !has_for_hire {
            failures.push(PostFailure::MissingKind);
        }
        if has_hiring && has_for_hire {
            failures.push(PostFailure::InconsistentKind);
        }

        for post in posts {
            // Untagged posts are held to the stricter for-hire limits.
            let kind = post.kind().unwrap_or(PostKind::ForHire);
            let (max_lines, max_chars) = match kind {
                PostKind::Hiring => (ctx.policy.hiring_max_lines, ctx.policy.hiring_max_chars),
                PostKind::ForHire => {
                    (ctx.policy.for_hire_max_lines, ctx.policy.for_hire_max_chars)
                }
            };

            let content_lines = post
                .description
                .lines()
                .filter(|l| !l.trim().is_empty())
                .count();
            let gaps = post
                .description
                .lines()
                .filter(|l| l.trim().is_empty())
                .count();
            let length = post.description.chars().count();
            let emojis = post.description.chars().filter(|c| is_emoji(*c)).count();
            let allowed_emojis = (length / ctx.policy.emoji_budget_chars).max(1);

            if content_lines > max_lines {
                failures.push(PostFailure::TooManyLines {
                    lines: content_lines,
                    limit: max_lines,
                });
            }
            if length > max_chars {
                failures.push(PostFailure::TooLong {
                    length,
                    limit: max_chars,
                });
            }
            if emojis > allowed_emojis {
                failures.push(PostFailure::TooManyEmojis {
                    count: emojis,
                    allowed: allowed_emojis,
                });
            }
            // The parser has already collapsed runs, so each gap here is a
            // deliberate paragraph break.
            if content_lines > 0 && gaps * 2 > content_lines {
                failures.push(PostFailure::TooManyGaps { gaps });
            }
        }

        failures
    }
}

/// Covers the emoji and pictograph blocks plus the legacy symbol ranges;
/// plain punctuation and text stay out.
fn is_emoji(c: char) -> bool {
    matches!(
        c as u32,
        0x1F000..=0x1FAFF   // pictographs, emoticons, transport, symbols ext.
        | 0x2600..=0x27BF   // misc symbols + dingbats
        | 0x2B00..=0x2BFF   // stars and arrows commonly rendered as emoji
    )
}
