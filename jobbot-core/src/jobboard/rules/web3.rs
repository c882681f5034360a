use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use jobbot_common::models::{ChannelMessage, Post, PostFailure};

use crate::jobboard::rules::{PostRule, RuleContext};

lazy_static! {
    /// Matched against simplified description text (lowercased, stripped
    /// of punctuation and emoji), so `W-E-B-3` and `Web3!` land the same.
    static ref BANNED_TOPICS: Regex = Regex::new(concat!(
        r"\b(web3|web 3|crypto(currency|currencies)?|blockchain|nfts?|defi|dao",
        r"|token(omics)?|smart contracts?|solidity|metaverse|play to earn|p2e",
        r"|shitcoins?|memecoins?|stablecoins?|airdrops?|minting)\b",
    ))
    .expect("banned topic pattern must compile");
}

/// Banned-topic detection with escalating per-author cooldowns.
///
/// An author with an active offender record fails immediately, no matter
/// what they posted, and the record escalates: the cooldown window is the
/// base cooldown multiplied by the offense count. A clean author only
/// fails (and gets a fresh record) when a post actually matches the
/// banned-topic pattern.
pub struct Web3Rule;

impl PostRule for Web3Rule {
    fn id(&self) -> &str {
        "jobboard.web3"
    }

    fn check(
        &self,
        posts: &[Post],
        message: &ChannelMessage,
        ctx: &RuleContext<'_>,
    ) -> Vec<PostFailure> {
        if let Some(count) = ctx
            .offenders
            .escalate_if_active(&message.author_id, ctx.now)
        {
            debug!(
                "Author {} posted while flagged for web3 content (offense #{count})",
                message.author_id
            );
            return vec![PostFailure::Web3Poster { count }];
        }

        let matched = posts
            .iter()
            .any(|p| BANNED_TOPICS.is_match(&simplify_content(&p.description)));
        if matched {
            let count = ctx.offenders.note_offense(&message.author_id, ctx.now);
            return vec![PostFailure::Web3Content { count }];
        }

        Vec::new()
    }
}

/// Lowercase and keep only letters, digits and single spaces; punctuation,
/// emoji and decoration drop out so the pattern table sees plain words.
pub fn simplify_content(raw: &str) -> String {
    let filtered: String = raw
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}
