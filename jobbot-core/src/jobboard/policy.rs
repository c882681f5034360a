use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Tuning knobs for the job board. The defaults are product decisions, not
/// structural requirements; operators may override any of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobBoardPolicy {
    /// How long a post blocks its author from posting again.
    pub repost_window_days: i64,
    /// Forward bias applied to "now" during eviction, so weekly posters are
    /// not tripped up by being a few hours early.
    pub repost_bias_hours: i64,
    /// How far back the bootstrap load pages through channel history.
    pub history_lookback_days: i64,
    /// Page size for the bootstrap load.
    pub bootstrap_page_size: u16,
    /// For-hire listings age off the board much faster than the repost
    /// window; this is their maximum visible age.
    pub for_hire_max_age_minutes: i64,
    /// Window after posting in which a self-deletion also clears the cache
    /// entry, so the author can repost without a frequency violation.
    pub repost_grace_minutes: i64,

    pub for_hire_max_lines: usize,
    pub for_hire_max_chars: usize,
    pub hiring_max_lines: usize,
    pub hiring_max_chars: usize,
    /// One emoji allowed per this many characters (minimum allowance of 1).
    pub emoji_budget_chars: usize,

    /// Base cooldown for web3 offenders; the active window is this value
    /// multiplied by the current offense count.
    pub web3_base_cooldown_hours: i64,
    /// Offense count at which a rejection also times the author out.
    pub web3_timeout_threshold: u32,

    pub thread_cache_capacity: usize,
    pub thread_cache_ttl_minutes: i64,
    pub report_cache_capacity: usize,
    pub report_cache_ttl_minutes: i64,
}

impl Default for JobBoardPolicy {
    fn default() -> Self {
        Self {
            repost_window_days: 7,
            repost_bias_hours: 6,
            history_lookback_days: 30,
            bootstrap_page_size: 100,
            for_hire_max_age_minutes: 75,
            repost_grace_minutes: 10,
            for_hire_max_lines: 8,
            for_hire_max_chars: 350,
            hiring_max_lines: 18,
            hiring_max_chars: 1800,
            emoji_budget_chars: 150,
            web3_base_cooldown_hours: 12,
            web3_timeout_threshold: 3,
            thread_cache_capacity: 64,
            thread_cache_ttl_minutes: 360,
            report_cache_capacity: 256,
            report_cache_ttl_minutes: 15,
        }
    }
}

impl JobBoardPolicy {
    pub fn repost_window(&self) -> Duration {
        Duration::days(self.repost_window_days)
    }

    pub fn repost_bias(&self) -> Duration {
        Duration::hours(self.repost_bias_hours)
    }

    pub fn history_lookback(&self) -> Duration {
        Duration::days(self.history_lookback_days)
    }

    pub fn for_hire_max_age(&self) -> Duration {
        Duration::minutes(self.for_hire_max_age_minutes)
    }

    pub fn repost_grace(&self) -> Duration {
        Duration::minutes(self.repost_grace_minutes)
    }

    pub fn web3_base_cooldown(&self) -> Duration {
        Duration::hours(self.web3_base_cooldown_hours)
    }
}
