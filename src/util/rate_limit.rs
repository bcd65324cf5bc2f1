//! Rate limiting utilities

use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use uuid::Uuid;

/// Rate limiter keyed by player id
pub type PlayerLimiter = DefaultKeyedRateLimiter<Uuid>;

/// Create a per-player limiter allowing `requests_per_second` for each key
pub fn create_player_limiter(requests_per_second: u32) -> PlayerLimiter {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    RateLimiter::keyed(quota)
}

/// UI command rate limit (class select, team switch, name, leaderboard)
pub const UI_COMMAND_RATE_LIMIT: u32 = 4; // Max 4 UI commands per second

/// Per-player limiter for UI command payloads
pub struct CommandLimiter {
    limiter: PlayerLimiter,
}

impl Default for CommandLimiter {
    fn default() -> Self {
        Self {
            limiter: create_player_limiter(UI_COMMAND_RATE_LIMIT),
        }
    }
}

impl CommandLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a UI command from this player is allowed (returns true if allowed)
    pub fn check(&self, player_id: Uuid) -> bool {
        self.limiter.check_key(&player_id).is_ok()
    }

    /// Drop state for players whose quota has fully replenished
    pub fn prune(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    /// Players with live limiter state
    pub fn tracked(&self) -> usize {
        self.limiter.len()
    }
}
