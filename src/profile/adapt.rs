//! Reward-driven adaptation of stake bounds.
//!
//! Given the last `W` rewards:
//!
//! ```text
//! factor = min(1.15, 1 + mean * 0.05)   if mean > 0
//!          max(0.85, 1 + mean * 0.05)   otherwise
//! bet'   = clamp(round2(bet * factor), GLOBAL_MIN_BET, GLOBAL_MAX_BET)
//! ```
//!
//! The factor is bounded on both sides, so a single episode can move stakes
//! by at most 15%, and the global floor and ceiling hold no matter how
//! extreme the reward signal is.

use tracing::debug;

use super::{ProfileConfig, GLOBAL_MAX_BET, GLOBAL_MIN_BET};
use crate::experience::{mean_reward, RewardSignal};

/// Number of recent records adaptation looks at by default.
pub const DEFAULT_ADAPTATION_WINDOW: usize = 20;

const MAX_FACTOR: f64 = 1.15;
const MIN_FACTOR: f64 = 0.85;
const SENSITIVITY: f64 = 0.05;

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Derive the next profile from `base` and the most recent rewards.
///
/// Returns `base` unchanged when fewer than `window` records are available.
/// Only the stake bounds change; every other field passes through.
pub fn adapt_profile<T: RewardSignal>(
    base: &ProfileConfig,
    recent: &[T],
    window: usize,
) -> ProfileConfig {
    if window == 0 || recent.len() < window {
        return base.clone();
    }

    let tail = &recent[recent.len() - window..];
    let mean = mean_reward(tail);
    let factor = scale_factor(mean);

    let min_bet = scale_bet(base.min_bet, factor);
    let max_bet = scale_bet(base.max_bet, factor);

    debug!(
        window,
        mean_reward = mean,
        factor,
        min_bet,
        max_bet,
        "adapted profile stake bounds"
    );

    ProfileConfig {
        min_bet,
        max_bet,
        ..base.clone()
    }
}

fn scale_factor(mean: f64) -> f64 {
    if !mean.is_finite() {
        return 1.0;
    }
    let raw = 1.0 + mean * SENSITIVITY;
    if mean > 0.0 {
        raw.min(MAX_FACTOR)
    } else {
        raw.max(MIN_FACTOR)
    }
}

fn scale_bet(bet: f64, factor: f64) -> f64 {
    round2(bet * factor).clamp(GLOBAL_MIN_BET, GLOBAL_MAX_BET)
}
