//! Episode-level reward statistics.
//!
//! All functions accept any slice of [`RewardSignal`]s, so they work on raw
//! [`ExperienceRecord`](super::ExperienceRecord)s and on the condensed
//! [`RewardSample`](super::RewardSample)s alike.

use super::types::RewardSignal;

/// Arithmetic mean of the rewards.
///
/// Returns 0.0 for an empty slice.
pub fn mean_reward<T: RewardSignal>(records: &[T]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    records.iter().map(RewardSignal::reward).sum::<f64>() / records.len() as f64
}

/// Number of records up to and including the first terminal one.
///
/// If no record is terminal, the full length is returned.
pub fn episode_length<T: RewardSignal>(records: &[T]) -> usize {
    records
        .iter()
        .position(RewardSignal::done)
        .map(|idx| idx + 1)
        .unwrap_or(records.len())
}

/// Sample variance of the rewards (divides by `n - 1`).
///
/// When `window` is given only the trailing `window` records are considered.
/// Fewer than two records yield 0.0.
pub fn reward_variance<T: RewardSignal>(records: &[T], window: Option<usize>) -> f64 {
    let tail = match window {
        Some(w) if w < records.len() => &records[records.len() - w..],
        _ => records,
    };
    if tail.len() < 2 {
        return 0.0;
    }

    let mean = mean_reward(tail);
    tail.iter()
        .map(|r| (r.reward() - mean).powi(2))
        .sum::<f64>()
        / (tail.len() as f64 - 1.0)
}

/// Sum of all rewards.
pub fn total_reward<T: RewardSignal>(records: &[T]) -> f64 {
    records.iter().map(RewardSignal::reward).sum()
}
