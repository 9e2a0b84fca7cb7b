//! Experience records and what this crate does with them.
//!
//! This module provides:
//! - [`types::ExperienceRecord`] -- the `(state, action, reward, next_state, done)`
//!   tuples the service records per action.
//! - [`metrics`] -- mean reward, episode length and reward variance.
//! - [`export`] -- Gymnasium-compatible JSONL export for offline training.

pub mod export;
pub mod metrics;
pub mod types;

pub use export::{to_jsonl, write_jsonl, GymnasiumStep};
pub use metrics::{episode_length, mean_reward, reward_variance, total_reward};
pub use types::{ExperienceRecord, RewardSample, RewardSignal};
