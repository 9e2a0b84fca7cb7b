//! Behavior profile: stake bounds and pacing the agent plays with.
//!
//! A profile is a plain value. It is created once per training run, replaced
//! wholesale by [`adapt_profile`] between episodes, and never mutated in
//! place while an episode is running.

pub mod adapt;

use std::fmt;

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::service::{Currency, Money, PlayerProfile};

pub use adapt::{adapt_profile, round2, DEFAULT_ADAPTATION_WINDOW};

/// Lowest stake any profile may carry.
pub const GLOBAL_MIN_BET: f64 = 0.5;
/// Highest stake any profile may carry.
pub const GLOBAL_MAX_BET: f64 = 100.0;

/// Behavior type announced to the service when a session is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorType {
    /// Small stakes, long pauses.
    Conservative,
    /// Large stakes, rapid spins.
    Aggressive,
    /// Alternates between the two.
    MixedAdaptive,
}

impl BehaviorType {
    pub fn as_str(self) -> &'static str {
        match self {
            BehaviorType::Conservative => "conservative",
            BehaviorType::Aggressive => "aggressive",
            BehaviorType::MixedAdaptive => "mixed_adaptive",
        }
    }

    /// Stake and pacing bounds this behavior plays with by default.
    ///
    /// Delays span one standard deviation around each behavior's mean
    /// cadence: 4000±800 ms, 800±200 ms and 2200±600 ms.
    pub fn preset(self) -> BehaviorPreset {
        match self {
            BehaviorType::Conservative => BehaviorPreset {
                min_bet: 0.5,
                max_bet: 1.0,
                delay_ms_min: 3_200,
                delay_ms_max: 4_800,
            },
            BehaviorType::Aggressive => BehaviorPreset {
                min_bet: 5.0,
                max_bet: 15.0,
                delay_ms_min: 600,
                delay_ms_max: 1_000,
            },
            BehaviorType::MixedAdaptive => BehaviorPreset {
                min_bet: 1.0,
                max_bet: 10.0,
                delay_ms_min: 1_600,
                delay_ms_max: 2_800,
            },
        }
    }
}

/// Default stake and delay bounds for a [`BehaviorType`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BehaviorPreset {
    pub min_bet: f64,
    pub max_bet: f64,
    pub delay_ms_min: u64,
    pub delay_ms_max: u64,
}

impl fmt::Display for BehaviorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stake bounds, currency and inter-action delay bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    pub min_bet: f64,
    pub max_bet: f64,
    pub currency: Currency,
    pub delay_ms_min: u64,
    pub delay_ms_max: u64,
    /// Optional weight in `[0, 1]` the caller attaches to reward shaping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward_weight: Option<f64>,
    pub behavior_type: BehaviorType,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        let behavior_type = BehaviorType::MixedAdaptive;
        let preset = behavior_type.preset();
        Self {
            min_bet: preset.min_bet,
            max_bet: preset.max_bet,
            currency: Currency::AUD,
            delay_ms_min: preset.delay_ms_min,
            delay_ms_max: preset.delay_ms_max,
            reward_weight: None,
            behavior_type,
        }
    }
}

impl ProfileConfig {
    /// Check every invariant a profile must hold.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.min_bet.is_finite() && self.max_bet.is_finite(),
            "stake bounds must be finite"
        );
        ensure!(
            self.min_bet >= GLOBAL_MIN_BET,
            "min_bet {} is below the global floor {GLOBAL_MIN_BET}",
            self.min_bet
        );
        ensure!(
            self.max_bet <= GLOBAL_MAX_BET,
            "max_bet {} is above the global ceiling {GLOBAL_MAX_BET}",
            self.max_bet
        );
        ensure!(
            self.min_bet <= self.max_bet,
            "min_bet {} exceeds max_bet {}",
            self.min_bet,
            self.max_bet
        );
        ensure!(
            self.delay_ms_min <= self.delay_ms_max,
            "delay_ms_min {} exceeds delay_ms_max {}",
            self.delay_ms_min,
            self.delay_ms_max
        );
        if let Some(weight) = self.reward_weight {
            ensure!(
                (0.0..=1.0).contains(&weight),
                "reward_weight {weight} must lie in [0, 1]"
            );
        }
        Ok(())
    }

    /// Switch to `behavior`, taking its preset for any stake or delay bounds
    /// still at their defaults. Bounds set explicitly are kept.
    pub fn with_behavior(self, behavior: BehaviorType) -> Self {
        let defaults = Self::default();
        let preset = behavior.preset();
        let mut profile = Self {
            behavior_type: behavior,
            ..self
        };
        if profile.min_bet == defaults.min_bet && profile.max_bet == defaults.max_bet {
            profile.min_bet = preset.min_bet;
            profile.max_bet = preset.max_bet;
        }
        if profile.delay_ms_min == defaults.delay_ms_min
            && profile.delay_ms_max == defaults.delay_ms_max
        {
            profile.delay_ms_min = preset.delay_ms_min;
            profile.delay_ms_max = preset.delay_ms_max;
        }
        profile
    }

    /// Midpoint of the delay bounds, the cadence human-likeness is scored against.
    pub fn delay_midpoint_ms(&self) -> f64 {
        (self.delay_ms_min as f64 + self.delay_ms_max as f64) / 2.0
    }

    pub fn min_stake(&self) -> Money {
        Money::new(self.min_bet, self.currency)
    }

    /// Player profile sent on session creation.
    pub fn player_profile(&self) -> PlayerProfile {
        PlayerProfile {
            behavior_type: self.behavior_type.to_string(),
            max_bet: Some(Money::new(self.max_bet, self.currency)),
        }
    }
}
