//! Epsilon-greedy action selection with per-episode decay.
//!
//! With probability `epsilon` the policy explores: it picks one of the three
//! action kinds uniformly and, for a bet, a stake drawn uniformly from
//! [`EXPLORATION_BET_RANGE`]. That range is fixed and independent of the
//! behavior profile's adapted bounds. Otherwise it follows [`plan`].

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use super::action::ActionProposal;
use super::planner::plan;
use super::random::RandomSource;
use crate::profile::round2;
use crate::service::{Currency, Money, Observation};

/// Epsilon never decays below this.
pub const EPSILON_FLOOR: f64 = 0.05;

/// Stake range exploratory bets are drawn from.
pub const EXPLORATION_BET_RANGE: (f64, f64) = (1.0, 10.0);

/// Currency exploratory bets are placed in.
pub const EXPLORATION_CURRENCY: Currency = Currency::AUD;

/// Exploration rate and its schedule. Replaced wholesale once per episode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolicyState {
    pub epsilon: f64,
    pub episode_count: u64,
    pub decay_rate: f64,
}

impl PolicyState {
    /// Fresh state for a training run.
    pub fn new(epsilon: f64, decay_rate: f64) -> Result<Self> {
        let state = Self {
            epsilon,
            episode_count: 0,
            decay_rate,
        };
        state.validate()?;
        Ok(state)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            (EPSILON_FLOOR..=1.0).contains(&self.epsilon),
            "epsilon {} must lie in [{EPSILON_FLOOR}, 1.0]",
            self.epsilon
        );
        ensure!(
            self.decay_rate > 0.0 && self.decay_rate <= 1.0,
            "decay_rate {} must lie in (0, 1]",
            self.decay_rate
        );
        Ok(())
    }

    /// State for the next episode. Call exactly once per completed episode.
    pub fn decay(&self) -> Self {
        Self {
            epsilon: (self.epsilon * self.decay_rate).max(EPSILON_FLOOR),
            episode_count: self.episode_count + 1,
            decay_rate: self.decay_rate,
        }
    }
}

impl Default for PolicyState {
    fn default() -> Self {
        Self {
            epsilon: 0.2,
            episode_count: 0,
            decay_rate: 0.95,
        }
    }
}

/// Free-function form of [`PolicyState::decay`].
pub fn decay(state: &PolicyState) -> PolicyState {
    state.decay()
}

/// Stateless epsilon-greedy decision rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct EpsilonGreedy;

impl EpsilonGreedy {
    /// Decide the next move for `observation` under `state`.
    ///
    /// Draws once to choose between exploring and planning, then, when
    /// exploring, once for the action kind and once more for a bet's stake.
    pub fn decide<R: RandomSource + ?Sized>(
        &self,
        state: &PolicyState,
        observation: &Observation,
        rng: &mut R,
    ) -> ActionProposal {
        if rng.next_f64() < state.epsilon {
            explore(rng)
        } else {
            plan(observation.state)
        }
    }
}

fn explore<R: RandomSource + ?Sized>(rng: &mut R) -> ActionProposal {
    let kind = ((rng.next_f64() * 3.0) as usize).min(2);
    match kind {
        0 => {
            let (low, high) = EXPLORATION_BET_RANGE;
            let amount = round2(rng.uniform(low, high));
            ActionProposal::PlaceBet {
                amount: Some(Money::new(amount, EXPLORATION_CURRENCY)),
            }
        }
        1 => ActionProposal::Spin,
        _ => ActionProposal::CashOut,
    }
}
