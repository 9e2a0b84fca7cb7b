//! Action selection.
//!
//! - [`planner`] -- the deterministic state-to-action table.
//! - [`epsilon`] -- epsilon-greedy exploration on top of the planner, and the
//!   per-episode [`PolicyState`] with its decay schedule.
//! - [`random`] -- the injectable [`RandomSource`].

pub mod action;
pub mod epsilon;
pub mod planner;
pub mod random;

pub use action::ActionProposal;
pub use epsilon::{
    decay, EpsilonGreedy, PolicyState, EPSILON_FLOOR, EXPLORATION_BET_RANGE, EXPLORATION_CURRENCY,
};
pub use planner::plan;
pub use random::{RandomSource, ScriptedRandom};
