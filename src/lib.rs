//! Parlay: session orchestration and adaptive policy for a simulated
//! gameplay agent.
//!
//! The agent drives sessions on a remote stateful service. Remote calls go
//! through bounded retry and a per-episode circuit breaker. Actions come from
//! an epsilon-greedy policy over a deterministic planner and are paced to a
//! human-like cadence. Stake bounds adapt between episodes from the rewards
//! they produced, and every episode's experiences are exported as
//! Gymnasium-style JSONL.

pub mod config;
pub mod experience;
pub mod orchestrator;
pub mod policy;
pub mod profile;
pub mod resilience;
pub mod service;
pub mod training;
