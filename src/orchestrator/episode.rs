//! One episode: create a session, step it to an end, collect its experiences.
//!
//! The loop stops on the first of:
//!
//! 1. the session reaching its terminal state,
//! 2. the circuit breaker opening,
//! 3. the hard step cap.
//!
//! A failed step is recorded on the breaker and then aborts the episode with
//! the step's error. Fetching experiences afterwards never fails the episode;
//! an export error degrades to an empty list.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::pacer::Pacer;
use super::step::StepExecutor;
use crate::experience::ExperienceRecord;
use crate::policy::{PolicyState, RandomSource};
use crate::profile::ProfileConfig;
use crate::resilience::{CircuitBreaker, Retrier};
use crate::service::{
    GameId, Observation, ServiceError, SessionId, SessionService, MAX_EXPORT_LIMIT,
};

/// Why the step loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The session reached its terminal state.
    Done,
    /// Consecutive failures reached the breaker threshold.
    BreakerOpen,
    /// The step cap was hit first.
    StepCap,
}

/// Per-episode limits.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeSettings {
    /// Game to open sessions for. A fresh id is used per episode when `None`.
    pub game_id: Option<GameId>,
    /// Hard cap on steps per episode, including the first.
    pub max_steps: usize,
    /// Consecutive step failures that open the breaker.
    pub breaker_threshold: u32,
    /// Experiences requested per export page.
    pub export_page_size: u32,
    /// Fixed inter-action delay instead of sampling from the profile.
    pub delay_override: Option<Duration>,
}

impl Default for EpisodeSettings {
    fn default() -> Self {
        Self {
            game_id: None,
            max_steps: 500,
            breaker_threshold: 5,
            export_page_size: 1_000,
            delay_override: None,
        }
    }
}

/// Everything an episode produced.
#[derive(Debug, Clone)]
pub struct EpisodeOutcome {
    pub session_id: SessionId,
    /// Last good observation.
    pub final_observation: Observation,
    /// Experiences exported for the session; empty if the export failed.
    pub experiences: Vec<ExperienceRecord>,
    pub steps: usize,
    pub termination: Termination,
    /// Mean human-likeness over the episode's steps.
    pub mean_human_likeness: f64,
}

/// Drives episodes against one service.
pub struct Orchestrator<S, P> {
    service: S,
    pacer: P,
    retrier: Retrier,
    settings: EpisodeSettings,
}

impl<S: SessionService, P: Pacer> Orchestrator<S, P> {
    pub fn new(service: S, pacer: P, retrier: Retrier, settings: EpisodeSettings) -> Self {
        Self {
            service,
            pacer,
            retrier,
            settings,
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn settings(&self) -> &EpisodeSettings {
        &self.settings
    }

    /// Run one episode under the given profile and policy.
    pub async fn run_episode<R: RandomSource + ?Sized>(
        &self,
        profile: &ProfileConfig,
        policy: &PolicyState,
        rng: &mut R,
    ) -> Result<EpisodeOutcome, ServiceError> {
        let game_id = self
            .settings
            .game_id
            .unwrap_or_else(|| GameId(Uuid::new_v4()));
        let player = profile.player_profile();

        let created = self
            .retrier
            .run("create_session", || {
                self.service.create_session(game_id, &player)
            })
            .await?;
        let session_id = created.session_id;
        info!(
            session_id = %session_id,
            game_id = %game_id,
            behavior = %profile.behavior_type,
            epsilon = policy.epsilon,
            min_bet = profile.min_bet,
            max_bet = profile.max_bet,
            "episode started"
        );

        let executor = StepExecutor::new(&self.service, &self.pacer, &self.retrier);
        let mut breaker = CircuitBreaker::new(self.settings.breaker_threshold);
        let max_steps = self.settings.max_steps.max(1);
        let delay = self.settings.delay_override;

        let mut steps = 0usize;
        let mut likeness_total = 0.0;

        let first = match executor.step(session_id, profile, policy, delay, rng).await {
            Ok(outcome) => outcome,
            Err(err) => {
                breaker.record_failure();
                warn!(session_id = %session_id, step = 1, error = %err, "step failed");
                return Err(err);
            }
        };
        breaker.record_success();
        steps += 1;
        likeness_total += first.human_likeness;
        let mut observation = first.observation;
        let mut done = first.done;

        while !done && !breaker.is_open() && steps < max_steps {
            match executor.step(session_id, profile, policy, delay, rng).await {
                Ok(outcome) => {
                    breaker.record_success();
                    steps += 1;
                    likeness_total += outcome.human_likeness;
                    observation = outcome.observation;
                    done = outcome.done;
                }
                Err(err) => {
                    breaker.record_failure();
                    warn!(
                        session_id = %session_id,
                        step = steps + 1,
                        failures = breaker.failure_count(),
                        error = %err,
                        "step failed"
                    );
                    return Err(err);
                }
            }
        }

        let termination = if done {
            Termination::Done
        } else if breaker.is_open() {
            Termination::BreakerOpen
        } else {
            Termination::StepCap
        };

        let experiences = match self.fetch_experiences(session_id).await {
            Ok(records) => records,
            Err(err) => {
                warn!(
                    session_id = %session_id,
                    error = %err,
                    "experience export failed, continuing with none"
                );
                Vec::new()
            }
        };

        info!(
            session_id = %session_id,
            steps,
            termination = ?termination,
            final_state = %observation.state,
            experiences = experiences.len(),
            "episode finished"
        );

        Ok(EpisodeOutcome {
            session_id,
            final_observation: observation,
            experiences,
            steps,
            termination,
            mean_human_likeness: likeness_total / steps as f64,
        })
    }

    /// Page through the session's experiences until a short page.
    pub async fn fetch_experiences(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<ExperienceRecord>, ServiceError> {
        let limit = self.settings.export_page_size.clamp(1, MAX_EXPORT_LIMIT);
        let mut records = Vec::new();
        let mut offset: u32 = 0;
        loop {
            let page = self
                .retrier
                .run("export_experiences", || {
                    self.service.export_experiences(session_id, limit, offset)
                })
                .await?;
            let fetched = page.len();
            records.extend(page);
            if fetched < limit as usize {
                break;
            }
            offset = offset.saturating_add(limit);
        }
        Ok(records)
    }
}
