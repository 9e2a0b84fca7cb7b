//! Multi-episode training loop.
//!
//! Episodes run strictly one after another. Between episodes the loop
//! threads two values forward:
//!
//! ```text
//! for k = 1 .. N:
//!     outcome  = run_episode(profile, policy)
//!     profile  = adapt_profile(profile, outcome.experiences, W)
//!     policy   = decay(policy)
//!     export outcome.experiences -> {output_dir}/episode_{k:04}.jsonl   (if any)
//!     emit EpisodeSummary
//! ```
//!
//! A failed episode either aborts the run or, with `abort_on_error` off, is
//! summarised with its error and leaves profile and policy untouched. A
//! failed export follows the same switch; when the run continues, the
//! episode still counts and its summary carries the export error.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::experience::{episode_length, mean_reward, reward_variance, total_reward, write_jsonl};
use crate::orchestrator::{EpisodeOutcome, Orchestrator, Pacer, Termination};
use crate::policy::{PolicyState, RandomSource};
use crate::profile::{adapt_profile, ProfileConfig, DEFAULT_ADAPTATION_WINDOW};
use crate::service::{GameState, SessionId, SessionService};

// ---------------------------------------------------------------------------
// Settings and summaries
// ---------------------------------------------------------------------------

/// How a training run is driven.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSettings {
    pub episodes: usize,
    /// Directory per-episode JSONL exports are written to.
    pub output_dir: PathBuf,
    /// Trailing records adaptation looks at.
    pub adaptation_window: usize,
    /// Stop the run on the first failed episode.
    pub abort_on_error: bool,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            episodes: 10,
            output_dir: PathBuf::from("data/episodes"),
            adaptation_window: DEFAULT_ADAPTATION_WINDOW,
            abort_on_error: true,
        }
    }
}

/// One line of the run report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    /// 1-based episode number.
    pub episode: usize,
    pub session_id: Option<SessionId>,
    pub total_reward: f64,
    /// Epsilon in effect while the episode ran.
    pub epsilon: f64,
    pub steps: usize,
    pub final_state: Option<GameState>,
    pub mean_reward: f64,
    pub reward_variance: f64,
    pub episode_length: usize,
    pub mean_human_likeness: f64,
    /// Stake bounds in effect while the episode ran.
    pub min_bet: f64,
    pub max_bet: f64,
    pub termination: Option<Termination>,
    pub export_path: Option<PathBuf>,
    /// Set when the episode ran but its JSONL file could not be written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_error: Option<String>,
    pub error: Option<String>,
}

impl EpisodeSummary {
    fn failed(episode: usize, profile: &ProfileConfig, policy: &PolicyState, error: String) -> Self {
        Self {
            episode,
            session_id: None,
            total_reward: 0.0,
            epsilon: policy.epsilon,
            steps: 0,
            final_state: None,
            mean_reward: 0.0,
            reward_variance: 0.0,
            episode_length: 0,
            mean_human_likeness: 0.0,
            min_bet: profile.min_bet,
            max_bet: profile.max_bet,
            termination: None,
            export_path: None,
            export_error: None,
            error: Some(error),
        }
    }

    /// Label of the final state, as shown in logs.
    pub fn final_state_label(&self) -> &'static str {
        self.final_state.map(GameState::label).unwrap_or("n/a")
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub summaries: Vec<EpisodeSummary>,
    pub final_profile: ProfileConfig,
    pub final_policy: PolicyState,
}

impl TrainingReport {
    pub fn completed_episodes(&self) -> usize {
        self.summaries.iter().filter(|s| s.error.is_none()).count()
    }

    /// Write the report as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))
    }
}

// ---------------------------------------------------------------------------
// Training loop
// ---------------------------------------------------------------------------

/// Runs episodes in sequence, adapting the profile and decaying the policy.
pub struct TrainingLoop<S, P> {
    orchestrator: Orchestrator<S, P>,
    settings: TrainingSettings,
}

impl<S: SessionService, P: Pacer> TrainingLoop<S, P> {
    pub fn new(orchestrator: Orchestrator<S, P>, settings: TrainingSettings) -> Self {
        Self {
            orchestrator,
            settings,
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator<S, P> {
        &self.orchestrator
    }

    /// Drive `settings.episodes` episodes starting from `profile` and `policy`.
    pub async fn run<R: RandomSource + ?Sized>(
        &self,
        mut profile: ProfileConfig,
        mut policy: PolicyState,
        rng: &mut R,
    ) -> Result<TrainingReport> {
        profile.validate().context("invalid starting profile")?;
        policy.validate().context("invalid starting policy")?;

        info!(
            episodes = self.settings.episodes,
            output_dir = %self.settings.output_dir.display(),
            epsilon = policy.epsilon,
            "training started"
        );

        let mut summaries = Vec::with_capacity(self.settings.episodes);

        for episode in 1..=self.settings.episodes {
            let outcome = match self.orchestrator.run_episode(&profile, &policy, rng).await {
                Ok(outcome) => outcome,
                Err(err) if self.settings.abort_on_error => {
                    return Err(err).with_context(|| format!("episode {episode} failed"));
                }
                Err(err) => {
                    warn!(episode, error = %err, "episode failed, continuing");
                    summaries.push(EpisodeSummary::failed(
                        episode,
                        &profile,
                        &policy,
                        err.to_string(),
                    ));
                    continue;
                }
            };

            let next_profile =
                adapt_profile(&profile, &outcome.experiences, self.settings.adaptation_window);
            let next_policy = policy.decay();

            let (export_path, export_error) = match self.export(episode, &outcome) {
                Ok(path) => (path, None),
                Err(err) if self.settings.abort_on_error => return Err(err),
                Err(err) => {
                    warn!(episode, error = %format!("{err:#}"), "episode export failed, continuing");
                    (None, Some(format!("{err:#}")))
                }
            };

            let mut summary = summarize(episode, &outcome, &profile, &policy, export_path);
            summary.export_error = export_error;
            info!(
                episode,
                total_reward = summary.total_reward,
                epsilon = summary.epsilon,
                steps = summary.steps,
                final_state = summary.final_state_label(),
                "episode summary"
            );
            summaries.push(summary);

            profile = next_profile;
            policy = next_policy;
        }

        info!(
            episodes = summaries.len(),
            final_epsilon = policy.epsilon,
            min_bet = profile.min_bet,
            max_bet = profile.max_bet,
            "training finished"
        );

        Ok(TrainingReport {
            summaries,
            final_profile: profile,
            final_policy: policy,
        })
    }

    fn export(&self, episode: usize, outcome: &EpisodeOutcome) -> Result<Option<PathBuf>> {
        if outcome.experiences.is_empty() {
            return Ok(None);
        }
        let path = episode_path(&self.settings.output_dir, episode);
        write_jsonl(&path, &outcome.experiences)
            .with_context(|| format!("failed to export episode {episode}"))?;
        Ok(Some(path))
    }
}

/// `{dir}/episode_{k:04}.jsonl`
pub fn episode_path(dir: &Path, episode: usize) -> PathBuf {
    dir.join(format!("episode_{episode:04}.jsonl"))
}

fn summarize(
    episode: usize,
    outcome: &EpisodeOutcome,
    profile: &ProfileConfig,
    policy: &PolicyState,
    export_path: Option<PathBuf>,
) -> EpisodeSummary {
    let records = &outcome.experiences;
    EpisodeSummary {
        episode,
        session_id: Some(outcome.session_id),
        total_reward: total_reward(records),
        epsilon: policy.epsilon,
        steps: outcome.steps,
        final_state: Some(outcome.final_observation.state),
        mean_reward: mean_reward(records),
        reward_variance: reward_variance(records, None),
        episode_length: episode_length(records),
        mean_human_likeness: outcome.mean_human_likeness,
        min_bet: profile.min_bet,
        max_bet: profile.max_bet,
        termination: Some(outcome.termination),
        export_path,
        export_error: None,
        error: None,
    }
}
