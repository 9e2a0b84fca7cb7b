use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::orchestrator::EpisodeSettings;
use crate::policy::PolicyState;
use crate::profile::{ProfileConfig, DEFAULT_ADAPTATION_WINDOW};
use crate::resilience::{ErrorClassifier, Retrier, RetryPolicy, DEFAULT_FATAL_CODES};
use crate::service::{ErrorCode, GameId, MockConfig, MAX_EXPORT_LIMIT};
use crate::training::TrainingSettings;

/// Environment variable that fills `service.api_key` when it is empty.
pub const API_KEY_ENV: &str = "PARLAY_API_KEY";
/// Environment variable that fills `service.base_url` when it is empty.
pub const BASE_URL_ENV: &str = "PARLAY_BASE_URL";

/// Complete configuration for a parlay run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParlayConfig {
    pub service: ServiceConfig,
    pub retry: RetryConfig,
    pub breaker: BreakerConfig,
    pub policy: PolicyConfig,
    pub profile: ProfileConfig,
    pub training: TrainingConfig,
    pub mock: MockConfig,
}

/// Remote session service connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL of the session API (default: empty, filled from `PARLAY_BASE_URL`).
    pub base_url: String,
    /// Bearer token (default: empty, filled from `PARLAY_API_KEY`).
    pub api_key: String,
    /// Per-request transport timeout in seconds (default: 30).
    pub timeout_secs: u64,
    /// Game to open sessions for (default: a fresh id per episode).
    pub game_id: Option<Uuid>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            timeout_secs: 30,
            game_id: None,
        }
    }
}

/// Retry budget and the codes that are never retried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt, plus backoff base and cap in ms
    /// (default: 3, 200, 5000).
    #[serde(flatten)]
    pub policy: RetryPolicy,
    /// Codes surfaced on first occurrence (default: wallet limit, invalid
    /// input, state error, not found, unauthorized).
    pub fatal_codes: Vec<ErrorCode>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            policy: RetryPolicy::default(),
            fatal_codes: DEFAULT_FATAL_CODES.to_vec(),
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive step failures that open the breaker (default: 5).
    pub threshold: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self { threshold: 5 }
    }
}

/// Epsilon-greedy schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Starting exploration rate in [0.05, 1.0] (default: 0.2).
    pub initial_epsilon: f64,
    /// Multiplier applied once per completed episode, in (0, 1] (default: 0.95).
    pub decay_rate: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        let state = PolicyState::default();
        Self {
            initial_epsilon: state.epsilon,
            decay_rate: state.decay_rate,
        }
    }
}

/// Training loop configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Episodes per run (default: 10).
    pub episodes: usize,
    /// Directory for per-episode JSONL files (default: "data/episodes").
    pub output_dir: PathBuf,
    /// Hard cap on steps per episode (default: 500).
    pub max_steps: usize,
    /// Experiences requested per export page (default: 1000).
    pub export_page_size: u32,
    /// Trailing rewards considered by profile adaptation (default: 20).
    pub adaptation_window: usize,
    /// Stop the run on the first failed episode (default: true).
    pub abort_on_error: bool,
    /// Fixed inter-action delay in ms instead of sampling (default: none).
    pub delay_override_ms: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            episodes: 10,
            output_dir: PathBuf::from("data/episodes"),
            max_steps: 500,
            export_page_size: 1_000,
            adaptation_window: DEFAULT_ADAPTATION_WINDOW,
            abort_on_error: true,
            delay_override_ms: None,
        }
    }
}

impl ParlayConfig {
    /// Load from a JSON file, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config from {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("Failed to parse config from {}", path.display()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Fill empty service fields from the environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Same as [`apply_env`](Self::apply_env) with an explicit lookup.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.service.api_key.is_empty() {
            if let Some(key) = lookup(API_KEY_ENV) {
                self.service.api_key = key;
            }
        }
        if self.service.base_url.is_empty() {
            if let Some(url) = lookup(BASE_URL_ENV) {
                self.service.base_url = url;
            }
        }
    }

    /// Check every section. `remote` additionally requires a service URL.
    pub fn validate(&self, remote: bool) -> Result<()> {
        if remote {
            ensure!(
                !self.service.base_url.is_empty(),
                "service.base_url is empty; set it in the config or via {BASE_URL_ENV}"
            );
        }
        ensure!(self.breaker.threshold > 0, "breaker.threshold must be positive");
        ensure!(
            self.retry.policy.base_delay <= self.retry.policy.cap_delay,
            "retry base_delay exceeds cap_delay"
        );
        self.initial_policy().context("invalid policy section")?;
        self.profile.validate().context("invalid profile section")?;
        ensure!(self.training.max_steps > 0, "training.max_steps must be positive");
        ensure!(
            (1..=MAX_EXPORT_LIMIT).contains(&self.training.export_page_size),
            "training.export_page_size must lie in [1, {MAX_EXPORT_LIMIT}]"
        );
        ensure!(
            (0.0..=1.0).contains(&self.mock.win_probability),
            "mock.win_probability must lie in [0, 1]"
        );
        ensure!(
            self.mock.retained_sessions > 0,
            "mock.retained_sessions must be positive"
        );
        Ok(())
    }

    pub fn initial_policy(&self) -> Result<PolicyState> {
        PolicyState::new(self.policy.initial_epsilon, self.policy.decay_rate)
    }

    pub fn retrier(&self) -> Retrier {
        Retrier::new(
            self.retry.policy,
            ErrorClassifier::new(self.retry.fatal_codes.iter().copied()),
        )
    }

    pub fn service_timeout(&self) -> Duration {
        Duration::from_secs(self.service.timeout_secs)
    }

    pub fn episode_settings(&self) -> EpisodeSettings {
        EpisodeSettings {
            game_id: self.service.game_id.map(GameId),
            max_steps: self.training.max_steps,
            breaker_threshold: self.breaker.threshold,
            export_page_size: self.training.export_page_size,
            delay_override: self.training.delay_override_ms.map(Duration::from_millis),
        }
    }

    pub fn training_settings(&self) -> TrainingSettings {
        TrainingSettings {
            episodes: self.training.episodes,
            output_dir: self.training.output_dir.clone(),
            adaptation_window: self.training.adaptation_window,
            abort_on_error: self.training.abort_on_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_are_valid_for_mock_runs() {
        let config = ParlayConfig::default();
        config.validate(false).unwrap();
        assert!(config.validate(true).is_err());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let raw = r#"{
            "service": { "base_url": "http://localhost:8080/v1" },
            "retry": { "max_retries": 1, "base_delay": 50, "cap_delay": 400, "fatal_codes": ["RATE_LIMIT"] },
            "profile": { "min_bet": 2.0, "max_bet": 20.0, "currency": "EUR",
                         "delay_ms_min": 500, "delay_ms_max": 1500,
                         "behavior_type": "aggressive" },
            "training": { "episodes": 3, "abort_on_error": false }
        }"#;
        let config: ParlayConfig = serde_json::from_str(raw).unwrap();
        config.validate(true).unwrap();

        assert_eq!(config.service.timeout_secs, 30);
        assert_eq!(config.retry.policy.max_retries, 1);
        assert_eq!(config.retry.policy.cap_delay, Duration::from_millis(400));
        assert_eq!(config.retry.fatal_codes, vec![ErrorCode::RateLimit]);
        assert_eq!(config.breaker.threshold, 5);
        assert_eq!(config.training.episodes, 3);
        assert_eq!(config.training.max_steps, 500);
        assert!(!config.training_settings().abort_on_error);
        assert_eq!(config.profile.behavior_type.as_str(), "aggressive");
    }

    #[test]
    fn env_fills_only_empty_fields() {
        let vars: HashMap<&str, &str> = [
            (API_KEY_ENV, "from-env"),
            (BASE_URL_ENV, "http://env.example/v1"),
        ]
        .into_iter()
        .collect();
        let lookup = |k: &str| vars.get(k).map(|v| v.to_string());

        let mut config = ParlayConfig::default();
        config.service.base_url = "http://file.example/v1".into();
        config.apply_env_with(lookup);

        assert_eq!(config.service.api_key, "from-env");
        assert_eq!(config.service.base_url, "http://file.example/v1");
    }

    #[test]
    fn rejects_out_of_range_sections() {
        let mut config = ParlayConfig::default();
        config.policy.initial_epsilon = 0.01;
        assert!(config.validate(false).is_err());

        let mut config = ParlayConfig::default();
        config.profile.max_bet = 500.0;
        assert!(config.validate(false).is_err());

        let mut config = ParlayConfig::default();
        config.breaker.threshold = 0;
        assert!(config.validate(false).is_err());

        let mut config = ParlayConfig::default();
        config.training.export_page_size = 0;
        assert!(config.validate(false).is_err());

        let mut config = ParlayConfig::default();
        config.mock.retained_sessions = 0;
        assert!(config.validate(false).is_err());
    }

    #[test]
    fn derived_settings_follow_sections() {
        let mut config = ParlayConfig::default();
        config.training.delay_override_ms = Some(250);
        config.breaker.threshold = 2;

        let episode = config.episode_settings();
        assert_eq!(episode.delay_override, Some(Duration::from_millis(250)));
        assert_eq!(episode.breaker_threshold, 2);
        assert_eq!(episode.game_id, None);

        let retrier = config.retrier();
        assert_eq!(retrier.policy, RetryPolicy::default());
    }
}
