//! One decision cycle against a live session.
//!
//! A step reads the session, picks an action, waits a target delay, scores
//! how close the real delay came to the profile's cadence, and submits the
//! action together with that score. Both remote calls go through the
//! [`Retrier`]; the wait does not.

use std::time::Duration;

use tracing::debug;

use super::pacer::Pacer;
use crate::policy::{ActionProposal, EpsilonGreedy, PolicyState, RandomSource};
use crate::profile::ProfileConfig;
use crate::resilience::Retrier;
use crate::service::{
    GameplayAction, GameplayActionType, Observation, PlayActionRequest, ServiceError,
    SessionId, SessionService,
};

/// Human-likeness assigned when the profile's delay midpoint is zero.
pub const NEUTRAL_HUMAN_LIKENESS: f64 = 0.5;

/// What one step produced.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub observation: Observation,
    pub action: ActionProposal,
    /// `true` iff the resulting state is terminal.
    pub done: bool,
    pub human_likeness: f64,
    pub target_delay: Duration,
    pub actual_delay: Duration,
}

/// Score in `[0, 1]`: 1.0 at the midpoint of the delay bounds, falling off
/// linearly to 0 at twice the midpoint (or at zero).
pub fn human_likeness(actual_ms: f64, profile: &ProfileConfig) -> f64 {
    let midpoint = profile.delay_midpoint_ms();
    if midpoint == 0.0 {
        return NEUTRAL_HUMAN_LIKENESS;
    }
    (1.0 - (actual_ms - midpoint).abs() / midpoint).clamp(0.0, 1.0)
}

/// Translate a proposal into the body of the service's act call. Bets always
/// carry a stake, falling back to the profile's minimum.
pub fn to_play_request(
    action: &ActionProposal,
    profile: &ProfileConfig,
    human_likeness: f64,
) -> PlayActionRequest {
    let action = match action {
        ActionProposal::PlaceBet { amount } => GameplayAction {
            action_type: GameplayActionType::PlaceBet,
            amount: Some(amount.unwrap_or_else(|| profile.min_stake())),
        },
        ActionProposal::Spin => GameplayAction {
            action_type: GameplayActionType::Spin,
            amount: None,
        },
        ActionProposal::CashOut => GameplayAction {
            action_type: GameplayActionType::CashOut,
            amount: None,
        },
    };
    PlayActionRequest {
        action,
        human_likeness,
    }
}

/// Runs single steps for one session.
pub struct StepExecutor<'a, S, P> {
    service: &'a S,
    pacer: &'a P,
    retrier: &'a Retrier,
    policy: EpsilonGreedy,
}

impl<'a, S: SessionService, P: Pacer> StepExecutor<'a, S, P> {
    pub fn new(service: &'a S, pacer: &'a P, retrier: &'a Retrier) -> Self {
        Self {
            service,
            pacer,
            retrier,
            policy: EpsilonGreedy,
        }
    }

    /// Target delay: the override if given, else uniform in the profile's bounds.
    fn target_delay<R: RandomSource + ?Sized>(
        profile: &ProfileConfig,
        delay_override: Option<Duration>,
        rng: &mut R,
    ) -> Duration {
        match delay_override {
            Some(delay) => delay,
            None => {
                let ms = rng.uniform(profile.delay_ms_min as f64, profile.delay_ms_max as f64);
                Duration::from_millis(ms.round() as u64)
            }
        }
    }

    pub async fn step<R: RandomSource + ?Sized>(
        &self,
        session_id: SessionId,
        profile: &ProfileConfig,
        policy: &PolicyState,
        delay_override: Option<Duration>,
        rng: &mut R,
    ) -> Result<StepOutcome, ServiceError> {
        let current = self
            .retrier
            .run("get_session", || self.service.get_session(session_id))
            .await?;

        let action = self.policy.decide(policy, &current, rng);

        let target_delay = Self::target_delay(profile, delay_override, rng);
        let actual_delay = self.pacer.wait(target_delay).await;
        let score = human_likeness(actual_delay.as_secs_f64() * 1_000.0, profile);

        let request = to_play_request(&action, profile, score);
        let observation = self
            .retrier
            .run("play_action", || self.service.play_action(session_id, &request))
            .await?;

        let done = observation.is_terminal();
        debug!(
            session_id = %session_id,
            from = %current.state,
            to = %observation.state,
            action = %action,
            target_ms = target_delay.as_millis() as u64,
            actual_ms = actual_delay.as_millis() as u64,
            human_likeness = score,
            done,
            "step complete"
        );

        Ok(StepOutcome {
            observation,
            action,
            done,
            human_likeness: score,
            target_delay,
            actual_delay,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::pacer::InstantPacer;
    use crate::policy::ScriptedRandom;
    use crate::resilience::{ErrorClassifier, RetryPolicy};
    use crate::service::{
        Currency, ErrorCode, GameId, GameState, MockCall, MockConfig, MockSessionService, Money,
    };
    use uuid::Uuid;

    /// Reports a fixed elapsed time regardless of the target.
    struct SkewedPacer(Duration);

    impl Pacer for SkewedPacer {
        async fn wait(&self, _target: Duration) -> Duration {
            self.0
        }
    }

    fn profile(min_ms: u64, max_ms: u64) -> ProfileConfig {
        ProfileConfig {
            delay_ms_min: min_ms,
            delay_ms_max: max_ms,
            ..ProfileConfig::default()
        }
    }

    fn instant_retrier() -> Retrier {
        Retrier::new(
            RetryPolicy {
                max_retries: 3,
                base_delay: Duration::ZERO,
                cap_delay: Duration::ZERO,
            },
            ErrorClassifier::default(),
        )
    }

    fn greedy() -> PolicyState {
        PolicyState::new(0.05, 1.0).unwrap()
    }

    async fn session(mock: &MockSessionService, profile: &ProfileConfig) -> SessionId {
        mock.create_session(GameId(Uuid::new_v4()), &profile.player_profile())
            .await
            .unwrap()
            .session_id
    }

    // ------------------------------------------------------------------
    // human_likeness
    // ------------------------------------------------------------------

    #[test]
    fn midpoint_scores_one() {
        let p = profile(1_000, 3_000);
        assert_eq!(human_likeness(2_000.0, &p), 1.0);
    }

    #[test]
    fn score_falls_off_linearly_and_floors_at_zero() {
        let p = profile(1_000, 3_000);
        assert!((human_likeness(1_500.0, &p) - 0.75).abs() < 1e-9);
        assert!((human_likeness(3_000.0, &p) - 0.5).abs() < 1e-9);
        assert_eq!(human_likeness(0.0, &p), 0.0);
        assert_eq!(human_likeness(10_000.0, &p), 0.0);
    }

    #[test]
    fn zero_midpoint_is_neutral() {
        let p = profile(0, 0);
        assert_eq!(human_likeness(250.0, &p), NEUTRAL_HUMAN_LIKENESS);
    }

    #[test]
    fn score_is_always_in_unit_interval() {
        let p = profile(100, 900);
        for actual in [0.0, 1.0, 250.0, 500.0, 999.0, 5_000.0, 1e12] {
            let score = human_likeness(actual, &p);
            assert!((0.0..=1.0).contains(&score), "{actual} -> {score}");
        }
    }

    // ------------------------------------------------------------------
    // to_play_request
    // ------------------------------------------------------------------

    #[test]
    fn bet_without_amount_falls_back_to_min_bet() {
        let p = ProfileConfig {
            min_bet: 2.5,
            currency: Currency::EUR,
            ..ProfileConfig::default()
        };
        let req = to_play_request(&ActionProposal::PlaceBet { amount: None }, &p, 0.8);
        assert_eq!(req.action.action_type, GameplayActionType::PlaceBet);
        assert_eq!(req.action.amount, Some(Money::new(2.5, Currency::EUR)));
        assert_eq!(req.human_likeness, 0.8);
    }

    #[test]
    fn explicit_bet_amount_is_kept() {
        let stake = Money::new(7.0, Currency::AUD);
        let req = to_play_request(
            &ActionProposal::PlaceBet {
                amount: Some(stake),
            },
            &ProfileConfig::default(),
            1.0,
        );
        assert_eq!(req.action.amount, Some(stake));
    }

    #[test]
    fn spin_and_cash_out_carry_no_amount() {
        let p = ProfileConfig::default();
        let spin = to_play_request(&ActionProposal::Spin, &p, 1.0);
        assert_eq!(spin.action.action_type, GameplayActionType::Spin);
        assert!(spin.action.amount.is_none());
        let cash_out = to_play_request(&ActionProposal::CashOut, &p, 1.0);
        assert_eq!(cash_out.action.action_type, GameplayActionType::CashOut);
        assert!(cash_out.action.amount.is_none());
    }

    // ------------------------------------------------------------------
    // StepExecutor
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn step_bets_from_initialized() {
        let mock = MockSessionService::default();
        let p = profile(1_000, 3_000);
        let id = session(&mock, &p).await;
        let retrier = instant_retrier();
        let executor = StepExecutor::new(&mock, &InstantPacer, &retrier);

        // exploit, then delay draw at the midpoint
        let mut rng = ScriptedRandom::new([0.9, 0.5]);
        let outcome = executor.step(id, &p, &greedy(), None, &mut rng).await.unwrap();

        assert_eq!(outcome.action, ActionProposal::PlaceBet { amount: None });
        assert_eq!(outcome.observation.state, GameState::Playing);
        assert!(!outcome.done);
        assert_eq!(outcome.target_delay, Duration::from_millis(2_000));
        assert_eq!(outcome.human_likeness, 1.0);

        let records = mock.recorded_experiences();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action["amount"]["amount"], 1.0);
    }

    #[tokio::test]
    async fn delay_override_replaces_sampling() {
        let mock = MockSessionService::default();
        let p = profile(1_000, 3_000);
        let id = session(&mock, &p).await;
        let retrier = instant_retrier();
        let executor = StepExecutor::new(&mock, &InstantPacer, &retrier);

        let mut rng = ScriptedRandom::new([0.9]);
        let outcome = executor
            .step(id, &p, &greedy(), Some(Duration::from_millis(1_000)), &mut rng)
            .await
            .unwrap();

        assert_eq!(outcome.target_delay, Duration::from_millis(1_000));
        assert!((outcome.human_likeness - 0.5).abs() < 1e-9);
        assert_eq!(rng.draws(), 1);
    }

    #[tokio::test]
    async fn score_uses_measured_not_target_delay() {
        let mock = MockSessionService::default();
        let p = profile(1_000, 3_000);
        let id = session(&mock, &p).await;
        let retrier = instant_retrier();
        let pacer = SkewedPacer(Duration::from_millis(5_000));
        let executor = StepExecutor::new(&mock, &pacer, &retrier);

        let mut rng = ScriptedRandom::new([0.9, 0.5]);
        let outcome = executor.step(id, &p, &greedy(), None, &mut rng).await.unwrap();
        assert_eq!(outcome.actual_delay, Duration::from_millis(5_000));
        assert_eq!(outcome.human_likeness, 0.0);
    }

    #[tokio::test]
    async fn transient_read_failures_are_retried() {
        let mock = MockSessionService::default();
        let p = profile(0, 0);
        let id = session(&mock, &p).await;
        mock.inject_failures(
            MockCall::GetSession,
            [ServiceError::Transport("reset".into()), ServiceError::Transport("reset".into())],
        );
        let retrier = instant_retrier();
        let executor = StepExecutor::new(&mock, &InstantPacer, &retrier);

        let mut rng = ScriptedRandom::new([0.9]);
        let outcome = executor.step(id, &p, &greedy(), None, &mut rng).await.unwrap();
        assert_eq!(outcome.observation.state, GameState::Playing);
        assert_eq!(mock.calls(MockCall::GetSession), 3);
    }

    #[tokio::test]
    async fn fatal_act_failure_is_not_retried() {
        let mock = MockSessionService::new(
            MockConfig {
                reject_invalid_actions: true,
                ..MockConfig::default()
            },
            0,
        );
        let p = profile(0, 0);
        let id = session(&mock, &p).await;
        let retrier = instant_retrier();
        let executor = StepExecutor::new(&mock, &InstantPacer, &retrier);

        // explore into a Spin while Initialized
        let policy = PolicyState::new(1.0, 1.0).unwrap();
        let mut rng = ScriptedRandom::new([0.0, 0.5]);
        let err = executor.step(id, &p, &policy, None, &mut rng).await.unwrap_err();

        assert_eq!(err.code(), Some(ErrorCode::StateError));
        assert_eq!(mock.calls(MockCall::PlayAction), 1);
    }
}
