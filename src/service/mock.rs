//! In-process session service for tests and `--mock` runs.
//!
//! [`MockSessionService`] keeps sessions in memory and enforces the same
//! lifecycle the real service does:
//!
//! ```text
//! Initialized --PlaceBet--> Playing (or Probing when probe rounds are on)
//! Probing     --PlaceBet--> Playing
//! Playing     --Spin------> Evaluating   (-> Completed once the spin limit
//!                                          or the wallet is exhausted)
//! Evaluating  --PlaceBet--> Playing
//! Evaluating  --CashOut---> Completed
//! ```
//!
//! Anything else is recorded as a no-op that keeps the state, or rejected
//! with `STATE_ERROR` when [`MockConfig::reject_invalid_actions`] is on. Every accepted action
//! records one experience, shaped as
//! `reward = (payout - stake) - cost_per_spin + human_likeness * weight`.
//!
//! Sessions that reach `Completed` stay readable and exportable until more
//! than [`MockConfig::retained_sessions`] newer sessions have finished; the
//! oldest are then evicted along with their experiences.
//!
//! Transient failures can be queued per call with
//! [`MockSessionService::inject_failures`]; each queued error is returned
//! once, before the call would otherwise run.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use super::error::{ErrorCode, ServiceError};
use super::traits::{Observation, SessionService, MAX_EXPORT_LIMIT};
use super::types::{
    CreateSessionResponse, GameId, GameState, GameplayActionType, GameplayResult, Money,
    PlayActionRequest, PlayerProfile, SessionId, SessionMetrics,
};
use crate::experience::ExperienceRecord;

const SYMBOLS: [&str; 5] = ["cherry", "lemon", "bell", "bar", "seven"];
const MULTIPLIERS: [f64; 3] = [1.5, 2.0, 5.0];

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunables for the simulated game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    /// Spins after which a session completes on its own.
    pub spins_per_session: u64,
    /// Chance that a spin pays out.
    pub win_probability: f64,
    /// Wallet balance each new session starts with.
    pub starting_balance: f64,
    /// Operational cost charged against every action's reward.
    pub cost_per_spin: f64,
    /// Weight of the human-likeness score in the shaped reward.
    pub human_likeness_weight: f64,
    /// Route the first bet through `Probing` before `Playing`.
    pub probe_round: bool,
    /// Reject actions that do not fit the current state with `STATE_ERROR`.
    /// When off, such actions are recorded as no-ops and the state is kept.
    pub reject_invalid_actions: bool,
    /// Reject stakes above the session's announced max bet with
    /// `WALLET_LIMIT_EXCEEDED`. Stakes above the balance are always rejected.
    pub enforce_max_bet: bool,
    /// Finished sessions kept in memory before the oldest are evicted.
    pub retained_sessions: usize,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            spins_per_session: 10,
            win_probability: 0.35,
            starting_balance: 500.0,
            cost_per_spin: 0.01,
            human_likeness_weight: 0.3,
            probe_round: false,
            reject_invalid_actions: false,
            enforce_max_bet: false,
            retained_sessions: 16,
        }
    }
}

/// Calls that failures can be injected into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockCall {
    CreateSession,
    GetSession,
    PlayAction,
    Export,
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct MockSession {
    game_id: GameId,
    state: GameState,
    metrics: SessionMetrics,
    balance: f64,
    max_bet: Option<f64>,
    pending_stake: Option<Money>,
}

impl MockSession {
    fn snapshot(&self) -> serde_json::Value {
        json!({
            "state": self.state.label(),
            "totalSpins": self.metrics.total_spins,
            "totalPayout": self.metrics.total_payout,
            "balance": self.balance,
        })
    }

    fn observation(&self, last_result: Option<GameplayResult>) -> Observation {
        Observation {
            state: self.state,
            last_result,
            metrics: self.metrics,
        }
    }
}

/// What one accepted action did to a session.
struct Applied {
    before: MockSession,
    after: MockSession,
    result: GameplayResult,
    stake: f64,
    payout: f64,
}

#[derive(Debug)]
struct Inner {
    rng: StdRng,
    sessions: HashMap<SessionId, MockSession>,
    experiences: HashMap<SessionId, Vec<ExperienceRecord>>,
    /// Completed sessions, oldest first.
    finished: VecDeque<SessionId>,
    failures: HashMap<MockCall, VecDeque<ServiceError>>,
    calls: HashMap<MockCall, u32>,
}

/// A scripted, in-memory implementation of [`SessionService`].
#[derive(Debug)]
pub struct MockSessionService {
    config: MockConfig,
    inner: Mutex<Inner>,
}

impl Default for MockSessionService {
    fn default() -> Self {
        Self::new(MockConfig::default(), 0)
    }
}

impl MockSessionService {
    pub fn new(config: MockConfig, seed: u64) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                rng: StdRng::seed_from_u64(seed),
                sessions: HashMap::new(),
                experiences: HashMap::new(),
                finished: VecDeque::new(),
                failures: HashMap::new(),
                calls: HashMap::new(),
            }),
        }
    }

    pub fn config(&self) -> &MockConfig {
        &self.config
    }

    /// Queue errors to be returned, in order, by the next calls to `call`.
    pub fn inject_failures(&self, call: MockCall, errors: impl IntoIterator<Item = ServiceError>) {
        let mut inner = self.lock();
        inner.failures.entry(call).or_default().extend(errors);
    }

    /// Number of times `call` has been invoked, including injected failures.
    pub fn calls(&self, call: MockCall) -> u32 {
        self.lock().calls.get(&call).copied().unwrap_or(0)
    }

    /// Every experience still held, grouped by session.
    pub fn recorded_experiences(&self) -> Vec<ExperienceRecord> {
        self.lock().experiences.values().flatten().cloned().collect()
    }

    /// Number of sessions still held in memory.
    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock only means a test panicked mid-call; the data is still usable.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Count the call and pop an injected failure if one is queued.
    fn enter(inner: &mut Inner, call: MockCall) -> Result<(), ServiceError> {
        *inner.calls.entry(call).or_insert(0) += 1;
        match inner.failures.get_mut(&call).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Mark a session finished and evict the oldest beyond the retention limit.
    fn retire(inner: &mut Inner, session_id: SessionId, retained: usize) {
        inner.finished.push_back(session_id);
        while inner.finished.len() > retained {
            let Some(evicted) = inner.finished.pop_front() else {
                break;
            };
            inner.sessions.remove(&evicted);
            inner.experiences.remove(&evicted);
            debug!(session_id = %evicted, "mock session evicted");
        }
    }

    fn apply(
        &self,
        inner: &mut Inner,
        session_id: SessionId,
        request: &PlayActionRequest,
    ) -> Result<Applied, ServiceError> {
        let Inner { rng, sessions, .. } = inner;
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| not_found(session_id))?;
        let before = session.clone();

        let mut result = GameplayResult::default();
        let mut stake = 0.0;
        let mut payout = 0.0;

        match (session.state, request.action.action_type) {
            (
                GameState::Initialized | GameState::Probing | GameState::Evaluating,
                GameplayActionType::PlaceBet,
            ) => {
                let amount = request.action.amount.ok_or_else(|| {
                    ServiceError::api(ErrorCode::InvalidInput, "PlaceBet requires an amount")
                })?;
                if !amount.amount.is_finite() || amount.amount <= 0.0 {
                    return Err(ServiceError::api(
                        ErrorCode::InvalidInput,
                        format!("stake must be positive, got {}", amount.amount),
                    ));
                }
                if let Some(max_bet) = session.max_bet.filter(|_| self.config.enforce_max_bet) {
                    if amount.amount > max_bet {
                        return Err(ServiceError::api(
                            ErrorCode::WalletLimitExceeded,
                            format!("stake {} exceeds max bet {max_bet}", amount.amount),
                        ));
                    }
                }
                if amount.amount > session.balance {
                    return Err(ServiceError::api(
                        ErrorCode::WalletLimitExceeded,
                        format!("stake {} exceeds balance {}", amount.amount, session.balance),
                    ));
                }
                session.pending_stake = Some(amount);
                session.state = if session.state == GameState::Initialized && self.config.probe_round {
                    GameState::Probing
                } else {
                    GameState::Playing
                };
            }
            (GameState::Playing, GameplayActionType::Spin) => {
                let bet = session.pending_stake.take().ok_or_else(|| {
                    ServiceError::api(ErrorCode::StateError, "no stake placed before spin")
                })?;
                stake = bet.amount;

                let won = rng.gen_bool(self.config.win_probability.clamp(0.0, 1.0));
                if won {
                    let symbol = SYMBOLS[rng.gen_range(0..SYMBOLS.len())];
                    payout = stake * MULTIPLIERS[rng.gen_range(0..MULTIPLIERS.len())];
                    result.symbols = vec![symbol.to_string(); 3];
                } else {
                    result.symbols = (0..3)
                        .map(|_| SYMBOLS[rng.gen_range(0..SYMBOLS.len())].to_string())
                        .collect();
                }
                result.payout = Some(Money::new(payout, bet.currency));

                session.balance += payout - stake;
                session.metrics.total_spins += 1;
                session.metrics.total_payout += payout;
                session.state = GameState::Evaluating;

                if session.metrics.total_spins >= self.config.spins_per_session
                    || session.balance <= 0.0
                {
                    session.state = GameState::Completed;
                }
            }
            (GameState::Evaluating, GameplayActionType::CashOut) => {
                session.state = GameState::Completed;
            }
            (_, _) if !self.config.reject_invalid_actions => {}
            (state, action) => {
                return Err(ServiceError::api(
                    ErrorCode::StateError,
                    format!("{action:?} is not allowed in state {state}"),
                ));
            }
        }

        Ok(Applied {
            before,
            after: session.clone(),
            result,
            stake,
            payout,
        })
    }
}

fn not_found(session_id: SessionId) -> ServiceError {
    ServiceError::api(ErrorCode::NotFound, format!("session {session_id} not found"))
}

// ---------------------------------------------------------------------------
// SessionService impl
// ---------------------------------------------------------------------------

impl SessionService for MockSessionService {
    async fn create_session(
        &self,
        game_id: GameId,
        profile: &PlayerProfile,
    ) -> Result<CreateSessionResponse, ServiceError> {
        let mut inner = self.lock();
        Self::enter(&mut inner, MockCall::CreateSession)?;

        let session_id = SessionId(Uuid::new_v4());
        inner.sessions.insert(
            session_id,
            MockSession {
                game_id,
                state: GameState::Initialized,
                metrics: SessionMetrics::default(),
                balance: self.config.starting_balance,
                max_bet: profile.max_bet.map(|m| m.amount),
                pending_stake: None,
            },
        );
        debug!(
            session_id = %session_id,
            behavior = %profile.behavior_type,
            "mock session created"
        );
        Ok(CreateSessionResponse {
            session_id,
            state: GameState::Initialized,
        })
    }

    async fn get_session(&self, session_id: SessionId) -> Result<Observation, ServiceError> {
        let mut inner = self.lock();
        Self::enter(&mut inner, MockCall::GetSession)?;
        inner
            .sessions
            .get(&session_id)
            .map(|s| s.observation(None))
            .ok_or_else(|| not_found(session_id))
    }

    async fn play_action(
        &self,
        session_id: SessionId,
        request: &PlayActionRequest,
    ) -> Result<Observation, ServiceError> {
        let mut inner = self.lock();
        Self::enter(&mut inner, MockCall::PlayAction)?;

        let Applied {
            before,
            after,
            result,
            stake,
            payout,
        } = self.apply(&mut inner, session_id, request)?;

        let likeness = request.human_likeness.clamp(0.0, 1.0);
        let reward = (payout - stake) - self.config.cost_per_spin
            + likeness * self.config.human_likeness_weight;

        let record = ExperienceRecord {
            id: Uuid::new_v4(),
            session_id,
            state: before.snapshot(),
            action: serde_json::to_value(&request.action)
                .map_err(|e| ServiceError::Decode(e.to_string()))?,
            reward,
            next_state: after.snapshot(),
            done: after.state.is_terminal(),
            timestamp: Some(Utc::now()),
        };
        inner.experiences.entry(session_id).or_default().push(record);
        if after.state.is_terminal() && !before.state.is_terminal() {
            Self::retire(&mut inner, session_id, self.config.retained_sessions);
        }

        debug!(
            session_id = %session_id,
            game_id = %after.game_id,
            from = %before.state,
            to = %after.state,
            reward,
            "mock action applied"
        );
        Ok(after.observation(Some(result)))
    }

    async fn export_experiences(
        &self,
        session_id: SessionId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ExperienceRecord>, ServiceError> {
        let mut inner = self.lock();
        Self::enter(&mut inner, MockCall::Export)?;
        if !inner.sessions.contains_key(&session_id) {
            return Err(not_found(session_id));
        }
        Ok(inner
            .experiences
            .get(&session_id)
            .into_iter()
            .flatten()
            .skip(offset as usize)
            .take(limit.min(MAX_EXPORT_LIMIT) as usize)
            .cloned()
            .collect())
    }
}
