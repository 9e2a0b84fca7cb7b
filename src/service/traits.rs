//! Core service trait and the observation snapshot it produces.
//!
//! The orchestrator only talks to the remote session service through the
//! [`SessionService`] trait, so tests and `--mock` runs can swap in the
//! in-process [`MockSessionService`](super::mock::MockSessionService).

use serde::{Deserialize, Serialize};

use super::error::ServiceError;
use super::types::{
    CreateSessionResponse, GameId, GameState, GameplayResult, HealthResponse, PlayActionRequest,
    PlayActionResponse, PlayerProfile, Session, SessionId, SessionMetrics,
};
use crate::experience::ExperienceRecord;

/// Largest page the export endpoint will return.
pub const MAX_EXPORT_LIMIT: u32 = 10_000;

/// Snapshot of a session after a read or an action. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Current session state.
    pub state: GameState,
    /// Result of the action that produced this observation, if any.
    pub last_result: Option<GameplayResult>,
    /// Running counters (spin count, payout total).
    pub metrics: SessionMetrics,
}

impl Observation {
    /// Observation of a freshly created session.
    pub fn initial(state: GameState) -> Self {
        Self {
            state,
            last_result: None,
            metrics: SessionMetrics::default(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

impl From<Session> for Observation {
    fn from(session: Session) -> Self {
        Self {
            state: session.state,
            last_result: None,
            metrics: session.metrics,
        }
    }
}

impl From<PlayActionResponse> for Observation {
    fn from(resp: PlayActionResponse) -> Self {
        Self {
            state: resp.session.state,
            last_result: Some(resp.result),
            metrics: resp.session.metrics,
        }
    }
}

/// The remote session service as seen by this client.
///
/// Every call may fail with a [`ServiceError`]; retry decisions are made by
/// the caller, never by implementations.
#[allow(async_fn_in_trait)]
pub trait SessionService: Send + Sync {
    /// Create a new session for `game_id` with the given player profile.
    async fn create_session(
        &self,
        game_id: GameId,
        profile: &PlayerProfile,
    ) -> Result<CreateSessionResponse, ServiceError>;

    /// Read the current state and metrics of a session.
    async fn get_session(&self, session_id: SessionId) -> Result<Observation, ServiceError>;

    /// Submit an action to a session and return the resulting observation.
    async fn play_action(
        &self,
        session_id: SessionId,
        request: &PlayActionRequest,
    ) -> Result<Observation, ServiceError>;

    /// Page through the experiences the service recorded for a session.
    async fn export_experiences(
        &self,
        session_id: SessionId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ExperienceRecord>, ServiceError>;

    /// Liveness probe.
    async fn health(&self) -> Result<HealthResponse, ServiceError> {
        Ok(HealthResponse {
            status: "healthy".into(),
        })
    }
}
