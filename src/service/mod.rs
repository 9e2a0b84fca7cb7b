//! Client side of the remote session service.
//!
//! - [`http`] -- reqwest-backed client with bearer authentication.
//! - [`mock`] -- in-process simulation with the same lifecycle rules, used by
//!   tests and `--mock` runs.
//!
//! Both implement [`SessionService`]; [`AnyService`] picks one at runtime.

pub mod error;
pub mod http;
pub mod mock;
pub mod traits;
pub mod types;

pub use error::{ErrorCode, ErrorDetail, ErrorResponse, ServiceError};
pub use http::HttpSessionService;
pub use mock::{MockCall, MockConfig, MockSessionService};
pub use traits::{Observation, SessionService, MAX_EXPORT_LIMIT};
pub use types::{
    CreateSessionRequest, CreateSessionResponse, Currency, ExportResponse, GameId, GameState,
    GameplayAction, GameplayActionType, GameplayResult, HealthResponse, Money, PlayActionRequest,
    PlayActionResponse, PlayerProfile, Session, SessionId, SessionMetrics,
};

use crate::experience::ExperienceRecord;

// ---------------------------------------------------------------------------
// AnyService: enum dispatch wrapper for runtime backend selection
// ---------------------------------------------------------------------------

/// Either backend behind one concrete type, since async trait methods rule
/// out `dyn SessionService`.
pub enum AnyService {
    Http(HttpSessionService),
    Mock(MockSessionService),
}

impl SessionService for AnyService {
    async fn create_session(
        &self,
        game_id: GameId,
        profile: &PlayerProfile,
    ) -> Result<CreateSessionResponse, ServiceError> {
        match self {
            Self::Http(s) => s.create_session(game_id, profile).await,
            Self::Mock(s) => s.create_session(game_id, profile).await,
        }
    }

    async fn get_session(&self, session_id: SessionId) -> Result<Observation, ServiceError> {
        match self {
            Self::Http(s) => s.get_session(session_id).await,
            Self::Mock(s) => s.get_session(session_id).await,
        }
    }

    async fn play_action(
        &self,
        session_id: SessionId,
        request: &PlayActionRequest,
    ) -> Result<Observation, ServiceError> {
        match self {
            Self::Http(s) => s.play_action(session_id, request).await,
            Self::Mock(s) => s.play_action(session_id, request).await,
        }
    }

    async fn export_experiences(
        &self,
        session_id: SessionId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ExperienceRecord>, ServiceError> {
        match self {
            Self::Http(s) => s.export_experiences(session_id, limit, offset).await,
            Self::Mock(s) => s.export_experiences(session_id, limit, offset).await,
        }
    }

    async fn health(&self) -> Result<HealthResponse, ServiceError> {
        match self {
            Self::Http(s) => s.health().await,
            Self::Mock(s) => s.health().await,
        }
    }
}
