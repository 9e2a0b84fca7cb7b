//! Wire types for the remote session service.
//!
//! All payloads are camelCase JSON. These mirror the service contract; the
//! orchestrator converts them into [`Observation`](super::Observation)s and
//! never inspects them beyond what it needs.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Session identifier assigned by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Game identifier the agent asks to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub Uuid);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// Session state as reported by the service.
///
/// `Completed` is the only terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum GameState {
    Idle,
    Initialized,
    Probing,
    Playing,
    Evaluating,
    Completed,
}

impl GameState {
    /// Whether the session has ended.
    pub fn is_terminal(self) -> bool {
        matches!(self, GameState::Completed)
    }

    /// Label used in logs and episode summaries.
    pub fn label(self) -> &'static str {
        match self {
            GameState::Idle => "Idle",
            GameState::Initialized => "Initialized",
            GameState::Probing => "Probing",
            GameState::Playing => "Playing",
            GameState::Evaluating => "Evaluating",
            GameState::Completed => "Completed",
        }
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Money
// ---------------------------------------------------------------------------

/// Currencies the service accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    AUD,
    USD,
    EUR,
}

/// An amount in a given currency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Money {
    pub amount: f64,
    pub currency: Currency,
}

impl Money {
    pub fn new(amount: f64, currency: Currency) -> Self {
        Self { amount, currency }
    }
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// Running counters the service keeps per session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetrics {
    pub total_spins: u64,
    pub total_payout: f64,
}

/// Full session snapshot returned by `GET /sessions/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: SessionId,
    pub game_id: GameId,
    pub state: GameState,
    #[serde(default)]
    pub metrics: SessionMetrics,
}

/// Player profile sent when a session is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProfile {
    pub behavior_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_bet: Option<Money>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub game_id: GameId,
    pub player_profile: PlayerProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub session_id: SessionId,
    pub state: GameState,
}

// ---------------------------------------------------------------------------
// Gameplay
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum GameplayActionType {
    PlaceBet,
    Spin,
    CashOut,
}

/// Gameplay action as the service expects it (discriminated on `type`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameplayAction {
    #[serde(rename = "type")]
    pub action_type: GameplayActionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Money>,
}

/// Body of `POST /sessions/{id}/actions`. The session is addressed by the
/// path, so it is not repeated here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayActionRequest {
    pub action: GameplayAction,
    pub human_likeness: f64,
}

/// Outcome of a single action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameplayResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout: Option<Money>,
    #[serde(default)]
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayActionResponse {
    pub session: Session,
    pub result: GameplayResult,
}

/// Response of `GET /rl/export`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResponse {
    pub experiences: Vec<crate::experience::ExperienceRecord>,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn play_action_request_has_no_session_id() {
        let req = PlayActionRequest {
            action: GameplayAction {
                action_type: GameplayActionType::PlaceBet,
                amount: Some(Money::new(2.5, Currency::AUD)),
            },
            human_likeness: 0.75,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["action"]["type"], "PlaceBet");
        assert_eq!(json["action"]["amount"]["currency"], "AUD");
        assert_eq!(json["humanLikeness"], 0.75);
        assert!(json.get("sessionId").is_none());
    }

    #[test]
    fn spin_omits_amount() {
        let action = GameplayAction {
            action_type: GameplayActionType::Spin,
            amount: None,
        };
        let json = serde_json::to_string(&action).unwrap();
        assert_eq!(json, r#"{"type":"Spin"}"#);
    }

    #[test]
    fn session_parses_camel_case() {
        let raw = r#"{
            "sessionId": "00000000-0000-4000-8000-000000000001",
            "gameId": "00000000-0000-4000-8000-000000000002",
            "state": "Evaluating",
            "metrics": { "totalSpins": 3, "totalPayout": 12.5 }
        }"#;
        let session: Session = serde_json::from_str(raw).unwrap();
        assert_eq!(session.state, GameState::Evaluating);
        assert_eq!(session.metrics.total_spins, 3);
        assert!((session.metrics.total_payout - 12.5).abs() < 1e-9);
    }

    #[test]
    fn only_completed_is_terminal() {
        for state in [
            GameState::Idle,
            GameState::Initialized,
            GameState::Probing,
            GameState::Playing,
            GameState::Evaluating,
        ] {
            assert!(!state.is_terminal(), "{state} should not be terminal");
        }
        assert!(GameState::Completed.is_terminal());
    }
}
