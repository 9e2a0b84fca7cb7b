//! Experience records recorded by the service for each gameplay action.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::service::SessionId;

/// One `(state, action, reward, next_state, done)` tuple.
///
/// Records are produced and stored by the remote service; this crate only
/// reads them for metrics, adaptation and export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceRecord {
    pub id: Uuid,
    pub session_id: SessionId,
    pub state: serde_json::Value,
    pub action: serde_json::Value,
    /// Shaped reward; may be negative.
    pub reward: f64,
    pub next_state: serde_json::Value,
    pub done: bool,
    #[serde(
        default,
        rename = "createdAt",
        alias = "timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
}

/// The `{reward, done}` view of a record, which is all metrics and profile
/// adaptation look at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardSample {
    pub reward: f64,
    pub done: bool,
}

impl RewardSample {
    pub fn new(reward: f64, done: bool) -> Self {
        Self { reward, done }
    }
}

/// Anything that carries a reward and a terminal marker.
pub trait RewardSignal {
    fn reward(&self) -> f64;
    fn done(&self) -> bool;
}

impl RewardSignal for ExperienceRecord {
    fn reward(&self) -> f64 {
        self.reward
    }

    fn done(&self) -> bool {
        self.done
    }
}

impl RewardSignal for RewardSample {
    fn reward(&self) -> f64 {
        self.reward
    }

    fn done(&self) -> bool {
        self.done
    }
}

impl From<&ExperienceRecord> for RewardSample {
    fn from(record: &ExperienceRecord) -> Self {
        Self::new(record.reward, record.done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_service_export_record() {
        let raw = r#"{
            "id": "00000000-0000-4000-8000-0000000000aa",
            "sessionId": "00000000-0000-4000-8000-000000000001",
            "state": {"state": "Playing"},
            "action": {"type": "Spin"},
            "reward": -1.25,
            "nextState": {"state": "Evaluating"},
            "done": false,
            "createdAt": "2024-05-01T12:00:00Z"
        }"#;
        let record: ExperienceRecord = serde_json::from_str(raw).unwrap();
        assert!((record.reward - (-1.25)).abs() < 1e-9);
        assert!(!record.done);
        assert_eq!(record.action["type"], "Spin");
        assert!(record.timestamp.is_some());
    }

    #[test]
    fn timestamp_is_optional() {
        let raw = r#"{
            "id": "00000000-0000-4000-8000-0000000000aa",
            "sessionId": "00000000-0000-4000-8000-000000000001",
            "state": {}, "action": {}, "reward": 1.0, "nextState": {}, "done": true
        }"#;
        let record: ExperienceRecord = serde_json::from_str(raw).unwrap();
        assert!(record.timestamp.is_none());
        assert_eq!(RewardSample::from(&record), RewardSample::new(1.0, true));
    }
}
