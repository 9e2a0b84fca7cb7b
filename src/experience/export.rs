//! Gymnasium-compatible JSONL export.
//!
//! Each [`ExperienceRecord`] becomes one line shaped like an offline-RL step:
//!
//! ```text
//! {"obs":…,"action":…,"reward":…,"next_obs":…,"terminated":…,"truncated":false,"info":{}}
//! ```
//!
//! Files are written to a temporary sibling and renamed into place, so a
//! reader sees either the previous file or the complete new one.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::types::ExperienceRecord;

/// One step record in the shape offline Gymnasium tooling expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GymnasiumStep {
    pub obs: serde_json::Value,
    pub action: serde_json::Value,
    pub reward: f64,
    pub next_obs: serde_json::Value,
    pub terminated: bool,
    /// Episodes are never cut short from the exporter's point of view.
    pub truncated: bool,
    pub info: serde_json::Map<String, serde_json::Value>,
}

impl From<&ExperienceRecord> for GymnasiumStep {
    fn from(record: &ExperienceRecord) -> Self {
        Self {
            obs: record.state.clone(),
            action: record.action.clone(),
            reward: record.reward,
            next_obs: record.next_state.clone(),
            terminated: record.done,
            truncated: false,
            info: serde_json::Map::new(),
        }
    }
}

/// Render records as newline-separated JSON with a single trailing newline.
///
/// An empty slice renders as `"\n"`.
pub fn to_jsonl(records: &[ExperienceRecord]) -> Result<String> {
    let lines = records
        .iter()
        .map(|r| serde_json::to_string(&GymnasiumStep::from(r)))
        .collect::<Result<Vec<_>, _>>()
        .context("failed to serialise experience record")?;

    let mut out = lines.join("\n");
    out.push('\n');
    Ok(out)
}

/// Atomically write `records` to `path` as JSONL. Returns the number of records written.
pub fn write_jsonl(path: &Path, records: &[ExperienceRecord]) -> Result<usize> {
    let content = to_jsonl(records)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create export directory {}", dir.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temporary file in {}", dir.display()))?;
    tmp.write_all(content.as_bytes())
        .context("failed to write export content")?;
    tmp.as_file()
        .sync_all()
        .context("failed to flush export file")?;
    tmp.persist(path)
        .with_context(|| format!("failed to move export into place at {}", path.display()))?;

    info!(path = %path.display(), records = records.len(), "exported experiences");
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::SessionId;
    use serde_json::json;
    use uuid::Uuid;

    fn record(reward: f64, done: bool) -> ExperienceRecord {
        ExperienceRecord {
            id: Uuid::new_v4(),
            session_id: SessionId(Uuid::new_v4()),
            state: json!({"state": "Playing"}),
            action: json!({"type": "Spin"}),
            reward,
            next_state: json!({"state": if done { "Completed" } else { "Evaluating" }}),
            done,
            timestamp: None,
        }
    }

    #[test]
    fn empty_export_is_a_single_newline() {
        assert_eq!(to_jsonl(&[]).unwrap(), "\n");
    }

    #[test]
    fn step_shape_matches_gymnasium() {
        let rec = record(1.5, true);
        let value = serde_json::to_value(GymnasiumStep::from(&rec)).unwrap();
        assert_eq!(value["obs"], rec.state);
        assert_eq!(value["next_obs"], rec.next_state);
        assert_eq!(value["terminated"], true);
        assert_eq!(value["truncated"], false);
        assert_eq!(value["info"], json!({}));
        assert!(value.get("done").is_none());
    }

    #[test]
    fn writes_zero_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.jsonl");

        let written = write_jsonl(&path, &[]).unwrap();
        assert_eq!(written, 0);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.trim().is_empty());
    }

    #[test]
    fn writes_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("episode_0000.jsonl");
        let records = vec![record(-0.5, false), record(3.0, true)];

        write_jsonl(&path, &records).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.ends_with('\n'));
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        for (line, source) in lines.iter().zip(&records) {
            let step: GymnasiumStep = serde_json::from_str(line).unwrap();
            assert_eq!(step.terminated, source.done);
            assert!(!step.truncated);
            assert!((step.reward - source.reward).abs() < 1e-9);
        }
    }

    #[test]
    fn overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("episode.jsonl");
        write_jsonl(&path, &[record(1.0, false), record(2.0, false)]).unwrap();
        write_jsonl(&path, &[record(9.0, true)]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }
}
