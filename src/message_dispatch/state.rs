//! Persisted bookkeeping for the message dispatcher: which message ids have
//! already been handled, and which one is currently in flight.
//!
//! Grounded on `orchestrator/message_dispatcher.py`'s `DispatchState`: the
//! whole document is rewritten on every mutation rather than appended to,
//! since it's small and a torn write here (unlike the task thread) would
//! corrupt bookkeeping rather than just lose one log line.

use super::error::DispatchError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingEntry {
    pub started_at: DateTime<Utc>,
    pub content_snippet: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchState {
    #[serde(default)]
    pub done: HashSet<String>,
    #[serde(default)]
    pub failed: HashSet<String>,
    #[serde(default)]
    pub processing: HashMap<String, ProcessingEntry>,
}

impl DispatchState {
    pub fn load(path: &Path) -> Result<Self, DispatchError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                serde_json::from_str(&contents).map_err(|e| DispatchError::StateRead(path.to_path_buf(), e))
            }
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), DispatchError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| DispatchError::StateWrite(path.to_path_buf(), e))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn is_handled(&self, message_id: &str) -> bool {
        self.done.contains(message_id)
            || self.failed.contains(message_id)
            || self.processing.contains_key(message_id)
    }

    pub fn mark_processing(&mut self, message_id: &str, content_snippet: &str) {
        self.processing.insert(
            message_id.to_string(),
            ProcessingEntry {
                started_at: Utc::now(),
                content_snippet: content_snippet.chars().take(200).collect(),
            },
        );
    }

    pub fn mark_done(&mut self, message_id: &str) {
        self.processing.remove(message_id);
        self.done.insert(message_id.to_string());
    }

    pub fn mark_failed(&mut self, message_id: &str) {
        self.processing.remove(message_id);
        self.failed.insert(message_id.to_string());
    }

    /// Find `processing` entries older than `threshold` and force-fail them,
    /// returning their ids so the caller can notify the human inbox.
    pub fn sweep_stuck(&mut self, threshold: chrono::Duration) -> Vec<String> {
        let now = Utc::now();
        let stuck: Vec<String> = self
            .processing
            .iter()
            .filter(|(_, entry)| now - entry.started_at > threshold)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &stuck {
            self.mark_failed(id);
        }
        stuck
    }
}

pub fn state_path(octopoid_dir: &Path) -> PathBuf {
    octopoid_dir.join("runtime").join("message_dispatch_state.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut state = DispatchState::default();
        state.mark_processing("msg-1", "hello");
        state.save(&path).unwrap();

        let loaded = DispatchState::load(&path).unwrap();
        assert!(loaded.processing.contains_key("msg-1"));
    }

    #[test]
    fn missing_file_loads_as_empty_default() {
        let dir = tempfile::tempdir().unwrap();
        let state = DispatchState::load(&dir.path().join("nope.json")).unwrap();
        assert!(state.done.is_empty() && state.failed.is_empty() && state.processing.is_empty());
    }

    #[test]
    fn sweep_stuck_moves_old_entries_to_failed() {
        let mut state = DispatchState::default();
        state.processing.insert(
            "old".to_string(),
            ProcessingEntry {
                started_at: Utc::now() - chrono::Duration::seconds(600),
                content_snippet: "stuck".to_string(),
            },
        );
        state.processing.insert(
            "fresh".to_string(),
            ProcessingEntry {
                started_at: Utc::now(),
                content_snippet: "just started".to_string(),
            },
        );
        let stuck = state.sweep_stuck(chrono::Duration::seconds(300));
        assert_eq!(stuck, vec!["old".to_string()]);
        assert!(state.failed.contains("old"));
        assert!(state.processing.contains_key("fresh"));
    }

    #[test]
    fn is_handled_covers_all_three_sets() {
        let mut state = DispatchState::default();
        state.done.insert("a".to_string());
        state.failed.insert("b".to_string());
        state.mark_processing("c", "...");
        assert!(state.is_handled("a"));
        assert!(state.is_handled("b"));
        assert!(state.is_handled("c"));
        assert!(!state.is_handled("d"));
    }
}
