//! Append-only per-task feedback thread.
//!
//! Grounded on `orchestrator/task_thread.py`: every rejection, review
//! comment, or other feedback event is appended as one JSON line to
//! `.octopoid/shared/threads/TASK-<id>.jsonl`. Reads tolerate malformed
//! lines (skip, don't fail) since the file is hand-editable and the history
//! it holds is more valuable than perfect parsing.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadEntry {
    pub role: String,
    pub content: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub author: Option<String>,
}

fn thread_path(threads_dir: &Path, task_id: &str) -> PathBuf {
    threads_dir.join(format!("TASK-{task_id}.jsonl"))
}

pub fn post_message(
    threads_dir: &Path,
    task_id: &str,
    role: &str,
    content: &str,
    author: Option<&str>,
) -> std::io::Result<()> {
    std::fs::create_dir_all(threads_dir)?;
    let entry = ThreadEntry {
        role: role.to_string(),
        content: content.to_string(),
        timestamp: chrono::Utc::now(),
        author: author.map(str::to_string),
    };
    let line = serde_json::to_string(&entry)
        .expect("ThreadEntry serialization cannot fail: no non-finite floats, no maps with non-string keys");

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(thread_path(threads_dir, task_id))?;
    writeln!(file, "{line}")
}

/// Read back a task's thread, silently skipping any line that doesn't parse.
pub fn get_thread(threads_dir: &Path, task_id: &str) -> Vec<ThreadEntry> {
    let path = thread_path(threads_dir, task_id);
    let Ok(contents) = std::fs::read_to_string(&path) else {
        return Vec::new();
    };
    contents
        .lines()
        .filter_map(|line| serde_json::from_str::<ThreadEntry>(line).ok())
        .collect()
}

/// Render only the `rejection`-role entries as a numbered feedback block
/// for the next agent's prompt.
pub fn format_thread_for_prompt(entries: &[ThreadEntry]) -> String {
    let rejections: Vec<&ThreadEntry> = entries.iter().filter(|e| e.role == "rejection").collect();
    if rejections.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    for (i, entry) in rejections.iter().enumerate() {
        let author = entry.author.as_deref().unwrap_or("reviewer");
        out.push_str(&format!(
            "### Previous rejection {} ({}, {})\n{}\n\n",
            i + 1,
            author,
            entry.timestamp.format("%Y-%m-%d %H:%M UTC"),
            entry.content
        ));
    }
    out
}

pub fn cleanup_thread(threads_dir: &Path, task_id: &str) -> bool {
    std::fs::remove_file(thread_path(threads_dir, task_id)).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_a_single_entry() {
        let dir = tempfile::tempdir().unwrap();
        post_message(dir.path(), "123", "rejection", "fix the flaky test", Some("alice"))
            .unwrap();
        let entries = get_thread(dir.path(), "123");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].content, "fix the flaky test");
    }

    #[test]
    fn malformed_lines_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = thread_path(dir.path(), "456");
        std::fs::write(&path, "not json\n{\"role\":\"rejection\",\"content\":\"ok\",\"timestamp\":\"2026-01-01T00:00:00Z\"}\n").unwrap();
        let entries = get_thread(dir.path(), "456");
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn format_filters_to_rejection_role_only() {
        let dir = tempfile::tempdir().unwrap();
        post_message(dir.path(), "789", "note", "not a rejection", None).unwrap();
        post_message(dir.path(), "789", "rejection", "please fix X", Some("bob")).unwrap();
        let entries = get_thread(dir.path(), "789");
        let rendered = format_thread_for_prompt(&entries);
        assert!(rendered.contains("please fix X"));
        assert!(!rendered.contains("not a rejection"));
    }

    #[test]
    fn missing_thread_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(get_thread(dir.path(), "does-not-exist").is_empty());
    }
}
