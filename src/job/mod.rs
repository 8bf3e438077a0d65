//! Job registry for transcript analysis runs.

use crate::model::{FewShotExample, PersonaReport, StyleSignature};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use uuid::Uuid;

/// Lifecycle of an analysis job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    AwaitingSelection,
    Done,
    Error,
}

/// One analysis job and everything it has produced so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    /// Coarse progress in percent.
    pub progress: u8,
    pub file_path: PathBuf,
    pub speakers: Vec<String>,
    pub selected_speaker: Option<String>,
    pub report: Option<PersonaReport>,
    pub style_examples: Vec<String>,
    pub dialog_examples: Vec<FewShotExample>,
    pub style_signature: Option<StyleSignature>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    fn new(file_path: PathBuf) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            status: JobStatus::Queued,
            progress: 0,
            file_path,
            speakers: Vec::new(),
            selected_speaker: None,
            report: None,
            style_examples: Vec::new(),
            dialog_examples: Vec::new(),
            style_signature: None,
            error: None,
            created_at: Utc::now(),
        }
    }
}

/// Shared registry of jobs.
#[derive(Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<String, Job>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a queued job for a transcript file and return its id.
    pub fn create(&self, file_path: PathBuf) -> String {
        let job = Job::new(file_path);
        let id = job.id.clone();
        let mut guard = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        guard.insert(id.clone(), job);
        id
    }

    /// Snapshot of a job by id.
    pub fn get(&self, id: &str) -> Option<Job> {
        let guard = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        guard.get(id).cloned()
    }

    /// Apply a mutation under the lock. Returns false for unknown ids.
    pub fn update(&self, id: &str, mutate: impl FnOnce(&mut Job)) -> bool {
        let mut guard = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        match guard.get_mut(id) {
            Some(job) => {
                mutate(job);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_get_update_roundtrip() {
        let registry = JobRegistry::new();
        let id = registry.create(PathBuf::from("/tmp/chat.txt"));

        let job = registry.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress, 0);

        assert!(registry.update(&id, |job| {
            job.status = JobStatus::Running;
            job.progress = 10;
        }));
        let job = registry.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.progress, 10);

        assert!(!registry.update("missing", |_| {}));
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&JobStatus::AwaitingSelection).unwrap();
        assert_eq!(json, "\"awaiting_selection\"");
    }
}
