//! Persona analysis pipeline.
//!
//! Drives a job through its lifecycle: parse the transcript and list the
//! speakers, analyze the selected speaker into a persona report plus style
//! artifacts, then confirm by indexing the speaker's turns for retrieval and
//! deleting the uploaded file.

use crate::error::{Error, Result};
use crate::index::RetrievalIndex;
use crate::job::{Job, JobRegistry, JobStatus};
use crate::model::Turn;
use crate::persona;
use crate::providers::GenerationProvider;
use crate::style;
use crate::transcript;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

const STYLE_EXAMPLE_COUNT: usize = 5;
const DIALOG_EXAMPLE_COUNT: usize = 3;

pub struct PersonaPipeline {
    registry: Arc<JobRegistry>,
    provider: Option<Arc<dyn GenerationProvider>>,
    index: Arc<RetrievalIndex>,
}

impl PersonaPipeline {
    pub fn new(
        registry: Arc<JobRegistry>,
        provider: Option<Arc<dyn GenerationProvider>>,
        index: Arc<RetrievalIndex>,
    ) -> Self {
        Self {
            registry,
            provider,
            index,
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Register a transcript file as a queued job.
    pub fn register(&self, file_path: PathBuf) -> String {
        self.registry.create(file_path)
    }

    fn job(&self, job_id: &str) -> Result<Job> {
        self.registry
            .get(job_id)
            .ok_or_else(|| Error::JobNotFound(job_id.to_string()))
    }

    fn fail(&self, job_id: &str, error: &Error) {
        let message = error.to_string();
        self.registry.update(job_id, |job| {
            job.status = JobStatus::Error;
            job.error = Some(message.clone());
        });
    }

    /// Parse the transcript and surface its speakers for selection.
    pub fn extract_speakers(&self, job_id: &str) -> Result<Vec<String>> {
        let job = self.job(job_id)?;
        self.registry.update(job_id, |job| {
            job.status = JobStatus::Running;
            job.progress = 10;
            job.error = None;
        });

        let turns = transcript::parse_file(&job.file_path);
        let speakers = transcript::speakers(&turns);
        if speakers.is_empty() {
            let error = Error::NoSpeakers;
            self.fail(job_id, &error);
            return Err(error);
        }

        info!(job_id, speakers = speakers.len(), turns = turns.len(), "speakers extracted");
        self.registry.update(job_id, |job| {
            job.speakers = speakers.clone();
            job.progress = 30;
            job.status = JobStatus::AwaitingSelection;
        });
        Ok(speakers)
    }

    /// Analyze the selected speaker: persona report plus style artifacts.
    pub async fn analyze(&self, job_id: &str, speaker: &str) -> Result<Job> {
        let job = self.job(job_id)?;
        if !job.speakers.iter().any(|s| s == speaker) {
            let error = Error::UnknownSpeaker(speaker.to_string());
            self.fail(job_id, &error);
            return Err(error);
        }

        self.registry.update(job_id, |job| {
            job.status = JobStatus::Running;
            job.progress = 60;
            job.selected_speaker = Some(speaker.to_string());
            job.error = None;
        });

        let turns = transcript::parse_file(&job.file_path);
        let target_turns: Vec<Turn> = turns
            .iter()
            .filter(|t| t.speaker == speaker)
            .cloned()
            .collect();
        if target_turns.is_empty() {
            let error = Error::SpeakerEmpty(speaker.to_string());
            self.fail(job_id, &error);
            return Err(error);
        }

        self.registry.update(job_id, |job| job.progress = 70);

        let report =
            match persona::build_report(self.provider.as_deref(), &target_turns, true).await {
                Ok(report) => report,
                Err(error) => {
                    self.fail(job_id, &error);
                    return Err(error);
                }
            };

        let style_examples = style::style_examples(&target_turns, STYLE_EXAMPLE_COUNT);
        let dialog_examples = style::dialog_examples(&turns, speaker, DIALOG_EXAMPLE_COUNT);
        let signature = style::style_signature(&target_turns);

        self.registry.update(job_id, |job| {
            job.report = Some(report.clone());
            job.style_examples = style_examples.clone();
            job.dialog_examples = dialog_examples.clone();
            job.style_signature = Some(signature.clone());
            job.progress = 100;
            job.status = JobStatus::Done;
        });

        info!(job_id, speaker, turns = target_turns.len(), "analysis complete");
        self.job(job_id)
    }

    /// Confirm the analysis: index the selected speaker's turns for
    /// retrieval and delete the uploaded transcript. Indexing and deletion
    /// failures are logged, not fatal, so the job result stays usable.
    pub async fn confirm(&self, job_id: &str) -> Result<Job> {
        let job = self.job(job_id)?;
        let Some(speaker) = job.selected_speaker.clone() else {
            return Err(Error::Other("job has no selected speaker".to_string()));
        };

        let turns = transcript::parse_file(&job.file_path);
        let target_turns: Vec<Turn> = turns
            .into_iter()
            .filter(|t| t.speaker == speaker)
            .collect();

        match self.index.index_turns(job_id, &target_turns).await {
            Ok(count) => info!(job_id, chunks = count, "transcript indexed for retrieval"),
            Err(e) => warn!(job_id, "indexing failed, chat will run without retrieval: {e}"),
        }

        if let Err(e) = std::fs::remove_file(&job.file_path) {
            warn!(job_id, "failed to remove transcript file: {e}");
        }

        self.job(job_id)
    }
}
