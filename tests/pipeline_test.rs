use async_trait::async_trait;
use lasttalk::error::{Error, Result};
use lasttalk::index::RetrievalIndex;
use lasttalk::job::{JobRegistry, JobStatus};
use lasttalk::pipeline::PersonaPipeline;
use lasttalk::providers::{ChatMessage, EmbeddingProvider, GenerationProvider, TokenStream};
use lasttalk::store::memory::InMemoryStore;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

const EXPORT: &str = "\
--------------- 2024년 3월 1일 금요일 ---------------
[장나영] [오전 10:16] 오늘 카페 갔다왔어
[김철수] [오전 10:17] 어땠어?
[장나영] [오전 10:18] 라떼 진짜 맛있더라
[장나영] [오전 10:19] 다음엔 같이 가자
";

struct StubProvider;

#[async_trait]
impl GenerationProvider for StubProvider {
    async fn complete_json(&self, _messages: &[ChatMessage]) -> Result<serde_json::Value> {
        Ok(serde_json::json!({
            "summary": "카페를 좋아하는 다정한 말투.",
            "profile": {
                "speech_style": {"honorific_level": "informal"}
            }
        }))
    }

    async fn stream_chat(&self, _: &[ChatMessage], _: f32) -> Result<TokenStream> {
        Err(Error::Provider("not used".to_string()))
    }
}

struct StubEmbedder;

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(vec![vec![0.5, 0.5]; texts.len()])
    }

    fn dimension(&self) -> usize {
        2
    }
}

fn write_export(content: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("lasttalk-test-{}.txt", Uuid::new_v4()));
    std::fs::write(&path, content).unwrap();
    path
}

fn pipeline(provider: Option<Arc<dyn GenerationProvider>>) -> PersonaPipeline {
    let index = Arc::new(RetrievalIndex::new(
        Arc::new(InMemoryStore::new()),
        Arc::new(StubEmbedder),
    ));
    PersonaPipeline::new(Arc::new(JobRegistry::new()), provider, index)
}

#[tokio::test]
async fn full_run_produces_a_done_job_with_artifacts() {
    let file = write_export(EXPORT);
    let pipeline = pipeline(Some(Arc::new(StubProvider)));

    let job_id = pipeline.register(file.clone());
    let speakers = pipeline.extract_speakers(&job_id).unwrap();
    assert_eq!(speakers, vec!["김철수".to_string(), "장나영".to_string()]);

    let job = pipeline.registry().get(&job_id).unwrap();
    assert_eq!(job.status, JobStatus::AwaitingSelection);
    assert_eq!(job.progress, 30);

    let job = pipeline.analyze(&job_id, "장나영").await.unwrap();
    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.progress, 100);
    assert_eq!(job.selected_speaker.as_deref(), Some("장나영"));

    let report = job.report.unwrap();
    assert_eq!(report.summary, "카페를 좋아하는 다정한 말투.");
    assert!(!job.style_examples.is_empty());
    // "어땠어?" by 김철수 answered by 장나영.
    assert_eq!(job.dialog_examples[0].user, "어땠어?");
    assert!(job.style_signature.unwrap().average_length > 0);

    // Confirm indexes the speaker turns and removes the upload.
    pipeline.confirm(&job_id).await.unwrap();
    assert!(!file.exists());
}

#[test]
fn transcript_without_speakers_fails_the_job() {
    let file = write_export("형식에 맞지 않는 내용뿐");
    let pipeline = pipeline(Some(Arc::new(StubProvider)));

    let job_id = pipeline.register(file.clone());
    let err = pipeline.extract_speakers(&job_id).unwrap_err();
    assert!(matches!(err, Error::NoSpeakers));

    let job = pipeline.registry().get(&job_id).unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert!(job.error.is_some());

    std::fs::remove_file(file).ok();
}

#[tokio::test]
async fn unknown_speaker_is_rejected() {
    let file = write_export(EXPORT);
    let pipeline = pipeline(Some(Arc::new(StubProvider)));

    let job_id = pipeline.register(file.clone());
    pipeline.extract_speakers(&job_id).unwrap();

    let err = pipeline.analyze(&job_id, "없는사람").await.unwrap_err();
    assert!(matches!(err, Error::UnknownSpeaker(_)));
    assert_eq!(
        pipeline.registry().get(&job_id).unwrap().status,
        JobStatus::Error
    );

    std::fs::remove_file(file).ok();
}

#[tokio::test]
async fn analysis_without_provider_fails_the_job() {
    let file = write_export(EXPORT);
    let pipeline = pipeline(None);

    let job_id = pipeline.register(file.clone());
    pipeline.extract_speakers(&job_id).unwrap();

    let err = pipeline.analyze(&job_id, "장나영").await.unwrap_err();
    assert!(matches!(err, Error::ProviderUnavailable));
    assert_eq!(
        pipeline.registry().get(&job_id).unwrap().status,
        JobStatus::Error
    );

    std::fs::remove_file(file).ok();
}

#[test]
fn unknown_job_id_is_an_error() {
    let pipeline = pipeline(None);
    let err = pipeline.extract_speakers("missing").unwrap_err();
    assert!(matches!(err, Error::JobNotFound(_)));
}
