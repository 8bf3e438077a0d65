//! lasttalk CLI: analyze a chat export and talk to the extracted persona.

use clap::{Parser, Subcommand};
use lasttalk::chat::{ChatEngine, ChatOptions, ChatRequest, PersonaContext, StreamFrame};
use lasttalk::config::Config;
use lasttalk::index::RetrievalIndex;
use lasttalk::job::Job;
use lasttalk::memory::ConversationMemory;
use lasttalk::model::StyleMode;
use lasttalk::pipeline::PersonaPipeline;
use lasttalk::providers::jina::JinaClient;
use lasttalk::providers::openai::OpenAiClient;
use lasttalk::providers::{EmbeddingProvider, GenerationProvider};
use lasttalk::store::VectorStore;
use lasttalk::store::memory::InMemoryStore;
use lasttalk::store::pgvector::PgVectorStore;
use lasttalk::telemetry::{TelemetryConfig, init_telemetry};
use secrecy::ExposeSecret;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "lasttalk", about = "Persona chat from KakaoTalk exports")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the speakers found in a transcript
    Speakers {
        /// Exported chat file
        file: PathBuf,
    },
    /// Analyze one speaker into a persona report
    Analyze {
        /// Exported chat file
        file: PathBuf,
        /// Speaker to analyze
        #[arg(long)]
        speaker: String,
    },
    /// Analyze a speaker, then chat with the persona interactively
    Chat {
        /// Exported chat file
        file: PathBuf,
        /// Speaker to impersonate
        #[arg(long)]
        speaker: String,
        /// Session id for conversation memory
        #[arg(long, default_value = "cli")]
        session: String,
        /// Reply mode: prompt, rag, or hybrid
        #[arg(long)]
        mode: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env();

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "lasttalk".to_string(),
        log_level: config.log_level.clone(),
    })?;

    match cli.command {
        Command::Speakers { file } => cmd_speakers(&config, file).await,
        Command::Analyze { file, speaker } => {
            let services = Services::build(&config).await?;
            let job = services.analyze(file, &speaker).await?;
            println!("{}", serde_json::to_string_pretty(&job)?);
            Ok(())
        }
        Command::Chat {
            file,
            speaker,
            session,
            mode,
        } => {
            let services = Services::build(&config).await?;
            let mode = mode
                .map(|m| StyleMode::parse(&m))
                .unwrap_or(config.style_mode);
            services.chat_repl(&config, file, &speaker, &session, mode).await
        }
    }
}

async fn cmd_speakers(config: &Config, file: PathBuf) -> anyhow::Result<()> {
    let services = Services::build(config).await?;
    let job_id = services.pipeline.register(file);
    let speakers = services.pipeline.extract_speakers(&job_id)?;
    for speaker in speakers {
        println!("{speaker}");
    }
    Ok(())
}

/// Wired service graph shared by the subcommands.
struct Services {
    pipeline: PersonaPipeline,
    engine: Arc<ChatEngine>,
}

impl Services {
    async fn build(config: &Config) -> anyhow::Result<Self> {
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(JinaClient::new(
            config.jina_api_key.clone(),
            config.embeddings_model.clone(),
        )?);

        let store: Arc<dyn VectorStore> = match &config.database_url {
            Some(url) => {
                let store = PgVectorStore::connect(url.expose_secret()).await?;
                store.ensure_schema(embedder.dimension()).await?;
                Arc::new(store)
            }
            None => Arc::new(InMemoryStore::new()),
        };

        let provider: Option<Arc<dyn GenerationProvider>> = match &config.openai_api_key {
            Some(key) => Some(Arc::new(OpenAiClient::new(key, config.openai_model.clone())?)),
            None => None,
        };

        let index = Arc::new(RetrievalIndex::new(store, embedder));
        let memory = Arc::new(ConversationMemory::new(config.memory_turns));
        let pipeline = PersonaPipeline::new(
            Arc::new(lasttalk::job::JobRegistry::new()),
            provider.clone(),
            Arc::clone(&index),
        );
        let engine = Arc::new(ChatEngine::new(
            provider,
            index,
            memory,
            ChatOptions {
                top_k: config.rag_results,
                max_distance: config.rag_max_distance,
                temperature: config.temperature,
            },
        ));

        Ok(Self { pipeline, engine })
    }

    async fn analyze(&self, file: PathBuf, speaker: &str) -> anyhow::Result<Job> {
        let job_id = self.pipeline.register(file);
        self.pipeline.extract_speakers(&job_id)?;
        self.pipeline.analyze(&job_id, speaker).await?;
        let job = self.pipeline.confirm(&job_id).await?;
        Ok(job)
    }

    async fn chat_repl(
        &self,
        config: &Config,
        file: PathBuf,
        speaker: &str,
        session: &str,
        mode: StyleMode,
    ) -> anyhow::Result<()> {
        if config.openai_api_key.is_none() {
            anyhow::bail!("OPENAI_API_KEY is required for chat");
        }

        let job = self.analyze(file, speaker).await?;
        let persona = PersonaContext {
            report: job.report.clone().unwrap_or_default(),
            speaker_name: speaker.to_string(),
            style_examples: job.style_examples.clone(),
            dialog_examples: job.dialog_examples.clone(),
            style_signature: job.style_signature.clone().unwrap_or_default(),
        };

        println!("{speaker}와의 대화를 시작합니다. 빈 줄을 입력하면 종료합니다. (mode: {mode})");
        let stdin = std::io::stdin();
        loop {
            print!("> ");
            std::io::stdout().flush()?;
            let mut line = String::new();
            if stdin.read_line(&mut line)? == 0 {
                break;
            }
            let message = line.trim().to_string();
            if message.is_empty() {
                break;
            }

            let mut rx = self.engine.stream_reply(ChatRequest {
                session_id: session.to_string(),
                message,
                owner_key: Some(job.id.clone()),
                persona: Some(persona.clone()),
                mode,
            });
            while let Some(frame) = rx.recv().await {
                match frame {
                    StreamFrame::Text { text } => {
                        print!("{text}");
                        std::io::stdout().flush()?;
                    }
                    StreamFrame::Error { error } => {
                        eprintln!("\n[error] {error}");
                    }
                    StreamFrame::Done { .. } => {
                        println!();
                        break;
                    }
                }
            }
        }
        Ok(())
    }
}
