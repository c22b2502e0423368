//! # Statute CLI (`statute`)
//!
//! Index statutory texts into embedding artifacts and ask grounded questions
//! against them.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `statute index <statute>` | Chunk, embed and save an artifact |
//! | `statute chunks <statute>` | Print the chunks of a statute |
//! | `statute ask <statute> "<question>"` | Retrieve context and generate an answer |
//! | `statute list` | List statutes and their saved artifacts |
//!
//! The statute argument takes a slug (`labor`) or the display name (`劳动法`).
//! Set `OPENAI_API_KEY` for `index` and `ask`.

mod settings;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use settings::Settings;
use statute_rag::openai::{OpenAIChatModel, OpenAIClient, OpenAIEmbeddingProvider};
use statute_rag::{
    Chunker, DirectorySource, DocumentSource, EmbeddingStore, FixedSizeChunker, IndexOptions,
    RetrievalConfig, RetrievalService, Statute,
};

#[derive(Parser)]
#[command(name = "statute", about = "Question answering over statutory texts", version)]
struct Cli {
    /// Path to a TOML settings file. Defaults to `./statute.toml` when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct Geometry {
    /// Characters per chunk.
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Characters shared by consecutive chunks.
    #[arg(long)]
    overlap: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chunk a statute, embed every chunk and save the artifact.
    Index {
        statute: Statute,

        #[command(flatten)]
        geometry: Geometry,

        /// Also generate a summary for every chunk.
        #[arg(long)]
        summarize: bool,
    },

    /// Print the chunks a statute splits into.
    Chunks {
        statute: Statute,

        #[command(flatten)]
        geometry: Geometry,
    },

    /// Answer a question from a precomputed artifact.
    Ask {
        statute: Statute,

        question: String,

        #[command(flatten)]
        geometry: Geometry,

        /// Number of chunks used as context.
        #[arg(long)]
        top_n: Option<usize>,

        /// Print the retrieved context without calling the chat model.
        #[arg(long)]
        context_only: bool,
    },

    /// List statutes and the geometries of their saved artifacts.
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Index { statute, geometry, summarize } => {
            let retrieval = settings.retrieval_config(geometry.chunk_size, geometry.overlap)?;
            let service = build_service(&settings, retrieval, None)?;
            let outcome =
                service.index(statute, IndexOptions { summarize, save: true }).await?;

            println!(
                "{}: {} chunks at {retrieval}",
                statute.display_name(),
                outcome.loaded.chunks().len()
            );
            if !outcome.failed_embeddings.is_empty() {
                println!("embedding failed for chunks {:?}", outcome.failed_embeddings);
            }
            if !outcome.failed_summaries.is_empty() {
                println!("summary failed for chunks {:?}", outcome.failed_summaries);
            }
            match outcome.artifact {
                Some(path) => println!("saved {}", path.display()),
                None => println!("artifact not saved; rerun to embed the missing chunks"),
            }
        }
        Commands::Chunks { statute, geometry } => {
            let retrieval = settings.retrieval_config(geometry.chunk_size, geometry.overlap)?;
            let source = DirectorySource::new(&settings.documents_dir);
            let document = source.load(statute).await?;
            let chunks = FixedSizeChunker::new(retrieval).chunk(&document);

            println!(
                "{}: {} characters, {} chunks at {retrieval}",
                statute.display_name(),
                document.len(),
                chunks.len()
            );
            for chunk in chunks {
                println!("--- chunk {} ---\n{}", chunk.id, chunk.text);
            }
        }
        Commands::Ask { statute, question, geometry, top_n, context_only } => {
            let retrieval = settings.retrieval_config(geometry.chunk_size, geometry.overlap)?;
            let service = build_service(&settings, retrieval, top_n)?;
            let loaded = service.load_precomputed(statute).await?;
            info!(statute = %statute, chunks = loaded.chunks().len(), "artifact loaded");

            if context_only {
                let top_n = service.config().top_n;
                let retrieval = service.answer_query(&loaded, &question, top_n).await?;
                for result in &retrieval.chunks {
                    println!("[{} | {:.4}]", result.chunk.id, result.similarity_score);
                }
                print!("{}", retrieval.context);
            } else {
                let answer = service.ask(&loaded, &question).await?;
                println!("Context:\n{}", answer.retrieval.context);
                println!("Answer:\n{}", answer.text);
            }
        }
        Commands::List => {
            let store = EmbeddingStore::new(&settings.artifacts_dir);
            for statute in Statute::ALL {
                let configs = store.available(statute).await?;
                let configs: Vec<String> = configs.iter().map(RetrievalConfig::to_string).collect();
                let configs = if configs.is_empty() { "-".to_string() } else { configs.join(", ") };
                println!("{:<10} {:<6} {configs}", statute.slug(), statute.display_name());
            }
        }
    }

    Ok(())
}

fn build_service(
    settings: &Settings,
    retrieval: RetrievalConfig,
    top_n: Option<usize>,
) -> Result<RetrievalService> {
    let openai = &settings.openai;
    let client = OpenAIClient::from_env()
        .context("index and ask need an OpenAI API key")?
        .with_base_url(openai.base_url.as_str())
        .with_timeout(Duration::from_secs(openai.timeout_secs))?;

    let embedder = OpenAIEmbeddingProvider::new(client.clone())
        .with_model(openai.embedding_model.as_str(), openai.embedding_dimensions);
    let mut chat = OpenAIChatModel::new(client).with_model(openai.chat_model.as_str());
    if let Some(temperature) = openai.temperature {
        chat = chat.with_temperature(temperature);
    }

    let service = RetrievalService::builder()
        .config(settings.rag_config(retrieval, top_n)?)
        .embedding_provider(Arc::new(embedder))
        .completion_model(Arc::new(chat))
        .source(Arc::new(DirectorySource::new(&settings.documents_dir)))
        .store(EmbeddingStore::new(&settings.artifacts_dir))
        .build()?;
    Ok(service)
}
