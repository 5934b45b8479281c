//! Terminal front end for the materials-science assistant.

mod config;
mod console;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Confirm, Input};
use matsci_rag::{
    ai::{OllamaEmbedder, OllamaGateway},
    ingest::parse_summaries,
    rebuild_collection, ChatMessage, ConversationState, NoopReporter, Pipeline, ProgressReporter,
    QdrantStore, RagError, RunContext, VectorRetriever,
};
use ollama_client::OllamaClient;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::console::{ConsoleReporter, StdoutSink};

type MaterialsPipeline = Pipeline<OllamaGateway, VectorRetriever<OllamaEmbedder, QdrantStore>>;

#[derive(Parser)]
#[command(name = "matsci")]
#[command(about = "Ask questions about Materials Project records")]
struct Cli {
    /// Hide the step-by-step progress
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive conversation
    Chat,

    /// Answer a single question
    Ask { question: String },

    /// Drop and rebuild the collection from a summaries file (JSON array or NDJSON)
    Ingest {
        path: PathBuf,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they never interleave with a streamed answer
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,matsci_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(ollama = %config.ollama_url, qdrant = %config.qdrant_url, "Configuration loaded");

    let client = OllamaClient::new(&config.ollama_url);
    let embedder = OllamaEmbedder::new(client.clone()).with_model(&config.embed_model);
    let mut store = QdrantStore::new(&config.qdrant_url);
    if let Some(api_key) = config.qdrant_api_key.take() {
        store = store.with_api_key(api_key);
    }

    match cli.command {
        Commands::Ingest { path, yes } => ingest(&config, &embedder, &store, path, yes).await,
        command => {
            let gateway = OllamaGateway::new(client).with_model(&config.chat_model);
            let retriever =
                VectorRetriever::new(embedder, store).with_collection(&config.collection);
            let pipeline = Pipeline::with_config(gateway, retriever, config.pipeline());

            match command {
                Commands::Ask { question } => {
                    answer(&pipeline, &question, Vec::new(), cli.quiet).await?;
                    Ok(())
                }
                _ => chat(&pipeline, cli.quiet).await,
            }
        }
    }
}

async fn chat(pipeline: &MaterialsPipeline, quiet: bool) -> Result<()> {
    println!(
        "{}",
        "Ask about materials by ID (e.g. mp-149) or property. Type 'exit' to quit.".bright_cyan()
    );

    let mut history = Vec::new();
    loop {
        let question = read_question().await?;
        let question = question.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question, "exit" | "quit") {
            println!("{}", "Goodbye!".bright_blue());
            break;
        }

        match answer(pipeline, question, history.clone(), quiet).await {
            Ok(output) => {
                history.push(ChatMessage::human(question));
                history.push(ChatMessage::ai(output));
            }
            Err(e) => eprintln!("{} {:#}", "Error:".bright_red().bold(), e),
        }
    }

    Ok(())
}

async fn read_question() -> Result<String> {
    let line = tokio::task::spawn_blocking(|| {
        Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt("You")
            .allow_empty(true)
            .interact_text()
    })
    .await??;
    Ok(line)
}

/// Run one question through the pipeline, streaming the answer to stdout.
///
/// Ctrl-C cancels the run in flight.
async fn answer(
    pipeline: &MaterialsPipeline,
    question: &str,
    history: Vec<ChatMessage>,
    quiet: bool,
) -> Result<String> {
    let console = ConsoleReporter::new();
    let reporter: &dyn ProgressReporter = if quiet { &NoopReporter } else { &console };
    let sink = StdoutSink::new();

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let ctx = RunContext::new(reporter, &sink).with_cancel(cancel);
    let result = pipeline
        .run(ConversationState::new(question, history), &ctx)
        .await;
    interrupt.abort();
    println!();

    match result {
        Ok(run) => Ok(run.output().to_string()),
        Err(RagError::Cancelled) => {
            println!("{}", "Cancelled.".yellow());
            Err(RagError::Cancelled.into())
        }
        Err(e) if e.is_upstream() => Err(anyhow::Error::new(e)
            .context("A backing service is unavailable; check that Ollama and Qdrant are running")),
        Err(e) => Err(e.into()),
    }
}

async fn ingest(
    config: &Config,
    embedder: &OllamaEmbedder,
    store: &QdrantStore,
    path: PathBuf,
    yes: bool,
) -> Result<()> {
    let text = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let summaries = parse_summaries(&text)
        .with_context(|| format!("Failed to parse summaries in {}", path.display()))?;

    let ingest_config = config.ingest();
    let prompt = format!(
        "Drop collection '{}' and rebuild it from {} materials?",
        ingest_config.collection,
        summaries.len()
    );
    if !yes {
        let confirmed = tokio::task::spawn_blocking(move || {
            Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .default(false)
                .interact()
        })
        .await??;
        if !confirmed {
            println!("{}", "Aborted.".yellow());
            return Ok(());
        }
    }

    let report = rebuild_collection(embedder, store, &summaries, &ingest_config)
        .await
        .context("Failed to rebuild collection")?;

    println!(
        "{} {} materials, {} chunks, {} points written to '{}'",
        "✓".bright_green().bold(),
        report.materials,
        report.chunks,
        report.points,
        ingest_config.collection
    );
    Ok(())
}
