use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use codeask::chat::ChatClient;
use codeask::config::Config;
use codeask::embedder::{Embedder, download, onnx::OnnxEmbedder};
use codeask::ingest::Ingestor;
use codeask::store::VectorStore;

#[derive(Parser)]
#[command(name = "codeask", version, about = "Ask questions about your codebases")]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, default_value = "config.json")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Clone configured repositories, embed their source files, and write
    /// the snapshot. Replaces any prior snapshot wholesale.
    Index,

    /// Answer a question using the indexed snapshot. Reads the question
    /// from stdin when not given on the command line.
    Ask {
        question: Option<String>,

        /// Number of files to retrieve as context.
        #[arg(long)]
        top_k: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = Config::load(&cli.config)?;
    config.validate().context("invalid configuration")?;

    match cli.command {
        Command::Index => index(&config).await,
        Command::Ask { question, top_k } => ask(&config, question, top_k).await,
    }
}

/// Build the shared embedder instance, downloading model files on first run.
async fn load_embedder(config: &Config) -> Result<OnnxEmbedder> {
    let model_dir = Path::new(&config.model.dir);
    download::ensure_model_files(model_dir).await?;
    let embedder = OnnxEmbedder::new(model_dir, config.model.dimensions)
        .context("failed to load embedding model")?;
    Ok(embedder)
}

async fn index(config: &Config) -> Result<()> {
    anyhow::ensure!(
        !config.repositories.is_empty(),
        "no repositories configured; add some to the config file"
    );
    let token = config.github_token()?;

    let embedder = load_embedder(config).await?;
    let report = Ingestor::new(&embedder, config).run(&token)?;

    info!(
        "Ingestion complete: {} embedded, {} failed, {} repositories skipped",
        report.embedded, report.failed, report.repos_failed
    );
    if report.saved {
        println!(
            "Saved {} embeddings to {}",
            report.embedded, config.snapshot_path
        );
    } else {
        println!("No embeddings generated; snapshot unchanged");
    }

    Ok(())
}

async fn ask(config: &Config, question: Option<String>, top_k: Option<usize>) -> Result<()> {
    let api_key = config.openrouter_api_key()?;

    let top_k = top_k.unwrap_or(config.search_top_k);
    anyhow::ensure!(top_k >= 1, "--top-k must be at least 1");

    let question = match question {
        Some(q) => q,
        None => prompt_for_question()?,
    };
    anyhow::ensure!(!question.trim().is_empty(), "question is empty");

    let store = VectorStore::load(Path::new(&config.snapshot_path))
        .context("failed to load snapshot; run `codeask index` first")?;
    anyhow::ensure!(
        !store.is_empty(),
        "snapshot is empty; run `codeask index` first"
    );

    let embedder = load_embedder(config).await?;
    let query_vector = embedder
        .embed(&question)
        .context("failed to embed the question")?;

    let hits = store.search(&query_vector, top_k)?;
    for hit in &hits {
        info!(
            "Retrieved {}:{} (score {:.3})",
            hit.record.repository, hit.record.file_path, hit.score
        );
    }

    let client = ChatClient::new(
        api_key,
        config.chat.base_url.clone(),
        config.chat.model.clone(),
    )?;
    let answer = client.ask(&question, &hits).await?;

    println!("{answer}");
    Ok(())
}

fn prompt_for_question() -> Result<String> {
    print!("Ask your code: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("failed to read question from stdin")?;
    Ok(line.trim().to_string())
}
