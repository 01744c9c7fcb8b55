//! Terminal client: ask one question about one document
//!
//! Run with: cargo run -p agentic-rag --features cli --bin agentic-rag -- ask --file notes.pdf --question "..."

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use agentic_rag::config::RagConfig;
use agentic_rag::generation::LlmResponseAgent;
use agentic_rag::ingestion::IngestionAgent;
use agentic_rag::providers::gemini::gemini_providers;
use agentic_rag::retrieval::RetrievalAgent;
use agentic_rag::CoordinatorAgent;
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Ask questions about a document from the terminal
#[derive(Parser, Debug)]
#[command(name = "agentic-rag", version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Answer a question from a document
    Ask {
        /// Document to answer from (pdf, docx, csv, txt, pptx)
        #[arg(short, long)]
        file: PathBuf,

        /// The question
        #[arg(short, long)]
        question: String,

        /// Print the source chunks under the answer
        #[arg(long)]
        sources: bool,
    },
    /// Print the chunks a document splits into, without calling the API
    Chunks {
        /// Document to split
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "agentic_rag=debug"
    } else {
        "agentic_rag=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = RagConfig::load(args.config.as_deref())?;

    match args.command {
        Command::Ask {
            file,
            question,
            sources,
        } => ask(&config, file, &question, sources).await,
        Command::Chunks { file } => chunks(&config, file).await,
    }
}

async fn ask(config: &RagConfig, file: PathBuf, question: &str, show_sources: bool) -> anyhow::Result<()> {
    let (embedder, llm) = gemini_providers(&config.gemini)?;
    let retrieval = RetrievalAgent::new(embedder, &config.retrieval)?;
    let coordinator = CoordinatorAgent::new(
        IngestionAgent::new(&config.chunking),
        Arc::new(retrieval),
        LlmResponseAgent::new(llm),
    );

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Thinking...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = coordinator.handle_file_and_query(&file, question).await;
    spinner.finish_and_clear();

    let (answer, sources) = result?;

    println!("{} {}", style("Q:").bold().cyan(), question);
    println!("{} {}", style("A:").bold().green(), answer);

    if show_sources {
        println!();
        for (i, chunk) in sources.iter().enumerate() {
            let score = chunk.score.map(|s| format!(" {:.3}", s)).unwrap_or_default();
            println!(
                "{}{}",
                style(format!("[{}] {}", i + 1, chunk.metadata.format_location())).dim(),
                style(score).dim()
            );
            println!("{}\n", chunk.preview(200));
        }
    }

    Ok(())
}

async fn chunks(config: &RagConfig, file: PathBuf) -> anyhow::Result<()> {
    let ingestion = IngestionAgent::new(&config.chunking);
    let msg = ingestion.parse_and_split(&file, None).await?;

    println!(
        "{} {} chunks (trace {})",
        style(file.display()).bold(),
        msg.payload.documents.len(),
        msg.trace_id
    );
    for chunk in &msg.payload.documents {
        println!(
            "\n{} {}",
            style(format!("#{}", chunk.chunk_index)).cyan(),
            style(chunk.metadata.format_location()).dim()
        );
        println!("{}", chunk.content);
    }

    Ok(())
}
