//! # askdocs CLI (`ask`)
//!
//! The `ask` binary is the primary interface for askdocs. It provides
//! commands for database initialization, index builds, retrieval previews,
//! one-shot grounded answers, and an interactive chat session.
//!
//! ## Usage
//!
//! ```bash
//! ask --config ./config/ask.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ask init` | Create the SQLite database and run schema migrations |
//! | `ask build` | Chunk, embed, and persist the corpus index |
//! | `ask search "<query>"` | Retrieval-only preview with distances |
//! | `ask query "<question>"` | Answer one question with citations |
//! | `ask chat` | Interactive session with conversation memory |
//! | `ask suggest` | Print starter questions |
//! | `ask stats` | Show index statistics |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use askdocs::config;
use askdocs::db;
use askdocs::engine::Engine;
use askdocs::error::QueryError;
use askdocs::ingest;
use askdocs::memory::ConversationMemory;
use askdocs::migrate;
use askdocs::models::{Answer, ConversationTurn};
use askdocs::stats;
use askdocs::suggest;

/// askdocs CLI — a retrieval-grounded question answering engine for scraped
/// documentation.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/ask.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "ask",
    about = "askdocs — retrieval-grounded question answering over scraped documentation",
    version,
    long_about = "askdocs indexes a scraped documentation corpus by embedding similarity and \
    answers natural-language questions with citation-traceable context, a retrieval-derived \
    confidence signal, and a pre-retrieval query guardrail."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/ask.toml`. Corpus, database, chunking,
    /// retrieval, and provider settings are read from this file.
    #[arg(long, global = true, default_value = "./config/ask.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables
    /// (chunks, chunk_vectors, index_meta). Idempotent.
    Init,

    /// Build the index from the corpus file.
    ///
    /// Loads the crawler's JSON output, chunks and embeds every document,
    /// and persists the result. Skipped when the stored fingerprint
    /// (corpus + chunking config + embedding model) is unchanged.
    Build {
        /// Ignore the stored fingerprint and rebuild from scratch.
        #[arg(long)]
        full: bool,
    },

    /// Retrieval-only preview: show the chunks a question would be
    /// grounded on, with distances. No language-model call is made.
    Search {
        /// The search query string.
        query: String,

        /// Number of results to return (clamped to 1..=20).
        #[arg(long)]
        k: Option<usize>,
    },

    /// Answer a single question with retrieved grounding.
    Query {
        /// The question to answer.
        question: String,

        /// Print the full structured answer as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Interactive chat session with rolling conversation memory.
    ///
    /// Type a question per line. `:clear` resets the memory window,
    /// `:quit` (or EOF) ends the session.
    Chat,

    /// Print starter questions.
    Suggest {
        /// Category: values, engineering, product, or people.
        #[arg(long)]
        category: Option<String>,

        /// Number of suggestions when sampling randomly.
        #[arg(short, default_value = "4")]
        n: usize,
    },

    /// Show index statistics.
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    // Suggestions are static; no config needed
    if let Commands::Suggest { category, n } = &cli.command {
        let questions = match category {
            Some(c) => suggest::category_questions(c),
            None => suggest::starter_questions(*n),
        };
        println!("Try asking:");
        for q in questions {
            println!("  - {}", q);
        }
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Build { full } => {
            ingest::run_build(&cfg, full).await?;
        }
        Commands::Search { query, k } => {
            let engine = Engine::open(&cfg).await?;
            let results = engine.preview(&query, k).await?;
            if results.is_empty() {
                println!("No results.");
                return Ok(());
            }
            for result in &results {
                println!(
                    "{}. [{:.4}] {} / {}",
                    result.rank + 1,
                    result.distance,
                    result.chunk.section_title,
                    result.chunk.source_url
                );
                println!(
                    "    excerpt: \"{}\"",
                    excerpt(&result.chunk.content).replace('\n', " ")
                );
                println!(
                    "    span: chars {}..{}",
                    result.chunk.start_char, result.chunk.end_char
                );
                println!();
            }
        }
        Commands::Query { question, json } => {
            let engine = Engine::open(&cfg).await?;
            match engine.answer_query(&question, &[]).await {
                Ok(answer) if json => {
                    println!("{}", serde_json::to_string_pretty(&answer)?);
                }
                Ok(answer) => print_answer(&answer),
                Err(e) => print_query_error(&e),
            }
        }
        Commands::Chat => {
            let engine = Engine::open(&cfg).await?;
            run_chat(&engine, cfg.memory.window).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Suggest { .. } => unreachable!(),
    }

    Ok(())
}

/// Interactive read-answer loop holding the session's memory window.
async fn run_chat(engine: &Engine, memory_window: usize) -> Result<()> {
    let mut memory = ConversationMemory::new(memory_window);
    let stdin = std::io::stdin();

    println!("askdocs chat. Type a question, `:clear` to reset memory, `:quit` to exit.");

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let input = line.trim();

        match input {
            "" => continue,
            ":quit" | ":exit" => break,
            ":clear" => {
                memory.clear();
                println!("(memory cleared)");
                continue;
            }
            _ => {}
        }

        let history = memory.recent(memory.capacity());
        match engine.answer_query(input, &history).await {
            Ok(answer) => {
                print_answer(&answer);
                if !answer.blocked {
                    memory.append(ConversationTurn::new(input, answer.response.clone()));
                }
            }
            Err(e) => print_query_error(&e),
        }
    }

    Ok(())
}

fn print_answer(answer: &Answer) {
    if answer.blocked {
        let reason = answer.block_reason.as_deref().unwrap_or("query not allowed");
        println!("This question can't be answered here ({}).", reason);
        println!("Only questions about the indexed documentation are supported.");
        return;
    }

    println!("{}", answer.response);
    println!();
    println!("confidence: {}", answer.confidence);

    if answer.sources.is_empty() {
        println!("sources: none (answer is not grounded in the corpus)");
    } else {
        println!("sources:");
        for (i, source) in answer.sources.iter().enumerate() {
            println!(
                "  [{}] {} — {} (distance {:.4})",
                i + 1,
                source.section_title,
                source.source_url,
                source.distance
            );
        }
    }
}

fn print_query_error(err: &QueryError) {
    match err {
        QueryError::Provider(msg) => {
            eprintln!("Couldn't get an answer right now (provider failure): {}", msg);
            eprintln!("This is temporary; please try again.");
        }
        other => eprintln!("Error: {}", other),
    }
}

fn excerpt(text: &str) -> String {
    const MAX: usize = 160;
    if text.len() <= MAX {
        return text.to_string();
    }
    let mut end = MAX;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
