//! # Prose Harness CLI (`prose`)
//!
//! ## Usage
//!
//! ```bash
//! prose --config ./config/prose.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `prose init` | Create the SQLite database and run schema migrations |
//! | `prose ingest <path>...` | Index reference documents from files or directories |
//! | `prose check "<text>"` | Split text into sentences and list detected issues |
//! | `prose suggest "<sentence>"` | Run the suggestion cascade for one sentence |
//!
//! ## Examples
//!
//! ```bash
//! prose init
//! prose ingest ./docs/style --doc-type technical
//! prose check "The config was loaded by the server. It is very fast."
//! prose suggest "The config was loaded by the server." --issue passive-voice --json
//! prose suggest "It runs very quickly." --goal conciseness --goal clarity
//! ```

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

use prose_harness::config::{self, Config};
use prose_harness::connector_fs::scan_directory;
use prose_harness::detect::{detect, detect_all};
use prose_harness::llm::create_client;
use prose_harness::models::{AdjacentContext, DocumentType, Issue, IssueKind, SuggestionRequest, WritingGoal};
use prose_harness::{logger, migrate, ProseHarness};

/// Prose Harness CLI: writing-quality checks with grounded rewrite suggestions.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file means built-in defaults.
#[derive(Parser)]
#[command(
    name = "prose",
    about = "Prose Harness: writing-quality checks with grounded rewrite suggestions",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/prose.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run more than once.
    Init,

    /// Ingest reference documents into the knowledge base.
    ///
    /// Directories are walked using `[ingest]` include and exclude globs.
    /// Chunks whose content is already indexed are skipped.
    Ingest {
        /// Files or directories to ingest.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Document type recorded on every ingested chunk.
        #[arg(long, default_value = "general")]
        doc_type: DocumentType,
    },

    /// Detect writing issues in a block of text.
    Check {
        /// The text to check.
        text: String,
    },

    /// Suggest a rewrite for one sentence.
    ///
    /// Without `--issue`, the first issue the detector finds is used.
    Suggest {
        /// The sentence to improve.
        sentence: String,

        /// Issue kind, e.g. `passive-voice`, `long-sentence`, `adverb`.
        #[arg(long)]
        issue: Option<IssueKind>,

        /// The sentence before this one, for context.
        #[arg(long)]
        prev: Option<String>,

        /// The sentence after this one, for context.
        #[arg(long)]
        next: Option<String>,

        /// Kind of document the sentence belongs to.
        #[arg(long, default_value = "general")]
        doc_type: DocumentType,

        /// Writing goal passed to the model. Repeat for several.
        #[arg(long = "goal", value_enum)]
        goals: Vec<WritingGoal>,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_or_default(&cli.config)?;
    logger::init(&cfg.logging.level)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { paths, doc_type } => {
            run_ingest(&cfg, &paths, doc_type).await?;
        }
        Commands::Check { text } => {
            run_check(&cfg, &text)?;
        }
        Commands::Suggest {
            sentence,
            issue,
            prev,
            next,
            doc_type,
            goals,
            json,
        } => {
            let context = AdjacentContext::new(prev.as_deref(), next.as_deref());
            let options = SuggestOptions { doc_type, goals, json };
            run_suggest(&cfg, &sentence, issue, context, options).await?;
        }
    }

    Ok(())
}

async fn run_ingest(cfg: &Config, paths: &[PathBuf], doc_type: DocumentType) -> Result<()> {
    let mut documents = Vec::new();
    for path in paths {
        documents.extend(scan_directory(path, &cfg.ingest, doc_type)?);
    }
    if documents.is_empty() {
        bail!("No ingestible files found");
    }

    let harness = ProseHarness::open(cfg).await?;
    let report = harness.ingest_all(&documents).await?;

    println!("documents: {}", documents.len());
    println!("chunks created: {}", report.chunks_created);
    println!("chunks skipped: {}", report.chunks_skipped);
    Ok(())
}

fn run_check(cfg: &Config, text: &str) -> Result<()> {
    let harness = ProseHarness::offline(cfg, create_client(&cfg.generation)?)?;
    let issues = harness.check(text);
    if issues.is_empty() {
        println!("No issues found.");
        return Ok(());
    }

    for issue in &issues {
        println!(
            "{:<14} {:>4}..{:<4} {:?}",
            issue.kind.as_str(),
            issue.span.start,
            issue.span.end,
            issue.matched_text
        );
        println!("    {}", issue.sentence_text);
    }
    println!();
    println!("{} issue(s)", issues.len());
    Ok(())
}

struct SuggestOptions {
    doc_type: DocumentType,
    goals: Vec<WritingGoal>,
    json: bool,
}

async fn run_suggest(
    cfg: &Config,
    sentence: &str,
    kind: Option<IssueKind>,
    context: AdjacentContext,
    options: SuggestOptions,
) -> Result<()> {
    let Some(issue) = pick_issue(sentence, kind, &context) else {
        println!("No issues found.");
        return Ok(());
    };

    // Reuse the knowledge base only if it was initialized; otherwise run
    // the cascade against an unbuilt index.
    let harness = if cfg.db.path.exists() {
        ProseHarness::open(cfg).await?
    } else {
        ProseHarness::offline(cfg, create_client(&cfg.generation)?)?
    };

    let request = SuggestionRequest::new(issue)
        .with_document_type(options.doc_type)
        .with_goals(options.goals);
    let result = harness.suggest(&request).await;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("Suggestion: {}", result.suggestion());
    if !result.explanation().is_empty() {
        println!("Why:        {}", result.explanation());
    }
    println!("Method:     {} ({} confidence)", result.method(), result.confidence());
    if !result.sources().is_empty() {
        println!("Sources:    {}", result.sources().join(", "));
    }
    Ok(())
}

/// The requested kind's first match, or the whole sentence under that kind
/// when the detector disagrees. Without a kind, the first detected issue.
fn pick_issue(sentence: &str, kind: Option<IssueKind>, context: &AdjacentContext) -> Option<Issue> {
    let issue = match kind {
        Some(kind) => detect(kind, sentence)
            .into_iter()
            .next()
            .or_else(|| Some(Issue::whole_sentence(kind, sentence))),
        None => detect_all(sentence, context).into_iter().next(),
    }?;
    Some(issue.with_context(context.clone()))
}
