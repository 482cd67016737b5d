//! research-collaborator - model-assisted research workflow CLI
//!
//! Every command prints its result as pretty JSON on stdout; logs go to stderr.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use research_collaborator::agents::{
    AlternativesRequest, ComparisonRequest, HypothesisRequest, LiteratureReviewRequest, PolishRequest,
};
use research_collaborator::models::PolishType;
use research_collaborator::progress::ProgressTracker;
use research_collaborator::utils::init_logger;
use research_collaborator::{Config, ResearchAssistant, ResearchStore};

#[derive(Parser, Debug)]
#[command(name = "research-collaborator")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Workspace directory (overrides RESEARCH_WORKSPACE_DIR)
    #[arg(short, long, global = true)]
    workspace: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    // === Workspace inputs ===
    /// Set the research question
    Question { text: String },

    /// Add citations to the workspace
    Cite {
        #[arg(required = true)]
        citations: Vec<String>,
    },

    /// Add research notes to the workspace
    Note {
        #[arg(required = true)]
        notes: Vec<String>,
    },

    // === Literature ===
    /// Review the stored and given sources
    Review {
        #[arg(short, long)]
        question: Option<String>,

        /// Citation to add (repeatable)
        #[arg(short, long = "citation")]
        citations: Vec<String>,

        /// Note to add (repeatable)
        #[arg(short, long = "note")]
        notes: Vec<String>,
    },

    /// Grade citation quality (defaults to the stored citations)
    Sources { citations: Vec<String> },

    // === Hypotheses ===
    /// Score a hypothesis against the seven-criterion rubric
    Validate {
        hypothesis: String,

        #[arg(short, long)]
        question: Option<String>,
    },

    /// Propose alternative hypotheses
    Alternatives {
        #[arg(short, long)]
        question: Option<String>,

        #[arg(short, long)]
        context: Option<String>,

        #[arg(short = 'n', long)]
        count: Option<usize>,
    },

    // === Drafts ===
    /// Polish draft text
    Polish {
        /// Draft text (or use --file)
        text: Option<String>,

        #[arg(short, long)]
        file: Option<PathBuf>,

        /// comprehensive, grammar, structure, clarity or citations
        #[arg(short = 't', long = "type", default_value = "comprehensive")]
        polish_type: String,

        #[arg(short, long)]
        audience: Option<String>,
    },

    /// Compare a revised text with an earlier version (defaults to the latest draft)
    Compare {
        /// Revised text (or use --file)
        text: Option<String>,

        #[arg(short, long)]
        file: Option<PathBuf>,

        #[arg(short, long)]
        original: Option<String>,
    },

    // === Workspace state ===
    /// Print the full research state
    State,

    /// Print phase completion
    Progress,

    /// Export the workspace with a progress summary
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Clear the workspace
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logger();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(dir) = cli.workspace {
        config.workspace.dir = dir;
    }

    match cli.command {
        Commands::Question { text } => print_json(&open_store(&config).await?.set_question(&text).await?),
        Commands::Cite { citations } => print_json(&open_store(&config).await?.add_citations(citations).await?),
        Commands::Note { notes } => print_json(&open_store(&config).await?.add_notes(notes).await?),
        Commands::Review { question, citations, notes } => {
            let assistant = ResearchAssistant::from_config(&config).await?;
            let review = assistant
                .conduct_literature_review(LiteratureReviewRequest { question, citations, notes })
                .await?;
            print_json(&review)
        }
        Commands::Sources { citations } => {
            let assistant = ResearchAssistant::from_config(&config).await?;
            print_json(&assistant.analyze_source_quality(citations).await?)
        }
        Commands::Validate { hypothesis, question } => {
            let assistant = ResearchAssistant::from_config(&config).await?;
            print_json(&assistant.validate_hypothesis(HypothesisRequest { hypothesis, question }).await?)
        }
        Commands::Alternatives { question, context, count } => {
            let assistant = ResearchAssistant::from_config(&config).await?;
            let alternatives = assistant
                .generate_alternatives(AlternativesRequest { question, context, count })
                .await?;
            print_json(&alternatives)
        }
        Commands::Polish { text, file, polish_type, audience } => {
            let polish_type: PolishType = polish_type.parse()?;
            let text = read_text(text, file).await?;
            let assistant = ResearchAssistant::from_config(&config).await?;
            let draft = assistant
                .polish_draft(PolishRequest {
                    text,
                    polish_type,
                    target_audience: audience,
                })
                .await?;
            print_json(&draft)
        }
        Commands::Compare { text, file, original } => {
            let revised_text = read_text(text, file).await?;
            let assistant = ResearchAssistant::from_config(&config).await?;
            let comparison = assistant
                .compare_drafts(ComparisonRequest {
                    revised_text,
                    original_text: original,
                })
                .await?;
            print_json(&comparison)
        }
        Commands::State => print_json(&open_store(&config).await?.get().await),
        Commands::Progress => print_json(&ProgressTracker::report(&open_store(&config).await?.get().await)),
        Commands::Export { output } => {
            let export = open_store(&config).await?.export().await;
            match output {
                Some(path) => {
                    let json = serde_json::to_string_pretty(&export)?;
                    tokio::fs::write(&path, json)
                        .await
                        .with_context(|| format!("Failed to write export to {}", path.display()))?;
                    info!(path = %path.display(), "Workspace exported");
                    Ok(())
                }
                None => print_json(&export),
            }
        }
        Commands::Reset { yes } => {
            if !yes {
                bail!("refusing to reset without --yes");
            }
            print_json(&open_store(&config).await?.reset().await?)
        }
    }
}

async fn open_store(config: &Config) -> Result<ResearchStore> {
    ResearchStore::open(&config.workspace.dir)
        .await
        .with_context(|| format!("Failed to open workspace {}", config.workspace.dir.display()))
}

async fn read_text(text: Option<String>, file: Option<PathBuf>) -> Result<String> {
    match (text, file) {
        (Some(text), None) => Ok(text),
        (None, Some(path)) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display())),
        (Some(_), Some(_)) => bail!("pass the text or --file, not both"),
        (None, None) => bail!("no text given; pass it as an argument or with --file"),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
