//! Parley CLI - talk to characters and fetch their profiles

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;

use parley_core::prelude::*;

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Turn-based conversations with fictional characters", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true, env = "PARLEY_CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a conversation with a character
    Chat {
        /// Character identifier (profile file name without extension)
        character: String,

        /// Classifier strategy (lexical or linguistic)
        #[arg(short, long)]
        strategy: Option<ClassifierStrategy>,

        /// Print the session summary as JSON on exit
        #[arg(long)]
        summary: bool,
    },
    /// Fetch a character from the catalog and save its profile
    Fetch {
        /// Character name; prompted for when omitted
        name: Option<String>,
    },
    /// Print the effective configuration
    Config,
    /// Version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr (filtered by RUST_LOG) so the conversation on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Chat {
            character,
            strategy,
            summary,
        } => {
            let mut config = load_config(cli.config)?;
            if let Some(strategy) = strategy {
                config.classifier.strategy = strategy;
            }
            chat(config, character, summary).await?;
        }
        Commands::Fetch { name } => {
            let config = load_config(cli.config)?;
            fetch(&config, name).await?;
        }
        Commands::Config => {
            let config = load_config(cli.config)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Version => {
            println!("parley {}", env!("CARGO_PKG_VERSION"));
            println!("parley-core {}", parley_core::VERSION);
        }
    }

    Ok(())
}

fn load_config(path: Option<PathBuf>) -> Result<ParleyConfig> {
    ParleyConfig::load_with(path.as_deref()).context("Failed to load configuration")
}

async fn chat(config: ParleyConfig, character: String, print_summary: bool) -> Result<()> {
    // The turn loop blocks on stdin
    let outcome = tokio::task::spawn_blocking(move || -> parley_core::error::Result<SessionSummary> {
        let mut session = SessionBuilder::from_config(&config)?.start(&character)?;
        let stdin = std::io::stdin();
        session.run(stdin.lock(), std::io::stdout())
    })
    .await
    .context("Conversation task failed")?;

    let summary = match outcome {
        Ok(summary) => summary,
        Err(e) if e.is_fatal() => anyhow::bail!(start_failure(&e)),
        Err(e) => return Err(e).context("Conversation failed"),
    };

    tracing::info!(
        session = %summary.session_id,
        turns = summary.turns,
        persisted = summary.persisted,
        "Conversation finished"
    );

    if print_summary {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    if !summary.persisted {
        anyhow::bail!(
            "relationship state for '{}' was not saved",
            summary.character_id
        );
    }
    Ok(())
}

/// User-facing message for an error that stops a conversation from starting
fn start_failure(err: &ParleyError) -> String {
    match err {
        ParleyError::ProfileNotFound(id) => format!(
            "No profile for '{id}'. Run `parley fetch` to download one, or add {id}.json to the characters directory."
        ),
        ParleyError::Configuration(_) => {
            format!("{err}. Check `parley config` for the effective settings.")
        }
        _ => err.to_string(),
    }
}

async fn fetch(config: &ParleyConfig, name: Option<String>) -> Result<()> {
    let name = match name {
        Some(name) => name,
        None => prompt("Enter character name: ")?,
    };
    let name = name.trim();
    if name.is_empty() {
        println!("No name provided.");
        return Ok(());
    }

    let catalog = ComicVineCatalog::from_env(&config.catalog)?;
    match catalog.find(name).await? {
        Some(profile) => {
            let path = JsonProfileDirectory::new(&config.storage.characters_dir)
                .save(name, &profile)
                .with_context(|| format!("Failed to save profile for {name}"))?;
            println!("Saved character to {}", path.display());
        }
        None => println!("No character found matching that name."),
    }
    Ok(())
}

fn prompt(message: &str) -> Result<String> {
    let mut stdout = std::io::stdout();
    write!(stdout, "{message}")?;
    stdout.flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}
