//! casuist: run the precedent reasoning pipeline from the command line
//!
//! Loads a dilemma and a precedent collection (JSON or YAML, chosen by file
//! extension), runs the pipeline and prints the outcome as JSON.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use tracing::info;

use casebase::{Dilemma, FrameworkRegistry, PrecedentStore, TracingAuditSink};
use casuist_engine::{EngineConfig, PipelineOptions, ReasoningPipeline};

#[derive(Parser)]
#[command(name = "casuist")]
#[command(about = "Precedent-based ethical reasoning")]
struct Cli {
    /// Log level for casuist crates; defaults to general.log_level from the config
    #[arg(long, env = "CASUIST_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reason about a dilemma using a precedent collection
    Run {
        /// Dilemma file (.json, .yaml or .yml)
        #[arg(long)]
        dilemma: PathBuf,

        /// Precedent collection file (.json, .yaml or .yml)
        #[arg(long)]
        precedents: PathBuf,

        /// Resolution strategy (balance, stakeholder, compromise, pluralistic, fallback)
        #[arg(long)]
        strategy: Option<String>,

        /// Minimum similarity for a precedent to match
        #[arg(long)]
        threshold: Option<f64>,

        /// Maximum matched precedents to adapt
        #[arg(long)]
        max_results: Option<usize>,

        /// Engine configuration (YAML)
        #[arg(short, long, env = "CASUIST_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Show how framework names resolve
    Frameworks {
        /// Framework names to resolve
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[derive(Clone, Copy)]
enum Format {
    Json,
    Yaml,
}

fn format_of(path: &Path) -> Format {
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => Format::Yaml,
        _ => Format::Json,
    }
}

fn read(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn parse<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = read(path)?;
    let value = match format_of(path) {
        Format::Yaml => serde_yaml::from_str(&content)?,
        Format::Json => serde_json::from_str(&content)?,
    };
    Ok(value)
}

fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_yaml(&read(path)?)
            .with_context(|| format!("Invalid config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

/// The flag wins over the config file.
fn log_level(flag: Option<&str>, config: &EngineConfig) -> String {
    flag.unwrap_or(config.general.log_level.as_str()).trim().to_lowercase()
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("casuist={}", level).parse()?)
                .add_directive(format!("casebase={}", level).parse()?),
        )
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.command {
        Command::Run { config, .. } => load_config(config.as_deref())?,
        Command::Frameworks { .. } => EngineConfig::default(),
    };
    init_tracing(&log_level(cli.log_level.as_deref(), &config))?;

    match cli.command {
        Command::Run {
            dilemma,
            precedents,
            strategy,
            threshold,
            max_results,
            ..
        } => {

            let mut registry = FrameworkRegistry::builder().with_defaults();
            if config.general.audit_enabled {
                registry = registry.audit_sink(Arc::new(TracingAuditSink));
            }
            let registry = Arc::new(registry.build());

            let dilemma: Dilemma = parse(&dilemma)?;

            let store = PrecedentStore::with_max_precedents(config.search.max_precedents);
            let content = read(&precedents)?;
            match format_of(&precedents) {
                Format::Yaml => store.load_yaml(&content).await?,
                Format::Json => store.load_json(&content).await?,
            };
            info!(dilemma_id = %dilemma.id, precedents = store.count().await, "Inputs loaded");

            let pipeline = ReasoningPipeline::builder(registry).config(config).build()?;
            let options = PipelineOptions {
                similarity_threshold: threshold,
                max_results,
                strategy,
            };

            let outcome = pipeline.run(&dilemma, &store.all().await, &options).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);

            if outcome.is_error() {
                std::process::exit(1);
            }
        }
        Command::Frameworks { names } => {
            let registry = FrameworkRegistry::with_defaults();
            let resolved: Vec<_> = names.iter().map(|name| registry.resolve(name)).collect();
            println!("{}", serde_json::to_string_pretty(&resolved)?);
        }
    }

    Ok(())
}
