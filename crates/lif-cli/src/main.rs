//! LIF CLI - Run annotation producers over LIF containers
//!
//! Usage:
//!   lif ner --gazetteer people.toml < input.json
//!   lif parse --treebank wsj.mrg --input input.json --output parsed.json
//!   lif validate --input parsed.json
//!
//! Containers are read from stdin and written to stdout unless files are given.
//! Logs go to stderr.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing_subscriber::EnvFilter;

use lif_core::{AppConfig, Container, LoggingConfig, Producer};
use lif_extractor::{
    GazetteerNameFinder, ModelRegistry, NamedEntityRecognizer, SyntacticParser, TreebankParser,
};

#[derive(Parser)]
#[command(name = "lif")]
#[command(about = "Annotate LIF containers with named entities and parse trees")]
#[command(version)]
struct Cli {
    /// TOML configuration file; LIF_* environment variables take precedence
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a named entity view
    Ner {
        /// Gazetteer model file, repeatable; models run in the given order
        #[arg(long = "gazetteer")]
        gazetteers: Vec<PathBuf>,

        #[command(flatten)]
        io: IoArgs,
    },
    /// Add a phrase structure view
    Parse {
        /// Treebank file with one bracketed tree per line
        #[arg(long)]
        treebank: Option<PathBuf>,

        #[command(flatten)]
        io: IoArgs,
    },
    /// Check every view of a container
    Validate {
        /// Input container (default: stdin)
        #[arg(long)]
        input: Option<PathBuf>,
    },
}

#[derive(Args)]
struct IoArgs {
    /// Input container (default: stdin)
    #[arg(long)]
    input: Option<PathBuf>,

    /// Output container (default: stdout)
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Ner { gazetteers, io } => run_ner(&config, gazetteers, &io).await,
        Commands::Parse { treebank, io } => run_parse(&config, treebank, &io).await,
        Commands::Validate { input } => run_validate(input.as_deref()).await,
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if logging.json_format {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

// ============================================================================
// Commands
// ============================================================================

async fn run_ner(config: &AppConfig, gazetteers: Vec<PathBuf>, io: &IoArgs) -> Result<()> {
    let paths = if gazetteers.is_empty() {
        config.ner.gazetteers.clone()
    } else {
        gazetteers
    };
    if paths.is_empty() {
        anyhow::bail!("no gazetteer given; pass --gazetteer or set LIF_GAZETTEERS");
    }

    let mut models = ModelRegistry::builder();
    for path in &paths {
        let gazetteer = GazetteerNameFinder::from_file(path)
            .with_context(|| format!("loading gazetteer {}", path.display()))?;
        models = models.with_name_finder(gazetteer);
    }

    let producer = NamedEntityRecognizer::new(models.build())?;
    run_producer(producer, io).await
}

async fn run_parse(config: &AppConfig, treebank: Option<PathBuf>, io: &IoArgs) -> Result<()> {
    let path = treebank
        .or_else(|| config.parser.treebank.clone())
        .context("no treebank given; pass --treebank or set LIF_TREEBANK")?;

    let parser = TreebankParser::from_file(&path)
        .with_context(|| format!("loading treebank {}", path.display()))?;

    let producer = SyntacticParser::new(ModelRegistry::builder().with_parser(parser).build())?;
    run_producer(producer, io).await
}

async fn run_validate(input: Option<&Path>) -> Result<()> {
    let container = Container::from_json(&read_input(input).await?)?;
    container.validate()?;

    let annotations: usize = container.views().iter().map(|v| v.len()).sum();
    tracing::info!(views = container.views().len(), annotations, "Container is valid");
    println!(
        "valid: {} views, {} annotations",
        container.views().len(),
        annotations
    );
    Ok(())
}

/// Read, annotate on a blocking worker, write
async fn run_producer<P>(producer: P, io: &IoArgs) -> Result<()>
where
    P: Producer + 'static,
{
    let mut container = Container::from_json(&read_input(io.input.as_deref()).await?)?;

    let container = tokio::task::spawn_blocking(move || -> lif_core::Result<Container> {
        let view = producer.produce(&mut container)?;
        tracing::info!(view = %view.id, annotations = view.len(), "View appended");
        Ok(container)
    })
    .await??;

    write_output(io.output.as_deref(), &container.to_json_pretty()?).await
}

async fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display())),
        None => {
            let mut buffer = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buffer)
                .await
                .context("reading stdin")?;
            Ok(buffer)
        }
    }
}

async fn write_output(path: Option<&Path>, json: &str) -> Result<()> {
    match path {
        Some(path) => tokio::fs::write(path, format!("{json}\n"))
            .await
            .with_context(|| format!("writing {}", path.display())),
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(json.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
            Ok(())
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
