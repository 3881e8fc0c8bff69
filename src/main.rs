//! kickoff-assistant CLI entry point

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use kickoff_assistant::{
    assistant::Assistant,
    config::Config,
    error::Error,
    index::IndexStats,
    progress::LogWriterFactory,
    repl::run_repl,
    server::{serve, AppState},
    session::SessionLimits,
};
use std::io::IsTerminal;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "kickoff-assistant")]
#[command(version, about = "Question answering over the Kickoff documentation", long_about = None)]
struct Cli {
    /// Path to config file (defaults to ./kickoff.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat in the terminal (default)
    Chat,

    /// Serve the HTTP API
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to bind
        #[arg(short, long)]
        port: Option<u16>,

        /// Log output format
        #[arg(long, value_enum, default_value_t = LogFormat::Text)]
        log_format: LogFormat,
    },

    /// Build or refresh the vector index and exit
    Index {
        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a config file with the default settings
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_format = match &cli.command {
        Some(Commands::Serve { log_format, .. }) => *log_format,
        _ => LogFormat::Text,
    };
    init_logging(cli.verbose, log_format);

    if let Some(Commands::Completions { shell }) = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "kickoff-assistant", &mut std::io::stdout());
        return Ok(());
    }

    if let Some(Commands::Init { force }) = cli.command {
        let path = cli.config.unwrap_or_else(Config::default_config_path);
        Config::init_file(&path, force)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    if let Ok(path) = dotenvy::dotenv() {
        info!("Loaded environment from {}", path.display());
    }

    let config = Config::resolve(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let assistant = Assistant::bootstrap(&config)
                .await
                .context("Failed to start the assistant")?;
            let engine = assistant.engine();
            run_repl(
                engine.as_ref(),
                BufReader::new(tokio::io::stdin()),
                tokio::io::stdout(),
            )
            .await?;
        }

        Commands::Serve { host, port, .. } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let addr: SocketAddr = format!("{}:{}", host, port)
                .parse()
                .map_err(|e| Error::Config(format!("Invalid bind address {}:{}: {}", host, port, e)))?;

            let assistant = Assistant::bootstrap(&config)
                .await
                .context("Failed to start the assistant")?;
            let state = AppState::new(assistant.engine(), SessionLimits::from_config(&config));
            serve(addr, state).await?;
        }

        Commands::Index { json } => {
            let stats = Assistant::build_index(&config, !json)
                .await
                .context("Failed to build the index")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_index_stats(&stats);
            }
        }

        Commands::Completions { .. } | Commands::Init { .. } => {}
    }

    Ok(())
}

fn init_logging(verbose: bool, format: LogFormat) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        // Progress bars only draw on a terminal; elsewhere log straight to stderr
        LogFormat::Text if std::io::stderr().is_terminal() => registry
            .with(fmt::layer().with_writer(LogWriterFactory::default()))
            .init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

fn print_index_stats(stats: &IndexStats) {
    println!("Collection:          {}", stats.collection);
    println!("Documents loaded:    {}", stats.documents_loaded);
    println!("Documents embedded:  {}", stats.documents_embedded);
    println!("Documents reused:    {}", stats.documents_reused);
    println!("Documents removed:   {}", stats.documents_removed);
    println!("Chunks embedded:     {}", stats.chunks_embedded);
    println!("Chunks reused:       {}", stats.chunks_reused);
    println!("Chunks deleted:      {}", stats.chunks_deleted);
    println!("Points in store:     {}", stats.points);
}
