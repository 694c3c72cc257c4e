//! CLI entry and dispatch.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use glint_core::{config, interrupt};

mod commands;
mod logging;
mod output;

use output::OutputFormat;

#[derive(Parser)]
#[command(name = "glint")]
#[command(version)]
#[command(about = "Streams assistant replies and renders them as they arrive")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Write logs to a daily rolling file in this directory
    #[arg(long, global = true, value_name = "DIR")]
    log_file: Option<PathBuf>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Sends a prompt and renders the streamed reply
    Stream {
        /// The prompt to send
        #[arg(short, long)]
        prompt: String,

        /// Stream endpoint (overrides GLINT_ENDPOINT and the config file)
        #[arg(long, value_name = "URL")]
        endpoint: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Feeds a recorded event stream through the same pipeline
    Replay {
        /// Recorded stream, or - to read stdin
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Bytes handed to the frame splitter per read
        #[arg(long, value_name = "BYTES", default_value = "64")]
        chunk_size: NonZeroUsize,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // Config commands must work even when the file on disk is broken.
    let config = match cli.command {
        Commands::Config { .. } => config::Config::default(),
        _ => config::Config::load().context("load config")?,
    };
    let _log_guard = logging::init(&config.log, cli.log_file.as_deref())?;

    interrupt::init()?;

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli.command, &config).await })
}

async fn dispatch(command: Commands, config: &config::Config) -> Result<()> {
    match command {
        Commands::Stream {
            prompt,
            endpoint,
            format,
        } => {
            commands::stream::run(commands::stream::StreamOptions {
                prompt: &prompt,
                endpoint: endpoint.as_deref(),
                format,
                config,
            })
            .await
        }

        Commands::Replay {
            file,
            chunk_size,
            format,
        } => {
            commands::replay::run(commands::replay::ReplayOptions {
                file: &file,
                chunk_size,
                format,
                config,
            })
            .await
        }

        Commands::Config { command } => match command {
            ConfigCommands::Path => commands::config::path(),
            ConfigCommands::Init => commands::config::init(),
        },
    }
}
