//! courier-track: entry point.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use courier_track::Tracker;
use courier_track_server::config::{load_registry, resolve_couriers_path, ServerConfig};
use courier_track_server::transport::HttpTransport;

#[derive(Parser)]
#[command(
    name = "courier-track",
    about = "Track shipments across Indian courier services through one JSON API",
    version
)]
struct Cli {
    /// Courier table (TOML). Also reads COURIER_TRACK_COURIERS; defaults to the built-in table.
    #[arg(long, global = true)]
    couriers: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(flatten)]
    server: ServerConfig,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default).
    Serve,

    /// Resolve one tracking number and print the result as JSON.
    Track {
        /// Courier id, e.g. indiapost.
        courier: String,

        /// Tracking number.
        number: String,
    },

    /// List the configured couriers.
    Couriers,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   courier-track completions bash > ~/.local/share/bash-completion/completions/courier-track
    ///   courier-track completions zsh > ~/.zfunc/_courier-track
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

fn init_tracing(level: &str, format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    match format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format);

    let couriers_path = resolve_couriers_path(cli.couriers.as_deref());

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let registry = load_registry(couriers_path.as_deref())?;
            tracing::info!("courier-track server ({} couriers)", registry.len());
            let tracker = Tracker::new(Arc::new(registry));
            let transport = HttpTransport::new(tracker, cli.server);
            transport.run().await?;
        }

        Commands::Track { courier, number } => {
            let registry = load_registry(couriers_path.as_deref())?;
            let tracker = Tracker::new(Arc::new(registry));
            let result = tracker.track(&courier, &number).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.is_success() {
                std::process::exit(1);
            }
        }

        Commands::Couriers => {
            let registry = load_registry(couriers_path.as_deref())?;
            for courier in registry.couriers() {
                println!("{:<12} {}", courier.id, courier.name);
            }
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "courier-track", &mut std::io::stdout());
        }
    }

    Ok(())
}
