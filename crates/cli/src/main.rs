//! Handoff CLI: the main entry point.
//!
//! Commands:
//! - `pack`        Build a sealed context package from a transcript
//! - `verify`      Re-check a package's checksum, fingerprint and signature
//! - `fingerprint` Print the transcript fingerprint only
//! - `config`      Show the effective configuration or its path

use clap::{Parser, Subcommand};
use handoff_config::EngineConfig;
use handoff_core::Profile;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "handoff",
    about = "Handoff: offline context compression and integrity for transcripts",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.handoff/config.toml)
    #[arg(long, global = true, env = "HANDOFF_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a sealed context package from a transcript file
    Pack {
        /// Transcript JSON: a message array or {session_id, messages, file_changes}
        #[arg(short, long)]
        input: PathBuf,

        /// digest, ultra or ultra-plus (defaults to the configured profile)
        #[arg(short, long)]
        profile: Option<Profile>,

        /// Write the package here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Embed the raw transcript (Digest only)
        #[arg(long)]
        include_transcript: bool,

        /// Override the session id
        #[arg(long)]
        session: Option<String>,

        /// Sign with the HMAC secret held in this environment variable
        #[arg(long)]
        sign_key_env: Option<String>,

        /// Key id recorded in the signature
        #[arg(long, default_value = "local")]
        key_id: String,

        /// Pretty-print the package
        #[arg(long)]
        pretty: bool,
    },

    /// Verify a package's checksum, and optionally its fingerprint and signature
    Verify {
        /// Package JSON to check
        #[arg(short, long)]
        package: PathBuf,

        /// Transcript to check the fingerprint against
        #[arg(short, long)]
        transcript: Option<PathBuf>,

        /// Check the signature with the HMAC secret in this environment variable
        #[arg(long)]
        sign_key_env: Option<String>,
    },

    /// Print the transcript fingerprint
    Fingerprint {
        /// Transcript JSON
        #[arg(short, long)]
        input: PathBuf,

        /// Messages per chunk (defaults to the size-tier value)
        #[arg(long)]
        chunk_size: Option<usize>,
    },

    /// Show configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the built-in defaults as TOML
    Defaults,
    /// Print the config file path
    Path,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::load_from(path)?,
        None => EngineConfig::load()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean for JSON output
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Pack {
            input,
            profile,
            output,
            include_transcript,
            session,
            sign_key_env,
            key_id,
            pretty,
        } => {
            let config = load_config(cli.config.as_ref())?;
            commands::pack::run(
                config,
                commands::pack::PackArgs {
                    input,
                    profile,
                    output,
                    include_transcript,
                    session,
                    sign_key_env,
                    key_id,
                    pretty,
                },
            )
            .await?
        }
        Commands::Verify {
            package,
            transcript,
            sign_key_env,
        } => commands::verify::run(&package, transcript.as_deref(), sign_key_env.as_deref())?,
        Commands::Fingerprint { input, chunk_size } => {
            let config = load_config(cli.config.as_ref())?;
            commands::fingerprint::run(&config, &input, chunk_size).await?
        }
        Commands::Config { action } => match action.unwrap_or(ConfigAction::Show) {
            ConfigAction::Show => {
                commands::config_cmd::show(&load_config(cli.config.as_ref())?)?
            }
            ConfigAction::Defaults => commands::config_cmd::defaults(),
            ConfigAction::Path => commands::config_cmd::path(cli.config.as_deref()),
        },
    }

    Ok(())
}
