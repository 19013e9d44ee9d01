//! PrivShare CLI
//!
//! Command-line client for files shared through PrivShare.
//!
//! # Commands
//! - `preview` - Show what a share code points at
//! - `download` - Download (and decrypt) a shared file
//! - `keygen` - Generate short encryption keys
//! - `validate` - Check a share code offline
//! - `config` - Show or edit configuration
//!
//! # Configuration
//! Config file: ~/.privshare/config.toml
//! Record-store credentials: PINATA_JWT, or PINATA_API_KEY + PINATA_API_SECRET

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use privshare_metadata::{PinataStore, RecordStore};
use privshare_transfer::{Downloader, RetrievalCascade};
use std::path::PathBuf;
use std::sync::Arc;

mod commands;
mod config;
mod symbols;

use commands::{download, keygen, preview, validate};

#[derive(Parser)]
#[command(name = "privshare")]
#[command(about = "Encrypted file sharing by share code")]
#[command(version)]
struct Cli {
    /// Pinning API URL (overrides config file)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Pinning gateway URL used to read share records (overrides config file)
    #[arg(long, global = true)]
    record_gateway: Option<String>,

    /// Per-request retrieval timeout in seconds (overrides config file)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show file details for a share code without downloading
    Preview {
        /// Share code or pasted share text
        share_code: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Download a shared file
    Download {
        /// Share code or pasted share text
        share_code: String,

        /// Decryption key (prompted for if the file is encrypted)
        #[arg(short, long, env = "PRIVSHARE_KEY", hide_env_values = true)]
        key: Option<String>,

        /// Output file or directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate short encryption keys
    Keygen {
        /// Number of keys
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,

        /// Also print the derived AES-256 key in hex
        #[arg(long)]
        hex: bool,
    },

    /// Check a share code without contacting the record store
    Validate {
        /// Share code or pasted share text
        share_code: String,
    },

    /// Show or initialize configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Show config file path
    Path,

    /// Initialize config file with defaults
    Init {
        /// Overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., retrieval.gateways, retrieval.timeout_secs)
        key: String,
        /// Value to set (comma-separated for retrieval.gateways)
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Load configuration from ~/.privshare/config.toml; CLI args override it
    let mut cfg = config::load_config();
    if let Some(url) = cli.api_url {
        cfg.record_store.api_url = url;
    }
    if let Some(url) = cli.record_gateway {
        cfg.record_store.gateway_url = url;
    }
    if let Some(secs) = cli.timeout {
        cfg.retrieval.timeout_secs = secs;
    }

    match cli.command {
        Commands::Preview { share_code, json } => {
            let downloader = Downloader::new(record_store(&cfg)?, cascade(&cfg)?);
            let config = preview::PreviewConfig { share_code, json };
            preview::run(&downloader, config).await?;
        }

        Commands::Download {
            share_code,
            key,
            output,
        } => {
            let config = download::DownloadConfig {
                share_code,
                key,
                output,
            };
            download::run(record_store(&cfg)?, cascade(&cfg)?, config).await?;
        }

        Commands::Keygen { count, hex } => {
            keygen::run(count, hex)?;
        }

        Commands::Validate { share_code } => {
            validate::run(&share_code)?;
        }

        Commands::Config { command } => {
            handle_config_command(command, &cfg)?;
        }
    }

    Ok(())
}

fn record_store(cfg: &config::PrivShareConfig) -> Result<Arc<dyn RecordStore>> {
    let store =
        PinataStore::new(cfg.pinata_config()).context("Failed to create record store client")?;
    Ok(Arc::new(store))
}

fn cascade(cfg: &config::PrivShareConfig) -> Result<RetrievalCascade> {
    RetrievalCascade::http(&cfg.retrieval_config()).context("Failed to create retrieval client")
}

/// Handle config subcommands
fn handle_config_command(
    command: Option<ConfigCommands>,
    effective: &config::PrivShareConfig,
) -> Result<()> {
    use console::style;

    match command {
        None | Some(ConfigCommands::Show) => {
            let cfg = effective;
            println!();
            println!("{}", style("PrivShare Configuration").bold().underlined());
            println!();
            println!("{}", style("[record_store]").cyan());
            println!("  api_url = \"{}\"", cfg.record_store.api_url);
            println!("  gateway_url = \"{}\"", cfg.record_store.gateway_url);
            println!();
            println!("{}", style("[retrieval]").cyan());
            println!("  gateways = [");
            for gateway in &cfg.retrieval.gateways {
                println!("    \"{}\",", gateway);
            }
            println!("  ]");
            println!("  timeout_secs = {}", cfg.retrieval.timeout_secs);
            println!();

            let credentials = match (
                std::env::var_os("PINATA_JWT"),
                std::env::var_os("PINATA_API_KEY"),
            ) {
                (Some(_), _) => style("PINATA_JWT").green(),
                (None, Some(_)) => style("PINATA_API_KEY / PINATA_API_SECRET").green(),
                (None, None) => style("not set").yellow(),
            };
            println!("{} {}", style("Record-store credentials:").dim(), credentials);

            // Show config file path
            if let Ok(path) = config::config_file_path() {
                println!("{} {}", style("Config file:").dim(), path.display());
                if !path.exists() {
                    println!(
                        "{} Run '{}' to create it",
                        style("(not created yet)").yellow(),
                        style("privshare config init").green()
                    );
                }
            }
        }

        Some(ConfigCommands::Path) => {
            println!("{}", config::config_file_path()?.display());
        }

        Some(ConfigCommands::Init { force }) => {
            let path = config::config_file_path()?;
            if path.exists() && !force {
                println!(
                    "{} Config file already exists at {}",
                    style(symbols::WARN).yellow(),
                    path.display()
                );
                println!("Use --force to overwrite");
                return Ok(());
            }

            config::save_config(&config::PrivShareConfig::default())?;
            println!(
                "{} Config file created at {}",
                style(symbols::CHECK).green(),
                path.display()
            );
        }

        Some(ConfigCommands::Set { key, value }) => {
            // Start from the file, not the flag-overridden view
            let mut cfg = config::load_config();
            cfg.set(&key, &value)?;
            config::save_config(&cfg)?;
            println!("{} Configuration updated", style(symbols::CHECK).green());
        }
    }

    Ok(())
}
