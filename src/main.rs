use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

use lanshare::config::{format_config, load_dotenv, Config, SHARED_DIR_ENV};
use lanshare::files::SharedRoot;
use lanshare::logging::{init_logging, LogConfig, Verbosity};
use lanshare::server::{run_server, ServerConfig};

#[derive(Parser)]
#[command(name = "lanshare")]
#[command(version)]
#[command(about = "Share a directory with every device on your local network")]
#[command(
    long_about = "Serves a directory over HTTP so phones and laptops on the same network can list, upload, download (directories as zip) and delete files from a browser."
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Also write debug logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the file server
    Serve {
        /// Directory to share (overrides FILE_TRANSFER_DIR and the config file)
        #[arg(short, long, value_name = "DIR")]
        dir: Option<PathBuf>,

        /// Port to listen on (default: 3001)
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind to (default: 0.0.0.0)
        #[arg(short, long)]
        bind: Option<IpAddr>,

        /// Open the page in your browser once the server is up
        #[arg(long)]
        open: bool,

        /// Seconds to keep directory archives after their download (default: 60)
        #[arg(long, value_name = "SECS")]
        cleanup_delay: Option<u64>,
    },
    /// Show or change the configuration file
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the current configuration
    Show,
    /// Set a configuration value
    Set {
        /// One of: shared_dir, port, bind, cleanup_delay_secs, open_browser
        key: String,
        value: String,
    },
    /// Remove a configuration value
    Unset { key: String },
    /// Print the path of the configuration file
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = init_logging(&LogConfig {
        verbosity: Verbosity::from_flags(cli.quiet, cli.verbose),
        log_file: cli.log_file,
    });

    // FILE_TRANSFER_DIR may come from a .env file; the real environment wins.
    load_dotenv();

    match cli.command {
        Commands::Serve {
            dir,
            port,
            bind,
            open,
            cleanup_delay,
        } => {
            let config = Config::load().context("Failed to load configuration")?;

            let shared_dir =
                config.effective_shared_dir(dir, std::env::var_os(SHARED_DIR_ENV))?;
            let root = SharedRoot::open(&shared_dir).with_context(|| {
                format!("Failed to open shared directory {}", shared_dir.display())
            })?;

            let server_config = ServerConfig {
                bind: config.effective_bind(bind),
                port: config.effective_port(port),
                open_browser: config.effective_open_browser(open),
                cleanup_delay: config.effective_cleanup_delay(cleanup_delay),
                ..ServerConfig::default()
            };

            run_server(root, server_config).await?;
        }
        Commands::Config { action } => match action.unwrap_or(ConfigAction::Show) {
            ConfigAction::Show => {
                let config = Config::load().context("Failed to load configuration")?;
                println!("{}", format_config(&config));
            }
            ConfigAction::Set { key, value } => {
                let mut config = Config::load().context("Failed to load configuration")?;
                config.set(&key, &value)?;
                config.save().context("Failed to save configuration")?;
                println!("Set {} = {}", key, value);
            }
            ConfigAction::Unset { key } => {
                let mut config = Config::load().context("Failed to load configuration")?;
                config.unset(&key)?;
                config.save().context("Failed to save configuration")?;
                println!("Unset {}", key);
            }
            ConfigAction::Path => {
                println!("{}", Config::config_path()?.display());
            }
        },
    }

    Ok(())
}
