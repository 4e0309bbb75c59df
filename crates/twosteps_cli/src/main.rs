//! Two Steps CLI
//!
//! Runs the board server and inspects its data file.
//!
//! # Commands
//!
//! - `serve` - Start the HTTP server
//! - `inspect` - Display board statistics and check consistency
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use twosteps_server::{ConfigError, ServerConfig};

/// Two Steps board server and tools.
#[derive(Parser)]
#[command(name = "twosteps")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the board data file (overrides TWOSTEPS_DATA)
    #[arg(global = true, short, long)]
    data: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Address to bind (overrides SERVER_HOST)
        #[arg(long)]
        host: Option<std::net::IpAddr>,

        /// Port to listen on (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Comma-separated CORS origins (overrides CORS_ORIGINS)
        #[arg(long, value_delimiter = ',')]
        cors_origins: Option<Vec<String>>,

        /// Mark the session cookie Secure
        #[arg(long)]
        secure_cookies: bool,
    },

    /// Display board statistics and check consistency
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    run(Cli::parse(), |name| std::env::var(name).ok())
}

/// Dispatches a parsed command line; `lookup` supplies environment variables.
fn run<F>(cli: Cli, lookup: F) -> Result<(), Box<dyn std::error::Error>>
where
    F: Fn(&str) -> Option<String>,
{
    match cli.command {
        Commands::Serve {
            host,
            port,
            cors_origins,
            secure_cookies,
        } => {
            let mut config = load_config(cli.data, cli.verbose, lookup)?;
            if let Some(host) = host {
                config.bind_addr.set_ip(host);
            }
            if let Some(port) = port {
                config.bind_addr.set_port(port);
            }
            if let Some(origins) = cors_origins {
                config = config.with_cors_origins(origins);
            }
            if secure_cookies {
                config = config.with_secure_cookies(true);
            }
            init_logging(&config);
            commands::serve::run(config)?;
        }
        Commands::Inspect { format } => {
            let config = load_config(cli.data, cli.verbose, lookup)?;
            init_logging(&config);
            commands::inspect::run(&config.data_path, &format)?;
        }
        Commands::Version => {
            println!("Two Steps CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

/// Reads the environment and applies the global flags.
fn load_config<F>(
    data: Option<PathBuf>,
    verbose: bool,
    lookup: F,
) -> Result<ServerConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = ServerConfig::from_lookup(lookup)?;
    if let Some(data) = data {
        config = config.with_data_path(data);
    }
    if verbose {
        config = config.with_debug(true);
    }
    Ok(config)
}

fn init_logging(config: &ServerConfig) {
    let default_level = if config.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    tracing::debug!(?config, "configuration loaded");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bad_port(name: &str) -> Option<String> {
        (name == "PORT").then(|| "not-a-port".to_string())
    }

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn version_ignores_broken_environment() {
        assert!(run(parse(&["twosteps", "version"]), bad_port).is_ok());
    }

    #[test]
    fn inspect_reports_broken_environment() {
        assert!(run(parse(&["twosteps", "inspect"]), bad_port).is_err());
    }

    #[test]
    fn verbose_flag_enables_debug() {
        let config = load_config(None, true, |_| None).unwrap();
        assert!(config.debug);

        let config = load_config(Some("x/board.json".into()), false, |_| None).unwrap();
        assert!(!config.debug);
        assert_eq!(config.data_path, PathBuf::from("x/board.json"));
    }
}
