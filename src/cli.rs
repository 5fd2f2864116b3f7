//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Secret backend issuing Tailscale device authentication keys
#[derive(Parser, Debug)]
#[command(name = "tailscale-key-backend")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "TSKB_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "TSKB_LOG_LEVEL", global = true)]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "TSKB_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand (optional - defaults to server mode)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the backend server (default)
    Serve,

    /// Load the configuration and print it as resolved
    CheckConfig,
}
