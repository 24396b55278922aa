//! Configuration types and constants for the hilltop server.

use std::path::PathBuf;

use clap::Parser;

/// Route history is capped per user; older entries are simply not shown.
pub(crate) const ROUTE_HISTORY_LIMIT: u32 = 10;

/// Campus companion server: friend location sharing, tracking codes,
/// SOS dispatch, and commute planning.
///
/// Configuration can be set via CLI arguments or environment variables.
/// CLI arguments take precedence over environment variables.
#[derive(Parser, Debug)]
#[command(name = "hilltop-server", version, about)]
pub struct Cli {
    /// HTTP server bind address [env: HILLTOP_BIND] [default: 127.0.0.1:4000]
    #[arg(long, short = 'b')]
    pub bind: Option<String>,

    /// Data directory for the database [env: HILLTOP_HOME] [default: ~/.hilltop]
    #[arg(long, short = 'd')]
    pub data_dir: Option<PathBuf>,
}

pub struct Config {
    pub bind_addr: String,
    pub data_dir: PathBuf,
}

impl Config {
    pub fn from_cli_and_env(cli: Cli) -> Self {
        let data_dir = cli
            .data_dir
            .or_else(|| std::env::var("HILLTOP_HOME").ok().map(PathBuf::from))
            .unwrap_or_else(|| {
                std::env::var("HOME")
                    .map(|h| PathBuf::from(h).join(".hilltop"))
                    .unwrap_or_else(|_| PathBuf::from(".hilltop"))
            });

        let bind_addr = cli
            .bind
            .or_else(|| std::env::var("HILLTOP_BIND").ok())
            .unwrap_or_else(|| "127.0.0.1:4000".to_string());

        Self {
            bind_addr,
            data_dir,
        }
    }
}
