//! waypost - configurable HTTP reverse proxy and API gateway

#![allow(missing_docs)]

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use waypost::server;

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "gateway", version, about = waypost::DESCRIPTION)]
struct Args {
    /// Path of the YAML configuration file
    #[arg(short, long, env = "WAYPOST_CONFIG", default_value = "config/gateway.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match server::builder::run_server(&args.config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // logging may not be installed yet
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
