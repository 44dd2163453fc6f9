//! Portscope - report open TCP ports and the processes that own them.

mod cli;
mod display;
mod error;
mod scanner;
mod server;

use clap::Parser;

use cli::{Cli, Command};
use display::{display_records, display_records_json};
use error::Result;
use scanner::PortScanner;

fn main() {
    // INFO by default, configurable with RUST_LOG.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { bind } => cmd_serve(&bind),
        Command::Scan { json } => cmd_scan(json),
    }
}

fn cmd_serve(bind: &str) -> Result<()> {
    let scanner = PortScanner::for_host()?;
    log::info!("portscope v{} starting", env!("CARGO_PKG_VERSION"));
    server::serve(bind, &scanner)
}

fn cmd_scan(json: bool) -> Result<()> {
    let scanner = PortScanner::for_host()?;
    let mut records = scanner.scan()?;
    // Sorted for display only; the HTTP snapshot stays unordered.
    records.sort_by_key(|r| r.port);

    if json {
        display_records_json(&records);
    } else {
        display_records(&records);
    }
    Ok(())
}
