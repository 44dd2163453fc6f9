//! CLI command definitions using clap.

use clap::{Parser, Subcommand};

/// Portscope - report open TCP ports and their owning processes.
#[derive(Parser, Debug)]
#[command(name = "portscope")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP server exposing the scan at GET /ports.
    Serve {
        /// Address to bind (host:port)
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: String,
    },

    /// Scan once and print the snapshot.
    Scan {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },
}
