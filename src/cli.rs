use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "railnet")]
#[command(about = "Plan and inspect train routes over rail network descriptions")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Default log filter, overridden by RUST_LOG
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Weighting and line defaults (TOML or JSON)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Plan every line and print the routes with their costs
    Plan {
        /// Network description (TOML or JSON)
        file: PathBuf,
    },
    /// Plan the line of a single train
    Route {
        file: PathBuf,

        /// Train name as written in the description
        #[arg(long)]
        train: String,
    },
    /// Plan every line and write the JSON snapshot
    Snapshot {
        file: PathBuf,

        /// Output path, stdout when missing
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List nodes, edges and connected clients
    Inspect { file: PathBuf },
}
