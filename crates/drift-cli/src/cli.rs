use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use drift_backend::Endpoint;

#[derive(Parser)]
#[command(
    name = "drift",
    about = "Drift: branch, navigate, and save trees of generated images",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path of the workspace config file
    #[arg(short, long, global = true, default_value = "drift.toml")]
    pub config: PathBuf,
}

#[derive(Subcommand)]
pub enum Command {
    /// Write a config file and create the workspace catalog
    Init(InitArgs),
    /// List saved queries
    Queries,
    /// List saved sessions
    Sessions,
    /// Forget a saved session
    RmSession(RmSessionArgs),
    /// Start the interactive navigator
    Shell(ShellArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Generation backend, e.g. tcp://127.0.0.1:51005 or synthetic://7
    #[arg(long)]
    pub endpoint: Endpoint,
    /// Directory for datastore/ and catalog.db, relative to the config file
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,
    /// Hex characters of the hash used to pick a blob bucket
    #[arg(long, default_value = "4")]
    pub prefix_len: usize,
    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct RmSessionArgs {
    pub name: String,
}

#[derive(Args)]
pub struct ShellArgs {
    /// Load this saved session before reading commands
    #[arg(short, long)]
    pub session: Option<String>,
}
