use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::cache::RemoveArg;
use super::get::GetArg;

#[derive(Clone, Debug, Parser)]
#[command(
    name = "sluice",
    version = env!("CARGO_PKG_VERSION"),
    about,
    long_about = None,
    propagate_version = true
)]
pub struct App {
    #[command(subcommand)]
    pub cmd: Commands,

    /// Configuration file (defaults to `$SLUICE_ROOT/config.toml`)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log every step of a download
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    #[command(alias = "g", name = "get", about = "Download a URL through the disk cache")]
    Get(GetArg),
    #[command(
        subcommand,
        alias = "c",
        name = "cache",
        about = "Inspect or maintain the disk cache"
    )]
    Cache(CacheCommands),
}

#[derive(Clone, Debug, Subcommand)]
pub enum CacheCommands {
    #[command(alias = "i", name = "info")]
    Info,
    #[command(alias = "rm", name = "remove")]
    Remove(RemoveArg),
    #[command(name = "clear")]
    Clear,
}
