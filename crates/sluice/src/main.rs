use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::cli::app::{App, CacheCommands, Commands};
use crate::config::AppConfig;
use crate::env::SluiceEnv;

mod cli;
mod config;
mod env;
mod ui;

fn main() -> Result<()> {
    let app = App::parse();
    init_logging(app.verbose);

    let env = SluiceEnv::new()?;
    let config_path = app.config.clone().unwrap_or_else(|| env.config_path());
    let config = AppConfig::load(&config_path)?;
    let ctx = cli::Context::new(env, config);

    match app.cmd {
        Commands::Get(arg) => cli::get::get(arg, &ctx),
        Commands::Cache(CacheCommands::Info) => cli::cache::info(&ctx),
        Commands::Cache(CacheCommands::Remove(arg)) => cli::cache::remove(arg, &ctx),
        Commands::Cache(CacheCommands::Clear) => cli::cache::clear(&ctx),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("sluice=info").add_directive(Level::WARN.into()))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
