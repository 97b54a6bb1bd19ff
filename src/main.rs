mod config;
mod manager;
mod model;
mod spin;
mod stats;
mod store;
mod synth;

use crate::manager::Manager;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    #[arg(long)]
    store_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Synth,

    Average,

    List,

    Clean,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    let mgr = Manager::new(args.store_dir).context("failed to construct mgr")?;

    match args.command {
        Command::Synth => mgr.synthesize()?,
        Command::Average => mgr.spin_average()?,
        Command::List => mgr.list_vars()?,
        Command::Clean => mgr.clean_vars()?,
    }

    Ok(())
}
