// faces-modules - main.rs
// Diagnostic runner for module discovery and lookup resolution

use anyhow::Context;
use clap::Parser;
use faces_util::cli::{run, Cli};
use faces_util::config_loader::load_config;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref()).context("Failed to load resolver configuration")?;

    let lines = run(&cli, config).context("Command failed")?;
    for line in lines {
        println!("{line}");
    }
    Ok(())
}
