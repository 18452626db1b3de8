use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "hookman", about = "Manage native hook plugins")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Hook spec file (overrides the configured `spec`)
    #[arg(long, global = true, value_name = "FILE")]
    spec: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the hooks and the symbol each is exported as
    Hooks(commands::hooks::HooksArgs),
    /// List installed plugins
    List(commands::plugins::ListArgs),
    /// Show hooks implemented by more than one plugin
    Status(commands::plugins::StatusArgs),
    /// Install a plugin package
    Install(commands::plugins::InstallArgs),
    /// Remove an installed plugin
    Remove(commands::plugins::RemoveArgs),
    /// Load every plugin and report which hooks are bound
    Check(commands::check::CheckArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = config::ConfigLoader::load()?;
    if let Some(spec) = cli.spec {
        config.spec = spec;
    }

    match cli.command {
        Commands::Hooks(args) => commands::hooks::run(args, &config),
        Commands::List(args) => commands::plugins::list(args, &config),
        Commands::Status(args) => commands::plugins::status(args, &config),
        Commands::Install(args) => commands::plugins::install(args, &config),
        Commands::Remove(args) => commands::plugins::remove(args, &config),
        Commands::Check(args) => commands::check::run(args, &config),
    }
}
