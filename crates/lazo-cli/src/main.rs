//! Lazo CLI - Command-line interface for the lazo duplex audio engine.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "lazo")]
#[command(author, version, about = "Duplex audio engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a duplex session: continuous tone plus microphone monitor
    Run(commands::run::RunArgs),

    /// List and manage audio devices
    Devices(commands::devices::DevicesArgs),
}

fn main() -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Devices(args) => commands::devices::run(args),
    }
}
