use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod cli;
mod core;
mod daemon;
mod sensors;

use crate::core::settings::Settings;

#[derive(Parser)]
#[command(name = "emby-stats")]
#[command(author, version, about = "Emby library statistics for home-automation dashboards")]
struct Cli {
    /// Path to the config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the server and publish sensor values until interrupted
    Daemon,

    /// Refresh once and print every sensor
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Test the connection and list users and libraries
    Discover {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Daemon => {
            init_logging();
            let settings = Settings::load(cli.config.as_deref())?;
            daemon::run(settings).await
        }
        Commands::Status { json } => {
            init_logging();
            let settings = Settings::load(cli.config.as_deref())?;
            cli::status::run(&settings, json).await
        }
        Commands::Discover { json } => {
            init_logging();
            let settings = Settings::load(cli.config.as_deref())?;
            cli::discover::run(&settings, json).await
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
    }
}
