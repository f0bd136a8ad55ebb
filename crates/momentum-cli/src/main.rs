use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "momentum-cli", version, about = "Momentum CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chain management
    Chain {
        #[command(subcommand)]
        action: commands::chain::ChainAction,
    },
    /// Exception rules of a chain
    Rule {
        #[command(subcommand)]
        action: commands::rule::RuleAction,
    },
    /// Focus session control
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Pre-commitments
    Schedule {
        #[command(subcommand)]
        action: commands::schedule::ScheduleAction,
    },
    /// Completion history
    History {
        #[command(subcommand)]
        action: commands::history::HistoryAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// Log to stderr, filtered by MOMENTUM_LOG. Notifications are logged at
/// `info` under `momentum::notify` and shown by default.
fn init_logging() {
    let filter = EnvFilter::try_from_env("MOMENTUM_LOG")
        .unwrap_or_else(|_| EnvFilter::new("warn,momentum::notify=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_logging();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Chain { action } => commands::chain::run(action),
        Commands::Rule { action } => commands::rule::run(action),
        Commands::Session { action } => commands::session::run(action),
        Commands::Schedule { action } => commands::schedule::run(action),
        Commands::History { action } => commands::history::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
