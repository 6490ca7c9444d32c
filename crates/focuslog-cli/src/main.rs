use clap::{Parser, Subcommand};
use focuslog_core::OwnerId;

mod commands;

#[derive(Parser)]
#[command(name = "focuslog-cli", version, about = "Focuslog CLI")]
struct Cli {
    /// Act as this owner instead of the configured one
    #[arg(long, global = true)]
    owner: Option<OwnerId>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Session lifecycle control
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Pomodoro duration settings
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },
    /// Completed-session statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Memo notes
    Memo {
        #[command(subcommand)]
        action: commands::memo::MemoAction,
    },
    /// Push subscriptions and overdue-notification dispatch
    Push {
        #[command(subcommand)]
        action: commands::push::PushAction,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Session { action } => commands::session::run(cli.owner, action),
        Commands::Settings { action } => commands::settings::run(cli.owner, action),
        Commands::Stats { action } => commands::stats::run(cli.owner, action),
        Commands::Memo { action } => commands::memo::run(cli.owner, action),
        Commands::Push { action } => commands::push::run(cli.owner, action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }
}
