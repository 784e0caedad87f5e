use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "studyflow", version, about = "StudyFlow CLI")]
struct Cli {
    /// User whose workspace to operate on (defaults to profile.default_user)
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Study session timer
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Deck catalog
    Deck {
        #[command(subcommand)]
        action: commands::deck::DeckAction,
    },
    /// Social feed
    Feed {
        #[command(subcommand)]
        action: commands::feed::FeedAction,
    },
    /// Long- and short-term goals
    Goal {
        #[command(subcommand)]
        action: commands::goal::GoalAction,
    },
    /// Study analytics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// List users with a stored workspace
    Users,
}

fn init_tracing() {
    // stdout carries JSON output; logs go to stderr.
    let filter = EnvFilter::try_from_env("STUDYFLOW_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let user = cli.user;
    let result = match cli.command {
        Commands::Timer { action } => commands::timer::run(user, action),
        Commands::Task { action } => commands::task::run(user, action),
        Commands::Deck { action } => commands::deck::run(user, action),
        Commands::Feed { action } => commands::feed::run(user, action),
        Commands::Goal { action } => commands::goal::run(user, action),
        Commands::Stats { action } => commands::stats::run(user, action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Users => commands::list_users(),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
