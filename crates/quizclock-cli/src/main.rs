//! quizclock CLI — take timed quizzes from the terminal.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;
mod display;

#[derive(Parser)]
#[command(name = "quizclock", version, about = "Timed quiz attempt engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take a quiz interactively
    Take {
        /// Path to the quiz .toml file
        #[arg(long)]
        quiz: PathBuf,

        /// Attempt id to resume (a new id is generated if omitted)
        #[arg(long)]
        attempt: Option<String>,

        /// Write a JSON attempt report to this path when done
        #[arg(long)]
        report: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show the result or progress of a stored attempt
    Results {
        /// Path to the quiz .toml file
        #[arg(long)]
        quiz: PathBuf,

        /// Attempt id
        #[arg(long)]
        attempt: String,

        /// Output format: text, markdown, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List stored attempts for a quiz
    Attempts {
        /// Path to the quiz .toml file
        #[arg(long)]
        quiz: PathBuf,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Delete a stored attempt
    Discard {
        /// Path to the quiz .toml file
        #[arg(long)]
        quiz: PathBuf,

        /// Attempt id
        #[arg(long)]
        attempt: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate quiz TOML files
    Validate {
        /// Path to quiz file or directory
        #[arg(long)]
        quiz: PathBuf,
    },

    /// Create starter config and a sample quiz
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("quizclock=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Take {
            quiz,
            attempt,
            report,
            config,
        } => commands::take::execute(quiz, attempt, report, config).await,
        Commands::Results {
            quiz,
            attempt,
            format,
            config,
        } => commands::results::execute(quiz, attempt, format, config).await,
        Commands::Attempts { quiz, config } => commands::attempts::execute(quiz, config).await,
        Commands::Discard {
            quiz,
            attempt,
            config,
        } => commands::discard::execute(quiz, attempt, config).await,
        Commands::Validate { quiz } => commands::validate::execute(quiz),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
