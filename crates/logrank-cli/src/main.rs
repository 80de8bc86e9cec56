use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use logrank_cli::{commands, logging};
use logrank_core::config::LoggingOptions;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "logrank")]
#[command(author, version, about, long_about = None)]
#[command(
    about = "Rank URLs by request time in the newest nginx access log",
    long_about = "logrank finds the most recent nginx access log in a directory, aggregates \
                  request times per URL and renders the slowest URLs into an HTML report."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze the newest log and write the HTML report
    Run {
        /// Path to the JSON configuration file
        #[arg(short, long, default_value = "config.json", env = "LOGRANK_CONFIG")]
        config: PathBuf,
    },

    /// Write a configuration file with default values
    Template {
        /// Where to write the configuration template
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        #[arg(long, value_enum)]
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { config } => commands::run::execute(&config, cli.verbose).map(|_| ()),
        Commands::Template { output } => logging::init(&LoggingOptions::default(), cli.verbose)
            .and_then(|()| commands::template::execute(&output)),
        Commands::Completion { shell } => {
            commands::completion::execute(shell, &mut Cli::command(), &mut std::io::stdout())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if tracing::dispatcher::has_been_set() {
                tracing::error!("{e:#}");
            } else {
                eprintln!("Error: {e:#}");
            }
            ExitCode::FAILURE
        }
    }
}
