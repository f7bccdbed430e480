mod commands;
mod input;
mod output;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::allocate::AllocateArgs;
use commands::hierarchy::MoveArgs;
use commands::scenario::{CompareArgs, ScenarioArgs};

/// Bank bail-in loss waterfall analysis
#[derive(Parser)]
#[command(
    name = "bailin",
    version,
    about = "Bank bail-in loss waterfall analysis",
    long_about = "Distributes a hypothetical bank loss across a loss-absorption buffer \
                  and a ranked hierarchy of creditor classes, with exemptions and \
                  reorderable priority. Supports single allocations, full scenarios \
                  against sample or custom balance sheets, and multi-bank comparison."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Allocate a loss down an ordered list of buckets
    Allocate(AllocateArgs),
    /// Move a bucket to a new priority position
    Move(MoveArgs),
    /// Run a bail-in scenario for one bank
    Scenario(ScenarioArgs),
    /// Apply the same percentage loss to several banks
    Compare(CompareArgs),
    /// Print the default hierarchy and sample banks
    Presets,
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Allocate(args) => commands::allocate::run_allocate(args),
        Commands::Move(args) => commands::hierarchy::run_move(args),
        Commands::Scenario(args) => commands::scenario::run_scenario(args),
        Commands::Compare(args) => commands::scenario::run_compare(args),
        Commands::Presets => commands::presets::run_presets(),
        Commands::Version => {
            println!("bailin {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            log::debug!("command failed: {e:?}");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}
