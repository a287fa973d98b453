use anyhow::Result;
use aurum::core::log::init_logging;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum WageKindArg {
    Average,
    Minimum,
}

impl From<WageKindArg> for aurum::wages::WageKind {
    fn from(kind: WageKindArg) -> aurum::wages::WageKind {
        match kind {
            WageKindArg::Average => aurum::wages::WageKind::Average,
            WageKindArg::Minimum => aurum::wages::WageKind::Minimum,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the NBP gold price history and store yearly or monthly averages
    Gold {
        /// First year to fetch (NBP publishes data from 2013)
        #[arg(long)]
        start_year: Option<i32>,

        /// Store monthly averages instead of yearly ones
        #[arg(long)]
        monthly: bool,

        /// Output JSON file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Fetch the last 30 days of gold prices and the latest quotation
    GoldToday,
    /// Rebuild the Warsaw m2 monthly price series from the NBP workbook
    Property {
        /// Output JSON file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Fetch Eurostat wage data for Poland
    Wages {
        /// Which wage dataset to fetch
        #[arg(long, value_enum, default_value = "average")]
        kind: WageKindArg,

        /// First year to include
        #[arg(long)]
        start_year: Option<i32>,

        /// Last year to include (defaults to the current year)
        #[arg(long)]
        end_year: Option<i32>,

        /// Output JSON file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Fetch monthly series for every configured stock ticker
    Stocks,
    /// Write last-update.json with the current time
    Stamp,
    /// Run every pipeline in dependency order
    Update {
        /// Skip output file validation
        #[arg(long)]
        skip_checks: bool,
    },
}

impl From<Commands> for aurum::AppCommand {
    fn from(cmd: Commands) -> aurum::AppCommand {
        match cmd {
            Commands::Gold {
                start_year,
                monthly,
                output,
            } => aurum::AppCommand::GoldHistory {
                start_year,
                monthly,
                output,
            },
            Commands::GoldToday => aurum::AppCommand::GoldToday,
            Commands::Property { output } => aurum::AppCommand::Property { output },
            Commands::Wages {
                kind,
                start_year,
                end_year,
                output,
            } => aurum::AppCommand::Wages {
                kind: kind.into(),
                start_year,
                end_year,
                output,
            },
            Commands::Stocks => aurum::AppCommand::Stocks,
            Commands::Stamp => aurum::AppCommand::Stamp,
            Commands::Update { skip_checks } => aurum::AppCommand::UpdateAll { skip_checks },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(cmd) => aurum::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
