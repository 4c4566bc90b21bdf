use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use ratewatch::core::log::init_logging;

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

impl From<Commands> for ratewatch::AppCommand {
    fn from(cmd: Commands) -> ratewatch::AppCommand {
        match cmd {
            Commands::Show { amount, flags } => ratewatch::AppCommand::Show { amount, flags },
            Commands::Watch { amount } => ratewatch::AppCommand::Watch { amount },
            Commands::Add { codes } => ratewatch::AppCommand::Add(codes),
            Commands::Remove { codes } => ratewatch::AppCommand::Remove(codes),
            Commands::List => ratewatch::AppCommand::List,
            Commands::Search { term } => {
                ratewatch::AppCommand::Search(term.unwrap_or_default())
            }
            Commands::Reset => ratewatch::AppCommand::Reset,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Fetch the selected rates once and print them
    Show {
        /// Amount of the base currency shown on the base row
        #[arg(short, long, default_value_t = 1.0)]
        amount: f64,
        /// Resolve flag image URLs for each row
        #[arg(long)]
        flags: bool,
    },
    /// Live dashboard that refreshes periodically until Ctrl-C
    Watch {
        /// Amount of the base currency shown on the base row
        #[arg(short, long, default_value_t = 1.0)]
        amount: f64,
    },
    /// Add currencies to the dashboard
    Add {
        #[arg(required = true)]
        codes: Vec<String>,
    },
    /// Remove currencies from the dashboard
    Remove {
        #[arg(required = true)]
        codes: Vec<String>,
    },
    /// List selected currencies
    List,
    /// Search the currency catalog
    Search { term: Option<String> },
    /// Restore the default selection
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => ratewatch::cli::setup::setup(),
        Some(cmd) => ratewatch::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
