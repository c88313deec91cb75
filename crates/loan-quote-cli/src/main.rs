mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::bridging::BridgingArgs;
use commands::btl::{BtlArgs, FeeColumnsArgs};

/// Buy-to-let and bridging loan quotes
#[derive(Parser)]
#[command(
    name = "lq",
    version,
    about = "Buy-to-let and bridging loan quotes",
    long_about = "Sizes and prices buy-to-let, bridge and Fusion loans with decimal \
                  precision. Requests are read from --input (JSON or YAML), stdin, \
                  or command-line flags."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Engine configuration file (JSON or YAML); defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log engine decisions to stderr (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Quote one BTL product column
    Btl(BtlArgs),
    /// Quote every configured product-fee column for a BTL product
    BtlColumns(FeeColumnsArgs),
    /// Quote a bridge or Fusion loan
    Bridging(BridgingArgs),
    /// Print the effective engine configuration
    Config,
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

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match commands::config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Btl(args) => commands::btl::run_btl(args, &config),
        Commands::BtlColumns(args) => commands::btl::run_fee_columns(args, &config),
        Commands::Bridging(args) => commands::bridging::run_bridging(args, &config),
        Commands::Config => commands::config::run_show(&config),
        Commands::Version => {
            println!("lq {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
