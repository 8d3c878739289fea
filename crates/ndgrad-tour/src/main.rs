//! ndgrad-tour - a narrated walk through tensors and autograd

mod autograd;
mod config;
mod data;
mod narrate;
mod tensors;
mod training;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use config::{TourConfig, TrainingArgs};

#[derive(Parser)]
#[command(name = "ndgrad-tour")]
#[command(version, about = "Narrated walkthrough of ndgrad tensors and autograd")]
#[command(after_help = "Diagnostics go to stderr; set RUST_LOG or --log-level to see them.")]
struct Cli {
    /// Seed for random tensors and the train/validation split
    #[arg(long, global = true, default_value_t = 42)]
    seed: u64,

    /// Log filter (error, warn, info, debug, trace or a RUST_LOG directive)
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Storage, shapes, strides, views, dtype and device conversion
    Tensors,

    /// Gradient tracking, backward and gradient accumulation
    Autograd,

    /// Fit the thermometer calibration model
    Training(TrainingArgs),

    /// Run every section in order
    All(TrainingArgs),
}

fn init_tracing(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Tensors => tensors::run(&TourConfig::new(cli.seed)),
        Commands::Autograd => autograd::run(&TourConfig::new(cli.seed)),
        Commands::Training(args) => training::run(&TourConfig::from_training(cli.seed, args)?),
        Commands::All(args) => {
            let config = TourConfig::from_training(cli.seed, args)?;
            tensors::run(&config)?;
            autograd::run(&config)?;
            training::run(&config)
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());
    tracing::debug!(seed = cli.seed, "starting tour");

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
