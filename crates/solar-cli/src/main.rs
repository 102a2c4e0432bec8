use std::error::Error;

use clap::{Parser, Subcommand};
use commands::{
    datasets::{self, DatasetsArgs},
    eval::{self, EvalArgs},
    paths::{self, PathsArgs},
    run::{self, RunArgs},
    summarize::{self, SummarizeArgs},
    train::{self, TrainArgs},
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "solar-sweep", about = "Solar segmentation experiment sweep coordinator")]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every path the sweep derives.
    Paths(PathsArgs),
    /// Build the dataset lists of every train set and seed.
    Datasets(DatasetsArgs),
    /// Train every model of the sweep.
    Train(TrainArgs),
    /// Evaluate every trained model against every test set.
    Eval(EvalArgs),
    /// Run the enabled stages and write the sweep report.
    Run(RunArgs),
    /// Tabulate the evaluation results of the sweep.
    Summarize(SummarizeArgs),
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(filter);
    tracing_subscriber::registry().with(stderr_layer).init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Command::Paths(args) => paths::run(&args),
        Command::Datasets(args) => datasets::run(&args),
        Command::Train(args) => train::run(&args),
        Command::Eval(args) => eval::run(&args),
        Command::Run(args) => run::run(&args),
        Command::Summarize(args) => summarize::run(&args),
    }
}
