mod categorizer;
mod cli;
mod db;
mod error;
mod fmt;
mod importer;
mod ledger;
mod models;
mod ofx;
mod projection;
mod settings;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

fn init_tracing(verbose: bool) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Init {
            data_dir,
            owner,
            currency,
        } => cli::init::run(data_dir, owner, currency),
        Commands::Import { file, owner } => cli::import::run(&file, owner),
        Commands::Add {
            amount,
            kind,
            category,
            description,
            date,
            owner,
        } => cli::add::run(cli::add::AddArgs {
            amount,
            kind,
            category,
            description,
            date,
            owner,
        }),
        Commands::Ledger { window } => cli::ledger::run(window),
        Commands::Budget { window } => cli::budget::run(window),
        Commands::Project {
            initial,
            monthly,
            rate,
            years,
            json,
        } => cli::project::run(&initial, &monthly, &rate, &years, json),
        Commands::Payoff {
            debt,
            payment,
            rate,
            schedule,
            json,
        } => cli::payoff::run(&debt, &payment, &rate, schedule, json),
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
