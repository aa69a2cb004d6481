mod cli;
mod error;
mod fmt;
mod loader;
mod merge;
mod models;
mod pdf;
mod report;
mod settings;
mod transaction;
mod transactions;

use clap::Parser;

use cli::{Cli, Commands};

/// Logs go to stderr so report text on stdout stays clean. `RUST_LOG`
/// overrides the default level.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("reimburse=warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Build {
            source,
            filters,
            report,
            output_dir,
        } => cli::build::run(&source, &filters, &report, output_dir).map(|_| ()),
        Commands::Preview {
            source,
            filters,
            report,
        } => cli::preview::run(&source, &filters, &report).map(|out| println!("{out}")),
        Commands::Freelancers { source, filters } => {
            cli::summary::freelancers(&source, &filters).map(|out| println!("{out}"))
        }
        Commands::Types { source, filters } => {
            cli::summary::types(&source, &filters).map(|out| println!("{out}"))
        }
        Commands::Init {
            sheets_url,
            default_funding_source,
            invoice_dir,
            output_dir,
            fetch_timeout,
        } => cli::init::run(cli::init::InitArgs {
            sheets_url,
            default_funding_source,
            invoice_dir,
            output_dir,
            fetch_timeout,
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
