use clap::Parser;
use colored::Colorize;
use sanitizer_reports_core::cli::handlers;
use sanitizer_reports_core::cli::{Cli, Commands};
use sanitizer_reports_core::exit::ReportExit;
use tracing_subscriber::EnvFilter;

fn main() -> ReportExit {
    // stdout carries the report; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match &cli.command {
        Commands::Scan(args) => handlers::handle_scan(args, cli.config.as_deref()),
        Commands::Kinds => handlers::handle_kinds(),
    };

    match result {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            ReportExit::Error
        }
    }
}
