use clap::Parser;
use shelf_scan::cli::commands::{cmd_aggregate, cmd_detect, cmd_run};
use shelf_scan::cli::config::{Cli, Commands, RunOverrides, load_config, log_filter};
use shelf_scan::trace::logger::TraceLogger;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_filter(cli.verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref());
    let trace = match cli.trace.as_deref() {
        Some(path) => TraceLogger::new(path),
        None => TraceLogger::disabled(),
    };

    match cli.command {
        Commands::Run {
            url,
            passes,
            fetcher,
            output_dir,
            no_variants,
            no_fallback,
        } => {
            let overrides = RunOverrides {
                passes,
                output_dir,
                no_variants,
                no_fallback,
            };
            cmd_run(&url, fetcher, &overrides, &config, &trace)?;
        }
        Commands::Detect { html, url, format } => {
            cmd_detect(&html, &url, &format, &config)?;
        }
        Commands::Aggregate { dir, output_dir } => {
            cmd_aggregate(&dir, output_dir.as_deref())?;
        }
    }

    Ok(())
}
