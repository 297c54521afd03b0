use std::process::ExitCode;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

fn main() -> Result<ExitCode> {
    let cli = xml_tabulate::cli::parse_args();

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    xml_tabulate::cli::run_with_args(cli)
}
