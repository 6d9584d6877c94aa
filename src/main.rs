use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    let filter = match cli.verbose {
        0 => "warn,pwa_lifecycle=info",
        1 => "info,pwa_lifecycle=debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match cli::run(cli).await {
        0 => ExitCode::SUCCESS,
        code => ExitCode::from(code),
    }
}
