use clap::error::ErrorKind;
use colored::*;
use std::process;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli_args = match webdeploy::cli::parse_args() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            // --help and --version are not errors
            let _ = e.print();
            process::exit(0);
        }
        Err(e) => {
            // clap appends the usage line and a --help hint
            let _ = e.print();
            process::exit(1);
        }
    };

    let default_level = match cli_args.verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var("WEBDEPLOY_LOG")
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = webdeploy::cli::run(cli_args).await {
        // Print user-facing error message clearly
        eprintln!("{}: {}", "Error".red().bold(), e);
        process::exit(1);
    }
}
