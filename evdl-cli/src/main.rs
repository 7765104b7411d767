mod cli;
mod commands;
mod config;
mod download;
mod error;
mod fetch;
mod output;
mod prompt;
mod tools;

use crate::{
    cli::{Args, Commands},
    commands::CommandExecutor,
    config::AppConfig,
    error::{CliError, Result},
};
use clap::Parser;
#[cfg(feature = "colored-output")]
use colored::*;
use std::{path::Path, process};
use tracing::{Level, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        error!("Application error: {}", e);
        #[cfg(feature = "colored-output")]
        {
            eprintln!("{} {}", "Error:".red().bold(), e);
        }
        #[cfg(not(feature = "colored-output"))]
        {
            eprintln!("Error: {}", e);
        }
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    // Keep the guard alive so buffered file logs are flushed on exit
    let _guard = init_logging(args.verbose, args.quiet, args.log_file.as_deref())?;

    let config = AppConfig::load(args.config.as_deref())?;
    info!("Starting evdl with config: {:?}", config);

    match args.command {
        Commands::List {
            source,
            output,
            output_file,
        } => {
            let executor = CommandExecutor::new(config, args.timeout, args.retries, args.quiet)?;
            executor
                .list(&source, &output, output_file.as_deref())
                .await?;
        }

        Commands::Plan {
            source,
            selection,
            output,
            output_file,
        } => {
            let executor = CommandExecutor::new(config, args.timeout, args.retries, args.quiet)?;
            executor
                .plan(&source, &selection, &output, output_file.as_deref())
                .await?;
        }

        Commands::Download {
            source,
            selection,
            mux,
            max_concurrent,
        } => {
            let executor = CommandExecutor::new(config, args.timeout, args.retries, args.quiet)?;
            executor
                .download(&source, &selection, mux, max_concurrent)
                .await?;
        }

        Commands::Completions { shell } => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Args::command();
            let bin_name = cmd.get_name().to_string();
            generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
        }

        Commands::Config { show, reset } => {
            if reset {
                AppConfig::reset(args.config.as_deref())?;
                println!("✓ Configuration reset to defaults");
            } else if show {
                println!("{}", config.show()?);
            } else {
                println!(
                    "Use --show to display current configuration or --reset to reset to defaults"
                );
            }
        }
    }

    Ok(())
}

/// Console logs go to stderr so listings and plans can be piped.
fn init_logging(verbose: bool, quiet: bool, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| CliError::invalid_input(format!("invalid log file path: {}", path.display())))?;
            std::fs::create_dir_all(dir)?;

            let appender = tracing_appender::rolling::never(dir, name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(non_blocking).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(verbose),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}
