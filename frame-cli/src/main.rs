mod cli;
mod commands;
mod config;
mod error;
mod output;
mod probe;
mod script;

use std::process;

use clap::Parser;
#[cfg(feature = "colored-output")]
use colored::*;
use frame_player::PlatformCapabilities;
use tracing::{Level, error};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::{
    cli::{Args, Commands},
    commands::CommandExecutor,
    config::AppConfig,
    error::Result,
};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let output_format = args.command.output_format();

    if let Err(e) = run(args).await {
        match output_format {
            Some(format) if format.is_json() => {
                let error_json = serde_json::json!({
                    "status": "error",
                    "message": e.to_string(),
                });
                println!("{error_json}");
            }
            _ => {
                error!("Application error: {}", e);
                #[cfg(feature = "colored-output")]
                {
                    eprintln!("{} {}", "Error:".red().bold(), e);
                }
                #[cfg(not(feature = "colored-output"))]
                {
                    eprintln!("Error: {}", e);
                }
            }
        }
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    init_logging(args.verbose, args.quiet);
    let executor = || AppConfig::load(args.config.as_deref()).map(CommandExecutor::new);

    match args.command {
        Commands::Completions { shell } => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Args::command();
            let bin_name = cmd.get_name().to_string();
            generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
        }

        Commands::Config { show, reset } => {
            if reset {
                let path = AppConfig::reset(args.config.as_deref())?;
                println!("✓ Configuration reset to defaults at {}", path.display());
            } else if show {
                let config = AppConfig::load(args.config.as_deref())?;
                println!("{}", config.show()?);
            } else {
                println!(
                    "Use --show to display current configuration or --reset to reset to defaults"
                );
            }
        }

        Commands::Resolve {
            url,
            no_hls_library,
            native_hls,
            output,
        } => {
            let capabilities = PlatformCapabilities {
                hls_library: !no_hls_library,
                native_hls,
            };
            executor()?.resolve(&url, capabilities, output)?;
        }

        Commands::Probe {
            url,
            timeout,
            output,
        } => executor()?.probe(&url, timeout, output).await?,

        Commands::Channels { file, output } => executor()?.channels(&file, output).await?,

        Commands::Simulate {
            script,
            time_scale,
            output,
        } => executor()?.simulate(&script, time_scale, output).await?,
    }

    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbose)
                .with_level(verbose),
        )
        .init();
}
